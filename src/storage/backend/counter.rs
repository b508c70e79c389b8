//! Sequence counter operations for SeaOrmStorage

use sea_orm::{
    EntityTrait, ExprTrait, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::trace;

use super::SeaOrmStorage;
use super::errors::{map_db_err, with_timeout};
use crate::errors::{Result, SeqlinkError};

use migration::entities::sequence_counter;

impl SeaOrmStorage {
    /// 原子自增并返回新值
    ///
    /// `INSERT .. ON CONFLICT(name) DO UPDATE SET seq_value = seq_value + 1`，
    /// 然后在同一事务内读回。行锁保证并发调用得到互不相同的值。
    pub async fn increment_counter(&self, counter_key: &str) -> Result<u64> {
        let operation_name = format!("upsert_and_return_counter({})", counter_key);
        let value = with_timeout(&operation_name, self.op_timeout, async {
            let txn = self.db.begin().await?;

            let row = sequence_counter::ActiveModel {
                name: sea_orm::ActiveValue::Set(counter_key.to_string()),
                seq_value: sea_orm::ActiveValue::Set(1),
            };
            sequence_counter::Entity::insert(row)
                .on_conflict(
                    OnConflict::column(sequence_counter::Column::Name)
                        .value(
                            sequence_counter::Column::SeqValue,
                            Expr::col((
                                sequence_counter::Entity,
                                sequence_counter::Column::SeqValue,
                            ))
                            .add(1),
                        )
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;

            let current = sequence_counter::Entity::find_by_id(counter_key.to_string())
                .one(&txn)
                .await?;
            txn.commit().await?;
            Ok::<_, sea_orm::DbErr>(current)
        })
        .await?;

        let model = value.ok_or_else(|| {
            map_db_err(
                &operation_name,
                sea_orm::DbErr::RecordNotFound(format!("counter '{}' vanished", counter_key)),
            )
        })?;

        let next = u64::try_from(model.seq_value).map_err(|_| {
            SeqlinkError::store(format!(
                "counter '{}' holds negative value {}",
                counter_key, model.seq_value
            ))
        })?;
        trace!("Counter '{}' advanced to {}", counter_key, next);
        Ok(next)
    }
}
