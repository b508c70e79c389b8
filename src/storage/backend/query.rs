//! Query operations for SeaOrmStorage
//!
//! This module contains all read-only database operations.

use std::pin::Pin;
use std::time::Duration;

use futures_util::stream::{self, Stream};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use tracing::{debug, info};

use super::SeaOrmStorage;
use super::converters::model_to_mapping;
use super::errors::with_timeout;
use crate::dedup::Fingerprint;
use crate::errors::Result;
use crate::storage::Mapping;

use migration::entities::short_url_map;

/// 按批次返回 token 的流
pub type TokenBatchStream = Pin<Box<dyn Stream<Item = Result<Vec<String>>> + Send>>;

impl SeaOrmStorage {
    pub async fn find_by_token(&self, token: &str) -> Result<Option<Mapping>> {
        let model = with_timeout(
            &format!("get_mapping_by_token({})", token),
            self.op_timeout,
            short_url_map::Entity::find()
                .filter(short_url_map::Column::Token.eq(token))
                .one(&self.db),
        )
        .await?;

        model.map(model_to_mapping).transpose()
    }

    pub async fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<Mapping>> {
        let model = with_timeout(
            "get_mapping_by_fingerprint",
            self.op_timeout,
            short_url_map::Entity::find()
                .filter(short_url_map::Column::Fingerprint.eq(fingerprint.to_hex()))
                .one(&self.db),
        )
        .await?;

        model.map(model_to_mapping).transpose()
    }

    /// 映射总数（用于 Existence Guard 预分配容量）
    pub async fn count_mappings(&self) -> Result<u64> {
        with_timeout(
            "count_mappings",
            self.op_timeout,
            short_url_map::Entity::find().count(&self.db),
        )
        .await
    }

    /// 按 id 游标分页流式读取所有 token
    ///
    /// 内存占用 O(batch_size)，启动时用于重建 Existence Guard。
    /// 每一页单独计算超时。
    pub fn stream_tokens(&self, batch_size: u64) -> TokenBatchStream {
        let db = self.db.clone();
        let batch_size = batch_size.max(1);
        let op_timeout = self.op_timeout;

        Box::pin(stream::unfold(
            (db, Some(i64::MIN), 0usize),
            move |(db, cursor, loaded)| async move {
                let after = cursor?;
                match fetch_token_page(&db, after, batch_size, op_timeout).await {
                    Ok(rows) if rows.is_empty() => {
                        info!("Token stream finished, {} tokens loaded", loaded);
                        None
                    }
                    Ok(rows) => {
                        let last_id = rows.last().map(|(id, _)| *id);
                        let loaded = loaded + rows.len();
                        debug!("Token stream batch of {} (total: {})", rows.len(), loaded);
                        let tokens = rows.into_iter().map(|(_, token)| token).collect();
                        Some((Ok(tokens), (db, last_id, loaded)))
                    }
                    // 出错后结束流
                    Err(e) => Some((Err(e), (db, None, loaded))),
                }
            },
        ))
    }
}

async fn fetch_token_page(
    db: &DatabaseConnection,
    after_id: i64,
    batch_size: u64,
    op_timeout: Duration,
) -> Result<Vec<(i64, String)>> {
    with_timeout(
        "stream_tokens",
        op_timeout,
        short_url_map::Entity::find()
            .select_only()
            .column(short_url_map::Column::Id)
            .column(short_url_map::Column::Token)
            .filter(short_url_map::Column::Id.gt(after_id))
            .order_by_asc(short_url_map::Column::Id)
            .limit(batch_size)
            .into_tuple::<(i64, String)>()
            .all(db),
    )
    .await
}
