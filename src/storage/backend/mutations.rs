//! Mutation operations for SeaOrmStorage
//!
//! Mappings are insert-only; nothing here updates or deletes a row.

use sea_orm::EntityTrait;
use tracing::{debug, info};

use super::SeaOrmStorage;
use super::converters::mapping_to_active_model;
use super::errors::{map_db_err, unique_violation_field};
use crate::errors::{Result, SeqlinkError};
use crate::storage::{InsertOutcome, Mapping};

use migration::entities::short_url_map;

impl SeaOrmStorage {
    pub async fn insert(&self, mapping: &Mapping) -> Result<InsertOutcome> {
        let active = mapping_to_active_model(mapping)?;
        let operation_name = format!("insert_mapping({})", mapping.token);

        let result = tokio::time::timeout(
            self.op_timeout,
            short_url_map::Entity::insert(active).exec_without_returning(&self.db),
        )
        .await
        .map_err(|_| {
            SeqlinkError::store_timeout(format!(
                "{} timed out after {}ms",
                operation_name,
                self.op_timeout.as_millis()
            ))
        })?;

        match result {
            Ok(_) => {
                info!("Mapping created: {} -> id {}", mapping.token, mapping.id);
                Ok(InsertOutcome::Inserted)
            }
            Err(e) => match unique_violation_field(&e) {
                Some(field) => {
                    debug!("{} hit unique constraint on {:?}: {}", operation_name, field, e);
                    Ok(InsertOutcome::UniqueViolation(field))
                }
                None => Err(map_db_err(&operation_name, e)),
            },
        }
    }
}
