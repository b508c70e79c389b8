use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DatabaseConfig;
use crate::dedup::Fingerprint;
use crate::errors::Result;

pub mod backend;
pub mod models;

pub use backend::SeaOrmStorage;
pub use backend::query::TokenBatchStream;
pub use models::{InsertOutcome, Mapping, UniqueField};

/// Durable mapping store used by both orchestrators.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// 原子插入；唯一约束冲突以 `InsertOutcome::UniqueViolation` 返回
    async fn insert_mapping(&self, mapping: &Mapping) -> Result<InsertOutcome>;

    async fn get_mapping_by_token(&self, token: &str) -> Result<Option<Mapping>>;

    async fn get_mapping_by_fingerprint(&self, fingerprint: &Fingerprint)
    -> Result<Option<Mapping>>;
}

/// Durable counter with an atomic increment-and-fetch.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 计数器加一并返回新值；key 不存在时从 1 开始
    async fn upsert_and_return_counter(&self, counter_key: &str) -> Result<u64>;
}

pub struct StorageFactory;

impl StorageFactory {
    /// 使用全局配置创建存储
    pub async fn create() -> Result<Arc<SeaOrmStorage>> {
        let config = crate::config::get_config();
        Self::create_with(&config.database).await
    }

    pub async fn create_with(config: &DatabaseConfig) -> Result<Arc<SeaOrmStorage>> {
        Ok(Arc::new(SeaOrmStorage::connect(config).await?))
    }
}

#[async_trait]
impl MappingStore for SeaOrmStorage {
    async fn insert_mapping(&self, mapping: &Mapping) -> Result<InsertOutcome> {
        self.insert(mapping).await
    }

    async fn get_mapping_by_token(&self, token: &str) -> Result<Option<Mapping>> {
        self.find_by_token(token).await
    }

    async fn get_mapping_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Mapping>> {
        self.find_by_fingerprint(fingerprint).await
    }
}

#[async_trait]
impl CounterStore for SeaOrmStorage {
    async fn upsert_and_return_counter(&self, counter_key: &str) -> Result<u64> {
        self.increment_counter(counter_key).await
    }
}
