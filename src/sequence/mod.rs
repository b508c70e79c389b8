//! Sequence allocator
//!
//! Hands out strictly unique, monotonically increasing ids backed by a
//! durable counter. Ids burned by blacklisted or failed conversions are
//! never reused.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, trace};

use crate::errors::{Result, SeqlinkError};
use crate::storage::CounterStore;

/// 默认计数器名
pub const DEFAULT_SEQUENCE_KEY: &str = "short_url";

#[async_trait]
pub trait Sequence: Send + Sync {
    async fn next(&self) -> Result<u64>;
}

pub struct SequenceAllocator {
    store: Arc<dyn CounterStore>,
    key: String,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn CounterStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }
}

#[async_trait]
impl Sequence for SequenceAllocator {
    async fn next(&self) -> Result<u64> {
        match self.store.upsert_and_return_counter(&self.key).await {
            Ok(id) => {
                trace!("Allocated id {} from '{}'", id, self.key);
                Ok(id)
            }
            Err(SeqlinkError::StoreTimeout(msg)) => Err(SeqlinkError::StoreTimeout(msg)),
            Err(e) => {
                error!("Sequence '{}' unavailable: {}", self.key, e);
                Err(SeqlinkError::allocator_unavailable(e.message().to_string()))
            }
        }
    }
}
