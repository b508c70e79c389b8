use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use tracing::debug;

use crate::cache::ObjectCache;

/// 已解析映射的进程内缓存
///
/// 映射创建后不可变，缓存项不会变脏，TTL 只用于控制内存占用。
pub struct MokaObjectCache {
    inner: Cache<String, String>,
}

impl MokaObjectCache {
    pub fn new(max_capacity: u64, ttl_secs: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        debug!(
            "MokaObjectCache initialized with max capacity: {}, TTL: {}s",
            max_capacity, ttl_secs
        );
        Self { inner }
    }
}

#[async_trait]
impl ObjectCache for MokaObjectCache {
    async fn get(&self, token: &str) -> Option<String> {
        self.inner.get(token).await
    }

    async fn insert(&self, token: &str, long_url: String) {
        self.inner.insert(token.to_string(), long_url).await;
    }
}
