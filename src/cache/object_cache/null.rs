use async_trait::async_trait;
use tracing::trace;

use crate::cache::ObjectCache;

/// 关闭缓存时使用，所有查询都交给存储
pub struct NullObjectCache;

#[async_trait]
impl ObjectCache for NullObjectCache {
    async fn get(&self, _token: &str) -> Option<String> {
        None
    }

    async fn insert(&self, token: &str, _long_url: String) {
        trace!("NullObjectCache: skip insert for {}", token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_never_returns_values() {
        let cache = NullObjectCache;
        cache.insert("a", "https://a.example".to_string()).await;
        assert_eq!(cache.get("a").await, None);
    }
}
