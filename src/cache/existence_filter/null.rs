use async_trait::async_trait;
use tracing::trace;

use crate::cache::ExistenceFilter;
use crate::config::GuardConfig;
use crate::declare_existence_filter_plugin;
use crate::errors::Result;
use crate::storage::TokenBatchStream;

declare_existence_filter_plugin!("null", NullExistenceFilterPlugin);

/// 永远回答“可能存在”，所有请求都会落到存储
pub struct NullExistenceFilterPlugin;

impl NullExistenceFilterPlugin {
    pub async fn create(_config: GuardConfig) -> Result<Self> {
        trace!("Using NullExistenceFilterPlugin: every lookup reaches the store");
        Ok(NullExistenceFilterPlugin)
    }
}

#[async_trait]
impl ExistenceFilter for NullExistenceFilterPlugin {
    async fn might_exist(&self, _token: &str) -> bool {
        true
    }

    async fn record_existing(&self, _token: &str) -> Result<()> {
        Ok(())
    }

    async fn bulk_record(&self, _tokens: &[String]) -> Result<()> {
        Ok(())
    }

    async fn rebuild_streaming(
        &self,
        _count: usize,
        _fp_rate: f64,
        _stream: TokenBatchStream,
    ) -> Result<()> {
        trace!("NullExistenceFilterPlugin: skip rebuild");
        Ok(())
    }

    /// 没有状态可丢，跳过启动时重建
    fn is_persistent(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always_maybe() {
        let plugin = NullExistenceFilterPlugin::create(GuardConfig::default())
            .await
            .unwrap();
        assert!(plugin.might_exist("any").await);
        assert!(plugin.might_exist("").await);
        plugin.record_existing("x").await.unwrap();
        assert!(plugin.might_exist("x").await);
    }

    #[tokio::test]
    async fn test_clear_and_rebuild_are_noops() {
        let plugin = NullExistenceFilterPlugin;
        assert!(plugin.clear(1000, 0.01).await.is_ok());
        let empty: TokenBatchStream = Box::pin(futures_util::stream::empty());
        assert!(plugin.rebuild_streaming(0, 0.01, empty).await.is_ok());
    }
}
