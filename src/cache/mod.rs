//! Existence guard and resolved-mapping cache
//!
//! - `existence_filter`: probabilistic "definitely absent / maybe present"
//!   index consulted before any store lookup
//! - `object_cache`: immutable token → long URL pairs

pub mod existence_filter;
pub mod macros;
pub mod object_cache;
pub mod register;
pub mod traits;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{CacheConfig, GuardConfig};
use crate::errors::{Result, SeqlinkError};

pub use existence_filter::{BloomExistenceFilterPlugin, NullExistenceFilterPlugin};
#[cfg(feature = "redis-guard")]
pub use existence_filter::RedisExistenceFilterPlugin;
pub use object_cache::{MokaObjectCache, NullObjectCache};
pub use traits::{ExistenceFilter, ObjectCache};

pub struct GuardFactory;

impl GuardFactory {
    /// 按配置名从插件注册表创建 Existence Guard
    pub async fn create(config: &GuardConfig) -> Result<Arc<dyn ExistenceFilter>> {
        register::debug_guard_registry();

        let constructor = register::get_filter_plugin(&config.backend).ok_or_else(|| {
            SeqlinkError::guard_plugin_not_found(format!(
                "Existence guard plugin '{}' is not registered (available: {})",
                config.backend,
                register::registered_filter_plugins().join(", ")
            ))
        })?;

        let filter = constructor(config.clone()).await?;
        info!(
            "Existence guard '{}' created (persistent: {})",
            config.backend,
            filter.is_persistent()
        );
        Ok(Arc::from(filter))
    }
}

/// 根据 cache.enabled 选择 moka 或空缓存
pub fn create_object_cache(config: &CacheConfig) -> Arc<dyn ObjectCache> {
    if config.enabled {
        Arc::new(MokaObjectCache::new(config.max_capacity, config.ttl_secs))
    } else {
        debug!("Resolved-mapping cache disabled");
        Arc::new(NullObjectCache)
    }
}
