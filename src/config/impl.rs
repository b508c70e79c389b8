use std::path::Path;
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;
use crate::errors::Result;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks. Falls back to defaults when nothing has
/// been loaded yet.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()))
        .load_full()
}

/// Load `config.toml` from the current directory plus `SEQLINK__*` env vars
pub fn init_config() -> Result<Arc<StaticConfig>> {
    init_config_from(StaticConfig::DEFAULT_PATH)
}

/// Load, validate and publish the configuration
pub fn init_config_from<P: AsRef<Path>>(path: P) -> Result<Arc<StaticConfig>> {
    let config = StaticConfig::load_from(path)?;
    config.validate()?;
    Ok(set_config(config))
}

/// 直接替换全局配置（嵌入方和测试使用）
pub fn set_config(config: StaticConfig) -> Arc<StaticConfig> {
    let config = Arc::new(config);
    CONFIG
        .get_or_init(|| ArcSwap::new(Arc::clone(&config)))
        .store(Arc::clone(&config));
    config
}
