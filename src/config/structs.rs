use std::path::Path;

use serde::{Deserialize, Serialize};

use super::validators;
use crate::codec::DEFAULT_ALPHABET;
use crate::errors::{Result, SeqlinkError};

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - database: 数据库连接
/// - codec: token 字母表
/// - conversion: 黑名单、重试上限、计数器名、短域名
/// - guard: Existence Guard 后端
/// - cache: 已解析映射缓存
/// - logging: 日志
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    pub const DEFAULT_PATH: &'static str = "config.toml";

    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > 配置文件 > 默认值
    /// ENV 前缀：SEQLINK，分隔符：__，列表用逗号分隔
    /// 示例：SEQLINK__GUARD__BACKEND=redis
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        use config::{Config, Environment, File};

        let path = path.as_ref();
        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::from(path).required(false))
            // 2. 从环境变量覆盖
            .add_source(
                Environment::with_prefix("SEQLINK")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("conversion.blacklist")
                    .try_parsing(true),
            );

        let settings = builder
            .build()
            .map_err(|e| SeqlinkError::config(format!("Failed to build config: {}", e)))?;
        let config = settings
            .try_deserialize::<StaticConfig>()
            .map_err(|e| SeqlinkError::config(format!("Failed to deserialize config: {}", e)))?;

        if path.exists() {
            tracing::debug!("Configuration loaded from: {}", path.display());
        }
        Ok(config)
    }

    /// 启动前检查，任何一项失败都拒绝启动
    pub fn validate(&self) -> Result<()> {
        let checks = [
            validators::validate_alphabet(&self.codec.alphabet),
            validators::validate_fp_rate(self.guard.fp_rate),
            validators::validate_max_encode_retries(self.conversion.max_encode_retries),
            validators::validate_guard_backend(&self.guard.backend),
            validators::validate_sequence_key(&self.conversion.sequence_key),
        ];
        let mut errors: Vec<String> = checks.into_iter().filter_map(|r| r.err()).collect();

        if let Some(domain) = self.conversion.short_domain.as_deref()
            && let Err(e) = validators::validate_short_domain(domain)
        {
            errors.push(e);
        }
        if self.database.operation_timeout_ms == 0 {
            errors.push("database.operation_timeout_ms must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SeqlinkError::config(errors.join("; ")))
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                SeqlinkError::config(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| {
            SeqlinkError::config(format!(
                "Failed to write {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// 单次存储操作的超时，超时返回 StoreTimeout
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// 62 个互不相同的可打印 ASCII 字符，顺序决定 token 外观
    #[serde(default = "default_alphabet")]
    pub alphabet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    #[serde(default = "default_blacklist")]
    pub blacklist: Vec<String>,
    #[serde(default = "default_max_encode_retries")]
    pub max_encode_retries: u32,
    #[serde(default = "default_sequence_key")]
    pub sequence_key: String,
    #[serde(default)]
    pub short_domain: Option<String>,
}

/// Existence Guard 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// bloom / redis / null
    #[serde(default = "default_guard_backend")]
    pub backend: String,
    #[serde(default = "default_guard_capacity")]
    pub capacity: usize,
    #[serde(default = "default_guard_fp_rate")]
    pub fp_rate: f64,
    /// 持久化后端是否也在启动时重建
    #[serde(default)]
    pub rebuild_on_startup: bool,
    #[serde(default)]
    pub redis: GuardRedisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardRedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_key")]
    pub key: String,
}

/// 已解析映射缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_database_url() -> String {
    "sqlite://seqlink.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    8
}

fn default_operation_timeout_ms() -> u64 {
    3000
}

fn default_alphabet() -> String {
    DEFAULT_ALPHABET.to_string()
}

fn default_blacklist() -> Vec<String> {
    ["api", "admin", "health", "version", "login", "static"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_encode_retries() -> u32 {
    crate::services::DEFAULT_MAX_ENCODE_RETRIES
}

fn default_sequence_key() -> String {
    crate::sequence::DEFAULT_SEQUENCE_KEY.to_string()
}

fn default_guard_backend() -> String {
    "bloom".to_string()
}

fn default_guard_capacity() -> usize {
    1_000_000
}

fn default_guard_fp_rate() -> f64 {
    0.001
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_redis_key() -> String {
    "seqlink:guard".to_string()
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_capacity() -> u64 {
    10000
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            alphabet: default_alphabet(),
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            blacklist: default_blacklist(),
            max_encode_retries: default_max_encode_retries(),
            sequence_key: default_sequence_key(),
            short_domain: None,
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            backend: default_guard_backend(),
            capacity: default_guard_capacity(),
            fp_rate: default_guard_fp_rate(),
            rebuild_on_startup: false,
            redis: GuardRedisConfig::default(),
        }
    }
}

impl Default for GuardRedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key: default_redis_key(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            max_capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(StaticConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_collects_errors() {
        let mut config = StaticConfig::default();
        config.codec.alphabet = "abc".to_string();
        config.guard.fp_rate = 2.0;
        config.conversion.max_encode_retries = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, SeqlinkError::Config(_)));
        assert!(err.message().contains("codec.alphabet"));
        assert!(err.message().contains("guard.fp_rate"));
        assert!(err.message().contains("max_encode_retries"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[conversion]
blacklist = ["10", "abc"]
max_encode_retries = 4
short_domain = "https://s.example"

[guard]
backend = "null"
fp_rate = 0.01
"#
        )
        .unwrap();

        let config = StaticConfig::load_from(file.path()).unwrap();
        assert_eq!(config.conversion.blacklist, vec!["10", "abc"]);
        assert_eq!(config.conversion.max_encode_retries, 4);
        assert_eq!(
            config.conversion.short_domain.as_deref(),
            Some("https://s.example")
        );
        assert_eq!(config.guard.backend, "null");
        assert_eq!(config.guard.fp_rate, 0.01);
        // 未配置的部分使用默认值
        assert_eq!(config.codec.alphabet, DEFAULT_ALPHABET);
        assert!(config.cache.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = StaticConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.guard.backend, "bloom");
        assert_eq!(config.conversion.sequence_key, "short_url");
    }

    #[test]
    fn test_sample_config_round_trip() {
        let sample = StaticConfig::generate_sample_config().unwrap();
        assert!(sample.contains("[database]"));
        assert!(sample.contains("[guard]"));

        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.conversion.blacklist, default_blacklist());
    }

    #[test]
    fn test_save_to_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        StaticConfig::default().save_to_file(&path).unwrap();
        assert!(path.exists());
    }
}
