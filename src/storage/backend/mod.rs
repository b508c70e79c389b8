//! SeaORM storage backend
//!
//! This module provides database storage using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod connection;
mod converters;
mod counter;
pub mod errors;
mod mutations;
pub mod query;

use std::time::Duration;

use sea_orm::DatabaseConnection;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::{Result, SeqlinkError};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{mapping_to_active_model, model_to_mapping};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(SeqlinkError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// SeaORM-based storage backend
///
/// Implements both [`MappingStore`](crate::storage::MappingStore) and
/// [`CounterStore`](crate::storage::CounterStore) on one connection pool.
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    /// 单次操作超时
    op_timeout: Duration,
}

impl SeaOrmStorage {
    /// 按配置连接数据库并运行迁移，数据库类型从 URL 推断
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let backend_name = infer_backend_from_url(&config.database_url)?;
        Self::new(
            &config.database_url,
            &backend_name,
            config.pool_size,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_millis(config.operation_timeout_ms),
        )
        .await
    }

    pub async fn new(
        database_url: &str,
        backend_name: &str,
        pool_size: u32,
        connect_timeout: Duration,
        op_timeout: Duration,
    ) -> Result<Self> {
        if database_url.is_empty() {
            return Err(SeqlinkError::database_config(
                "database_url 未设置".to_string(),
            ));
        }

        // 根据不同数据库类型配置连接选项
        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, backend_name, pool_size, connect_timeout).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
            op_timeout,
        };

        // 运行迁移
        run_migrations(&storage.db).await?;

        info!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn operation_timeout(&self) -> Duration {
        self.op_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(infer_backend_from_url("sqlite://data.db").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("links.db").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url(":memory:").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("mariadb://u:p@localhost/db").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://localhost/db").unwrap(),
            "postgres"
        );
        assert!(matches!(
            infer_backend_from_url("redis://localhost"),
            Err(SeqlinkError::DatabaseConfig(_))
        ));
    }
}
