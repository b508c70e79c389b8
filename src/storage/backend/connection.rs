use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

use crate::errors::{Result, SeqlinkError};
use migration::{Migrator, MigratorTrait};

/// 连接 SQLite 数据库（带自动创建和 WAL）
pub async fn connect_sqlite(database_url: &str) -> Result<DatabaseConnection> {
    use sea_orm::SqlxSqliteConnector;
    use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
    use sea_orm::sqlx::sqlite::SqlitePoolOptions;
    use std::str::FromStr;

    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite://{}", database_url)
    };

    let opt = SqliteConnectOptions::from_str(&url)
        .map_err(|e| SeqlinkError::database_config(format!("SQLite URL 解析失败: {}", e)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        // 计数器 upsert 在并发下会互相等待写锁
        .busy_timeout(Duration::from_secs(5))
        .pragma("cache_size", "-64000")
        .pragma("temp_store", "memory");

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(opt)
        .await
        .map_err(|e| {
            SeqlinkError::database_connection(format!("无法连接到 SQLite 数据库: {}", e))
        })?;

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

/// 连接通用数据库（MySQL/PostgreSQL）
pub async fn connect_generic(
    database_url: &str,
    backend_name: &str,
    pool_size: u32,
    connect_timeout: Duration,
) -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(pool_size)
        .min_connections(pool_size.min(5))
        .connect_timeout(connect_timeout)
        .acquire_timeout(connect_timeout)
        .idle_timeout(Duration::from_secs(300)) // 5分钟空闲超时
        .max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(false);

    Database::connect(opt).await.map_err(|e| {
        SeqlinkError::database_connection(format!(
            "无法连接到 {} 数据库: {}",
            backend_name.to_uppercase(),
            e
        ))
    })
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None)
        .await
        .map_err(|e| SeqlinkError::database_connection(format!("迁移失败: {}", e)))?;

    info!("Database migrations completed");
    Ok(())
}
