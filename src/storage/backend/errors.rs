//! 数据库错误分类与超时控制
//!
//! 存储层不做本地重试：超时和连接故障直接上抛，由调用方决定是否重试。

use std::future::Future;
use std::time::Duration;

use sea_orm::{DbErr, SqlErr};
use tracing::{debug, warn};

use crate::errors::SeqlinkError;
use crate::storage::UniqueField;

/// 判断数据库错误是否是瞬时故障（连接、死锁、锁超时）
pub fn is_transient_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | // 连接池获取失败
        DbErr::Conn(_) => true,
        DbErr::Exec(runtime_err) | DbErr::Query(runtime_err) => {
            is_transient_runtime_error(runtime_err)
        }
        _ => false,
    }
}

fn is_transient_runtime_error(err: &sea_orm::error::RuntimeErr) -> bool {
    use sea_orm::error::RuntimeErr;

    match err {
        RuntimeErr::SqlxError(sqlx_err) => {
            use std::ops::Deref;
            if let Some(db_err) = sqlx_err.deref().as_database_error() {
                if let Some(code) = db_err.code() {
                    return matches!(
                        code.as_ref(),
                        // MySQL 死锁和锁超时
                        "1213" | "1205" |
                        // PostgreSQL 序列化失败和死锁
                        "40001" | "40P01" |
                        // SQLite BUSY 和 LOCKED
                        "5" | "6"
                    );
                }
            }
            is_transient_error_message(&sqlx_err.to_string().to_lowercase())
        }
        RuntimeErr::Internal(msg) => is_transient_error_message(&msg.to_lowercase()),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

/// 通过错误消息判断（回退方案）
fn is_transient_error_message(err_str: &str) -> bool {
    err_str.contains("deadlock")
        || err_str.contains("lock wait timeout")
        || err_str.contains("database is locked")
        || err_str.contains("serialization failure")
        || err_str.contains("connection")
}

/// 唯一约束冲突时，判断是哪一列
///
/// 各数据库的报错都会带上索引名或列名，例如
/// `UNIQUE constraint failed: short_url_map.fingerprint` 或
/// `Duplicate entry '...' for key 'idx_short_url_map_fingerprint'`。
pub fn unique_violation_field(err: &DbErr) -> Option<UniqueField> {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => Some(classify_unique_message(&msg)),
        _ => None,
    }
}

fn classify_unique_message(msg: &str) -> UniqueField {
    if msg.to_lowercase().contains("fingerprint") {
        UniqueField::Fingerprint
    } else {
        UniqueField::Token
    }
}

/// 把 DbErr 转换为领域错误
pub fn map_db_err(operation_name: &str, err: DbErr) -> SeqlinkError {
    if is_transient_error(&err) {
        warn!("Operation '{}' hit a transient failure: {}", operation_name, err);
    } else {
        debug!("Operation '{}' failed: {}", operation_name, err);
    }
    SeqlinkError::store(format!("{} failed: {}", operation_name, err))
}

/// 带超时执行一次数据库操作，超时返回 `StoreTimeout`
pub async fn with_timeout<T, Fut>(
    operation_name: &str,
    timeout: Duration,
    operation: Fut,
) -> crate::errors::Result<T>
where
    Fut: Future<Output = Result<T, DbErr>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(map_db_err(operation_name, e)),
        Err(_elapsed) => {
            warn!(
                "Operation '{}' timed out after {}ms",
                operation_name,
                timeout.as_millis()
            );
            Err(SeqlinkError::store_timeout(format!(
                "{} timed out after {}ms",
                operation_name,
                timeout.as_millis()
            )))
        }
    }
}
