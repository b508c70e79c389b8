use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use super::startup::StartupContext;

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// 关闭数据库连接池
///
/// 组件都是 Arc 共享的，这里只负责最后释放连接。
pub async fn shutdown(ctx: StartupContext) {
    let StartupContext {
        storage,
        conversion,
        resolution,
        ..
    } = ctx;
    drop(conversion);
    drop(resolution);

    let db = storage.get_db().clone();
    drop(storage);

    match timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), db.close()).await {
        Ok(Ok(())) => info!("Database connection closed"),
        Ok(Err(e)) => warn!("Failed to close database connection: {}", e),
        Err(_) => warn!(
            "Closing database connection timed out after {} seconds",
            SHUTDOWN_TIMEOUT_SECS
        ),
    }
}
