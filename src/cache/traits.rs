use async_trait::async_trait;

use crate::errors::Result;
use crate::storage::TokenBatchStream;

#[async_trait]
pub trait ExistenceFilter: Send + Sync {
    /// 在访问后端前先判断是否可能存在
    /// - `false` 表示**一定不存在**
    /// - `true` 表示**可能存在**
    async fn might_exist(&self, token: &str) -> bool;

    /// 新建映射后调用，返回 `Ok` 后 `might_exist(token)` 必须为 true
    ///
    /// 共享后端写入失败时返回错误，调用方不能把 token 交出去
    async fn record_existing(&self, token: &str) -> Result<()>;

    /// 批量写入（用于从数据库导入）
    async fn bulk_record(&self, tokens: &[String]) -> Result<()>;

    /// 清空整个 Filter，按 count 重新分配容量
    async fn clear(&self, count: usize, fp_rate: f64) -> Result<()> {
        tracing::debug!(
            "Not clearing Existence Filter, no operation defined. Count: {}, FP Rate: {}",
            count,
            fp_rate
        );
        Ok(())
    }

    /// 从 token 流重建，完成后原子替换旧状态
    async fn rebuild_streaming(
        &self,
        count: usize,
        fp_rate: f64,
        stream: TokenBatchStream,
    ) -> Result<()>;

    /// 进程重启后状态是否仍然存在
    fn is_persistent(&self) -> bool {
        false
    }
}

#[async_trait]
pub trait ObjectCache: Send + Sync {
    async fn get(&self, token: &str) -> Option<String>;
    async fn insert(&self, token: &str, long_url: String);
}
