use async_trait::async_trait;
use bloomfilter::Bloom;
use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::debug;

use crate::cache::ExistenceFilter;
use crate::config::GuardConfig;
use crate::declare_existence_filter_plugin;
use crate::errors::{Result, SeqlinkError};
use crate::storage::TokenBatchStream;

declare_existence_filter_plugin!("bloom", BloomExistenceFilterPlugin);

/// 进程内 Bloom Filter，重启后需要从数据库重建
pub struct BloomExistenceFilterPlugin {
    inner: Arc<RwLock<Bloom<str>>>,
    /// rebuild 期间收集新增 token 的 buffer。
    /// Some = 正在重建，record_existing() 会同时写入 buffer
    /// None = 未在重建
    rebuild_buffer: Mutex<Option<Vec<String>>>,
}

impl BloomExistenceFilterPlugin {
    pub fn new(capacity: usize, fp_rate: f64) -> Result<Self> {
        let bloom = new_bloom(capacity.max(1), fp_rate)?;
        Ok(Self {
            inner: Arc::new(RwLock::new(bloom)),
            rebuild_buffer: Mutex::new(None),
        })
    }

    pub async fn create(config: GuardConfig) -> Result<Self> {
        debug!(
            "Creating bloom guard with capacity {} and fp_rate {}",
            config.capacity, config.fp_rate
        );
        Self::new(config.capacity, config.fp_rate)
    }
}

fn new_bloom(capacity: usize, fp_rate: f64) -> Result<Bloom<str>> {
    Bloom::new_for_fp_rate(capacity, fp_rate).map_err(|e| {
        SeqlinkError::guard_backend(format!("Failed to create bloom filter: {e}"))
    })
}

/// 分段预留策略，计算 Bloom Filter 实际容量
/// - < 5000: 预留 50%
/// - 5000-100000: 预留 20%
/// - > 100000: 预留 10%（最多 100 万）
pub fn calculate_capacity(count: usize) -> usize {
    let reserve = if count < 5000 {
        count / 2
    } else if count < 100000 {
        count / 5
    } else {
        (count / 10).min(1_000_000)
    };
    count + reserve.max(1000) // 最少预留 1000
}

#[async_trait]
impl ExistenceFilter for BloomExistenceFilterPlugin {
    async fn might_exist(&self, token: &str) -> bool {
        self.inner.read().check(token)
    }

    async fn record_existing(&self, token: &str) -> Result<()> {
        // 锁顺序：buffer lock → inner write lock（与 rebuild_streaming 一致）
        let mut buffer_guard = self.rebuild_buffer.lock();
        self.inner.write().set(token);
        if let Some(ref mut buffer) = *buffer_guard {
            buffer.push(token.to_string());
        }
        Ok(())
    }

    async fn bulk_record(&self, tokens: &[String]) -> Result<()> {
        let mut buffer_guard = self.rebuild_buffer.lock();
        {
            let mut bloom = self.inner.write();
            for token in tokens {
                bloom.set(token);
            }
        }
        if let Some(ref mut buffer) = *buffer_guard {
            buffer.extend(tokens.iter().cloned());
        }
        debug!("Bulk inserted {} tokens into bloom filter", tokens.len());
        Ok(())
    }

    async fn clear(&self, count: usize, fp_rate: f64) -> Result<()> {
        let capacity = calculate_capacity(count);
        let fresh = new_bloom(capacity, fp_rate)?;
        *self.inner.write() = fresh;
        debug!(
            "Bloom filter cleared with capacity: {} (count: {} + reserve: {}), fp_rate: {}",
            capacity,
            count,
            capacity - count,
            fp_rate
        );
        Ok(())
    }

    /// 在锁外构建完整的新 Bloom Filter，然后原子交换。
    /// 读取端看到的要么是旧的完整 Bloom，要么是新的完整 Bloom。
    /// 重建期间并发写入的 token 先进 buffer，交换前补齐。
    async fn rebuild_streaming(
        &self,
        count: usize,
        fp_rate: f64,
        mut stream: TokenBatchStream,
    ) -> Result<()> {
        *self.rebuild_buffer.lock() = Some(Vec::new());

        let capacity = calculate_capacity(count);
        let mut new_bloom = match new_bloom(capacity, fp_rate) {
            Ok(bloom) => bloom,
            Err(e) => {
                *self.rebuild_buffer.lock() = None;
                return Err(e);
            }
        };

        let mut loaded: usize = 0;
        while let Some(batch_result) = stream.next().await {
            match batch_result {
                Ok(batch) => {
                    for token in &batch {
                        new_bloom.set(token.as_str());
                    }
                    loaded += batch.len();
                }
                Err(e) => {
                    // 旧 Bloom 保持不变
                    *self.rebuild_buffer.lock() = None;
                    return Err(e);
                }
            }
        }

        // 持 buffer lock → drain buffer → 交换 → 关闭 buffer
        let buffered_count;
        {
            let mut buffer_guard = self.rebuild_buffer.lock();
            if let Some(pending) = buffer_guard.take() {
                buffered_count = pending.len();
                for token in &pending {
                    new_bloom.set(token.as_str());
                }
            } else {
                buffered_count = 0;
            }
            *self.inner.write() = new_bloom;
        }

        debug!(
            "Bloom filter rebuilt with {} tokens ({} from buffer), capacity: {} (count: {} + reserve: {}), fp_rate: {}",
            loaded + buffered_count,
            buffered_count,
            capacity,
            count,
            capacity - count,
            fp_rate
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn filter() -> BloomExistenceFilterPlugin {
        BloomExistenceFilterPlugin::new(1000, 0.001).unwrap()
    }

    fn batches(batches: Vec<Result<Vec<String>>>) -> TokenBatchStream {
        Box::pin(stream::iter(batches))
    }

    #[tokio::test]
    async fn test_empty_filter_reports_absent() {
        assert!(!filter().might_exist("nonexistent").await);
    }

    #[tokio::test]
    async fn test_record_and_check() {
        let f = filter();
        f.record_existing("1En").await.unwrap();
        assert!(f.might_exist("1En").await);
        assert!(!f.might_exist("1Eo").await);
    }

    #[tokio::test]
    async fn test_bulk_record() {
        let f = filter();
        let tokens: Vec<String> = (0..100).map(|i| format!("t{}", i)).collect();
        f.bulk_record(&tokens).await.unwrap();
        for token in &tokens {
            assert!(f.might_exist(token).await, "{} should exist", token);
        }
    }

    #[tokio::test]
    async fn test_clear_resets_filter() {
        let f = filter();
        f.record_existing("abc").await.unwrap();
        f.clear(1000, 0.001).await.unwrap();
        assert!(!f.might_exist("abc").await);
    }

    #[test]
    fn test_calculate_capacity_tiers() {
        assert_eq!(calculate_capacity(0), 1000);
        assert_eq!(calculate_capacity(4000), 6000);
        assert_eq!(calculate_capacity(50_000), 60_000);
        assert_eq!(calculate_capacity(200_000), 220_000);
        assert_eq!(calculate_capacity(20_000_000), 21_000_000);
    }

    #[tokio::test]
    async fn test_rebuild_streaming_replaces_state() {
        let f = filter();
        f.record_existing("old").await.unwrap();

        let stream = batches(vec![
            Ok(vec!["a".to_string(), "b".to_string()]),
            Ok(vec!["c".to_string()]),
        ]);
        f.rebuild_streaming(3, 0.001, stream).await.unwrap();

        assert!(f.might_exist("a").await);
        assert!(f.might_exist("c").await);
        assert!(!f.might_exist("old").await);
    }

    #[tokio::test]
    async fn test_rebuild_streaming_error_keeps_old_filter() {
        let f = filter();
        f.record_existing("kept").await.unwrap();

        let stream = batches(vec![
            Ok(vec!["a".to_string()]),
            Err(SeqlinkError::store("connection reset")),
        ]);
        assert!(f.rebuild_streaming(2, 0.001, stream).await.is_err());

        assert!(f.might_exist("kept").await);
        assert!(!f.might_exist("a").await);
    }

    #[tokio::test]
    async fn test_record_during_rebuild_is_not_lost() {
        let f = Arc::new(filter());
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<Vec<String>>>(1);
        let stream: TokenBatchStream = Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }));

        let rebuilding = {
            let f = f.clone();
            tokio::spawn(async move { f.rebuild_streaming(2, 0.001, stream).await })
        };

        tx.send(Ok(vec!["from_store".to_string()])).await.unwrap();
        // 容量为 1，第二次 send 返回时重建一定已经开始
        tx.send(Ok(vec![])).await.unwrap();
        f.record_existing("fresh").await.unwrap();
        drop(tx);

        rebuilding.await.unwrap().unwrap();
        assert!(f.might_exist("from_store").await);
        assert!(f.might_exist("fresh").await);
    }

    #[tokio::test]
    async fn test_false_positive_rate_within_bounds() {
        let f = filter();
        let tokens: Vec<String> = (0..1000).map(|i| format!("existing_{}", i)).collect();
        f.bulk_record(&tokens).await.unwrap();

        let mut false_positives = 0;
        for i in 0..10000 {
            if f.might_exist(&format!("nonexistent_{}", i)).await {
                false_positives += 1;
            }
        }
        // 期望约 10 次，允许到 50
        assert!(
            false_positives < 50,
            "False positive rate too high: {}/10000",
            false_positives
        );
    }

    #[tokio::test]
    async fn test_not_persistent() {
        assert!(!filter().is_persistent());
    }
}
