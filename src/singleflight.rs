//! In-flight request coalescing
//!
//! [`Group`] merges concurrent calls for the same key into one execution.
//! The first caller spawns the work on the runtime; every caller, the first
//! included, waits on a `watch` channel for the shared result. The key is
//! removed from the registry before the result is published, so a caller
//! arriving afterwards starts a fresh execution.
//!
//! Because the work runs in its own task, a caller that is cancelled or
//! dropped never cancels the work for the others.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightError {
    /// 当前调用方被取消，共享的执行不受影响
    Cancelled,
    /// 执行在产出结果前 panic 或被中止
    Abandoned,
}

impl fmt::Display for FlightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightError::Cancelled => write!(f, "caller cancelled while waiting"),
            FlightError::Abandoned => write!(f, "in-flight call ended without a result"),
        }
    }
}

impl std::error::Error for FlightError {}

struct Call<V> {
    id: u64,
    rx: watch::Receiver<Option<V>>,
}

type Calls<K, V> = Arc<Mutex<HashMap<K, Call<V>>>>;

pub struct Group<K, V> {
    calls: Calls<K, V>,
    next_id: AtomicU64,
}

impl<K, V> Default for Group<K, V> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }
}

/// 执行结束（正常返回、panic 或任务被中止）时把 key 移出注册表
struct FlightGuard<K: Eq + Hash, V> {
    calls: Calls<K, V>,
    key: K,
    id: u64,
}

impl<K: Eq + Hash, V> Drop for FlightGuard<K, V> {
    fn drop(&mut self) {
        let mut calls = self.calls.lock();
        // 只删除自己注册的那一次
        if calls.get(&self.key).is_some_and(|call| call.id == self.id) {
            calls.remove(&self.key);
        }
    }
}

impl<K, V> Group<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// 以 key 执行 `f`，同一 key 的并发调用共享一次执行的结果
    pub async fn work<F, Fut>(&self, key: K, f: F) -> Result<V, FlightError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let mut rx = self.join_or_start(key, f);
        wait_for_result(&mut rx).await
    }

    /// 同 [`Group::work`]，`cancel` 触发时当前调用方立即返回 `Cancelled`
    pub async fn work_with_cancel<F, Fut>(
        &self,
        key: K,
        cancel: &CancellationToken,
        f: F,
    ) -> Result<V, FlightError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(FlightError::Cancelled);
        }
        let mut rx = self.join_or_start(key, f);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                trace!("Singleflight caller cancelled");
                Err(FlightError::Cancelled)
            }
            result = wait_for_result(&mut rx) => result,
        }
    }

    /// 当前正在执行的 key 数量
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    fn join_or_start<F, Fut>(&self, key: K, f: F) -> watch::Receiver<Option<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let (tx, rx, id) = {
            let mut calls = self.calls.lock();
            if let Some(call) = calls.get(&key) {
                trace!("Singleflight joined call #{}", call.id);
                return call.rx.clone();
            }

            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let (tx, rx) = watch::channel(None);
            calls.insert(
                key.clone(),
                Call {
                    id,
                    rx: rx.clone(),
                },
            );
            (tx, rx, id)
        };

        // f() 在锁外调用；它 panic 时 guard 负责清理
        let guard = FlightGuard {
            calls: Arc::clone(&self.calls),
            key,
            id,
        };
        let fut = f();

        tokio::spawn(async move {
            let value = fut.await;
            drop(guard);
            if tx.send(Some(value)).is_err() {
                trace!("Singleflight call #{} finished with no waiters left", id);
            }
        });

        rx
    }
}

async fn wait_for_result<V: Clone>(rx: &mut watch::Receiver<Option<V>>) -> Result<V, FlightError> {
    match rx.wait_for(Option::is_some).await {
        Ok(value) => value.clone().ok_or(FlightError::Abandoned),
        Err(_) => {
            warn!("Singleflight call dropped its result channel");
            Err(FlightError::Abandoned)
        }
    }
}
