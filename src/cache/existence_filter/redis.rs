//! Redis-backed bloom bitmap
//!
//! Bits live in one Redis string (`SETBIT`/`GETBIT`), so the guard survives
//! process restarts and is shared by every instance pointing at the same key.
//! The bitmap layout (`m` bits, `k` hashes) is stored next to it under
//! `{key}:layout` and read back on startup, so a changed `capacity` in the
//! config never reinterprets existing bits.
//!
//! Reads that fail answer "maybe". A failed write is returned to the caller
//! (the token must not be handed out) and marks this instance degraded until
//! the next successful rebuild.
//!
//! Every read and write reads `{key}:layout` inside the same MULTI as its
//! bit commands. When another instance has rebuilt with a different layout,
//! reads answer "maybe" and writes are repeated with the stored layout, which
//! then replaces the local copy.

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use redis::{AsyncCommands, aio::MultiplexedConnection};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};
use xxhash_rust::xxh3::xxh3_128;

use super::calculate_capacity;
use crate::cache::ExistenceFilter;
use crate::config::GuardConfig;
use crate::declare_existence_filter_plugin;
use crate::errors::{Result, SeqlinkError};
use crate::storage::TokenBatchStream;

declare_existence_filter_plugin!("redis", RedisExistenceFilterPlugin);

/// Redis string 最大 512MB
const MAX_BITS: u64 = 1 << 32;
const MAX_HASHES: u32 = 30;
/// 每个 pipeline 写入的 token 数
const PIPELINE_CHUNK: usize = 1000;
/// 写入时布局连续变化的最多重试次数
const LAYOUT_RETRIES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BitLayout {
    num_bits: u64,
    num_hashes: u32,
}

impl BitLayout {
    fn for_capacity(capacity: usize, fp_rate: f64) -> Self {
        let n = capacity.max(1) as f64;
        let ln2 = std::f64::consts::LN_2;
        let m = (-(n * fp_rate.ln()) / (ln2 * ln2)).ceil();
        let num_bits = (m as u64).clamp(64, MAX_BITS);
        let k = ((num_bits as f64 / n) * ln2).round() as u32;
        Self {
            num_bits,
            num_hashes: k.clamp(1, MAX_HASHES),
        }
    }

    fn encode(&self) -> String {
        format!("{}:{}", self.num_bits, self.num_hashes)
    }

    fn decode(raw: &str) -> Option<Self> {
        let (m, k) = raw.split_once(':')?;
        let num_bits: u64 = m.parse().ok()?;
        let num_hashes: u32 = k.parse().ok()?;
        if num_bits == 0 || num_bits > MAX_BITS || num_hashes == 0 || num_hashes > MAX_HASHES {
            return None;
        }
        Some(Self {
            num_bits,
            num_hashes,
        })
    }

    /// Kirsch–Mitzenmacher 双重哈希
    fn positions(&self, token: &str) -> impl Iterator<Item = u64> + '_ {
        let h = xxh3_128(token.as_bytes());
        let h1 = h as u64;
        let h2 = ((h >> 64) as u64) | 1;
        let m = self.num_bits;
        (0..self.num_hashes as u64).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % m)
    }
}

/// 一次读取的结果
#[derive(Debug, PartialEq, Eq)]
enum BitsRead {
    /// 布局一致，true 表示全部 bit 已置位
    Checked(bool),
    /// Redis 中的布局与本地不同（None 表示布局 key 丢失或无法解析）
    LayoutChanged(Option<BitLayout>),
}

/// 解析 `GET {key}:layout` + `GETBIT`... 的回复
fn interpret_read(local: BitLayout, replies: &[Option<String>]) -> BitsRead {
    let Some((stored, bits)) = replies.split_first() else {
        return BitsRead::LayoutChanged(None);
    };
    let stored = stored.as_deref().and_then(BitLayout::decode);
    if stored != Some(local) {
        return BitsRead::LayoutChanged(stored);
    }
    BitsRead::Checked(bits.iter().all(|bit| bit.as_deref() == Some("1")))
}

pub struct RedisExistenceFilterPlugin {
    client: redis::Client,
    /// 持久化连接，使用 RwLock 保护
    connection: Arc<tokio::sync::RwLock<Option<MultiplexedConnection>>>,
    key: String,
    layout: RwLock<BitLayout>,
    degraded: AtomicBool,
    /// Some = 正在重建
    rebuild_buffer: Mutex<Option<Vec<String>>>,
}

impl RedisExistenceFilterPlugin {
    pub async fn create(config: GuardConfig) -> Result<Self> {
        let client = redis::Client::open(config.redis.url.clone()).map_err(|e| {
            SeqlinkError::guard_backend(format!("Invalid Redis URL '{}': {}", config.redis.url, e))
        })?;

        let plugin = Self {
            client,
            connection: Arc::new(tokio::sync::RwLock::new(None)),
            key: config.redis.key.clone(),
            layout: RwLock::new(BitLayout::for_capacity(config.capacity, config.fp_rate)),
            degraded: AtomicBool::new(false),
            rebuild_buffer: Mutex::new(None),
        };

        let mut conn = plugin.get_connection().await.map_err(|e| {
            SeqlinkError::guard_backend(format!(
                "Failed to connect to Redis at {}: {}",
                config.redis.url, e
            ))
        })?;

        let stored: Option<String> = conn
            .get(plugin.layout_key())
            .await
            .map_err(|e| SeqlinkError::guard_backend(format!("Failed to read layout: {}", e)))?;

        match stored.as_deref().and_then(BitLayout::decode) {
            Some(layout) => {
                info!(
                    "Redis guard '{}' reusing stored layout: {} bits, {} hashes",
                    plugin.key, layout.num_bits, layout.num_hashes
                );
                *plugin.layout.write() = layout;
            }
            None => {
                let layout = *plugin.layout.read();
                let _: () = conn
                    .set(plugin.layout_key(), layout.encode())
                    .await
                    .map_err(|e| {
                        SeqlinkError::guard_backend(format!("Failed to write layout: {}", e))
                    })?;
                info!(
                    "Redis guard '{}' initialized: {} bits, {} hashes",
                    plugin.key, layout.num_bits, layout.num_hashes
                );
            }
        }

        Ok(plugin)
    }

    fn layout_key(&self) -> String {
        format!("{}:layout", self.key)
    }

    fn rebuild_key(&self) -> String {
        format!("{}:rebuild", self.key)
    }

    /// 获取或建立持久连接
    async fn get_connection(&self) -> redis::RedisResult<MultiplexedConnection> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;
        // 双重检查
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established and cached");
        Ok(new_conn)
    }

    async fn reset_connection(&self) {
        *self.connection.write().await = None;
        debug!("Redis connection reset due to error");
    }

    async fn set_bits(&self, key: &str, layout: BitLayout, tokens: &[String]) -> redis::RedisResult<()> {
        let mut conn = self.get_connection().await?;
        for chunk in tokens.chunks(PIPELINE_CHUNK) {
            let mut pipe = redis::pipe();
            for token in chunk {
                for pos in layout.positions(token) {
                    pipe.cmd("SETBIT").arg(key).arg(pos).arg(1).ignore();
                }
            }
            let _: () = pipe.query_async(&mut conn).await?;
        }
        Ok(())
    }

    /// 写入主 key，每个 chunk 在 MULTI 内先读布局。
    /// `None` 表示布局一致；`Some(stored)` 为 Redis 中不同的布局（key 丢失时为 `Some(None)`）
    async fn set_bits_checked(
        &self,
        layout: BitLayout,
        tokens: &[String],
    ) -> redis::RedisResult<Option<Option<BitLayout>>> {
        let mut conn = self.get_connection().await?;
        for chunk in tokens.chunks(PIPELINE_CHUNK) {
            let mut pipe = redis::pipe();
            pipe.atomic().cmd("GET").arg(self.layout_key());
            for token in chunk {
                for pos in layout.positions(token) {
                    pipe.cmd("SETBIT").arg(&self.key).arg(pos).arg(1).ignore();
                }
            }
            let replies: Vec<Option<String>> = pipe.query_async(&mut conn).await?;
            let stored = replies
                .first()
                .and_then(|raw| raw.as_deref())
                .and_then(BitLayout::decode);
            if stored != Some(layout) {
                return Ok(Some(stored));
            }
        }
        Ok(None)
    }

    async fn get_bits(&self, token: &str) -> redis::RedisResult<BitsRead> {
        let layout = *self.layout.read();
        let mut conn = self.get_connection().await?;
        let mut pipe = redis::pipe();
        pipe.atomic().cmd("GET").arg(self.layout_key());
        for pos in layout.positions(token) {
            pipe.cmd("GETBIT").arg(&self.key).arg(pos);
        }
        let replies: Vec<Option<String>> = pipe.query_async(&mut conn).await?;
        Ok(interpret_read(layout, &replies))
    }

    fn adopt_layout(&self, stored: BitLayout) {
        let mut local = self.layout.write();
        if *local != stored {
            warn!(
                "Redis guard '{}' layout changed by another instance: {} bits, {} hashes",
                self.key, stored.num_bits, stored.num_hashes
            );
            *local = stored;
        }
    }

    /// 记录 token 并返回写入时使用的布局
    fn buffer_and_layout(&self, tokens: &[String]) -> BitLayout {
        let mut buffer_guard = self.rebuild_buffer.lock();
        if let Some(ref mut buffer) = *buffer_guard {
            buffer.extend(tokens.iter().cloned());
        }
        *self.layout.read()
    }

    async fn write_tokens(&self, tokens: &[String]) -> Result<()> {
        let mut layout = self.buffer_and_layout(tokens);
        for _ in 0..LAYOUT_RETRIES {
            match self.set_bits_checked(layout, tokens).await {
                Ok(None) => return Ok(()),
                Ok(Some(Some(stored))) => {
                    // 已写入的 bit 使用了旧布局，按新布局重写
                    self.adopt_layout(stored);
                    layout = stored;
                }
                Ok(Some(None)) => {
                    self.degraded.store(true, Ordering::SeqCst);
                    return Err(SeqlinkError::guard_backend(format!(
                        "Redis guard '{}' has no valid layout",
                        self.key
                    )));
                }
                Err(e) => {
                    // 丢失写入后不能再回答“一定不存在”
                    self.degraded.store(true, Ordering::SeqCst);
                    error!(
                        "Redis guard write failed for {} tokens, guard degraded until next rebuild: {}",
                        tokens.len(),
                        e
                    );
                    self.reset_connection().await;
                    return Err(SeqlinkError::guard_backend(format!(
                        "Failed to record {} tokens in redis guard: {}",
                        tokens.len(),
                        e
                    )));
                }
            }
        }
        self.degraded.store(true, Ordering::SeqCst);
        Err(SeqlinkError::guard_backend(format!(
            "Redis guard '{}' layout kept changing during write",
            self.key
        )))
    }

    fn abort_rebuild(&self) {
        *self.rebuild_buffer.lock() = None;
    }

    /// 交换前把 buffer 中的 token 写入临时 key，直到 buffer 为空
    async fn drain_buffer_into(&self, key: &str, layout: BitLayout) -> redis::RedisResult<usize> {
        let mut drained = 0;
        loop {
            let pending = match self.rebuild_buffer.lock().as_mut() {
                Some(buffer) => std::mem::take(buffer),
                None => Vec::new(),
            };
            if pending.is_empty() {
                return Ok(drained);
            }
            drained += pending.len();
            self.set_bits(key, layout, &pending).await?;
        }
    }
}

#[async_trait]
impl ExistenceFilter for RedisExistenceFilterPlugin {
    async fn might_exist(&self, token: &str) -> bool {
        if self.degraded.load(Ordering::SeqCst) {
            return true;
        }
        match self.get_bits(token).await {
            Ok(BitsRead::Checked(present)) => present,
            Ok(BitsRead::LayoutChanged(stored)) => {
                if let Some(stored) = stored {
                    self.adopt_layout(stored);
                }
                true
            }
            Err(e) => {
                warn!("Redis guard read failed, answering maybe: {}", e);
                self.reset_connection().await;
                true
            }
        }
    }

    async fn record_existing(&self, token: &str) -> Result<()> {
        self.write_tokens(std::slice::from_ref(&token.to_string()))
            .await
    }

    async fn bulk_record(&self, tokens: &[String]) -> Result<()> {
        self.write_tokens(tokens).await?;
        debug!("Bulk inserted {} tokens into redis guard", tokens.len());
        Ok(())
    }

    async fn clear(&self, count: usize, fp_rate: f64) -> Result<()> {
        let layout = BitLayout::for_capacity(calculate_capacity(count), fp_rate);
        let mut conn = self
            .get_connection()
            .await
            .map_err(|e| SeqlinkError::guard_backend(e.to_string()))?;
        let _: () = redis::pipe()
            .atomic()
            .cmd("DEL")
            .arg(&self.key)
            .ignore()
            .cmd("SET")
            .arg(self.layout_key())
            .arg(layout.encode())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| SeqlinkError::guard_backend(format!("Failed to clear redis guard: {}", e)))?;
        *self.layout.write() = layout;
        self.degraded.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// 写入临时 key，完成后 MULTI 内 RENAME + 更新布局。
    /// 重建期间的并发写入先写旧 key 并进入 buffer，交换前后各补写一次。
    async fn rebuild_streaming(
        &self,
        count: usize,
        fp_rate: f64,
        mut stream: TokenBatchStream,
    ) -> Result<()> {
        let layout = BitLayout::for_capacity(calculate_capacity(count), fp_rate);
        let tmp_key = self.rebuild_key();
        *self.rebuild_buffer.lock() = Some(Vec::new());

        let mut conn = match self.get_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                self.abort_rebuild();
                return Err(SeqlinkError::guard_backend(e.to_string()));
            }
        };
        let cleared: redis::RedisResult<()> = conn.del(&tmp_key).await;
        if let Err(e) = cleared {
            self.abort_rebuild();
            return Err(SeqlinkError::guard_backend(e.to_string()));
        }

        let mut loaded = 0usize;
        while let Some(batch_result) = stream.next().await {
            let batch = match batch_result {
                Ok(batch) => batch,
                Err(e) => {
                    self.abort_rebuild();
                    return Err(e);
                }
            };
            if let Err(e) = self.set_bits(&tmp_key, layout, &batch).await {
                self.abort_rebuild();
                return Err(SeqlinkError::guard_backend(format!(
                    "Failed to write rebuild batch: {}",
                    e
                )));
            }
            loaded += batch.len();
        }

        // 交换窗口内本地布局和 Redis 中的 bitmap 可能不一致，先回答“可能存在”
        self.degraded.store(true, Ordering::SeqCst);
        let swap = async {
            let buffered = self.drain_buffer_into(&tmp_key, layout).await?;
            // 空集合时 SETBIT 从未执行，临时 key 不存在，RENAME 会失败
            let _: usize = redis::cmd("APPEND")
                .arg(&tmp_key)
                .arg("")
                .query_async(&mut conn)
                .await?;
            let _: () = redis::pipe()
                .atomic()
                .cmd("RENAME")
                .arg(&tmp_key)
                .arg(&self.key)
                .ignore()
                .cmd("SET")
                .arg(self.layout_key())
                .arg(layout.encode())
                .ignore()
                .query_async(&mut conn)
                .await?;
            Ok::<usize, redis::RedisError>(buffered)
        };
        let buffered = match swap.await {
            Ok(buffered) => buffered,
            Err(e) => {
                self.abort_rebuild();
                return Err(SeqlinkError::guard_backend(format!(
                    "Failed to swap rebuilt redis guard: {}",
                    e
                )));
            }
        };

        *self.layout.write() = layout;
        // 交换前后的并发写入可能落在旧布局上，用新布局补写
        let late: Vec<String> = self.rebuild_buffer.lock().take().unwrap_or_default();
        if !late.is_empty()
            && let Err(e) = self.set_bits(&self.key, layout, &late).await
        {
            self.degraded.store(true, Ordering::SeqCst);
            return Err(SeqlinkError::guard_backend(format!(
                "Failed to replay {} late tokens: {}",
                late.len(),
                e
            )));
        }

        self.degraded.store(false, Ordering::SeqCst);
        info!(
            "Redis guard '{}' rebuilt with {} tokens ({} buffered), {} bits, {} hashes",
            self.key,
            loaded + buffered + late.len(),
            buffered + late.len(),
            layout.num_bits,
            layout.num_hashes
        );
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        true
    }
}
