//! Shared test doubles for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use seqlink::blacklist::BlacklistFilter;
use seqlink::cache::{BloomExistenceFilterPlugin, ExistenceFilter, ObjectCache};
use seqlink::codec::Codec;
use seqlink::dedup::Fingerprint;
use seqlink::errors::{Result, SeqlinkError};
use seqlink::sequence::SequenceAllocator;
use seqlink::services::{ConversionOptions, ConversionService, ResolutionService};
use seqlink::storage::{
    CounterStore, InsertOutcome, Mapping, MappingStore, TokenBatchStream, UniqueField,
};

#[derive(Default)]
struct Tables {
    by_token: HashMap<String, Mapping>,
    by_fingerprint: HashMap<Fingerprint, String>,
}

/// In-memory mapping + counter store with call counting and fault injection
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    counter: AtomicU64,
    pub token_lookups: AtomicUsize,
    pub fingerprint_lookups: AtomicUsize,
    pub inserts: AtomicUsize,
    lookup_delay_ms: AtomicU64,
    fail_lookups: AtomicBool,
    timeout_lookups: AtomicBool,
    fail_counter: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 计数器从 `start` 开始，下一次分配得到 `start + 1`
    pub fn with_counter(start: u64) -> Arc<Self> {
        let store = Self::default();
        store.counter.store(start, Ordering::SeqCst);
        Arc::new(store)
    }

    pub fn set_lookup_delay(&self, delay: Duration) {
        self.lookup_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn timeout_lookups(&self, timeout: bool) {
        self.timeout_lookups.store(timeout, Ordering::SeqCst);
    }

    pub fn fail_counter(&self, fail: bool) {
        self.fail_counter.store(fail, Ordering::SeqCst);
    }

    pub fn counter_value(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn token_lookup_count(&self) -> usize {
        self.token_lookups.load(Ordering::SeqCst)
    }

    pub fn mapping_count(&self) -> usize {
        self.tables.lock().by_token.len()
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.tables.lock().by_token.contains_key(token)
    }

    /// 绕过编排器直接写入
    pub fn seed(&self, mapping: Mapping) {
        let mut tables = self.tables.lock();
        tables
            .by_fingerprint
            .insert(mapping.fingerprint, mapping.token.clone());
        tables.by_token.insert(mapping.token.clone(), mapping);
    }

    async fn before_lookup(&self) -> Result<()> {
        let delay = self.lookup_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.timeout_lookups.load(Ordering::SeqCst) {
            return Err(SeqlinkError::store_timeout("lookup exceeded 5ms"));
        }
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(SeqlinkError::store("connection reset"));
        }
        Ok(())
    }
}

#[async_trait]
impl MappingStore for MemoryStore {
    async fn insert_mapping(&self, mapping: &Mapping) -> Result<InsertOutcome> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.lock();
        if tables.by_fingerprint.contains_key(&mapping.fingerprint) {
            return Ok(InsertOutcome::UniqueViolation(UniqueField::Fingerprint));
        }
        if tables.by_token.contains_key(&mapping.token) {
            return Ok(InsertOutcome::UniqueViolation(UniqueField::Token));
        }
        tables
            .by_fingerprint
            .insert(mapping.fingerprint, mapping.token.clone());
        tables
            .by_token
            .insert(mapping.token.clone(), mapping.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn get_mapping_by_token(&self, token: &str) -> Result<Option<Mapping>> {
        self.token_lookups.fetch_add(1, Ordering::SeqCst);
        self.before_lookup().await?;
        Ok(self.tables.lock().by_token.get(token).cloned())
    }

    async fn get_mapping_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Mapping>> {
        self.fingerprint_lookups.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock();
        Ok(tables
            .by_fingerprint
            .get(fingerprint)
            .and_then(|token| tables.by_token.get(token))
            .cloned())
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn upsert_and_return_counter(&self, _counter_key: &str) -> Result<u64> {
        if self.fail_counter.load(Ordering::SeqCst) {
            return Err(SeqlinkError::store("counter table is read-only"));
        }
        Ok(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Guard with a fixed answer
pub struct FixedGuard(pub bool);

#[async_trait]
impl ExistenceFilter for FixedGuard {
    async fn might_exist(&self, _token: &str) -> bool {
        self.0
    }

    async fn record_existing(&self, _token: &str) -> Result<()> {
        Ok(())
    }

    async fn bulk_record(&self, _tokens: &[String]) -> Result<()> {
        Ok(())
    }

    async fn rebuild_streaming(
        &self,
        _count: usize,
        _fp_rate: f64,
        _stream: TokenBatchStream,
    ) -> Result<()> {
        Ok(())
    }
}

/// Bloom guard whose writes take `delay` before they land
pub struct SlowGuard {
    inner: BloomExistenceFilterPlugin,
    delay: Duration,
}

impl SlowGuard {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: BloomExistenceFilterPlugin::new(10_000, 0.001).unwrap(),
            delay,
        }
    }
}

#[async_trait]
impl ExistenceFilter for SlowGuard {
    async fn might_exist(&self, token: &str) -> bool {
        self.inner.might_exist(token).await
    }

    async fn record_existing(&self, token: &str) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.record_existing(token).await
    }

    async fn bulk_record(&self, tokens: &[String]) -> Result<()> {
        self.inner.bulk_record(tokens).await
    }

    async fn rebuild_streaming(
        &self,
        count: usize,
        fp_rate: f64,
        stream: TokenBatchStream,
    ) -> Result<()> {
        self.inner.rebuild_streaming(count, fp_rate, stream).await
    }
}

/// Bloom guard whose writes fail while `failing` is set, like a shared
/// backend that went away
pub struct FlakyGuard {
    inner: BloomExistenceFilterPlugin,
    pub failing: AtomicBool,
}

impl FlakyGuard {
    pub fn new() -> Self {
        Self {
            inner: BloomExistenceFilterPlugin::new(10_000, 0.001).unwrap(),
            failing: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl ExistenceFilter for FlakyGuard {
    async fn might_exist(&self, token: &str) -> bool {
        self.inner.might_exist(token).await
    }

    async fn record_existing(&self, token: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SeqlinkError::guard_backend("connection refused"));
        }
        self.inner.record_existing(token).await
    }

    async fn bulk_record(&self, tokens: &[String]) -> Result<()> {
        self.inner.bulk_record(tokens).await
    }

    async fn rebuild_streaming(
        &self,
        count: usize,
        fp_rate: f64,
        stream: TokenBatchStream,
    ) -> Result<()> {
        self.inner.rebuild_streaming(count, fp_rate, stream).await
    }
}

/// Cache that never stores anything but counts reads
#[derive(Default)]
pub struct CountingCache {
    pub gets: AtomicUsize,
}

#[async_trait]
impl ObjectCache for CountingCache {
    async fn get(&self, _token: &str) -> Option<String> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        None
    }

    async fn insert(&self, _token: &str, _long_url: String) {}
}

pub fn bloom_guard() -> Arc<dyn ExistenceFilter> {
    Arc::new(BloomExistenceFilterPlugin::new(10_000, 0.001).unwrap())
}

pub fn conversion_service(
    store: &Arc<MemoryStore>,
    guard: Arc<dyn ExistenceFilter>,
    blacklist: &[&str],
    options: ConversionOptions,
) -> ConversionService {
    ConversionService::new(
        Arc::new(Codec::default()),
        Arc::new(BlacklistFilter::new(blacklist.iter().copied())),
        Arc::new(SequenceAllocator::new(store.clone(), "short_url")),
        store.clone(),
        guard,
        options,
    )
}

pub fn resolution_service(
    store: &Arc<MemoryStore>,
    guard: Arc<dyn ExistenceFilter>,
    cache: Arc<dyn ObjectCache>,
) -> ResolutionService {
    ResolutionService::new(Arc::new(Codec::default()), guard, cache, store.clone())
}
