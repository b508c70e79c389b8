//! Resolution orchestrator
//!
//! Token → long URL. Order of checks: token syntax, existence guard,
//! resolved-mapping cache, then one coalesced store lookup per token.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, trace};

use crate::cache::{ExistenceFilter, ObjectCache};
use crate::codec::Codec;
use crate::errors::{Result, SeqlinkError};
use crate::singleflight::{FlightError, Group};
use crate::storage::MappingStore;

pub struct ResolutionService {
    codec: Arc<Codec>,
    guard: Arc<dyn ExistenceFilter>,
    cache: Arc<dyn ObjectCache>,
    store: Arc<dyn MappingStore>,
    flights: Group<String, Result<Option<String>>>,
}

impl ResolutionService {
    pub fn new(
        codec: Arc<Codec>,
        guard: Arc<dyn ExistenceFilter>,
        cache: Arc<dyn ObjectCache>,
        store: Arc<dyn MappingStore>,
    ) -> Self {
        Self {
            codec,
            guard,
            cache,
            store,
            flights: Group::new(),
        }
    }

    /// Resolve a token; `Ok(None)` means the token was never issued
    #[instrument(skip(self))]
    pub async fn resolve(&self, token: &str) -> Result<Option<String>> {
        self.resolve_inner(token, None).await
    }

    /// Same as [`resolve`](Self::resolve), returning `Cancelled` as soon as
    /// `cancel` fires. The shared lookup keeps running for other callers.
    #[instrument(skip(self, cancel))]
    pub async fn resolve_with_cancel(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        self.resolve_inner(token, Some(cancel)).await
    }

    /// 正在进行的存储查询数
    pub fn lookups_in_flight(&self) -> usize {
        self.flights.in_flight()
    }

    async fn resolve_inner(
        &self,
        token: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<String>> {
        self.codec.decode(token)?;

        if !self.guard.might_exist(token).await {
            trace!("Guard rejected '{}'", token);
            return Ok(None);
        }

        if let Some(long_url) = self.cache.get(token).await {
            trace!("Cache hit for '{}'", token);
            return Ok(Some(long_url));
        }

        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        let key = token.to_string();
        let lookup = move || async move { lookup_and_fill(store, cache, key).await };

        let flight = match cancel {
            Some(cancel) => {
                self.flights
                    .work_with_cancel(token.to_string(), cancel, lookup)
                    .await
            }
            None => self.flights.work(token.to_string(), lookup).await,
        };

        match flight {
            Ok(result) => result,
            Err(FlightError::Cancelled) => Err(SeqlinkError::cancelled(format!(
                "resolution of '{}' cancelled",
                token
            ))),
            Err(FlightError::Abandoned) => Err(SeqlinkError::resolution_unavailable(format!(
                "lookup for '{}' ended without a result",
                token
            ))),
        }
    }
}

/// 共享的存储查询，命中后写入缓存
async fn lookup_and_fill(
    store: Arc<dyn MappingStore>,
    cache: Arc<dyn ObjectCache>,
    token: String,
) -> Result<Option<String>> {
    match store.get_mapping_by_token(&token).await {
        Ok(Some(mapping)) => {
            cache.insert(&token, mapping.long_url.clone()).await;
            Ok(Some(mapping.long_url))
        }
        Ok(None) => {
            debug!("Guard false positive for '{}'", token);
            Ok(None)
        }
        Err(SeqlinkError::StoreTimeout(msg)) => Err(SeqlinkError::StoreTimeout(msg)),
        Err(e) => {
            error!("Lookup for '{}' failed: {}", token, e);
            Err(SeqlinkError::resolution_unavailable(e.message().to_string()))
        }
    }
}
