//! Conversion orchestrator
//!
//! Long URL → token. Validates the input, rejects URLs that were already
//! converted or that are themselves short links, then allocates ids until
//! one encodes to a token that is not blacklisted and persists the mapping.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::blacklist::BlacklistFilter;
use crate::cache::ExistenceFilter;
use crate::codec::Codec;
use crate::dedup::{DedupIndex, Fingerprint};
use crate::errors::{Result, SeqlinkError};
use crate::sequence::Sequence;
use crate::storage::{InsertOutcome, Mapping, MappingStore, UniqueField};
use crate::utils::url_validator::{last_path_segment, validate_url};

/// 默认最多尝试的 id 数
pub const DEFAULT_MAX_ENCODE_RETRIES: u32 = 16;

#[derive(Debug, Clone)]
pub struct ConversionOptions {
    /// 分配 id 的总次数上限（被黑名单或重复 token 消耗的 id 也计入）
    pub max_encode_retries: u32,
    /// 配置后返回 `short_domain/token`
    pub short_domain: Option<String>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            max_encode_retries: DEFAULT_MAX_ENCODE_RETRIES,
            short_domain: None,
        }
    }
}

/// Result of a successful conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertResult {
    pub id: u64,
    pub token: String,
    pub short_url: Option<String>,
}

/// 一次分配失败的原因，用于耗尽时选择错误类型
#[derive(Debug, Clone, Copy)]
enum BurnReason {
    Blacklisted,
    DuplicateToken,
}

pub struct ConversionService {
    codec: Arc<Codec>,
    blacklist: Arc<BlacklistFilter>,
    sequence: Arc<dyn Sequence>,
    store: Arc<dyn MappingStore>,
    dedup: DedupIndex,
    guard: Arc<dyn ExistenceFilter>,
    options: ConversionOptions,
}

impl ConversionService {
    pub fn new(
        codec: Arc<Codec>,
        blacklist: Arc<BlacklistFilter>,
        sequence: Arc<dyn Sequence>,
        store: Arc<dyn MappingStore>,
        guard: Arc<dyn ExistenceFilter>,
        options: ConversionOptions,
    ) -> Self {
        Self {
            dedup: DedupIndex::new(Arc::clone(&store)),
            codec,
            blacklist,
            sequence,
            store,
            guard,
            options,
        }
    }

    /// Convert a long URL into a new token
    ///
    /// Fails with `AlreadyConverted(token)` when the URL already has one.
    #[instrument(skip(self))]
    pub async fn convert(&self, long_url: &str) -> Result<ConvertResult> {
        let parsed = validate_url(long_url).map_err(|e| SeqlinkError::invalid_input(e.to_string()))?;
        let long_url = long_url.trim();

        let fingerprint = Fingerprint::of(long_url);
        self.ensure_not_converted(long_url, &fingerprint).await?;
        self.ensure_not_short(long_url, &parsed).await?;

        let attempts = self.options.max_encode_retries.max(1);
        let mut last_burn = BurnReason::Blacklisted;

        for attempt in 1..=attempts {
            let id = self.sequence.next().await?;
            let token = self.codec.encode(id);

            if self.blacklist.contains(&token) {
                warn!(
                    "Burned id {} (attempt {}/{}): token '{}' is blacklisted",
                    id, attempt, attempts, token
                );
                last_burn = BurnReason::Blacklisted;
                continue;
            }

            let mapping = Mapping {
                id,
                long_url: long_url.to_string(),
                fingerprint,
                token,
                created_at: Utc::now(),
            };

            match self.store.insert_mapping(&mapping).await? {
                InsertOutcome::Inserted => {
                    // 映射已持久化；写入失败时重试会走 AlreadyConverted 并补写 guard
                    self.guard.record_existing(&mapping.token).await.inspect_err(|e| {
                        error!(
                            "Mapping '{}' persisted but guard write failed: {}",
                            mapping.token, e
                        )
                    })?;
                    info!("Converted '{}' -> '{}' (id {})", long_url, mapping.token, id);
                    return Ok(self.result(id, mapping.token));
                }
                InsertOutcome::UniqueViolation(UniqueField::Fingerprint) => {
                    // 并发转换同一个 URL，另一个请求先写入
                    return Err(self.lost_race(long_url, &fingerprint).await);
                }
                InsertOutcome::UniqueViolation(UniqueField::Token) => {
                    warn!(
                        "Burned id {} (attempt {}/{}): token '{}' already persisted",
                        id, attempt, attempts, mapping.token
                    );
                    last_burn = BurnReason::DuplicateToken;
                }
            }
        }

        Err(match last_burn {
            BurnReason::Blacklisted => SeqlinkError::blacklist_exhausted(format!(
                "no usable token after {} allocations",
                attempts
            )),
            BurnReason::DuplicateToken => SeqlinkError::duplicate_token(format!(
                "every allocated token collided after {} allocations",
                attempts
            )),
        })
    }

    async fn ensure_not_converted(&self, long_url: &str, fingerprint: &Fingerprint) -> Result<()> {
        match self.dedup.find_by_fingerprint(fingerprint).await? {
            None => Ok(()),
            Some(existing) if existing.long_url == long_url => {
                debug!("'{}' already converted to '{}'", long_url, existing.token);
                // 先写入者可能还没记录到 guard，或者它的 insert 在提交后超时
                self.guard.record_existing(&existing.token).await?;
                Err(SeqlinkError::already_converted(existing.token))
            }
            Some(existing) => Err(collision(long_url, &existing)),
        }
    }

    /// 路径最后一段是已签发的 token，说明输入本身就是短链接
    async fn ensure_not_short(&self, long_url: &str, parsed: &Url) -> Result<()> {
        let Some(segment) = last_path_segment(parsed) else {
            return Ok(());
        };
        if !self.codec.is_valid_token(segment) {
            return Ok(());
        }
        if self.store.get_mapping_by_token(segment).await?.is_some() {
            return Err(SeqlinkError::already_short(format!(
                "'{}' already points at token '{}'",
                long_url, segment
            )));
        }
        Ok(())
    }

    async fn lost_race(&self, long_url: &str, fingerprint: &Fingerprint) -> SeqlinkError {
        match self.dedup.find_by_fingerprint(fingerprint).await {
            Ok(Some(winner)) if winner.long_url == long_url => {
                debug!("Concurrent conversion of '{}' won by '{}'", long_url, winner.token);
                match self.guard.record_existing(&winner.token).await {
                    Ok(()) => SeqlinkError::already_converted(winner.token),
                    Err(e) => e,
                }
            }
            Ok(Some(winner)) => collision(long_url, &winner),
            Ok(None) => SeqlinkError::store(format!(
                "fingerprint {} rejected as duplicate but no mapping found",
                fingerprint
            )),
            Err(e) => e,
        }
    }

    fn result(&self, id: u64, token: String) -> ConvertResult {
        let short_url = self
            .options
            .short_domain
            .as_deref()
            .filter(|domain| !domain.is_empty())
            .map(|domain| format!("{}/{}", domain.trim_end_matches('/'), token));
        ConvertResult {
            id,
            token,
            short_url,
        }
    }
}

fn collision(long_url: &str, existing: &Mapping) -> SeqlinkError {
    warn!(
        "Fingerprint {} shared by '{}' and '{}'",
        existing.fingerprint, long_url, existing.long_url
    );
    SeqlinkError::fingerprint_collision(format!(
        "'{}' collides with the fingerprint of token '{}'",
        long_url, existing.token
    ))
}
