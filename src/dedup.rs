//! Content dedup index
//!
//! Every long URL is hashed into a 128-bit fingerprint (xxh3). The store
//! keeps a unique index on it, so one URL only ever gets one token.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;
use xxhash_rust::xxh3::xxh3_128;

use crate::errors::{Result, SeqlinkError};
use crate::storage::{Mapping, MappingStore};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    pub fn of(long_url: &str) -> Self {
        Self(xxh3_128(long_url.as_bytes()).to_be_bytes())
    }

    /// 32 位小写 hex，数据库中的存储格式
    pub fn to_hex(&self) -> String {
        format!("{:032x}", u128::from_be_bytes(self.0))
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.len() != 32 {
            return Err(SeqlinkError::store(format!(
                "fingerprint '{}' must be 32 hex chars",
                hex
            )));
        }
        let value = u128::from_str_radix(hex, 16).map_err(|e| {
            SeqlinkError::store(format!("fingerprint '{}' is not valid hex: {}", hex, e))
        })?;
        Ok(Self(value.to_be_bytes()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Lookup of existing mappings by fingerprint.
#[derive(Clone)]
pub struct DedupIndex {
    store: Arc<dyn MappingStore>,
}

impl DedupIndex {
    pub fn new(store: Arc<dyn MappingStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<Mapping>> {
        let found = self.store.get_mapping_by_fingerprint(fingerprint).await?;
        trace!(
            "Dedup lookup for {}: {}",
            fingerprint,
            if found.is_some() { "hit" } else { "miss" }
        );
        Ok(found)
    }
}
