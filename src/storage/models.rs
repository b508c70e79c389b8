use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dedup::Fingerprint;

/// 持久化的映射关系，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub id: u64,
    pub long_url: String,
    pub fingerprint: Fingerprint,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

impl Mapping {
    pub fn new(id: u64, long_url: impl Into<String>, token: impl Into<String>) -> Self {
        let long_url = long_url.into();
        Self {
            id,
            fingerprint: Fingerprint::of(&long_url),
            long_url,
            token: token.into(),
            created_at: Utc::now(),
        }
    }
}

/// 违反唯一约束的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Token,
    Fingerprint,
}

/// `insert_mapping` 的结果：唯一约束冲突不是存储故障，交给调用方决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    UniqueViolation(UniqueField),
}
