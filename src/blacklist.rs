use std::collections::HashSet;

use tracing::{debug, warn};

use crate::codec::Codec;

/// Tokens that must never be handed out (route names, offensive words, ...).
///
/// Built once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct BlacklistFilter {
    tokens: HashSet<String>,
}

impl BlacklistFilter {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: HashSet<String> = tokens
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| !t.is_empty())
            .collect();
        debug!("Blacklist loaded with {} tokens", tokens.len());
        Self { tokens }
    }

    /// 构建并提示永远不会被编码出来的条目（配置失误）
    pub fn with_codec<I, S>(tokens: I, codec: &Codec) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filter = Self::new(tokens);
        for token in &filter.tokens {
            if !codec.is_valid_token(token) {
                warn!(
                    "Blacklist entry '{}' can never be produced by the configured alphabet",
                    token
                );
            }
        }
        filter
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
