//! Base62 token codec
//!
//! Converts allocated sequence numbers into short tokens and back. The
//! alphabet order comes from configuration, so a shuffled alphabet makes
//! consecutive ids look unrelated while the mapping stays bijective.

use crate::errors::{Result, SeqlinkError};

/// 字母表长度
pub const BASE: u64 = 62;

/// 未打乱的默认字母表
pub const DEFAULT_ALPHABET: &str =
    "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const ABSENT: u8 = u8::MAX;

/// A validated 62-symbol alphabet with a reverse lookup table.
#[derive(Clone)]
pub struct Alphabet {
    symbols: [u8; BASE as usize],
    index: [u8; 256],
}

impl Alphabet {
    /// 校验并构建字母表：必须是 62 个互不相同的可打印 ASCII 字符
    pub fn new(alphabet: &str) -> Result<Self> {
        let len = alphabet.chars().count();
        if len != BASE as usize {
            return Err(SeqlinkError::config(format!(
                "alphabet must contain exactly {} symbols, got {}",
                BASE, len
            )));
        }

        let mut symbols = [0u8; BASE as usize];
        let mut index = [ABSENT; 256];
        for (i, c) in alphabet.chars().enumerate() {
            if !c.is_ascii_graphic() {
                return Err(SeqlinkError::config(format!(
                    "alphabet symbol {:?} at position {} is not a printable ASCII character",
                    c, i
                )));
            }
            let b = c as u8;
            if index[b as usize] != ABSENT {
                return Err(SeqlinkError::config(format!(
                    "alphabet symbol {:?} appears more than once",
                    c
                )));
            }
            symbols[i] = b;
            index[b as usize] = i as u8;
        }

        Ok(Self { symbols, index })
    }

    pub fn symbol(&self, digit: usize) -> char {
        self.symbols[digit] as char
    }

    /// 字符在字母表中的位置，不存在返回 None
    pub fn position(&self, c: char) -> Option<u64> {
        if !c.is_ascii() {
            return None;
        }
        match self.index[c as usize] {
            ABSENT => None,
            i => Some(i as u64),
        }
    }

    pub fn as_str(&self) -> &str {
        // symbols 全部是 ASCII
        std::str::from_utf8(&self.symbols).unwrap_or_default()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHABET).unwrap_or_else(|_| unreachable!("default alphabet is valid"))
    }
}

impl std::fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Alphabet").field(&self.as_str()).finish()
    }
}

/// Positional base62 codec, most significant digit first.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    alphabet: Alphabet,
}

impl Codec {
    pub fn new(alphabet: Alphabet) -> Self {
        Self { alphabet }
    }

    pub fn from_alphabet_str(alphabet: &str) -> Result<Self> {
        Ok(Self::new(Alphabet::new(alphabet)?))
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn encode(&self, mut n: u64) -> String {
        if n == 0 {
            return self.alphabet.symbol(0).to_string();
        }

        // u64::MAX 在 62 进制下是 11 位
        let mut digits = [0u8; 11];
        let mut len = 0;
        while n > 0 {
            digits[len] = (n % BASE) as u8;
            n /= BASE;
            len += 1;
        }

        digits[..len]
            .iter()
            .rev()
            .map(|&d| self.alphabet.symbol(d as usize))
            .collect()
    }

    pub fn decode(&self, token: &str) -> Result<u64> {
        if token.is_empty() {
            return Err(SeqlinkError::invalid_token("token is empty"));
        }

        let zero = self.alphabet.symbol(0);
        if token.len() > 1 && token.starts_with(zero) {
            return Err(SeqlinkError::invalid_token(format!(
                "token '{}' has a redundant leading '{}'",
                token, zero
            )));
        }

        let mut value: u64 = 0;
        for c in token.chars() {
            let digit = self.alphabet.position(c).ok_or_else(|| {
                SeqlinkError::invalid_token(format!(
                    "token '{}' contains {:?} which is not in the alphabet",
                    token, c
                ))
            })?;
            value = value
                .checked_mul(BASE)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| {
                    SeqlinkError::invalid_token(format!("token '{}' overflows u64", token))
                })?;
        }
        Ok(value)
    }

    /// Syntax check only; says nothing about whether the token was issued.
    pub fn is_valid_token(&self, token: &str) -> bool {
        self.decode(token).is_ok()
    }
}
