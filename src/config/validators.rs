//! 配置值验证
//!
//! 在任何组件构建之前检查静态配置，错误信息直接展示给运维。

use crate::codec::Alphabet;

pub fn validate_alphabet(alphabet: &str) -> Result<(), String> {
    Alphabet::new(alphabet)
        .map(|_| ())
        .map_err(|e| format!("codec.alphabet: {}", e.message()))
}

/// 误判率必须在 (0, 1) 之间
pub fn validate_fp_rate(fp_rate: f64) -> Result<(), String> {
    if fp_rate > 0.0 && fp_rate < 1.0 {
        Ok(())
    } else {
        Err(format!(
            "guard.fp_rate must be between 0 and 1 (exclusive), got {}",
            fp_rate
        ))
    }
}

pub fn validate_max_encode_retries(retries: u32) -> Result<(), String> {
    if retries == 0 {
        return Err("conversion.max_encode_retries must be at least 1".to_string());
    }
    Ok(())
}

pub fn validate_guard_backend(backend: &str) -> Result<(), String> {
    if backend.trim().is_empty() {
        return Err("guard.backend cannot be empty".to_string());
    }
    if backend
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
    {
        return Err(format!("guard.backend '{}' is not a valid plugin name", backend));
    }
    Ok(())
}

pub fn validate_sequence_key(key: &str) -> Result<(), String> {
    // sequence_counters.name 为 VARCHAR(64)
    if key.is_empty() || key.len() > 64 {
        return Err(format!(
            "conversion.sequence_key must be 1..=64 bytes, got {}",
            key.len()
        ));
    }
    Ok(())
}

pub fn validate_short_domain(domain: &str) -> Result<(), String> {
    let lower = domain.to_lowercase();
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return Err(format!(
            "conversion.short_domain '{}' must start with http:// or https://",
            domain
        ));
    }
    url::Url::parse(domain)
        .map(|_| ())
        .map_err(|e| format!("conversion.short_domain '{}': {}", domain, e))
}
