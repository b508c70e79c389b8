//! URL 验证模块
//!
//! 验证长链接安全性，阻止危险协议，并提取路径最后一段用于环路检测

use url::Url;

/// URL 验证错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlValidationError {
    EmptyUrl,
    InvalidProtocol(String),
    DangerousProtocol(String),
    InvalidFormat(String),
    MissingHost,
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::InvalidProtocol(proto) => write!(
                f,
                "Invalid protocol: {}. Only http:// and https:// are allowed",
                proto
            ),
            Self::DangerousProtocol(proto) => {
                write!(f, "Dangerous protocol blocked: {}", proto)
            }
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
            Self::MissingHost => write!(f, "URL has no host"),
        }
    }
}

impl std::error::Error for UrlValidationError {}

/// 危险协议列表
const DANGEROUS_PROTOCOLS: &[&str] = &[
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "about:",
    "blob:",
];

/// 验证长链接并返回解析结果
///
/// 检查项目：
/// 1. URL 不为空
/// 2. 不是危险协议（javascript:, data:, file: 等）
/// 3. 必须是 http:// 或 https://
/// 4. URL 格式有效且带 host
pub fn validate_url(url: &str) -> Result<Url, UrlValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    let url_lower = url.to_lowercase();

    for proto in DANGEROUS_PROTOCOLS {
        if url_lower.starts_with(proto) {
            return Err(UrlValidationError::DangerousProtocol(proto.to_string()));
        }
    }

    if !url_lower.starts_with("http://") && !url_lower.starts_with("https://") {
        let proto = url_lower
            .split(':')
            .next()
            .map(|s| format!("{}:", s))
            .unwrap_or_default();
        return Err(UrlValidationError::InvalidProtocol(proto));
    }

    let parsed = Url::parse(url).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(UrlValidationError::MissingHost),
    }
}

/// 路径的最后一段，忽略结尾的 `/`，不含 query 和 fragment
///
/// `https://s.example/1En/` → `Some("1En")`，`https://s.example/` → `None`
pub fn last_path_segment(url: &Url) -> Option<&str> {
    url.path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("https://example.com/path?query=1").is_ok());
        assert!(validate_url("  https://example.com  ").is_ok());
        assert!(validate_url("http://localhost:8080").is_ok());
    }

    #[test]
    fn test_dangerous_protocols() {
        assert!(matches!(
            validate_url("javascript:alert(1)"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
        assert!(matches!(
            validate_url("data:text/html,<script>alert(1)</script>"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
        assert!(matches!(
            validate_url("FILE:///etc/passwd"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
    }

    #[test]
    fn test_invalid_protocol_and_format() {
        assert_eq!(
            validate_url("ftp://example.com"),
            Err(UrlValidationError::InvalidProtocol("ftp:".to_string()))
        );
        assert_eq!(validate_url(""), Err(UrlValidationError::EmptyUrl));
        assert!(matches!(
            validate_url("http://exa mple.com"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
        assert!(validate_url("http://").is_err());
    }

    #[test]
    fn test_last_path_segment() {
        let seg = |s: &str| {
            let url = Url::parse(s).unwrap();
            last_path_segment(&url).map(str::to_string)
        };
        assert_eq!(seg("https://s.example/1En"), Some("1En".to_string()));
        assert_eq!(seg("https://s.example/a/b/1En/"), Some("1En".to_string()));
        assert_eq!(seg("https://s.example/1En?x=2#frag"), Some("1En".to_string()));
        assert_eq!(seg("https://s.example/"), None);
        assert_eq!(seg("https://s.example"), None);
    }
}
