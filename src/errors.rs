use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeqlinkError {
    InvalidInput(String),
    InvalidToken(String),
    /// 该长链接已经转换过，携带已存在的 token
    AlreadyConverted(String),
    AlreadyShort(String),
    FingerprintCollision(String),
    AllocatorUnavailable(String),
    Store(String),
    StoreTimeout(String),
    ResolutionUnavailable(String),
    BlacklistExhausted(String),
    DuplicateToken(String),
    Cancelled(String),
    Config(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    GuardPluginNotFound(String),
    GuardBackend(String),
}

impl SeqlinkError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            SeqlinkError::InvalidInput(_) => "E001",
            SeqlinkError::InvalidToken(_) => "E002",
            SeqlinkError::AlreadyConverted(_) => "E003",
            SeqlinkError::AlreadyShort(_) => "E004",
            SeqlinkError::FingerprintCollision(_) => "E005",
            SeqlinkError::AllocatorUnavailable(_) => "E006",
            SeqlinkError::Store(_) => "E007",
            SeqlinkError::StoreTimeout(_) => "E008",
            SeqlinkError::ResolutionUnavailable(_) => "E009",
            SeqlinkError::BlacklistExhausted(_) => "E010",
            SeqlinkError::DuplicateToken(_) => "E011",
            SeqlinkError::Cancelled(_) => "E012",
            SeqlinkError::Config(_) => "E013",
            SeqlinkError::DatabaseConfig(_) => "E014",
            SeqlinkError::DatabaseConnection(_) => "E015",
            SeqlinkError::GuardPluginNotFound(_) => "E016",
            SeqlinkError::GuardBackend(_) => "E017",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            SeqlinkError::InvalidInput(_) => "Invalid Input",
            SeqlinkError::InvalidToken(_) => "Invalid Token",
            SeqlinkError::AlreadyConverted(_) => "Already Converted",
            SeqlinkError::AlreadyShort(_) => "Already Short",
            SeqlinkError::FingerprintCollision(_) => "Fingerprint Collision",
            SeqlinkError::AllocatorUnavailable(_) => "Allocator Unavailable",
            SeqlinkError::Store(_) => "Store Error",
            SeqlinkError::StoreTimeout(_) => "Store Timeout",
            SeqlinkError::ResolutionUnavailable(_) => "Resolution Unavailable",
            SeqlinkError::BlacklistExhausted(_) => "Blacklist Exhausted",
            SeqlinkError::DuplicateToken(_) => "Duplicate Token",
            SeqlinkError::Cancelled(_) => "Cancelled",
            SeqlinkError::Config(_) => "Configuration Error",
            SeqlinkError::DatabaseConfig(_) => "Database Configuration Error",
            SeqlinkError::DatabaseConnection(_) => "Database Connection Error",
            SeqlinkError::GuardPluginNotFound(_) => "Guard Plugin Not Found",
            SeqlinkError::GuardBackend(_) => "Guard Backend Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            SeqlinkError::InvalidInput(msg)
            | SeqlinkError::InvalidToken(msg)
            | SeqlinkError::AlreadyConverted(msg)
            | SeqlinkError::AlreadyShort(msg)
            | SeqlinkError::FingerprintCollision(msg)
            | SeqlinkError::AllocatorUnavailable(msg)
            | SeqlinkError::Store(msg)
            | SeqlinkError::StoreTimeout(msg)
            | SeqlinkError::ResolutionUnavailable(msg)
            | SeqlinkError::BlacklistExhausted(msg)
            | SeqlinkError::DuplicateToken(msg)
            | SeqlinkError::Cancelled(msg)
            | SeqlinkError::Config(msg)
            | SeqlinkError::DatabaseConfig(msg)
            | SeqlinkError::DatabaseConnection(msg)
            | SeqlinkError::GuardPluginNotFound(msg)
            | SeqlinkError::GuardBackend(msg) => msg,
        }
    }

    /// 调用方输入导致的错误，重试没有意义
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SeqlinkError::InvalidInput(_)
                | SeqlinkError::InvalidToken(_)
                | SeqlinkError::AlreadyConverted(_)
                | SeqlinkError::AlreadyShort(_)
                | SeqlinkError::FingerprintCollision(_)
        )
    }

    /// `AlreadyConverted` 时返回已存在的 token
    pub fn existing_token(&self) -> Option<&str> {
        match self {
            SeqlinkError::AlreadyConverted(token) => Some(token),
            _ => None,
        }
    }

    /// 格式化为彩色输出（用于 CLI）
    #[cfg(feature = "cli")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for SeqlinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for SeqlinkError {}

// 便捷的构造函数
impl SeqlinkError {
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::InvalidInput(msg.into())
    }

    pub fn invalid_token<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::InvalidToken(msg.into())
    }

    pub fn already_converted<T: Into<String>>(token: T) -> Self {
        SeqlinkError::AlreadyConverted(token.into())
    }

    pub fn already_short<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::AlreadyShort(msg.into())
    }

    pub fn fingerprint_collision<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::FingerprintCollision(msg.into())
    }

    pub fn allocator_unavailable<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::AllocatorUnavailable(msg.into())
    }

    pub fn store<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::Store(msg.into())
    }

    pub fn store_timeout<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::StoreTimeout(msg.into())
    }

    pub fn resolution_unavailable<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::ResolutionUnavailable(msg.into())
    }

    pub fn blacklist_exhausted<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::BlacklistExhausted(msg.into())
    }

    pub fn duplicate_token<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::DuplicateToken(msg.into())
    }

    pub fn cancelled<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::Cancelled(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::Config(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::DatabaseConnection(msg.into())
    }

    pub fn guard_plugin_not_found<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::GuardPluginNotFound(msg.into())
    }

    pub fn guard_backend<T: Into<String>>(msg: T) -> Self {
        SeqlinkError::GuardBackend(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for SeqlinkError {
    fn from(err: sea_orm::DbErr) -> Self {
        SeqlinkError::Store(err.to_string())
    }
}

impl From<toml::ser::Error> for SeqlinkError {
    fn from(err: toml::ser::Error) -> Self {
        SeqlinkError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SeqlinkError>;
