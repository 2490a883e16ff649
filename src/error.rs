/// Error Handling Module
///
/// Unified error types for the token lifecycle:
/// 1. Domain-Specific Error Types (validation, store, auth, config)
/// 2. Unified Application Error Type with `From` conversions
/// 3. Stable error codes for callers
/// 4. Structured Error Logging with Context
///
/// Token verification never surfaces these to callers; they are logged and
/// collapsed to a binary result. Sign-up, sign-in and revocation return them.

use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    SuspiciousContent(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::SuspiciousContent(field) => {
                write!(f, "{} contains suspicious content", field)
            }
        }
    }
}

impl StdError for ValidationError {}

/// Credential store errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(String),
    UniqueConstraintViolation(String),
    Unavailable(String),
    Unexpected(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StoreError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            StoreError::Unavailable(msg) => write!(f, "Credential store unavailable: {}", msg),
            StoreError::Unexpected(msg) => write!(f, "Credential store error: {}", msg),
        }
    }
}

impl StdError for StoreError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    Load(config::ConfigError),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Load(e) => write!(f, "Failed to load configuration: {}", e),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Load(e) => Some(e),
            ConfigError::InvalidValue(_) => None,
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err)
    }
}

/// Authentication errors
///
/// `TokenExpired` and `TokenInvalid` must stay distinct: only an expired
/// access token may fall back to the refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    EmailInUse,
    TokenExpired,
    TokenInvalid,
    MissingToken,
    IdentityNotFound,
    CounterMismatch,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::EmailInUse => write!(f, "Email already in use"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::IdentityNotFound => write!(f, "Token subject no longer exists"),
            AuthError::CounterMismatch => write!(f, "Session has been revoked"),
        }
    }
}

impl StdError for AuthError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all library errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Store(StoreError),
    Auth(AuthError),
    Config(ConfigError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Store(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AppError::Validation(e) => Some(e),
            AppError::Store(e) => Some(e),
            AppError::Auth(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Internal(_) => None,
        }
    }
}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(ConfigError::Load(err))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {}", err))
    }
}

// ============================================================================
// 3. ERROR CODES
// ============================================================================

impl AppError {
    /// Stable, machine-readable code for client-side handling
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Store(e) => match e {
                StoreError::NotFound(_) => "NOT_FOUND",
                StoreError::UniqueConstraintViolation(_) => "DUPLICATE_ENTRY",
                StoreError::Unavailable(_) => "SERVICE_UNAVAILABLE",
                StoreError::Unexpected(_) => "STORE_ERROR",
            },
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
                AuthError::EmailInUse => "EMAIL_IN_USE",
                AuthError::MissingToken => "MISSING_TOKEN",
                AuthError::TokenExpired
                | AuthError::TokenInvalid
                | AuthError::IdentityNotFound
                | AuthError::CounterMismatch => "TOKEN_INVALID",
            },
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Error context for enhanced logging and debugging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn log_error(&self, error: &AppError) {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "user_id": self.user_id,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        match error {
            AppError::Validation(_) => {
                tracing::warn!(
                    error = %error,
                    code = error.code(),
                    context = ?context,
                    "Validation error"
                );
            }
            AppError::Auth(_) => {
                tracing::warn!(
                    error = %error,
                    code = error.code(),
                    context = ?context,
                    "Authentication error"
                );
            }
            AppError::Store(StoreError::UniqueConstraintViolation(_)) => {
                tracing::warn!(
                    error = %error,
                    code = error.code(),
                    context = ?context,
                    "Duplicate entry attempt"
                );
            }
            AppError::Store(_) => {
                tracing::error!(
                    error = %error,
                    code = error.code(),
                    context = ?context,
                    "Credential store error"
                );
            }
            AppError::Config(_) => {
                tracing::error!(
                    error = %error,
                    code = error.code(),
                    context = ?context,
                    "Configuration error"
                );
            }
            AppError::Internal(_) => {
                tracing::error!(
                    error = %error,
                    code = error.code(),
                    context = ?context,
                    "Internal error"
                );
            }
        }
    }
}
