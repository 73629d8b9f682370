//! Error types for herald operations.
//!
//! Errors carry a structured error code and, where it helps an operator, a
//! suggestion. Variants follow the failure classes the decision pipeline has
//! to react to differently: input validation, authorization, own quota,
//! transient upstream failures, fatal upstream failures and corrupt data.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for herald operations.
pub type HeraldResult<T> = Result<T, HeraldError>;

/// Main error type for all herald operations.
#[derive(Error, Debug)]
pub enum HeraldError {
    /// Upstream authentication failed (bad or missing provider credentials).
    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Caller is not allowed to act on the requested resource.
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String, code: ErrorCode },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// Requested record does not exist.
    #[error("Not found: {message}")]
    NotFound { message: String, code: ErrorCode },

    /// Upstream inference service rate limited us.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        code: ErrorCode,
        retry_after: Option<u64>,
    },

    /// Per-user daily quota for a feature is used up.
    #[error("Quota exceeded: {message}")]
    QuotaExceeded {
        message: String,
        code: ErrorCode,
        current_usage: Option<u64>,
        limit: Option<u64>,
    },

    /// Inference call failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Inference call did not complete in time.
    #[error("Timeout: {message}")]
    Timeout { message: String, code: ErrorCode },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network error.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// Parse error (unparsable inference or cached payload).
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (AUTH_xxx)
    AuthInvalidKey,
    AuthMissingCredentials,

    // Authorization (AUTHZ_xxx)
    AuthzNotParticipant,
    AuthzNotOwner,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,
    ValInvalidFormat,

    // Not found (NF_xxx)
    NotFoundRecord,

    // Rate Limit (RATE_xxx)
    RateLimitExceeded,

    // Quota (QTA_xxx)
    QtaExceeded,

    // LLM (LLM_xxx)
    LlmConnectionFailed,
    LlmGenerationFailed,
    LlmInvalidResponse,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Network (NET_xxx)
    NetTimeout,
    NetConnectionFailed,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseMissingField,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthInvalidKey => "AUTH_001",
            ErrorCode::AuthMissingCredentials => "AUTH_002",
            ErrorCode::AuthzNotParticipant => "AUTHZ_001",
            ErrorCode::AuthzNotOwner => "AUTHZ_002",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::ValInvalidFormat => "VAL_003",
            ErrorCode::NotFoundRecord => "NF_001",
            ErrorCode::RateLimitExceeded => "RATE_001",
            ErrorCode::QtaExceeded => "QTA_001",
            ErrorCode::LlmConnectionFailed => "LLM_001",
            ErrorCode::LlmGenerationFailed => "LLM_002",
            ErrorCode::LlmInvalidResponse => "LLM_003",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::NetConnectionFailed => "NET_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseMissingField => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl HeraldError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error for a missing or empty field.
    pub fn missing_field(field: &str) -> Self {
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.to_string());
        Self::Validation {
            message: format!("Missing required field '{}'", field),
            code: ErrorCode::ValMissingField,
            details,
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidFormat,
            details: HashMap::new(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Caller is not a participant of the conversation.
    pub fn not_participant(user_id: &str, conversation_id: &str) -> Self {
        Self::PermissionDenied {
            message: format!(
                "User '{}' is not a participant of conversation '{}'",
                user_id, conversation_id
            ),
            code: ErrorCode::AuthzNotParticipant,
        }
    }

    /// Caller asked for data owned by someone else.
    pub fn not_owner(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
            code: ErrorCode::AuthzNotOwner,
        }
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: ErrorCode::NotFoundRecord,
        }
    }

    /// Create a quota exceeded error.
    pub fn quota_exceeded(message: impl Into<String>, current_usage: u64, limit: u64) -> Self {
        Self::QuotaExceeded {
            message: message.into(),
            code: ErrorCode::QtaExceeded,
            current_usage: Some(current_usage),
            limit: Some(limit),
        }
    }

    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            code: ErrorCode::NetTimeout,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create an API (network) error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            code: ErrorCode::AuthInvalidKey,
            source: None,
        }
    }

    /// Create a rate limit error.
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
            code: ErrorCode::RateLimitExceeded,
            retry_after: None,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. } => *code,
            Self::PermissionDenied { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::RateLimit { code, .. } => *code,
            Self::QuotaExceeded { code, .. } => *code,
            Self::Llm { code, .. } => *code,
            Self::Timeout { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::AuthMissingCredentials,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Authentication { .. } => {
                Some("Check the inference provider API key and account status")
            }
            Self::Configuration(_) => Some("Check the herald configuration file and environment"),
            Self::RateLimit { .. } => Some("The inference provider is throttling requests"),
            Self::QuotaExceeded { .. } => Some("Daily quota is reset at 00:00 UTC"),
            Self::PermissionDenied { .. } => {
                Some("Only participants may act on a conversation and only owners may read their data")
            }
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }

    /// Upstream failure an operator has to fix; must not be silently degraded.
    pub fn is_upstream_fatal(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::Configuration(_) | Self::UnsupportedProvider { .. }
        )
    }

    /// Upstream failure that is expected to clear up on its own.
    pub fn is_upstream_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimit { .. } | Self::Timeout { .. } | Self::Network { .. } | Self::Llm { .. }
        )
    }

    /// Classify an HTTP failure from an inference provider.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            400 | 404 | 422 => Self::Llm {
                message: format!("HTTP {}: {}", status, body),
                code: ErrorCode::LlmInvalidResponse,
                source: None,
            },
            401 | 403 => Self::Authentication {
                message: body.to_string(),
                code: ErrorCode::AuthInvalidKey,
                source: None,
            },
            408 => Self::timeout(body.to_string()),
            429 => Self::RateLimit {
                message: body.to_string(),
                code: ErrorCode::RateLimitExceeded,
                retry_after: None,
            },
            _ => Self::Llm {
                message: format!("HTTP {}: {}", status, body),
                code: ErrorCode::LlmConnectionFailed,
                source: None,
            },
        }
    }
}

impl From<rusqlite::Error> for HeraldError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}
