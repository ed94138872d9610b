//! Unified error handling for the ticketdesk CLI and SDK
//!
//! Every error carries a stable code in the format `TXXX`:
//! - T1XX: Authentication and session errors
//! - T2XX: Network and API errors
//! - T3XX: File and I/O errors
//! - T4XX: Configuration errors
//! - T5XX: Validation and input errors
//! - T7XX: Resource errors
//! - T8XX: UI and interaction errors
//! - T9XX: Internal errors

use std::fmt;
use thiserror::Error;

/// Unified Result type for all ticketdesk operations
pub type Result<T> = std::result::Result<T, DeskError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (T1XX)
    /// T101: Authentication failed
    AuthenticationFailed,
    /// T102: Authorization denied (403)
    AuthorizationDenied,
    /// T103: Refresh token rejected
    RefreshExpired,
    /// T104: Username/password rejected
    InvalidCredentials,
    /// T105: No session
    SessionNotFound,
    /// T106: Request rejected with 401 after the refresh cycle
    Unauthorized,

    // Network (T2XX)
    /// T201: HTTP request failed
    HttpError,
    /// T202: Connection timeout
    ConnectionTimeout,
    /// T204: Connection refused
    ConnectionRefused,
    /// T205: API returned error response
    ApiError,
    /// T206: Invalid API response format
    InvalidResponse,

    // File/IO (T3XX)
    /// T301: File not found
    FileNotFound,
    /// T302: File read error
    FileReadError,
    /// T303: File write error
    FileWriteError,

    // Configuration (T4XX)
    /// T401: Configuration error
    ConfigError,
    /// T402: Invalid endpoint URL
    InvalidEndpoint,

    // Validation (T5XX)
    /// T501: Invalid input
    InvalidInput,
    /// T502: Validation failed
    ValidationFailed,

    // Resource (T7XX)
    /// T705: Resource not found
    ResourceNotFound,

    // UI (T8XX)
    /// T801: Dialog error
    DialogError,
    /// T802: User cancelled
    UserCancelled,

    // Internal (T9XX)
    /// T901: Internal error
    InternalError,
    /// T902: Serialization error
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u16 {
        match self {
            ErrorCode::AuthenticationFailed => 101,
            ErrorCode::AuthorizationDenied => 102,
            ErrorCode::RefreshExpired => 103,
            ErrorCode::InvalidCredentials => 104,
            ErrorCode::SessionNotFound => 105,
            ErrorCode::Unauthorized => 106,

            ErrorCode::HttpError => 201,
            ErrorCode::ConnectionTimeout => 202,
            ErrorCode::ConnectionRefused => 204,
            ErrorCode::ApiError => 205,
            ErrorCode::InvalidResponse => 206,

            ErrorCode::FileNotFound => 301,
            ErrorCode::FileReadError => 302,
            ErrorCode::FileWriteError => 303,

            ErrorCode::ConfigError => 401,
            ErrorCode::InvalidEndpoint => 402,

            ErrorCode::InvalidInput => 501,
            ErrorCode::ValidationFailed => 502,

            ErrorCode::ResourceNotFound => 705,

            ErrorCode::DialogError => 801,
            ErrorCode::UserCancelled => 802,

            ErrorCode::InternalError => 901,
            ErrorCode::SerializationError => 902,
        }
    }

    /// Get the string code (e.g., "T101")
    pub fn as_str(&self) -> String {
        format!("T{}", self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.code())
    }
}

/// Main error type for all ticketdesk operations
#[derive(Error, Debug)]
pub enum DeskError {
    // ==================== Authentication Errors (T1XX) ====================
    /// Authentication or session failure
    #[error("[{code}] Authentication failed: {message}")]
    Authentication { code: ErrorCode, message: String },

    /// Authorization denied
    #[error("[{code}] Authorization denied: {message}")]
    Authorization { code: ErrorCode, message: String },

    // ==================== Network Errors (T2XX) ====================
    /// Transport-level failure; the request never produced a response
    #[error("[{code}] Network error: {message}")]
    Network {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// API error with status code
    #[error("[{code}] API error ({status}): {message}")]
    Api {
        code: ErrorCode,
        status: u16,
        message: String,
    },

    // ==================== File/IO Errors (T3XX) ====================
    #[error("[{code}] {context}: {message}")]
    Io {
        code: ErrorCode,
        context: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // ==================== Configuration Errors (T4XX) ====================
    #[error("[{code}] Configuration error: {message}")]
    Config {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<config::ConfigError>,
    },

    // ==================== Validation Errors (T5XX) ====================
    #[error("[{code}] Validation error: {message}")]
    Validation {
        code: ErrorCode,
        message: String,
        field: Option<String>,
    },

    #[error("[{code}] Invalid input: {message}")]
    InvalidInput { code: ErrorCode, message: String },

    // ==================== Resource Errors (T7XX) ====================
    #[error("[{code}] Not found: {resource}")]
    NotFound { code: ErrorCode, resource: String },

    // ==================== UI Errors (T8XX) ====================
    #[error("[{code}] UI error: {message}")]
    Ui { code: ErrorCode, message: String },

    // ==================== Internal Errors (T9XX) ====================
    #[error("[{code}] Internal error: {message}")]
    Internal { code: ErrorCode, message: String },

    #[error("[{code}] Serialization error: {message}")]
    Serialization {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

// ==================== Constructor Methods ====================

impl DeskError {
    // --- Authentication ---

    /// Create authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::AuthenticationFailed,
            message: message.into(),
        }
    }

    /// Login rejected by the server
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::InvalidCredentials,
            message: message.into(),
        }
    }

    /// Refresh token rejected or missing
    pub fn refresh_expired(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::RefreshExpired,
            message: message.into(),
        }
    }

    /// 401 that the refresh cycle could not resolve
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::Unauthorized,
            message: message.into(),
        }
    }

    /// No authenticated session
    pub fn session_not_found() -> Self {
        Self::Authentication {
            code: ErrorCode::SessionNotFound,
            message: "Not logged in. Run `ticketdesk login` first.".to_string(),
        }
    }

    /// Create authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            code: ErrorCode::AuthorizationDenied,
            message: message.into(),
        }
    }

    // --- Network ---

    /// Create network error from message
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            code: ErrorCode::HttpError,
            message: message.into(),
            source: None,
        }
    }

    /// Create network error from reqwest error
    pub fn network_from_reqwest(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            ErrorCode::ConnectionTimeout
        } else if err.is_connect() {
            ErrorCode::ConnectionRefused
        } else {
            ErrorCode::HttpError
        };

        Self::Network {
            code,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::ApiError,
            status,
            message: message.into(),
        }
    }

    /// Create invalid response error
    pub fn invalid_response(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::InvalidResponse,
            status,
            message: message.into(),
        }
    }

    // --- File/IO ---

    /// Create IO error from std::io::Error
    pub fn io_from_error(context: impl Into<String>, err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::FileWriteError,
            _ => ErrorCode::FileReadError,
        };

        Self::Io {
            code,
            context: context.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create file not found error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::Io {
            code: ErrorCode::FileNotFound,
            context: "File not found".to_string(),
            message: path.into(),
            source: None,
        }
    }

    // --- Configuration ---

    /// Create configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: message.into(),
            source: None,
        }
    }

    /// Create invalid endpoint error
    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::InvalidEndpoint,
            message: message.into(),
            source: None,
        }
    }

    // --- Validation ---

    /// Create validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
            field: None,
        }
    }

    /// Create validation error with field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            code: ErrorCode::InvalidInput,
            message: message.into(),
        }
    }

    // --- Resource ---

    /// Create not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            code: ErrorCode::ResourceNotFound,
            resource: resource.into(),
        }
    }

    // --- UI ---

    /// Create user cancelled error
    pub fn user_cancelled() -> Self {
        Self::Ui {
            code: ErrorCode::UserCancelled,
            message: "Operation cancelled by user".to_string(),
        }
    }

    // --- Internal ---

    /// Create internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: ErrorCode::InternalError,
            message: message.into(),
        }
    }

    /// Create serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            code: ErrorCode::SerializationError,
            message: message.into(),
            source: None,
        }
    }

    // --- Utility Methods ---

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. } => *code,
            Self::Authorization { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Api { code, .. } => *code,
            Self::Io { code, .. } => *code,
            Self::Config { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::InvalidInput { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Ui { code, .. } => *code,
            Self::Internal { code, .. } => *code,
            Self::Serialization { code, .. } => *code,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Authorization { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Authentication {
                code: ErrorCode::Unauthorized,
                ..
            } => Some(401),
            _ => None,
        }
    }

    /// Check if this is an authentication error
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::Authorization { .. }
        )
    }

    /// Check if this error ended the session
    pub fn is_session_terminal(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::RefreshExpired | ErrorCode::Unauthorized | ErrorCode::SessionNotFound
        )
    }

    /// Check if this is a network error
    pub fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Api { status: 503, .. } | Self::Api { status: 429, .. }
        )
    }
}

// ==================== From Implementations ====================

impl From<std::io::Error> for DeskError {
    fn from(err: std::io::Error) -> Self {
        Self::io_from_error("IO operation", err)
    }
}

impl From<reqwest::Error> for DeskError {
    fn from(err: reqwest::Error) -> Self {
        Self::network_from_reqwest(err)
    }
}

impl From<serde_json::Error> for DeskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            code: ErrorCode::SerializationError,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<config::ConfigError> for DeskError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<dialoguer::Error> for DeskError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Ui {
            code: ErrorCode::DialogError,
            message: format!("Dialog error: {}", err),
        }
    }
}

impl From<validator::ValidationErrors> for DeskError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<String> = field_errors.keys().map(|k| k.to_string()).collect();
        fields.sort_unstable();

        match fields.first() {
            Some(first) => Self::validation_field(
                format!("invalid value for: {}", fields.join(", ")),
                first.clone(),
            ),
            None => Self::validation(errors.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::AuthenticationFailed.code(), 101);
        assert_eq!(ErrorCode::RefreshExpired.code(), 103);
        assert_eq!(ErrorCode::HttpError.code(), 201);
        assert_eq!(ErrorCode::FileNotFound.code(), 301);
        assert_eq!(ErrorCode::ConfigError.code(), 401);
    }

    #[test]
    fn test_error_code_string() {
        assert_eq!(ErrorCode::InvalidCredentials.as_str(), "T104");
        assert_eq!(ErrorCode::HttpError.as_str(), "T201");
    }

    #[test]
    fn test_error_display() {
        let err = DeskError::invalid_credentials("No active account found");
        assert!(err.to_string().contains("T104"));
        assert!(err.to_string().contains("No active account found"));
    }

    #[test]
    fn test_session_terminal_classification() {
        assert!(DeskError::refresh_expired("expired").is_session_terminal());
        assert!(DeskError::unauthorized("401").is_session_terminal());
        assert!(!DeskError::invalid_credentials("bad").is_session_terminal());
        assert!(!DeskError::network("down").is_session_terminal());
        assert_eq!(DeskError::unauthorized("401").status(), Some(401));
    }

    #[test]
    fn test_error_is_retryable() {
        assert!(DeskError::network("reset").is_retryable());
        assert!(DeskError::api(503, "busy").is_retryable());
        assert!(!DeskError::authentication("Failed").is_retryable());
    }
}
