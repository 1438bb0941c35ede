//! Error handling for ItemSearch core library

use std::fmt;
use thiserror::Error;

/// Result type alias for ItemSearch operations
pub type Result<T> = std::result::Result<T, ItemSearchError>;

/// Main error type for ItemSearch operations
#[derive(Error, Debug)]
pub enum ItemSearchError {
    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),

    /// Caller supplied a missing or malformed field or parameter
    #[error("{message}")]
    Validation { message: String },

    /// Absent or incorrect API token
    #[error("Invalid or missing API token")]
    Unauthorized,

    /// Resource not found errors
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Failure talking to, or reported by, the search engine
    #[error("Search engine error during {operation}: {message}")]
    Engine { operation: String, message: String },

    /// Invalid configuration values
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl ItemSearchError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a validation error for an absent required field
    pub fn missing_field(field: &str) -> Self {
        Self::validation(format!("Missing required field: {}", field))
    }

    /// Create a validation error for an absent required search parameter
    pub fn missing_parameter(parameter: &str) -> Self {
        Self::validation(format!("Missing required parameter: {}", parameter))
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a search engine error
    pub fn engine<O: Into<String>, S: Into<String>>(operation: O, message: S) -> Self {
        Self::Engine {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Engine { .. } | Self::Io(_))
    }

    /// Get error category for logging and status mapping
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Unauthorized => ErrorCategory::Security,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Engine { .. } => ErrorCategory::Engine,
            Self::Config(_) | Self::InvalidConfig { .. } | Self::Url(_) => {
                ErrorCategory::Configuration
            }
            Self::Json(_) => ErrorCategory::Serialization,
            Self::Io(_) | Self::Generic(_) => ErrorCategory::Generic,
        }
    }
}

/// Error categories for metrics and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    Security,
    NotFound,
    Engine,
    Configuration,
    Serialization,
    Generic,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Security => write!(f, "security"),
            Self::NotFound => write!(f, "not_found"),
            Self::Engine => write!(f, "engine"),
            Self::Configuration => write!(f, "configuration"),
            Self::Serialization => write!(f, "serialization"),
            Self::Generic => write!(f, "generic"),
        }
    }
}
