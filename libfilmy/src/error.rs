//! Error types for Filmy

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilmyError>;

#[derive(Error, Debug)]
pub enum FilmyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl FilmyError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            FilmyError::InvalidInput(_) => 3,
            FilmyError::Authentication(_) => 2,
            FilmyError::Api(api) if api.is_authentication() => 2,
            FilmyError::Api(_) => 1,
            FilmyError::Operation(_) => 1,
            FilmyError::Config(_) => 1,
            FilmyError::Storage(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

/// Failures raised by the remote API client
///
/// Cloneable so effect handlers can hand the same error to logging and to
/// the failure action they dispatch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Non-2xx response, with the raw body text
    #[error("Request failed with status {status}: {body}")]
    Request { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Transport(String),

    /// 2xx response whose payload reported `success: false`
    #[error("{0}")]
    Rejected(String),

    #[error("Not authenticated")]
    Unauthenticated,
}

impl ApiError {
    /// The `message` field of a JSON error body, when the server sent one
    pub fn server_message(&self) -> Option<String> {
        match self {
            ApiError::Request { body, .. } => serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .filter(|m| !m.trim().is_empty()),
            _ => None,
        }
    }

    /// Message suitable for a slice `error` field
    pub fn user_message(&self) -> String {
        self.server_message().unwrap_or_else(|| self.to_string())
    }

    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthenticated | ApiError::Request { status: 401 | 403, .. }
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Snapshot encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
