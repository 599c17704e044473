use thiserror::Error;

/// Errors that can occur when interacting with the App Configuration service.
#[derive(Error, Debug)]
pub enum AppConfigError {
    /// The request failed due to an HTTP error.
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// The service returned a structured error response.
    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The requested configuration setting does not exist.
    #[error("configuration setting not found")]
    ResourceNotFound,

    /// A configuration setting with the same key and label already exists.
    #[error("configuration setting already exists")]
    ResourceExists,

    /// The configuration setting was modified since it was last read.
    #[error("configuration setting was modified")]
    ResourceModified,

    /// The configuration setting has not changed since it was last read.
    #[error("configuration setting was not modified")]
    ResourceNotModified,

    /// The configuration setting is locked and cannot be written.
    #[error("configuration setting is read-only")]
    ResourceReadOnly,

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The request payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request failed at the transport level.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint URL is invalid.
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    /// The connection string could not be parsed.
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// A required configuration value is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// A request could not be built from the given inputs.
    #[error("Invalid request: {0}")]
    Builder(String),
}

impl AppConfigError {
    /// Construct a generic HTTP error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// The HTTP status this error was classified from, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::ResourceNotFound => Some(404),
            Self::ResourceNotModified => Some(304),
            _ => None,
        }
    }
}

/// Result type alias for App Configuration operations.
pub type AppConfigResult<T> = std::result::Result<T, AppConfigError>;
