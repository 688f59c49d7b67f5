//! Error types for the LevelUp client.

/// Top-level error type for the client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Durable credential store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Failures below HTTP: no connectivity, timeouts, unreadable bodies.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Session / credential errors raised by the token gateway.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No active session: refresh token is missing")]
    NoSession,

    #[error("Session expired: {reason}")]
    SessionExpired { reason: String },

    #[error("Transport error during token refresh: {0}")]
    Transport(#[from] TransportError),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),
}

/// Remote API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized (HTTP 401) on {endpoint}")]
    Unauthorized { endpoint: String },

    #[error("{endpoint} failed with HTTP {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Input rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please fill in the {field} field")]
    Blank { field: &'static str },

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {min} characters long")]
    PasswordTooShort { min: usize },

    #[error("Invalid {link} link")]
    MissingToken { link: &'static str },
}

/// Task lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task {id} not found")]
    NotFound { id: i64 },

    #[error("Task {id} is completed and cannot be marked as not completed")]
    CannotReopen { id: i64 },
}

impl ApiError {
    /// Whether the caller must drop the session and log in again.
    pub fn requires_reauth(&self) -> bool {
        match self {
            Self::Unauthorized { .. } => true,
            Self::Auth(AuthError::NoSession | AuthError::SessionExpired { .. }) => true,
            _ => false,
        }
    }
}

impl Error {
    /// Whether the caller must drop the session and log in again.
    pub fn requires_reauth(&self) -> bool {
        match self {
            Self::Api(e) => e.requires_reauth(),
            Self::Auth(AuthError::NoSession | AuthError::SessionExpired { .. }) => true,
            _ => false,
        }
    }

    /// Text for the user-facing error slot.
    ///
    /// `fallback` is used when the server rejected the call without a message.
    pub fn user_message(&self, fallback: &str) -> String {
        if self.requires_reauth() {
            return "Session expired, please log in again".to_string();
        }
        match self {
            Self::Transport(e) | Self::Api(ApiError::Transport(e)) => network_message(e),
            Self::Auth(AuthError::Transport(e)) | Self::Api(ApiError::Auth(AuthError::Transport(e))) => {
                network_message(e)
            }
            Self::Api(ApiError::Status { message, .. }) if !message.is_empty() => message.clone(),
            Self::Validation(e) => e.to_string(),
            Self::Task(e) => e.to_string(),
            _ => fallback.to_string(),
        }
    }
}

fn network_message(e: &TransportError) -> String {
    format!("Network error: {e}")
}

/// Result type alias for the client.
pub type Result<T> = std::result::Result<T, Error>;
