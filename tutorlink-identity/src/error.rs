//! Error types for tutorlink-identity — Railway Programming
//!
//! All operations return `Result<T, IdentityError>`.
//! No panics, no unwraps in production code paths.

use thiserror::Error;

/// Unified error type for the identity core
#[derive(Error, Debug)]
pub enum IdentityError {
    // ─── Record Store Errors ───

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Record store returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Record store request timed out")]
    Timeout,

    #[error("Record not found: {entity}/{id}")]
    NotFound { entity: String, id: String },

    // ─── Session Errors ───

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication service unavailable: {0}")]
    AuthServiceUnavailable(String),

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Profile update failed: {0}")]
    UpdateFailed(String),

    #[error("No active session")]
    NoActiveSession,

    /// Durable slot holds undecodable data. Recovered inside `restore()`,
    /// never returned from a public session operation.
    #[error("Malformed persisted session: {0}")]
    MalformedPersistedSession(String),

    #[error("Session persistence failed: {0}")]
    SessionPersistence(String),

    // ─── Allocation Errors ───

    #[error("Id allocation unavailable for {entity}: {reason}")]
    AllocationUnavailable { entity: String, reason: String },

    // ─── Infrastructure Errors ───

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Actor unavailable: {0}")]
    ActorUnavailable(String),
}

impl IdentityError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT",
            Self::Server { .. } => "SERVER",
            Self::Timeout => "TIMEOUT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AuthServiceUnavailable(_) => "AUTH_SERVICE_UNAVAILABLE",
            Self::RegistrationFailed(_) => "REGISTRATION_FAILED",
            Self::UpdateFailed(_) => "UPDATE_FAILED",
            Self::NoActiveSession => "NO_ACTIVE_SESSION",
            Self::MalformedPersistedSession(_) => "MALFORMED_PERSISTED_SESSION",
            Self::SessionPersistence(_) => "SESSION_PERSISTENCE",
            Self::AllocationUnavailable { .. } => "ALLOCATION_UNAVAILABLE",
            Self::Io(_) => "IO",
            Self::Serialization(_) => "SERIALIZATION",
            Self::Config(_) => "CONFIG",
            Self::ActorUnavailable(_) => "ACTOR_UNAVAILABLE",
        }
    }

    /// Message worth showing to a person: the store's own text when it sent one
    pub fn server_message(&self) -> String {
        match self {
            Self::Server { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }

    /// True for failures raised by the transport or the remote store
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Server { .. } | Self::Timeout | Self::NotFound { .. }
        )
    }
}

impl From<serde_json::Error> for IdentityError {
    fn from(err: serde_json::Error) -> Self {
        IdentityError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for IdentityError {
    fn from(err: url::ParseError) -> Self {
        IdentityError::Config(format!("URL parse error: {err}"))
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IdentityError::Timeout
        } else if err.is_decode() {
            IdentityError::Serialization(err.to_string())
        } else {
            IdentityError::Transport(err.to_string())
        }
    }
}

/// Result type alias for identity operations
pub type Result<T> = std::result::Result<T, IdentityError>;
