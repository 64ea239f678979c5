//! Error types and exit code mapping

use thiserror::Error;

/// Result type alias for trust stack operations
pub type Result<T> = std::result::Result<T, TrustError>;

/// Trust stack error with process exit code mapping
#[derive(Error, Debug)]
pub enum TrustError {
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("invalid repository entry: {message}")]
    InvalidRepoEntry { message: String },

    #[error("invalid issuer: {message}")]
    InvalidIssuer { message: String },

    #[error("invalid claims: {message}")]
    InvalidClaims { message: String },

    #[error("access denied: {message}")]
    AccessDenied { message: String },

    #[error("breaking change: {message}")]
    BreakingChange { message: String },

    #[error("render error: {message}")]
    Render { message: String },

    #[error("io error: {message}")]
    Io { message: String },
}

impl TrustError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn invalid_repo_entry(message: impl Into<String>) -> Self {
        Self::InvalidRepoEntry {
            message: message.into(),
        }
    }

    pub fn invalid_issuer(message: impl Into<String>) -> Self {
        Self::InvalidIssuer {
            message: message.into(),
        }
    }

    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    pub fn breaking_change(message: impl Into<String>) -> Self {
        Self::BreakingChange {
            message: message.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidConfig { .. } => 2,
            Self::InvalidRepoEntry { .. } => 2,
            Self::InvalidIssuer { .. } => 2,
            Self::InvalidClaims { .. } => 2,
            Self::AccessDenied { .. } => 3,
            Self::BreakingChange { .. } => 4,
            Self::Render { .. } => 1,
            Self::Io { .. } => 1,
        }
    }

    /// Get the error key for this error
    pub fn error_key(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "invalid_config",
            Self::InvalidRepoEntry { .. } => "invalid_repo_entry",
            Self::InvalidIssuer { .. } => "invalid_issuer",
            Self::InvalidClaims { .. } => "invalid_claims",
            Self::AccessDenied { .. } => "access_denied",
            Self::BreakingChange { .. } => "breaking_change",
            Self::Render { .. } => "render_error",
            Self::Io { .. } => "io_error",
        }
    }
}
