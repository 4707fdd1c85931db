//! Error handling module
//!
//! Centralized error types and their caller-facing rendering.

use serde::Serialize;

use crate::domain::{CoinsError, DomainError, ErrorKind};

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Business rule violations
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<CoinsError> for AppError {
    fn from(e: CoinsError) -> Self {
        AppError::Domain(DomainError::InvalidAmount(e.to_string()))
    }
}

/// Error body handed back to the request-handling layer
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// Taxonomy bucket for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Domain(e) => e.kind(),
            _ => ErrorKind::Internal,
        }
    }

    /// The business error, if this is one
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            AppError::Domain(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_insufficient_funds(&self) -> bool {
        self.kind() == ErrorKind::InsufficientFunds
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Non-technical message for end users. Internal details never leak.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Domain(e) => e.user_message(),
            _ => "Something went wrong. Please try again later.".to_string(),
        }
    }

    /// Render for the caller, logging internal failures with full context
    pub fn to_response(&self) -> ErrorResponse {
        let details = match self {
            AppError::Domain(e) => Some(e.to_string()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                None
            }
            AppError::Migration(e) => {
                tracing::error!("Migration error: {:?}", e);
                None
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                None
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                None
            }
        };

        ErrorResponse {
            error: self.user_message(),
            error_code: self.error_code().to_string(),
            details,
        }
    }
}
