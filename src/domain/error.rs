//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;
use uuid::Uuid;

/// Error categories surfaced to callers of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; never retried automatically
    Validation,
    /// Student, item or request is missing (or not pending)
    NotFound,
    /// The atomic debit failed its floor check
    InsufficientFunds,
    /// Duplicate pending request or already-owned item
    Conflict,
    /// Storage failure unrelated to business rules
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal_error",
        }
    }
}

/// Business rule violations and domain invariant failures.
///
/// These errors are independent of the storage layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid amount (zero, out of range, unparsable)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Malformed input other than the amount
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Student not found, or not in a class the actor teaches
    #[error("Student not found: {0}")]
    StudentNotFound(Uuid),

    #[error("Class not found: {0}")]
    ClassNotFound(Uuid),

    #[error("Item not found: {0}")]
    ItemNotFound(Uuid),

    /// Item exists but is no longer for sale
    #[error("Item is not available for purchase: {0}")]
    ItemInactive(Uuid),

    /// Request missing, foreign to the actor, or no longer pending
    #[error("Purchase request not found or already processed: {0}")]
    RequestNotFound(Uuid),

    /// The conditional balance update matched no row
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("Item {item_id} is already owned")]
    AlreadyOwned { item_id: Uuid },

    #[error("A pending request for item {item_id} already exists")]
    DuplicatePendingRequest { item_id: Uuid },

    /// Idempotency key reused with a different payload
    #[error("Idempotency key {key} was already used for a different adjustment")]
    IdempotencyConflict { key: Uuid },
}

impl DomainError {
    pub fn insufficient_funds(required: i64, available: i64) -> Self {
        Self::InsufficientFunds { required, available }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_) | Self::InvalidRequest(_) => ErrorKind::Validation,
            Self::StudentNotFound(_)
            | Self::ClassNotFound(_)
            | Self::ItemNotFound(_)
            | Self::ItemInactive(_)
            | Self::RequestNotFound(_) => ErrorKind::NotFound,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::AlreadyOwned { .. }
            | Self::DuplicatePendingRequest { .. }
            | Self::IdempotencyConflict { .. } => ErrorKind::Conflict,
        }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal)
    }

    /// Message safe to show to a student or teacher.
    pub fn user_message(&self) -> String {
        match self {
            Self::InsufficientFunds { required, available } => format!(
                "Not enough coins: this needs {required} but only {available} are available."
            ),
            Self::AlreadyOwned { .. } => "You already own this item.".to_string(),
            Self::DuplicatePendingRequest { .. } => {
                "You already asked for this item. Wait for your teacher to respond.".to_string()
            }
            Self::ItemInactive(_) => "This item is no longer available.".to_string(),
            Self::ItemNotFound(_) => "That item could not be found.".to_string(),
            Self::StudentNotFound(_) => "That student could not be found.".to_string(),
            Self::ClassNotFound(_) => "That class could not be found.".to_string(),
            Self::RequestNotFound(_) => {
                "That request could not be found or was already handled.".to_string()
            }
            Self::InvalidAmount(msg) | Self::InvalidRequest(msg) => msg.clone(),
            Self::IdempotencyConflict { .. } => {
                "This adjustment was already submitted with different details.".to_string()
            }
        }
    }
}
