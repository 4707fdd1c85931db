//! Command definitions
//!
//! Commands carry already-authenticated ids and primitive values from the
//! request layer into the ledger. Business rules are re-validated by the
//! handlers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{PurchaseRequest, RequestStatus, ResolveAction, TransactionType};

// =========================================================================
// AdjustCommand
// =========================================================================

/// Command for a teacher to gift (positive) or deduct (negative) coins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustCommand {
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    /// Signed amount; zero is rejected
    pub amount: i64,
    pub reason: String,
    /// Replaying a key returns the original entry instead of applying twice
    pub idempotency_key: Option<Uuid>,
}

impl AdjustCommand {
    pub fn new(student_id: Uuid, teacher_id: Uuid, amount: i64, reason: impl Into<String>) -> Self {
        Self {
            student_id,
            teacher_id,
            amount,
            reason: reason.into(),
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: Uuid) -> Self {
        self.idempotency_key = Some(key);
        self
    }
}

/// Result of an adjustment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustResult {
    pub ledger_entry_id: Uuid,
    pub student_id: Uuid,
    pub amount: i64,
    pub transaction_type: TransactionType,
    pub new_balance: i64,
    /// True when an idempotency key matched an earlier adjustment
    pub replayed: bool,
}

// =========================================================================
// DirectPurchaseCommand
// =========================================================================

/// Command to buy an item immediately, without a request queue
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DirectPurchaseCommand {
    pub student_id: Uuid,
    pub item_id: Uuid,
}

impl DirectPurchaseCommand {
    pub fn new(student_id: Uuid, item_id: Uuid) -> Self {
        Self { student_id, item_id }
    }
}

/// A settled purchase: coins debited and the item granted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseResult {
    pub student_id: Uuid,
    pub item_id: Uuid,
    pub cost: i64,
    pub new_balance: i64,
    pub ledger_entry_id: Uuid,
    pub request_id: Option<Uuid>,
}

// =========================================================================
// SubmitPurchaseCommand
// =========================================================================

/// Command for a student to ask for an item
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubmitPurchaseCommand {
    pub student_id: Uuid,
    pub item_id: Uuid,
}

impl SubmitPurchaseCommand {
    pub fn new(student_id: Uuid, item_id: Uuid) -> Self {
        Self { student_id, item_id }
    }
}

/// Result of submitting a purchase request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResult {
    pub request: PurchaseRequest,
    /// Settled at submission under the class threshold
    pub auto_approved: bool,
    /// Balance after settlement; `None` while pending
    pub new_balance: Option<i64>,
}

// =========================================================================
// ResolveCommand
// =========================================================================

/// Command for a teacher to approve or deny a pending request
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResolveCommand {
    pub request_id: Uuid,
    pub action: ResolveAction,
    pub actor_id: Uuid,
}

impl ResolveCommand {
    pub fn new(request_id: Uuid, action: ResolveAction, actor_id: Uuid) -> Self {
        Self {
            request_id,
            action,
            actor_id,
        }
    }

    pub fn approve(request_id: Uuid, actor_id: Uuid) -> Self {
        Self::new(request_id, ResolveAction::Approve, actor_id)
    }

    pub fn deny(request_id: Uuid, actor_id: Uuid) -> Self {
        Self::new(request_id, ResolveAction::Deny, actor_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResult {
    pub request: PurchaseRequest,
    /// Balance after the debit; `None` for denials
    pub new_balance: Option<i64>,
}

// =========================================================================
// BulkResolveCommand
// =========================================================================

/// Apply one action to many requests, each in its own transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResolveCommand {
    pub request_ids: Vec<Uuid>,
    pub action: ResolveAction,
    pub actor_id: Uuid,
}

impl BulkResolveCommand {
    pub fn new(request_ids: Vec<Uuid>, action: ResolveAction, actor_id: Uuid) -> Self {
        Self {
            request_ids,
            action,
            actor_id,
        }
    }
}

/// Outcome for one request of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemResult {
    pub request_id: Uuid,
    pub success: bool,
    /// Status after processing; `None` when the request could not be read
    pub status: Option<RequestStatus>,
    pub error_code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResolveResult {
    pub processed: usize,
    pub failed: usize,
    pub results: Vec<BulkItemResult>,
}

// =========================================================================
// BuyOutcome
// =========================================================================

/// What a purchase attempt turned into, depending on the class's mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BuyOutcome {
    Purchased(PurchaseResult),
    Requested(SubmitResult),
}
