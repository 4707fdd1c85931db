//! Ledger entities
//!
//! Row types for the tables the ledger touches. Enum columns are stored as
//! snake_case TEXT.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;
use uuid::Uuid;

//--------------------------------------   TransactionType     ---------------------------------------------------------

/// Why a ledger entry exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TransactionType {
    TeacherGift,
    TeacherDeduct,
    /// Settled direct purchase, or a manually approved request
    Purchase,
    /// Request settled at submission under the class threshold
    AutoApprovedPurchase,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::TeacherGift => "teacher_gift",
            TransactionType::TeacherDeduct => "teacher_deduct",
            TransactionType::Purchase => "purchase",
            TransactionType::AutoApprovedPurchase => "auto_approved_purchase",
        }
    }

    pub fn is_purchase(&self) -> bool {
        matches!(self, TransactionType::Purchase | TransactionType::AutoApprovedPurchase)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------    RequestStatus      ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Denied => "denied",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------    ResolveAction      ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveAction {
    Approve,
    Deny,
}

impl ResolveAction {
    /// The terminal status a pending request moves to
    pub fn target_status(&self) -> RequestStatus {
        match self {
            ResolveAction::Approve => RequestStatus::Approved,
            ResolveAction::Deny => RequestStatus::Denied,
        }
    }
}

impl std::str::FromStr for ResolveAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(ResolveAction::Approve),
            "deny" => Ok(ResolveAction::Deny),
            other => Err(format!("Unknown action: {other}")),
        }
    }
}

//--------------------------------------    PurchaseMode       ---------------------------------------------------------

/// How a class settles student purchases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PurchaseMode {
    /// Settle immediately, no request queue
    Direct,
    /// Queue a request for the teacher (subject to auto-approval)
    Approval,
}

//--------------------------------------       Entities        ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Classroom {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub name: String,
    pub auto_approve_threshold: Option<i64>,
    pub purchase_mode: PurchaseMode,
    pub created_at: DateTime<Utc>,
}

impl Classroom {
    /// Whether a purchase of `cost` settles at submission time
    pub fn auto_approves(&self, cost: i64) -> bool {
        self.auto_approve_threshold.is_some_and(|threshold| cost <= threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub class_id: Uuid,
    pub display_name: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CatalogItem {
    pub id: Uuid,
    pub name: String,
    pub cost: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub student_id: Uuid,
    /// Position in the student's chain, starting at 1
    pub sequence: i64,
    pub actor_id: Uuid,
    pub amount: i64,
    pub reason: String,
    pub transaction_type: TransactionType,
    pub item_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub idempotency_key: Option<Uuid>,
    pub prev_hash: String,
    pub entry_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PurchaseRequest {
    pub id: Uuid,
    pub student_id: Uuid,
    pub item_id: Uuid,
    pub cost_snapshot: i64,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct InventoryGrant {
    pub student_id: Uuid,
    pub item_id: Uuid,
    pub request_id: Option<Uuid>,
    pub granted_at: DateTime<Utc>,
}
