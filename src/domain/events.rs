//! Domain Events
//!
//! Facts published after a money transaction commits. They feed
//! notification collaborators and are never part of the transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::{RequestStatus, TransactionType};

/// Events emitted by the coin ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CoinEvent {
    /// A teacher gifted or deducted coins
    BalanceAdjusted {
        student_id: Uuid,
        teacher_id: Uuid,
        amount: i64,
        new_balance: i64,
        transaction_type: TransactionType,
        reason: String,
        adjusted_at: DateTime<Utc>,
    },

    /// An item was paid for and granted
    ItemPurchased {
        student_id: Uuid,
        item_id: Uuid,
        cost: i64,
        new_balance: i64,
        request_id: Option<Uuid>,
        purchased_at: DateTime<Utc>,
    },

    /// A purchase request entered the teacher's queue
    PurchaseRequested {
        request_id: Uuid,
        student_id: Uuid,
        item_id: Uuid,
        cost: i64,
        requested_at: DateTime<Utc>,
    },

    /// A purchase request reached a terminal state
    PurchaseResolved {
        request_id: Uuid,
        student_id: Uuid,
        status: RequestStatus,
        processed_by: Uuid,
        processed_at: DateTime<Utc>,
    },
}

impl CoinEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            CoinEvent::BalanceAdjusted { .. } => "BalanceAdjusted",
            CoinEvent::ItemPurchased { .. } => "ItemPurchased",
            CoinEvent::PurchaseRequested { .. } => "PurchaseRequested",
            CoinEvent::PurchaseResolved { .. } => "PurchaseResolved",
        }
    }

    /// Get the student this event relates to
    pub fn student_id(&self) -> Uuid {
        match self {
            CoinEvent::BalanceAdjusted { student_id, .. } => *student_id,
            CoinEvent::ItemPurchased { student_id, .. } => *student_id,
            CoinEvent::PurchaseRequested { student_id, .. } => *student_id,
            CoinEvent::PurchaseResolved { student_id, .. } => *student_id,
        }
    }
}
