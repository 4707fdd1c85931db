//! Balance Store
//!
//! The atomic conditional mutation primitive. A balance moves only inside
//! [`post_entry`], which applies the delta with a single conditional
//! `UPDATE` and appends the matching ledger entry on the same connection.
//! Run it inside a transaction and roll back on any error.

use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::domain::{Adjustment, Coins, DomainError, LedgerEntry, TransactionType};
use crate::error::AppResult;

use super::ledger;

/// Lowest balance a debit may leave behind
pub const BALANCE_FLOOR: i64 = 0;

/// A ledger entry about to be posted
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub student_id: Uuid,
    pub actor_id: Uuid,
    /// Signed balance delta; never zero
    pub amount: i64,
    pub reason: String,
    pub transaction_type: TransactionType,
    pub item_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub idempotency_key: Option<Uuid>,
}

impl NewLedgerEntry {
    /// Entry debiting `coins` from the student
    pub fn debit(
        student_id: Uuid,
        actor_id: Uuid,
        coins: Coins,
        transaction_type: TransactionType,
        reason: impl Into<String>,
    ) -> Self {
        Self::with_amount(student_id, actor_id, coins.as_debit(), transaction_type, reason)
    }

    /// Teacher gift or deduction, typed by its direction
    pub fn adjustment(
        student_id: Uuid,
        teacher_id: Uuid,
        adjustment: Adjustment,
        reason: impl Into<String>,
    ) -> Self {
        let transaction_type = if adjustment.is_gift() {
            TransactionType::TeacherGift
        } else {
            TransactionType::TeacherDeduct
        };
        Self::with_amount(student_id, teacher_id, adjustment.delta(), transaction_type, reason)
    }

    fn with_amount(
        student_id: Uuid,
        actor_id: Uuid,
        amount: i64,
        transaction_type: TransactionType,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            student_id,
            actor_id,
            amount,
            reason: reason.into(),
            transaction_type,
            item_id: None,
            request_id: None,
            idempotency_key: None,
        }
    }

    pub fn for_item(mut self, item_id: Uuid) -> Self {
        self.item_id = Some(item_id);
        self
    }

    pub fn for_request(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_idempotency_key(mut self, key: Option<Uuid>) -> Self {
        self.idempotency_key = key;
        self
    }
}

/// Outcome of a successful posting
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub entry: LedgerEntry,
    pub new_balance: i64,
}

/// Apply `entry.amount` to the student's balance and append the entry.
///
/// Fails with `InsufficientFunds` when the debit would cross
/// [`BALANCE_FLOOR`] and with `StudentNotFound` when the row is missing.
/// Either way nothing has been written by this call, but the caller must
/// still roll back its transaction to discard its own earlier writes.
pub async fn post_entry(conn: &mut SqliteConnection, entry: NewLedgerEntry) -> AppResult<Posting> {
    let new_balance = apply_delta(conn, entry.student_id, entry.amount, BALANCE_FLOOR).await?;
    let stored = ledger::append(conn, &entry).await?;

    tracing::debug!(
        student_id = %entry.student_id,
        amount = entry.amount,
        new_balance = new_balance,
        transaction_type = %entry.transaction_type,
        ledger_entry_id = %stored.id,
        "Ledger entry posted"
    );

    Ok(Posting {
        entry: stored,
        new_balance,
    })
}

/// `balance = balance + delta` only if the result stays at or above `floor`.
async fn apply_delta(
    conn: &mut SqliteConnection,
    student_id: Uuid,
    delta: i64,
    floor: i64,
) -> AppResult<i64> {
    let new_balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE students
        SET balance = balance + $1, updated_at = $2
        WHERE id = $3 AND balance + $1 >= $4
        RETURNING balance
        "#,
    )
    .bind(delta)
    .bind(Utc::now())
    .bind(student_id)
    .bind(floor)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(balance) = new_balance {
        return Ok(balance);
    }

    // No row matched: tell a missing student apart from a failed floor check
    let current: Option<i64> = sqlx::query_scalar("SELECT balance FROM students WHERE id = $1")
        .bind(student_id)
        .fetch_optional(&mut *conn)
        .await?;

    match current {
        None => Err(DomainError::StudentNotFound(student_id).into()),
        Some(available) => {
            tracing::warn!(
                student_id = %student_id,
                required = -delta,
                available = available,
                "Conditional balance update rejected"
            );
            Err(DomainError::insufficient_funds(-delta, available).into())
        }
    }
}
