//! Adjustment Handler
//!
//! Teacher gifts and deductions. Both go through the balance store with
//! the zero floor, so a deduction larger than the balance fails with
//! `InsufficientFunds` and writes nothing.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::config::LedgerSettings;
use crate::domain::{Adjustment, CoinEvent, DomainError, LedgerEntry, OperationContext};
use crate::error::AppResult;
use crate::notify::{NoopNotifier, Notifier};
use crate::store::{self, ledger, roster, NewLedgerEntry};

use super::{AdjustCommand, AdjustResult};

/// Handler for teacher balance adjustments
pub struct AdjustmentHandler {
    pool: SqlitePool,
    settings: LedgerSettings,
    notifier: Arc<dyn Notifier>,
}

impl AdjustmentHandler {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            settings: LedgerSettings::default(),
            notifier: Arc::new(NoopNotifier),
        }
    }

    pub fn with_settings(mut self, settings: LedgerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Execute the adjustment
    pub async fn execute(&self, command: AdjustCommand, context: &OperationContext) -> AppResult<AdjustResult> {
        let adjustment = self.validate_amount(command.amount)?;
        let reason = self.validate_reason(&command.reason)?;

        let mut tx = self.pool.begin().await?;

        // First statement takes the write lock on the student row
        let (student, _class) =
            roster::lock_student_for_teacher(&mut *tx, command.student_id, command.teacher_id).await?;

        if let Some(key) = command.idempotency_key {
            if let Some(original) = ledger::find_by_idempotency_key(&mut *tx, key).await? {
                check_replay(&command, key, &original)?;
                tracing::info!(
                    student_id = %command.student_id,
                    idempotency_key = %key,
                    ledger_entry_id = %original.id,
                    correlation_id = %context.correlation(),
                    "Adjustment replayed"
                );
                return Ok(AdjustResult {
                    ledger_entry_id: original.id,
                    student_id: original.student_id,
                    amount: original.amount,
                    transaction_type: original.transaction_type,
                    new_balance: student.balance,
                    replayed: true,
                });
            }
        }

        let entry = NewLedgerEntry::adjustment(command.student_id, command.teacher_id, adjustment, reason)
            .with_idempotency_key(command.idempotency_key);

        let posting = store::post_entry(&mut *tx, entry).await?;
        tx.commit().await?;

        tracing::info!(
            student_id = %command.student_id,
            teacher_id = %command.teacher_id,
            amount = posting.entry.amount,
            new_balance = posting.new_balance,
            correlation_id = %context.correlation(),
            "Balance adjusted"
        );

        self.notifier.notify(CoinEvent::BalanceAdjusted {
            student_id: command.student_id,
            teacher_id: command.teacher_id,
            amount: posting.entry.amount,
            new_balance: posting.new_balance,
            transaction_type: posting.entry.transaction_type,
            reason: posting.entry.reason.clone(),
            adjusted_at: Utc::now(),
        });

        Ok(AdjustResult {
            ledger_entry_id: posting.entry.id,
            student_id: command.student_id,
            amount: posting.entry.amount,
            transaction_type: posting.entry.transaction_type,
            new_balance: posting.new_balance,
            replayed: false,
        })
    }

    fn validate_amount(&self, amount: i64) -> AppResult<Adjustment> {
        let adjustment = Adjustment::from_signed(amount)?;
        let max = self.settings.max_adjustment;
        if adjustment.coins().value() > max {
            return Err(DomainError::InvalidAmount(format!(
                "Adjustments are limited to {max} coins at a time"
            ))
            .into());
        }
        Ok(adjustment)
    }

    fn validate_reason(&self, reason: &str) -> AppResult<String> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::InvalidRequest("A reason is required".to_string()).into());
        }
        let max = self.settings.max_reason_length;
        if reason.chars().count() > max {
            return Err(DomainError::InvalidRequest(format!(
                "Reason must be at most {max} characters"
            ))
            .into());
        }
        Ok(reason.to_string())
    }
}

/// A replay must name the same student, teacher and signed amount
fn check_replay(command: &AdjustCommand, key: Uuid, original: &LedgerEntry) -> AppResult<()> {
    let same = original.student_id == command.student_id
        && original.actor_id == command.teacher_id
        && original.amount == command.amount;
    if !same {
        tracing::warn!(
            idempotency_key = %key,
            student_id = %command.student_id,
            "Idempotency key reused with a different adjustment"
        );
        return Err(DomainError::IdempotencyConflict { key }.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use sqlx::sqlite::SqlitePoolOptions;

    fn handler() -> AdjustmentHandler {
        // Validation runs before any query, so a lazy pool is never touched
        let pool = SqlitePoolOptions::new()
            .connect_lazy("sqlite::memory:")
            .unwrap();
        AdjustmentHandler::new(pool).with_settings(LedgerSettings {
            max_adjustment: 100,
            max_reason_length: 10,
            ledger_page_limit: 50,
        })
    }

    #[tokio::test]
    async fn test_validate_amount_bounds() {
        let h = handler();
        assert!(h.validate_amount(100).is_ok());
        assert!(h.validate_amount(-100).is_ok());
        assert!(matches!(
            h.validate_amount(101),
            Err(AppError::Domain(DomainError::InvalidAmount(_)))
        ));
        assert!(matches!(
            h.validate_amount(0),
            Err(AppError::Domain(DomainError::InvalidAmount(_)))
        ));
    }

    #[tokio::test]
    async fn test_validate_reason() {
        let h = handler();
        assert_eq!(h.validate_reason("  quiz  ").unwrap(), "quiz");
        assert!(h.validate_reason("   ").is_err());
        assert!(h.validate_reason("far too long a reason").is_err());
    }
}
