//! Ledger audit
//!
//! Offline checks over the persisted ledger: balance reconciliation
//! (`balance == sum(amount)` per student) and per-student hash chain
//! verification.

use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::store::ledger::{self, entry_hash, HashInput, GENESIS_HASH};

// =========================================================================
// Reconciliation
// =========================================================================

/// A student whose stored balance disagrees with their ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDrift {
    pub student_id: Uuid,
    pub balance: i64,
    pub ledger_sum: i64,
}

impl BalanceDrift {
    pub fn difference(&self) -> i64 {
        self.balance - self.ledger_sum
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub students_checked: u64,
    pub drifts: Vec<BalanceDrift>,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.drifts.is_empty()
    }
}

/// Compare every student's balance with the sum of their ledger entries
pub async fn reconcile(pool: &SqlitePool) -> AppResult<ReconciliationReport> {
    let rows: Vec<(Uuid, i64, i64)> = sqlx::query_as(
        r#"
        SELECT s.id, s.balance, COALESCE(SUM(l.amount), 0)
        FROM students s
        LEFT JOIN ledger_entries l ON l.student_id = s.id
        GROUP BY s.id, s.balance
        "#,
    )
    .fetch_all(pool)
    .await?;

    let students_checked = rows.len() as u64;
    let drifts: Vec<BalanceDrift> = rows
        .into_iter()
        .filter(|(_, balance, sum)| balance != sum)
        .map(|(student_id, balance, ledger_sum)| BalanceDrift {
            student_id,
            balance,
            ledger_sum,
        })
        .collect();

    for drift in &drifts {
        tracing::error!(
            student_id = %drift.student_id,
            balance = drift.balance,
            ledger_sum = drift.ledger_sum,
            "Balance does not match ledger"
        );
    }

    Ok(ReconciliationReport {
        students_checked,
        drifts,
    })
}

// =========================================================================
// Hash chain verification
// =========================================================================

/// Result of hash chain verification for one student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerificationResult {
    pub student_id: Uuid,
    pub is_valid: bool,
    pub entries_checked: u64,
    pub first_invalid_entry: Option<Uuid>,
    pub expected_hash: Option<String>,
    pub actual_hash: Option<String>,
}

impl ChainVerificationResult {
    fn valid(student_id: Uuid, entries_checked: u64) -> Self {
        Self {
            student_id,
            is_valid: true,
            entries_checked,
            first_invalid_entry: None,
            expected_hash: None,
            actual_hash: None,
        }
    }

    fn broken(student_id: Uuid, entries_checked: u64, entry: Uuid, expected: String, actual: String) -> Self {
        Self {
            student_id,
            is_valid: false,
            entries_checked,
            first_invalid_entry: Some(entry),
            expected_hash: Some(expected),
            actual_hash: Some(actual),
        }
    }
}

/// Recompute a student's chain from the genesis hash, stopping at the
/// first entry whose link, sequence or hash does not match.
pub async fn verify_student_chain(conn: &mut SqliteConnection, student_id: Uuid) -> AppResult<ChainVerificationResult> {
    let entries = ledger::chain_for_student(conn, student_id).await?;

    let mut previous_hash = GENESIS_HASH.to_string();
    for (index, entry) in entries.iter().enumerate() {
        let checked = index as u64 + 1;

        if entry.prev_hash != previous_hash {
            return Ok(ChainVerificationResult::broken(
                student_id,
                checked,
                entry.id,
                previous_hash,
                entry.prev_hash.clone(),
            ));
        }

        // Sequences start at 1 with no gaps
        if entry.sequence != checked as i64 {
            return Ok(ChainVerificationResult::broken(
                student_id,
                checked,
                entry.id,
                format!("sequence {checked}"),
                format!("sequence {}", entry.sequence),
            ));
        }

        let calculated = entry_hash(&HashInput::of(entry));
        if calculated != entry.entry_hash {
            return Ok(ChainVerificationResult::broken(
                student_id,
                checked,
                entry.id,
                calculated,
                entry.entry_hash.clone(),
            ));
        }

        previous_hash = entry.entry_hash.clone();
    }

    Ok(ChainVerificationResult::valid(student_id, entries.len() as u64))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainAuditReport {
    pub students_checked: u64,
    pub entries_checked: u64,
    pub broken: Vec<ChainVerificationResult>,
}

impl ChainAuditReport {
    pub fn is_valid(&self) -> bool {
        self.broken.is_empty()
    }
}

/// Verify the chain of every student with at least one entry
pub async fn verify_all_chains(pool: &SqlitePool) -> AppResult<ChainAuditReport> {
    let student_ids: Vec<Uuid> = sqlx::query_scalar("SELECT DISTINCT student_id FROM ledger_entries")
        .fetch_all(pool)
        .await?;

    let mut conn = pool.acquire().await?;
    let mut report = ChainAuditReport::default();
    for student_id in student_ids {
        let result = verify_student_chain(&mut *conn, student_id).await?;
        report.students_checked += 1;
        report.entries_checked += result.entries_checked;
        if !result.is_valid {
            tracing::error!(
                student_id = %student_id,
                first_invalid_entry = ?result.first_invalid_entry,
                "Ledger hash chain broken"
            );
            report.broken.push(result);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_drift_difference() {
        let drift = BalanceDrift {
            student_id: Uuid::nil(),
            balance: 120,
            ledger_sum: 100,
        };
        assert_eq!(drift.difference(), 20);
    }

    #[test]
    fn test_reports_start_clean() {
        assert!(ReconciliationReport::default().is_consistent());
        assert!(ChainAuditReport::default().is_valid());
    }

    #[test]
    fn test_chain_verification_result() {
        let ok = ChainVerificationResult::valid(Uuid::nil(), 3);
        assert!(ok.is_valid);
        assert_eq!(ok.entries_checked, 3);

        let bad = ChainVerificationResult::broken(Uuid::nil(), 2, Uuid::nil(), "a".into(), "b".into());
        assert!(!bad.is_valid);
        assert_eq!(bad.expected_hash.as_deref(), Some("a"));
    }
}
