//! Ledger
//!
//! Append-only log of balance-affecting events. Entries are chained per
//! student: each stores the hash of its predecessor, so any edit made
//! outside this module is detectable by [`crate::audit`].

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::domain::{LedgerEntry, TransactionType};
use crate::error::AppResult;

use super::balance::NewLedgerEntry;

/// `prev_hash` of a student's first entry
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Fields covered by an entry's hash
#[derive(Debug, Clone, Copy)]
pub struct HashInput<'a> {
    pub prev_hash: &'a str,
    pub id: Uuid,
    pub student_id: Uuid,
    pub sequence: i64,
    pub actor_id: Uuid,
    pub amount: i64,
    pub transaction_type: TransactionType,
    pub reason: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> HashInput<'a> {
    pub fn of(entry: &'a LedgerEntry) -> Self {
        Self {
            prev_hash: &entry.prev_hash,
            id: entry.id,
            student_id: entry.student_id,
            sequence: entry.sequence,
            actor_id: entry.actor_id,
            amount: entry.amount,
            transaction_type: entry.transaction_type,
            reason: &entry.reason,
            created_at: entry.created_at,
        }
    }
}

/// SHA-256 over the entry fields, hex encoded
pub fn entry_hash(input: &HashInput<'_>) -> String {
    let material = format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}",
        input.prev_hash,
        input.id,
        input.student_id,
        input.sequence,
        input.actor_id,
        input.amount,
        input.transaction_type.as_str(),
        input.reason,
        input.created_at.timestamp_micros(),
    );
    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    hex::encode(hasher.finalize())
}

/// Append an entry. Only [`super::balance::post_entry`] calls this, right
/// after the paired balance update.
pub(super) async fn append(conn: &mut SqliteConnection, entry: &NewLedgerEntry) -> AppResult<LedgerEntry> {
    let head: Option<(i64, String)> = sqlx::query_as(
        r#"
        SELECT sequence, entry_hash FROM ledger_entries
        WHERE student_id = $1
        ORDER BY sequence DESC
        LIMIT 1
        "#,
    )
    .bind(entry.student_id)
    .fetch_optional(&mut *conn)
    .await?;

    let (sequence, prev_hash) = match head {
        Some((last, hash)) => (last + 1, hash),
        None => (1, GENESIS_HASH.to_string()),
    };

    let id = Uuid::new_v4();
    let created_at = Utc::now();
    let hash = entry_hash(&HashInput {
        prev_hash: &prev_hash,
        id,
        student_id: entry.student_id,
        sequence,
        actor_id: entry.actor_id,
        amount: entry.amount,
        transaction_type: entry.transaction_type,
        reason: &entry.reason,
        created_at,
    });

    let stored: LedgerEntry = sqlx::query_as(
        r#"
        INSERT INTO ledger_entries (
            id, student_id, sequence, actor_id, amount, reason, transaction_type,
            item_id, request_id, idempotency_key, prev_hash, entry_hash, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(entry.student_id)
    .bind(sequence)
    .bind(entry.actor_id)
    .bind(entry.amount)
    .bind(&entry.reason)
    .bind(entry.transaction_type)
    .bind(entry.item_id)
    .bind(entry.request_id)
    .bind(entry.idempotency_key)
    .bind(&prev_hash)
    .bind(&hash)
    .bind(created_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(stored)
}

pub async fn find_by_idempotency_key(
    conn: &mut SqliteConnection,
    key: Uuid,
) -> AppResult<Option<LedgerEntry>> {
    let entry = sqlx::query_as("SELECT * FROM ledger_entries WHERE idempotency_key = $1")
        .bind(key)
        .fetch_optional(conn)
        .await?;
    Ok(entry)
}

/// A student's entries, newest first
pub async fn history(
    conn: &mut SqliteConnection,
    student_id: Uuid,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<LedgerEntry>> {
    let entries = sqlx::query_as(
        r#"
        SELECT * FROM ledger_entries
        WHERE student_id = $1
        ORDER BY sequence DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(student_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}

/// A student's full chain, oldest first
pub async fn chain_for_student(
    conn: &mut SqliteConnection,
    student_id: Uuid,
) -> AppResult<Vec<LedgerEntry>> {
    let entries = sqlx::query_as("SELECT * FROM ledger_entries WHERE student_id = $1 ORDER BY sequence ASC")
        .bind(student_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
