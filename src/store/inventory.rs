//! Inventory Grant
//!
//! Ownership records. Uniqueness of `(student_id, item_id)` is the table's
//! primary key, so a second grant cannot be inserted no matter how two
//! purchases interleave.

use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::domain::{DomainError, InventoryGrant};
use crate::error::AppResult;

/// Record ownership. A duplicate is a no-op at the database and surfaces
/// as `AlreadyOwned`, so the enclosing purchase rolls back.
pub async fn grant(
    conn: &mut SqliteConnection,
    student_id: Uuid,
    item_id: Uuid,
    request_id: Option<Uuid>,
) -> AppResult<InventoryGrant> {
    let granted: Option<InventoryGrant> = sqlx::query_as(
        r#"
        INSERT INTO inventory_grants (student_id, item_id, request_id, granted_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (student_id, item_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(student_id)
    .bind(item_id)
    .bind(request_id)
    .bind(Utc::now())
    .fetch_optional(conn)
    .await?;

    granted.ok_or_else(|| DomainError::AlreadyOwned { item_id }.into())
}

pub async fn owns(conn: &mut SqliteConnection, student_id: Uuid, item_id: Uuid) -> AppResult<bool> {
    let owned: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM inventory_grants WHERE student_id = $1 AND item_id = $2)",
    )
    .bind(student_id)
    .bind(item_id)
    .fetch_one(conn)
    .await?;
    Ok(owned)
}

pub async fn for_student(conn: &mut SqliteConnection, student_id: Uuid) -> AppResult<Vec<InventoryGrant>> {
    let grants = sqlx::query_as(
        "SELECT * FROM inventory_grants WHERE student_id = $1 ORDER BY rowid ASC",
    )
    .bind(student_id)
    .fetch_all(conn)
    .await?;
    Ok(grants)
}
