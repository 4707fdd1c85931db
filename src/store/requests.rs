//! Purchase request rows
//!
//! Requests are inserted once and updated once: [`claim_pending`] is a
//! conditional `UPDATE` that only matches a pending row, so two resolvers
//! racing for the same request cannot both win.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::domain::{DomainError, PurchaseRequest, RequestStatus};
use crate::error::{AppError, AppResult};

/// Fields of a request row about to be inserted
#[derive(Debug, Clone)]
pub struct NewPurchaseRequest {
    pub student_id: Uuid,
    pub item_id: Uuid,
    pub cost_snapshot: i64,
    pub status: RequestStatus,
    pub processed_by: Option<Uuid>,
}

pub async fn insert(conn: &mut SqliteConnection, request: NewPurchaseRequest) -> AppResult<PurchaseRequest> {
    let now = Utc::now();
    let processed_at: Option<DateTime<Utc>> = request.status.is_terminal().then_some(now);

    let result = sqlx::query_as(
        r#"
        INSERT INTO purchase_requests (
            id, student_id, item_id, cost_snapshot, status, requested_at, processed_at, processed_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(request.student_id)
    .bind(request.item_id)
    .bind(request.cost_snapshot)
    .bind(request.status)
    .bind(now)
    .bind(processed_at)
    .bind(request.processed_by)
    .fetch_one(conn)
    .await;

    match result {
        Ok(row) => Ok(row),
        // Partial unique index: one pending request per (student, item)
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(DomainError::DuplicatePendingRequest { item_id: request.item_id }.into())
        }
        Err(e) => Err(AppError::Database(e)),
    }
}

pub async fn fetch(conn: &mut SqliteConnection, request_id: Uuid) -> AppResult<Option<PurchaseRequest>> {
    let request = sqlx::query_as("SELECT * FROM purchase_requests WHERE id = $1")
        .bind(request_id)
        .fetch_optional(conn)
        .await?;
    Ok(request)
}

pub async fn pending_exists(conn: &mut SqliteConnection, student_id: Uuid, item_id: Uuid) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM purchase_requests
            WHERE student_id = $1 AND item_id = $2 AND status = 'pending'
        )
        "#,
    )
    .bind(student_id)
    .bind(item_id)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

/// Coins soft-held by the student's pending requests
pub async fn pending_total(conn: &mut SqliteConnection, student_id: Uuid) -> AppResult<i64> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(cost_snapshot), 0) FROM purchase_requests
        WHERE student_id = $1 AND status = 'pending'
        "#,
    )
    .bind(student_id)
    .fetch_one(conn)
    .await?;
    Ok(total)
}

/// Move a pending request the actor teaches into `status`.
///
/// Returns `None` when the request is missing, already resolved, or belongs
/// to a class the actor does not teach.
pub async fn claim_pending(
    conn: &mut SqliteConnection,
    request_id: Uuid,
    actor_id: Uuid,
    status: RequestStatus,
) -> AppResult<Option<PurchaseRequest>> {
    let claimed = sqlx::query_as(
        r#"
        UPDATE purchase_requests
        SET status = $1, processed_at = $2, processed_by = $3
        WHERE id = $4
          AND status = 'pending'
          AND student_id IN (
              SELECT s.id FROM students s
              JOIN classes c ON c.id = s.class_id
              WHERE c.teacher_id = $3
          )
        RETURNING *
        "#,
    )
    .bind(status)
    .bind(Utc::now())
    .bind(actor_id)
    .bind(request_id)
    .fetch_optional(conn)
    .await?;
    Ok(claimed)
}

/// Approval queue across every class the teacher runs, oldest first
pub async fn pending_for_teacher(conn: &mut SqliteConnection, teacher_id: Uuid) -> AppResult<Vec<PurchaseRequest>> {
    let requests = sqlx::query_as(
        r#"
        SELECT r.* FROM purchase_requests r
        JOIN students s ON s.id = r.student_id
        JOIN classes c ON c.id = s.class_id
        WHERE c.teacher_id = $1 AND r.status = 'pending'
        ORDER BY r.rowid ASC
        "#,
    )
    .bind(teacher_id)
    .fetch_all(conn)
    .await?;
    Ok(requests)
}

pub async fn for_student(conn: &mut SqliteConnection, student_id: Uuid) -> AppResult<Vec<PurchaseRequest>> {
    let requests = sqlx::query_as(
        "SELECT * FROM purchase_requests WHERE student_id = $1 ORDER BY rowid DESC",
    )
    .bind(student_id)
    .fetch_all(conn)
    .await?;
    Ok(requests)
}
