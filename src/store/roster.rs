//! Classes and students
//!
//! Roster management lives elsewhere; the ledger needs the student row
//! (balance, class) and the class settings (teacher of record,
//! auto-approval threshold, purchase mode).

use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::domain::{Classroom, DomainError, PurchaseMode, Student};
use crate::error::AppResult;

pub async fn insert_class(
    conn: &mut SqliteConnection,
    teacher_id: Uuid,
    name: &str,
    auto_approve_threshold: Option<i64>,
    purchase_mode: PurchaseMode,
) -> AppResult<Classroom> {
    let class = sqlx::query_as(
        r#"
        INSERT INTO classes (id, teacher_id, name, auto_approve_threshold, purchase_mode, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(teacher_id)
    .bind(name)
    .bind(auto_approve_threshold)
    .bind(purchase_mode)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(class)
}

pub async fn update_class_settings(
    conn: &mut SqliteConnection,
    class_id: Uuid,
    auto_approve_threshold: Option<i64>,
    purchase_mode: PurchaseMode,
) -> AppResult<Classroom> {
    let class: Option<Classroom> = sqlx::query_as(
        r#"
        UPDATE classes SET auto_approve_threshold = $1, purchase_mode = $2
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(auto_approve_threshold)
    .bind(purchase_mode)
    .bind(class_id)
    .fetch_optional(conn)
    .await?;

    class.ok_or_else(|| DomainError::ClassNotFound(class_id).into())
}

pub async fn fetch_class(conn: &mut SqliteConnection, class_id: Uuid) -> AppResult<Option<Classroom>> {
    let class = sqlx::query_as("SELECT * FROM classes WHERE id = $1")
        .bind(class_id)
        .fetch_optional(conn)
        .await?;
    Ok(class)
}

/// New students start with a zero balance and an empty ledger
pub async fn insert_student(conn: &mut SqliteConnection, class_id: Uuid, display_name: &str) -> AppResult<Student> {
    let now = Utc::now();
    let student = sqlx::query_as(
        r#"
        INSERT INTO students (id, class_id, display_name, balance, created_at, updated_at)
        VALUES ($1, $2, $3, 0, $4, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(class_id)
    .bind(display_name)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(student)
}

pub async fn fetch_student(conn: &mut SqliteConnection, student_id: Uuid) -> AppResult<Option<Student>> {
    let student = sqlx::query_as("SELECT * FROM students WHERE id = $1")
        .bind(student_id)
        .fetch_optional(conn)
        .await?;
    Ok(student)
}

/// Take the write lock and read the student row in one statement.
///
/// A no-op `UPDATE` as the first statement of a transaction makes it a
/// writer from the start, so concurrent units of work on the same database
/// queue on the lock (bounded by the busy timeout) instead of failing on a
/// stale read snapshot.
pub async fn lock_student(conn: &mut SqliteConnection, student_id: Uuid) -> AppResult<Option<Student>> {
    let student = sqlx::query_as("UPDATE students SET balance = balance WHERE id = $1 RETURNING *")
        .bind(student_id)
        .fetch_optional(conn)
        .await?;
    Ok(student)
}

/// Lock a student and load their class, requiring `teacher_id` to teach it.
/// A student in someone else's class is reported as not found.
pub async fn lock_student_for_teacher(
    conn: &mut SqliteConnection,
    student_id: Uuid,
    teacher_id: Uuid,
) -> AppResult<(Student, Classroom)> {
    let (student, class) = lock_student_with_class(conn, student_id).await?;

    if class.teacher_id != teacher_id {
        return Err(DomainError::StudentNotFound(student_id).into());
    }
    Ok((student, class))
}

/// Lock a student and load their class
pub async fn lock_student_with_class(
    conn: &mut SqliteConnection,
    student_id: Uuid,
) -> AppResult<(Student, Classroom)> {
    let student = lock_student(&mut *conn, student_id)
        .await?
        .ok_or(DomainError::StudentNotFound(student_id))?;
    let class = fetch_class(&mut *conn, student.class_id)
        .await?
        .ok_or(DomainError::ClassNotFound(student.class_id))?;
    Ok((student, class))
}
