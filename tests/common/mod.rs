//! Common test utilities
#![allow(dead_code)]

use std::time::Duration;

use classroom_coins::domain::{CatalogItem, Classroom, PurchaseMode, Student};
use classroom_coins::handlers::{AdjustCommand, AdjustmentHandler};
use classroom_coins::store::{catalog, roster};
use classroom_coins::{audit, db, Coins, OperationContext};
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

/// A migrated database in its own temp directory. Dropping it removes the
/// files, so keep it alive for the whole test.
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

/// Setup test database - fresh file per test, migrations applied
pub async fn setup_test_db() -> TestDb {
    setup_test_db_with_busy_timeout(Duration::from_secs(10)).await
}

/// Same as [`setup_test_db`], with a custom lock wait
pub async fn setup_test_db_with_busy_timeout(busy_timeout: Duration) -> TestDb {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("coins.db").display());

    let pool = db::connect_with(&url, 8, busy_timeout)
        .await
        .expect("Failed to connect to DB");
    db::migrate(&pool).await.expect("Failed to run migrations");

    TestDb { pool, _dir: dir }
}

pub fn ctx() -> OperationContext {
    OperationContext::new().with_correlation_id(Uuid::new_v4())
}

/// Class taught by a fresh teacher id
pub async fn seed_class(pool: &SqlitePool, auto_approve_threshold: Option<i64>, mode: PurchaseMode) -> Classroom {
    let mut conn = pool.acquire().await.unwrap();
    roster::insert_class(&mut *conn, Uuid::new_v4(), "Room 12", auto_approve_threshold, mode)
        .await
        .expect("Failed to seed class")
}

/// Student funded through a teacher gift, so balance and ledger agree
pub async fn seed_student(pool: &SqlitePool, class: &Classroom, balance: i64) -> Student {
    let student = {
        let mut conn = pool.acquire().await.unwrap();
        roster::insert_student(&mut *conn, class.id, "Ada")
            .await
            .expect("Failed to seed student")
    };

    if balance > 0 {
        AdjustmentHandler::new(pool.clone())
            .execute(
                AdjustCommand::new(student.id, class.teacher_id, balance, "Starting balance"),
                &ctx(),
            )
            .await
            .expect("Failed to fund student");
    }
    student
}

pub async fn seed_item(pool: &SqlitePool, cost: i64) -> CatalogItem {
    let mut conn = pool.acquire().await.unwrap();
    catalog::insert_item(&mut *conn, &format!("Item costing {cost}"), Coins::new(cost).unwrap(), true)
        .await
        .expect("Failed to seed item")
}

pub async fn balance_of(pool: &SqlitePool, student_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT balance FROM students WHERE id = $1")
        .bind(student_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn ledger_count(pool: &SqlitePool, student_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries WHERE student_id = $1")
        .bind(student_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn grant_count(pool: &SqlitePool, student_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM inventory_grants WHERE student_id = $1")
        .bind(student_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// balance == sum(ledger) for every student, and every chain verifies
pub async fn assert_ledger_consistent(pool: &SqlitePool) {
    let report = audit::reconcile(pool).await.unwrap();
    assert!(report.is_consistent(), "balance drift: {:?}", report.drifts);

    let chains = audit::verify_all_chains(pool).await.unwrap();
    assert!(chains.is_valid(), "broken chains: {:?}", chains.broken);
}

/// Make every insert into `table` fail, to force a rollback mid-transaction
pub async fn fail_inserts_into(pool: &SqlitePool, table: &str) {
    let sql = format!(
        "CREATE TRIGGER fail_{table}_insert BEFORE INSERT ON {table} \
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END"
    );
    sqlx::query(&sql).execute(pool).await.unwrap();
}

/// Await every spawned task, returning results in spawn order
pub async fn join_all<T>(tasks: Vec<tokio::task::JoinHandle<T>>) -> Vec<T> {
    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        results.push(task.await.expect("task panicked"));
    }
    results
}
