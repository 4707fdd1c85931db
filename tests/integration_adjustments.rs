//! Integration tests for teacher adjustments

use classroom_coins::domain::{PurchaseMode, TransactionType};
use classroom_coins::handlers::{AdjustCommand, AdjustmentHandler, LedgerQueries};
use classroom_coins::{audit, AppError, DomainError, ErrorKind, LedgerSettings};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_gift_credits_balance_and_appends_entry() {
    let db = common::setup_test_db().await;
    let class = common::seed_class(&db.pool, None, PurchaseMode::Approval).await;
    let student = common::seed_student(&db.pool, &class, 0).await;
    let handler = AdjustmentHandler::new(db.pool.clone());

    let result = assert_ok!(
        handler
            .execute(AdjustCommand::new(student.id, class.teacher_id, 25, "Spelling bee"), &common::ctx())
            .await
    );

    assert_eq!(result.amount, 25);
    assert_eq!(result.new_balance, 25);
    assert_eq!(result.transaction_type, TransactionType::TeacherGift);
    assert!(!result.replayed);

    let history = LedgerQueries::new(db.pool.clone()).history(student.id, None, 0).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].actor_id, class.teacher_id);
    assert_eq!(history[0].reason, "Spelling bee");
    common::assert_ledger_consistent(&db.pool).await;
}

#[tokio::test]
async fn test_deduction_beyond_balance_is_rejected() {
    // Deduct 30 from a balance of 20
    let db = common::setup_test_db().await;
    let class = common::seed_class(&db.pool, None, PurchaseMode::Approval).await;
    let student = common::seed_student(&db.pool, &class, 20).await;
    let handler = AdjustmentHandler::new(db.pool.clone());

    let err = assert_err!(
        handler
            .execute(AdjustCommand::new(student.id, class.teacher_id, -30, "Late homework"), &common::ctx())
            .await
    );

    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert!(matches!(
        err,
        AppError::Domain(DomainError::InsufficientFunds { required: 30, available: 20 })
    ));
    assert_eq!(common::balance_of(&db.pool, student.id).await, 20);
    // Only the starting gift
    assert_eq!(common::ledger_count(&db.pool, student.id).await, 1);
}

#[tokio::test]
async fn test_deduction_to_exactly_zero() {
    let db = common::setup_test_db().await;
    let class = common::seed_class(&db.pool, None, PurchaseMode::Approval).await;
    let student = common::seed_student(&db.pool, &class, 20).await;

    let result = AdjustmentHandler::new(db.pool.clone())
        .execute(AdjustCommand::new(student.id, class.teacher_id, -20, "Reset"), &common::ctx())
        .await
        .unwrap();

    assert_eq!(result.new_balance, 0);
    assert_eq!(result.transaction_type, TransactionType::TeacherDeduct);
    common::assert_ledger_consistent(&db.pool).await;
}

#[tokio::test]
async fn test_invalid_adjustments_are_validation_errors() {
    let db = common::setup_test_db().await;
    let class = common::seed_class(&db.pool, None, PurchaseMode::Approval).await;
    let student = common::seed_student(&db.pool, &class, 50).await;
    let handler = AdjustmentHandler::new(db.pool.clone()).with_settings(LedgerSettings {
        max_adjustment: 100,
        ..LedgerSettings::default()
    });

    let cases = [
        AdjustCommand::new(student.id, class.teacher_id, 0, "Nothing"),
        AdjustCommand::new(student.id, class.teacher_id, 101, "Too generous"),
        AdjustCommand::new(student.id, class.teacher_id, -101, "Too harsh"),
        AdjustCommand::new(student.id, class.teacher_id, i64::MIN, "Overflow"),
        AdjustCommand::new(student.id, class.teacher_id, 10, "   "),
    ];

    for command in cases {
        let err = handler.execute(command, &common::ctx()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{err}");
    }

    assert_eq!(common::balance_of(&db.pool, student.id).await, 50);
    assert_eq!(common::ledger_count(&db.pool, student.id).await, 1);
}

#[tokio::test]
async fn test_unknown_or_foreign_student_is_not_found() {
    let db = common::setup_test_db().await;
    let class = common::seed_class(&db.pool, None, PurchaseMode::Approval).await;
    let student = common::seed_student(&db.pool, &class, 10).await;
    let handler = AdjustmentHandler::new(db.pool.clone());

    let missing = handler
        .execute(AdjustCommand::new(Uuid::new_v4(), class.teacher_id, 5, "Ghost"), &common::ctx())
        .await
        .unwrap_err();
    assert!(missing.is_not_found());

    let other_teacher = Uuid::new_v4();
    let foreign = handler
        .execute(AdjustCommand::new(student.id, other_teacher, 5, "Not my class"), &common::ctx())
        .await
        .unwrap_err();
    assert!(matches!(foreign, AppError::Domain(DomainError::StudentNotFound(id)) if id == student.id));
    assert_eq!(common::balance_of(&db.pool, student.id).await, 10);
}

#[tokio::test]
async fn test_idempotency_key_replays_original_entry() {
    let db = common::setup_test_db().await;
    let class = common::seed_class(&db.pool, None, PurchaseMode::Approval).await;
    let student = common::seed_student(&db.pool, &class, 0).await;
    let handler = AdjustmentHandler::new(db.pool.clone());
    let key = Uuid::new_v4();

    let command = AdjustCommand::new(student.id, class.teacher_id, 15, "Field trip").with_idempotency_key(key);
    let first = handler.execute(command.clone(), &common::ctx()).await.unwrap();
    let second = handler.execute(command, &common::ctx()).await.unwrap();

    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(first.ledger_entry_id, second.ledger_entry_id);
    assert_eq!(common::balance_of(&db.pool, student.id).await, 15);
    assert_eq!(common::ledger_count(&db.pool, student.id).await, 1);
}

#[tokio::test]
async fn test_idempotency_key_with_different_amount_conflicts() {
    let db = common::setup_test_db().await;
    let class = common::seed_class(&db.pool, None, PurchaseMode::Approval).await;
    let student = common::seed_student(&db.pool, &class, 0).await;
    let handler = AdjustmentHandler::new(db.pool.clone());
    let key = Uuid::new_v4();

    handler
        .execute(
            AdjustCommand::new(student.id, class.teacher_id, 15, "Field trip").with_idempotency_key(key),
            &common::ctx(),
        )
        .await
        .unwrap();

    let err = handler
        .execute(
            AdjustCommand::new(student.id, class.teacher_id, 20, "Field trip").with_idempotency_key(key),
            &common::ctx(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(common::balance_of(&db.pool, student.id).await, 15);
}

#[tokio::test]
async fn test_ledger_entries_cannot_be_edited() {
    let db = common::setup_test_db().await;
    let class = common::seed_class(&db.pool, None, PurchaseMode::Approval).await;
    let student = common::seed_student(&db.pool, &class, 40).await;

    let update = sqlx::query("UPDATE ledger_entries SET amount = 1000 WHERE student_id = $1")
        .bind(student.id)
        .execute(&db.pool)
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM ledger_entries WHERE student_id = $1")
        .bind(student.id)
        .execute(&db.pool)
        .await;
    assert!(delete.is_err());

    common::assert_ledger_consistent(&db.pool).await;
}

#[tokio::test]
async fn test_audit_detects_tampered_entry() {
    let db = common::setup_test_db().await;
    let class = common::seed_class(&db.pool, None, PurchaseMode::Approval).await;
    let student = common::seed_student(&db.pool, &class, 40).await;
    AdjustmentHandler::new(db.pool.clone())
        .execute(AdjustCommand::new(student.id, class.teacher_id, -10, "Lost book"), &common::ctx())
        .await
        .unwrap();

    // Someone with direct database access bypasses the append-only guard
    sqlx::query("DROP TRIGGER ledger_entries_append_only_update")
        .execute(&db.pool)
        .await
        .unwrap();
    sqlx::query("UPDATE ledger_entries SET amount = -5 WHERE student_id = $1 AND sequence = 2")
        .bind(student.id)
        .execute(&db.pool)
        .await
        .unwrap();

    let reconciliation = audit::reconcile(&db.pool).await.unwrap();
    assert_eq!(reconciliation.drifts.len(), 1);
    assert_eq!(reconciliation.drifts[0].student_id, student.id);
    assert_eq!(reconciliation.drifts[0].difference(), -5);

    let mut conn = db.pool.acquire().await.unwrap();
    let chain = audit::verify_student_chain(&mut *conn, student.id).await.unwrap();
    assert!(!chain.is_valid);
    assert_eq!(chain.entries_checked, 2);
}
