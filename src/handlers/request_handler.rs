//! Request Handler
//!
//! The purchase request state machine. A request moves from `pending` to
//! `approved` or `denied` exactly once; approval runs the debit, ledger
//! entry and grant in the same transaction as the status change.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::{
    Coins, CoinEvent, DomainError, OperationContext, RequestStatus, ResolveAction, TransactionType,
};
use crate::error::AppResult;
use crate::notify::{NoopNotifier, Notifier};
use crate::store::requests::{self, NewPurchaseRequest};
use crate::store::{catalog, inventory, roster};

use super::purchase_handler::{settle_purchase, Settlement};
use super::{ResolveCommand, ResolveResult, SubmitPurchaseCommand, SubmitResult};

/// Handler for submitting and resolving purchase requests
pub struct RequestHandler {
    pool: SqlitePool,
    notifier: Arc<dyn Notifier>,
}

impl RequestHandler {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            notifier: Arc::new(NoopNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Submit a purchase request.
    ///
    /// Requests at or under the class's auto-approval threshold settle
    /// immediately; everything else waits in the teacher's queue.
    pub async fn submit(&self, command: SubmitPurchaseCommand, context: &OperationContext) -> AppResult<SubmitResult> {
        let mut tx = self.pool.begin().await?;

        let (student, class) = roster::lock_student_with_class(&mut *tx, command.student_id).await?;
        let item = catalog::require_purchasable(&mut *tx, command.item_id).await?;
        let cost = Coins::new(item.cost)?;

        if inventory::owns(&mut *tx, student.id, item.id).await? {
            return Err(DomainError::AlreadyOwned { item_id: item.id }.into());
        }
        if requests::pending_exists(&mut *tx, student.id, item.id).await? {
            return Err(DomainError::DuplicatePendingRequest { item_id: item.id }.into());
        }

        // Soft hold: coins already asked for by other pending requests.
        // Early rejection only; the debit at approval is authoritative.
        let held = requests::pending_total(&mut *tx, student.id).await?;
        let available = student.balance - held;
        if available < item.cost {
            tracing::warn!(
                student_id = %student.id,
                item_id = %item.id,
                cost = item.cost,
                balance = student.balance,
                held = held,
                "Purchase request rejected for insufficient available balance"
            );
            return Err(DomainError::insufficient_funds(item.cost, available.max(0)).into());
        }

        if !class.auto_approves(item.cost) {
            let request = requests::insert(
                &mut *tx,
                NewPurchaseRequest {
                    student_id: student.id,
                    item_id: item.id,
                    cost_snapshot: item.cost,
                    status: RequestStatus::Pending,
                    processed_by: None,
                },
            )
            .await?;
            tx.commit().await?;

            tracing::info!(
                request_id = %request.id,
                student_id = %student.id,
                item_id = %item.id,
                cost = item.cost,
                correlation_id = %context.correlation(),
                "Purchase request queued"
            );

            self.notifier.notify(CoinEvent::PurchaseRequested {
                request_id: request.id,
                student_id: student.id,
                item_id: item.id,
                cost: item.cost,
                requested_at: request.requested_at,
            });

            return Ok(SubmitResult {
                request,
                auto_approved: false,
                new_balance: None,
            });
        }

        let request = requests::insert(
            &mut *tx,
            NewPurchaseRequest {
                student_id: student.id,
                item_id: item.id,
                cost_snapshot: item.cost,
                status: RequestStatus::Approved,
                processed_by: Some(class.teacher_id),
            },
        )
        .await?;

        let (posting, _grant) = settle_purchase(
            &mut *tx,
            Settlement {
                student_id: student.id,
                item: &item,
                cost,
                actor_id: class.teacher_id,
                transaction_type: TransactionType::AutoApprovedPurchase,
                request_id: Some(request.id),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            student_id = %student.id,
            item_id = %item.id,
            cost = item.cost,
            new_balance = posting.new_balance,
            correlation_id = %context.correlation(),
            "Purchase request auto-approved"
        );

        let now = Utc::now();
        self.notifier.notify(CoinEvent::ItemPurchased {
            student_id: student.id,
            item_id: item.id,
            cost: item.cost,
            new_balance: posting.new_balance,
            request_id: Some(request.id),
            purchased_at: now,
        });
        self.notifier.notify(CoinEvent::PurchaseResolved {
            request_id: request.id,
            student_id: student.id,
            status: RequestStatus::Approved,
            processed_by: class.teacher_id,
            processed_at: now,
        });

        Ok(SubmitResult {
            request,
            auto_approved: true,
            new_balance: Some(posting.new_balance),
        })
    }

    /// Approve or deny a pending request.
    ///
    /// A request that is missing, already resolved, or outside the actor's
    /// classes fails with `RequestNotFound` and is left untouched. A failed
    /// approval (e.g. insufficient funds) rolls back and the request stays
    /// pending.
    pub async fn resolve(&self, command: ResolveCommand, context: &OperationContext) -> AppResult<ResolveResult> {
        let mut tx = self.pool.begin().await?;

        let request = requests::claim_pending(
            &mut *tx,
            command.request_id,
            command.actor_id,
            command.action.target_status(),
        )
        .await?
        .ok_or(DomainError::RequestNotFound(command.request_id))?;

        let new_balance = match command.action {
            ResolveAction::Deny => None,
            ResolveAction::Approve => {
                let item = catalog::fetch_item(&mut *tx, request.item_id)
                    .await?
                    .ok_or(DomainError::ItemNotFound(request.item_id))?;
                let cost = Coins::new(request.cost_snapshot)?;

                let (posting, _grant) = settle_purchase(
                    &mut *tx,
                    Settlement {
                        student_id: request.student_id,
                        item: &item,
                        cost,
                        actor_id: command.actor_id,
                        transaction_type: TransactionType::Purchase,
                        request_id: Some(request.id),
                    },
                )
                .await?;
                Some(posting.new_balance)
            }
        };

        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            student_id = %request.student_id,
            status = %request.status,
            actor_id = %command.actor_id,
            correlation_id = %context.correlation(),
            "Purchase request resolved"
        );

        let processed_at = request.processed_at.unwrap_or_else(Utc::now);
        if let Some(new_balance) = new_balance {
            self.notifier.notify(CoinEvent::ItemPurchased {
                student_id: request.student_id,
                item_id: request.item_id,
                cost: request.cost_snapshot,
                new_balance,
                request_id: Some(request.id),
                purchased_at: processed_at,
            });
        }
        self.notifier.notify(CoinEvent::PurchaseResolved {
            request_id: request.id,
            student_id: request.student_id,
            status: request.status,
            processed_by: command.actor_id,
            processed_at,
        });

        Ok(ResolveResult { request, new_balance })
    }
}
