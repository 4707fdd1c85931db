//! Purchase Handler
//!
//! Direct purchases, plus [`settle_purchase`]: the debit, ledger entry and
//! grant shared by every path that pays for an item.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::domain::{CatalogItem, Coins, CoinEvent, DomainError, InventoryGrant, OperationContext, PurchaseMode, TransactionType};
use crate::error::AppResult;
use crate::notify::{NoopNotifier, Notifier};
use crate::store::{self, catalog, inventory, roster, NewLedgerEntry, Posting};

use super::{DirectPurchaseCommand, PurchaseResult};

/// One item being paid for
#[derive(Debug, Clone)]
pub(crate) struct Settlement<'a> {
    pub student_id: Uuid,
    pub item: &'a CatalogItem,
    /// Price to charge: the live cost, or a request's snapshot
    pub cost: Coins,
    pub actor_id: Uuid,
    pub transaction_type: TransactionType,
    pub request_id: Option<Uuid>,
}

/// Debit, ledger entry and grant on `conn`.
///
/// The caller owns the transaction. Ownership is checked before any
/// balance mutation; the grant's primary key still rejects a duplicate that
/// slips past the check.
pub(crate) async fn settle_purchase(
    conn: &mut SqliteConnection,
    settlement: Settlement<'_>,
) -> AppResult<(Posting, InventoryGrant)> {
    let Settlement {
        student_id,
        item,
        cost,
        actor_id,
        transaction_type,
        request_id,
    } = settlement;

    if inventory::owns(&mut *conn, student_id, item.id).await? {
        return Err(DomainError::AlreadyOwned { item_id: item.id }.into());
    }

    let mut entry = NewLedgerEntry::debit(
        student_id,
        actor_id,
        cost,
        transaction_type,
        format!("Purchased {}", item.name),
    )
    .for_item(item.id);
    if let Some(request_id) = request_id {
        entry = entry.for_request(request_id);
    }

    let posting = store::post_entry(&mut *conn, entry).await?;
    let grant = inventory::grant(&mut *conn, student_id, item.id, request_id).await?;

    Ok((posting, grant))
}

/// Handler for immediate purchases
pub struct PurchaseHandler {
    pool: SqlitePool,
    notifier: Arc<dyn Notifier>,
}

impl PurchaseHandler {
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

    /// Execute the purchase in one transaction.
    ///
    /// Only classes in `direct` mode settle here; approval-mode classes go
    /// through [`RequestHandler::submit`](super::RequestHandler::submit).
    pub async fn execute(
        &self,
        command: DirectPurchaseCommand,
        context: &OperationContext,
    ) -> AppResult<PurchaseResult> {
        let mut tx = self.pool.begin().await?;

        let (_student, class) = roster::lock_student_with_class(&mut *tx, command.student_id).await?;
        if class.purchase_mode != PurchaseMode::Direct {
            return Err(DomainError::InvalidRequest(
                "Purchases in this class need teacher approval".to_string(),
            )
            .into());
        }
        let item = catalog::require_purchasable(&mut *tx, command.item_id).await?;
        let cost = Coins::new(item.cost)?;

        let (posting, _grant) = settle_purchase(
            &mut *tx,
            Settlement {
                student_id: command.student_id,
                item: &item,
                cost,
                actor_id: command.student_id,
                transaction_type: TransactionType::Purchase,
                request_id: None,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            student_id = %command.student_id,
            item_id = %item.id,
            cost = item.cost,
            new_balance = posting.new_balance,
            correlation_id = %context.correlation(),
            source = context.source.as_deref().unwrap_or("direct"),
            "Item purchased"
        );

        self.notifier.notify(CoinEvent::ItemPurchased {
            student_id: command.student_id,
            item_id: item.id,
            cost: item.cost,
            new_balance: posting.new_balance,
            request_id: None,
            purchased_at: Utc::now(),
        });

        Ok(PurchaseResult {
            student_id: command.student_id,
            item_id: item.id,
            cost: item.cost,
            new_balance: posting.new_balance,
            ledger_entry_id: posting.entry.id,
            request_id: None,
        })
    }
}
