//! Store Handler
//!
//! Single purchase entry point for every storefront. The class's purchase
//! mode picks the settlement path.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::{DomainError, OperationContext, PurchaseMode};
use crate::error::AppResult;
use crate::store::roster;

use super::{BuyOutcome, DirectPurchaseCommand, PurchaseHandler, RequestHandler, SubmitPurchaseCommand};

pub struct StoreHandler {
    pool: SqlitePool,
    direct: PurchaseHandler,
    requests: RequestHandler,
}

impl StoreHandler {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            direct: PurchaseHandler::new(pool.clone()),
            requests: RequestHandler::new(pool.clone()),
            pool,
        }
    }

    pub fn with_handlers(pool: SqlitePool, direct: PurchaseHandler, requests: RequestHandler) -> Self {
        Self { pool, direct, requests }
    }

    /// Buy an item: settle now in `direct` classes, queue a request otherwise
    pub async fn buy(&self, student_id: Uuid, item_id: Uuid, context: &OperationContext) -> AppResult<BuyOutcome> {
        let mode = self.purchase_mode(student_id).await?;

        match mode {
            PurchaseMode::Direct => self
                .direct
                .execute(DirectPurchaseCommand::new(student_id, item_id), context)
                .await
                .map(BuyOutcome::Purchased),
            PurchaseMode::Approval => self
                .requests
                .submit(SubmitPurchaseCommand::new(student_id, item_id), context)
                .await
                .map(BuyOutcome::Requested),
        }
    }

    async fn purchase_mode(&self, student_id: Uuid) -> AppResult<PurchaseMode> {
        let mut conn = self.pool.acquire().await?;
        let student = roster::fetch_student(&mut *conn, student_id)
            .await?
            .ok_or(DomainError::StudentNotFound(student_id))?;
        let class = roster::fetch_class(&mut *conn, student.class_id)
            .await?
            .ok_or(DomainError::ClassNotFound(student.class_id))?;
        Ok(class.purchase_mode)
    }
}
