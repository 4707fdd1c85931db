//! Ledger queries
//!
//! Read side for dashboards and student views. Reads run outside any write
//! transaction and may be stale by the time they are shown.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::config::LedgerSettings;
use crate::domain::{DomainError, InventoryGrant, LedgerEntry, PurchaseRequest};
use crate::error::AppResult;
use crate::store::{inventory, ledger, requests, roster};

pub struct LedgerQueries {
    pool: SqlitePool,
    settings: LedgerSettings,
}

impl LedgerQueries {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            settings: LedgerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: LedgerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub async fn balance(&self, student_id: Uuid) -> AppResult<i64> {
        let mut conn = self.pool.acquire().await?;
        let student = roster::fetch_student(&mut *conn, student_id)
            .await?
            .ok_or(DomainError::StudentNotFound(student_id))?;
        Ok(student.balance)
    }

    /// Balance minus coins held by pending requests, never below zero
    pub async fn available_balance(&self, student_id: Uuid) -> AppResult<i64> {
        let mut conn = self.pool.acquire().await?;
        let student = roster::fetch_student(&mut *conn, student_id)
            .await?
            .ok_or(DomainError::StudentNotFound(student_id))?;
        let held = requests::pending_total(&mut *conn, student_id).await?;
        Ok((student.balance - held).max(0))
    }

    /// Newest entries first. `limit` is clamped to the configured page size.
    pub async fn history(&self, student_id: Uuid, limit: Option<i64>, offset: i64) -> AppResult<Vec<LedgerEntry>> {
        let page_limit = self.settings.ledger_page_limit.max(1);
        let limit = limit.unwrap_or(page_limit).clamp(1, page_limit);
        let offset = offset.max(0);

        let mut conn = self.pool.acquire().await?;
        ledger::history(&mut *conn, student_id, limit, offset).await
    }

    pub async fn pending_for_teacher(&self, teacher_id: Uuid) -> AppResult<Vec<PurchaseRequest>> {
        let mut conn = self.pool.acquire().await?;
        requests::pending_for_teacher(&mut *conn, teacher_id).await
    }

    pub async fn requests_for_student(&self, student_id: Uuid) -> AppResult<Vec<PurchaseRequest>> {
        let mut conn = self.pool.acquire().await?;
        requests::for_student(&mut *conn, student_id).await
    }

    pub async fn inventory(&self, student_id: Uuid) -> AppResult<Vec<InventoryGrant>> {
        let mut conn = self.pool.acquire().await?;
        inventory::for_student(&mut *conn, student_id).await
    }
}
