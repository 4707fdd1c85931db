//! Catalog Lookup
//!
//! Read contract for store items: `id -> {cost, active} | NotFound`.
//! Catalog writes belong to the store-management side and exist here for
//! seeding.

use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::domain::{CatalogItem, Coins, DomainError};
use crate::error::AppResult;

pub async fn fetch_item(conn: &mut SqliteConnection, item_id: Uuid) -> AppResult<Option<CatalogItem>> {
    let item = sqlx::query_as("SELECT * FROM catalog_items WHERE id = $1")
        .bind(item_id)
        .fetch_optional(conn)
        .await?;
    Ok(item)
}

/// Fetch an item that can currently be bought
pub async fn require_purchasable(conn: &mut SqliteConnection, item_id: Uuid) -> AppResult<CatalogItem> {
    let item = fetch_item(conn, item_id)
        .await?
        .ok_or(DomainError::ItemNotFound(item_id))?;

    if !item.active {
        return Err(DomainError::ItemInactive(item_id).into());
    }
    Ok(item)
}

pub async fn insert_item(
    conn: &mut SqliteConnection,
    name: &str,
    cost: Coins,
    active: bool,
) -> AppResult<CatalogItem> {
    let item = sqlx::query_as(
        r#"
        INSERT INTO catalog_items (id, name, cost, active, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(cost.value())
    .bind(active)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(item)
}

/// Retire or re-list an item. Price is never edited in place.
pub async fn set_active(conn: &mut SqliteConnection, item_id: Uuid, active: bool) -> AppResult<()> {
    let rows = sqlx::query("UPDATE catalog_items SET active = $1 WHERE id = $2")
        .bind(active)
        .bind(item_id)
        .execute(conn)
        .await?
        .rows_affected();

    if rows == 0 {
        return Err(DomainError::ItemNotFound(item_id).into());
    }
    Ok(())
}
