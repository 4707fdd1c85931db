//! Database module
//!
//! Connection pool, migrations and schema verification.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::error::AppResult;

/// Open a pool configured from [`Config`]
pub async fn connect(config: &Config) -> AppResult<SqlitePool> {
    connect_with(
        &config.database_url,
        config.database_max_connections,
        config.busy_timeout(),
    )
    .await
}

/// Open a pool against `url`.
///
/// Foreign keys are enforced and the WAL journal is used so readers never
/// block the writer. `busy_timeout` bounds how long a transaction waits for
/// the write lock before it fails and rolls back.
pub async fn connect_with(
    url: &str,
    max_connections: u32,
    busy_timeout: Duration,
) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Apply the embedded migrations
pub async fn migrate(pool: &SqlitePool) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Simple connectivity check
pub async fn verify_connection(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &SqlitePool) -> Result<bool, sqlx::Error> {
    let required_tables = [
        "classes",
        "students",
        "catalog_items",
        "ledger_entries",
        "purchase_requests",
        "inventory_grants",
    ];

    for table in required_tables {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sqlite_master
                WHERE type = 'table' AND name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}
