//! classroom_coins - ledger maintenance entry point
//!
//! Applies migrations, then audits every student's balance against the
//! ledger and verifies the hash chains. Exits non-zero on any drift so it
//! can gate deploys and run from cron.

use classroom_coins::{audit, db, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
fn init_tracing(log_format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "classroom_coins=debug,sqlx=warn".into());

    let registry = tracing_subscriber::registry().with(filter);
    if log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.log_format);

    tracing::info!(environment = %config.environment, "Starting classroom_coins ledger audit");
    if config.is_production() && config.log_format != "json" {
        tracing::warn!("Running in production with text logs; set LOG_FORMAT=json for log shipping");
    }

    let pool = db::connect(&config).await?;
    db::verify_connection(&pool).await?;
    tracing::info!("Database connected successfully");

    db::migrate(&pool).await?;

    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete after migrations");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    let reconciliation = audit::reconcile(&pool).await?;
    let chains = audit::verify_all_chains(&pool).await?;

    tracing::info!(
        students_checked = reconciliation.students_checked,
        drifting_students = reconciliation.drifts.len(),
        chains_checked = chains.students_checked,
        entries_checked = chains.entries_checked,
        broken_chains = chains.broken.len(),
        "Ledger audit finished"
    );

    pool.close().await;

    if !reconciliation.is_consistent() || !chains.is_valid() {
        return Err(anyhow::anyhow!(
            "Ledger audit failed: {} drifting balances, {} broken chains",
            reconciliation.drifts.len(),
            chains.broken.len()
        ));
    }

    tracing::info!("Ledger is consistent");
    Ok(())
}
