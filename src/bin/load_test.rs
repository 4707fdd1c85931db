//! Load Testing Tool
//!
//! Fires concurrent purchases and deductions at one student and checks the
//! ledger afterwards.
//!
//! Run with: cargo run --bin load_test --release -- --operations 500 --items 40

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use uuid::Uuid;

use classroom_coins::domain::PurchaseMode;
use classroom_coins::handlers::{AdjustCommand, AdjustmentHandler, DirectPurchaseCommand, PurchaseHandler};
use classroom_coins::store::{catalog, roster};
use classroom_coins::{audit, db, AppError, Coins, ErrorKind, OperationContext};

const STARTING_BALANCE: i64 = 2_000;

#[derive(Debug, Clone, Copy)]
enum Operation {
    Buy(Uuid),
    Deduct(i64),
}

#[derive(Debug, Default)]
struct Tally {
    succeeded: u64,
    insufficient: u64,
    conflicts: u64,
    other_errors: u64,
}

impl Tally {
    fn record(&mut self, result: Result<(), AppError>) {
        match result {
            Ok(()) => self.succeeded += 1,
            Err(e) => match e.kind() {
                ErrorKind::InsufficientFunds => self.insufficient += 1,
                ErrorKind::Conflict => self.conflicts += 1,
                _ => {
                    eprintln!("Unexpected error: {e}");
                    self.other_errors += 1;
                }
            },
        }
    }
}

fn arg_or(args: &[String], flag: &str, default: usize) -> usize {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let operations = arg_or(&args, "--operations", 500);
    let item_count = arg_or(&args, "--items", 40).max(1);

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://load_test.db".to_string());

    println!("Load Test - {} concurrent operations over {} items", operations, item_count);
    println!("Connecting to {}...", database_url);

    let pool = db::connect_with(&database_url, 10, Duration::from_secs(30)).await?;
    db::migrate(&pool).await?;

    // Seed one direct-mode class with a single funded student
    let teacher_id = Uuid::new_v4();
    let mut conn = pool.acquire().await?;
    let class = roster::insert_class(&mut *conn, teacher_id, "Load test", None, PurchaseMode::Direct).await?;
    let student = roster::insert_student(&mut *conn, class.id, "Load test student").await?;

    let mut item_ids = Vec::with_capacity(item_count);
    for i in 0..item_count {
        let cost = Coins::new(rand::thread_rng().gen_range(5..=120))?;
        let item = catalog::insert_item(&mut *conn, &format!("Item {i}"), cost, true).await?;
        item_ids.push(item.id);
    }
    drop(conn);

    let mut context = OperationContext::new().with_source("load_test");
    let run_id = context.ensure_correlation_id();
    println!("Run id: {}", run_id);
    AdjustmentHandler::new(pool.clone())
        .execute(
            AdjustCommand::new(student.id, teacher_id, STARTING_BALANCE, "Starting balance"),
            &context,
        )
        .await?;

    // Workload is drawn up front; ThreadRng cannot cross an await
    let workload: Vec<Operation> = {
        let mut rng = rand::thread_rng();
        (0..operations)
            .map(|_| {
                if rng.gen_bool(0.7) {
                    Operation::Buy(item_ids[rng.gen_range(0..item_ids.len())])
                } else {
                    Operation::Deduct(-rng.gen_range(1..=150))
                }
            })
            .collect()
    };

    let purchases = Arc::new(PurchaseHandler::new(pool.clone()));
    let adjustments = Arc::new(AdjustmentHandler::new(pool.clone()));

    let start = Instant::now();
    let mut tasks = Vec::with_capacity(workload.len());
    for operation in workload {
        let purchases = purchases.clone();
        let adjustments = adjustments.clone();
        let context = context.clone();
        let student_id = student.id;
        tasks.push(tokio::spawn(async move {
            match operation {
                Operation::Buy(item_id) => purchases
                    .execute(DirectPurchaseCommand::new(student_id, item_id), &context)
                    .await
                    .map(|_| ()),
                Operation::Deduct(amount) => adjustments
                    .execute(AdjustCommand::new(student_id, teacher_id, amount, "Load test deduction"), &context)
                    .await
                    .map(|_| ()),
            }
        }));
    }

    let mut tally = Tally::default();
    for task in tasks {
        tally.record(task.await?);
    }
    let elapsed = start.elapsed();

    // Invariants
    let mut conn = pool.acquire().await?;
    let final_student = roster::fetch_student(&mut *conn, student.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Student disappeared"))?;
    let duplicate_grants: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM (SELECT 1 FROM inventory_grants GROUP BY student_id, item_id HAVING COUNT(*) > 1)",
    )
    .fetch_one(&mut *conn)
    .await?;
    let chain = audit::verify_student_chain(&mut *conn, student.id).await?;
    drop(conn);
    let reconciliation = audit::reconcile(&pool).await?;

    let rate = operations as f64 / elapsed.as_secs_f64();

    println!("\n=== Load Test Results ===");
    println!("Operations: {}", operations);
    println!("Succeeded: {}", tally.succeeded);
    println!("Insufficient funds: {}", tally.insufficient);
    println!("Conflicts (already owned): {}", tally.conflicts);
    println!("Other errors: {}", tally.other_errors);
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Rate: {:.0} ops/sec", rate);
    println!("Final balance: {}", final_student.balance);
    println!("Ledger entries verified: {}", chain.entries_checked);

    let healthy = final_student.balance >= 0
        && duplicate_grants == 0
        && chain.is_valid
        && reconciliation.is_consistent()
        && tally.other_errors == 0;

    pool.close().await;

    if !healthy {
        return Err(anyhow::anyhow!("Ledger invariants violated under load"));
    }
    println!("All invariants held");
    Ok(())
}
