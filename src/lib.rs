//! Classroom Coins Library
//!
//! Coin ledger and purchase-transaction engine for the classroom app.
//! Re-exports modules for integration testing and the binaries.

pub mod audit;
pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod notify;
pub mod store;

mod error;

pub use config::{Config, LedgerSettings};
pub use domain::{Adjustment, Coins, CoinsError, DomainError, ErrorKind, OperationContext};
pub use domain::CoinEvent;
pub use error::{AppError, AppResult, ErrorResponse};
