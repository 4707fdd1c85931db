//! Domain module
//!
//! Core domain types and business rules.

pub mod amount;
pub mod context;
pub mod error;
pub mod events;
pub mod models;

pub use amount::{Adjustment, Coins, CoinsError, MAX_COINS};
pub use context::OperationContext;
pub use error::{DomainError, ErrorKind};
pub use events::CoinEvent;
pub use models::{
    CatalogItem, Classroom, InventoryGrant, LedgerEntry, PurchaseMode, PurchaseRequest,
    RequestStatus, ResolveAction, Student, TransactionType,
};
