//! Command Handlers module
//!
//! Handlers validate a command, run it as one database transaction through
//! the store layer, and publish events once it has committed.

mod adjustment_handler;
mod bulk_handler;
mod commands;
mod purchase_handler;
mod query_handler;
mod request_handler;
mod store_handler;


pub use adjustment_handler::AdjustmentHandler;
pub use bulk_handler::BulkResolveHandler;
pub use commands::*;
pub use purchase_handler::PurchaseHandler;
pub use query_handler::LedgerQueries;
pub use request_handler::RequestHandler;
pub use store_handler::StoreHandler;
