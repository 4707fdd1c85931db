//! Store module
//!
//! Transaction-scoped persistence for the ledger tables. Every function takes
//! a `&mut SqliteConnection`, so callers decide the transaction boundary:
//! pass `&mut tx` to take part in a unit of work, or a pooled connection for
//! standalone reads.
//!
//! Balances change only through [`balance::post_entry`], which pairs the
//! conditional balance update with its ledger insert.

pub mod balance;
pub mod catalog;
pub mod inventory;
pub mod ledger;
pub mod requests;
pub mod roster;

pub use balance::{post_entry, NewLedgerEntry, Posting, BALANCE_FLOOR};
