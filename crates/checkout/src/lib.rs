//! Cart-to-order checkout workflow.
//!
//! The orchestrator drives a purchase through a fixed sequence: snapshot
//! the cart, validate it against live stock, create the order, reduce
//! stock line by line, clear the cart. Stock reduction is the only step
//! that can half-complete, and a failure there compensates by cancelling
//! the order, which restores the reduced lines.
//!
//! Cancellation is also exposed directly for completed orders.

pub mod error;
pub mod factory;
pub mod ledger;
pub mod orchestrator;
pub mod snapshot;
pub mod state;
pub mod validator;

pub use error::{CheckoutError, Result, StockIssue};
pub use factory::{Cancellation, OrderFactory};
pub use ledger::StockLedger;
pub use orchestrator::{CheckoutOrchestrator, CheckoutReceipt};
pub use snapshot::{CartSnapshot, SnapshotBuilder, SnapshotLine};
pub use state::CheckoutState;
