//! wgr-runtime
//!
//! The Ledger Writer: applies engine plans to the record store.
//!
//! - every mutation is serialized in-process and journaled (intent, writes,
//!   commit)
//! - all derived records are computed before the first write
//! - settlement writes settled entries, then deficits, then removes the
//!   pending records

mod error;
mod views;
mod writer;

pub use error::RuntimeError;
pub use views::*;
pub use writer::{LedgerRuntime, RuntimeResult};
