//! Commit history kept for the lifetime of the process.

pub mod ledger;

pub use ledger::{CommitLedger, CommitRecord, DEFAULT_RECENT_LIMIT, LEDGER_CAPACITY};
