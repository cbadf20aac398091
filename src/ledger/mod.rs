//! Host ledger abstraction.
//!
//! - `Ledger` trait with versioned, compare-and-swap commits
//! - `MemoryLedger` for tests and embedding
//! - `FileLedger` for the operator CLI

pub mod file;
pub mod mock;
pub mod traits;

pub use file::FileLedger;
pub use mock::MemoryLedger;
pub use traits::{AccountKey, AccountRecord, Ledger, LedgerError, LedgerResult};
