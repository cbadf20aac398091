//! Trait abstraction for the account ledger.
//!
//! The ledger stores one opaque record per account and serializes writes
//! with optimistic concurrency: every commit names the version it was
//! computed from, and a commit against a newer version is refused.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account identifier (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountKey([u8; 32]);

impl AccountKey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from a slice. Returns `None` unless it is exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Stored account data with its version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Starts at 1 on creation, incremented by every commit.
    pub version: u64,
    pub data: Vec<u8>,
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger operation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No account under this key.
    AccountNotFound(AccountKey),
    /// An account already exists under this key.
    AccountExists(AccountKey),
    /// The account moved on since it was read.
    VersionConflict {
        account: AccountKey,
        expected: u64,
        actual: u64,
    },
    /// Storage I/O failed.
    Io(String),
    /// Stored record could not be decoded.
    Corrupt(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountNotFound(key) => write!(f, "Account not found: {}", key),
            Self::AccountExists(key) => write!(f, "Account already exists: {}", key),
            Self::VersionConflict {
                account,
                expected,
                actual,
            } => write!(
                f,
                "Version conflict on {}: expected {}, found {}",
                account, expected, actual
            ),
            Self::Io(msg) => write!(f, "Ledger I/O error: {}", msg),
            Self::Corrupt(msg) => write!(f, "Corrupt ledger record: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Host ledger holding multisig accounts.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Read the current record of an account.
    async fn get(&self, account: &AccountKey) -> LedgerResult<AccountRecord>;

    /// Create an account at version 1.
    async fn create(&self, account: &AccountKey, data: Vec<u8>) -> LedgerResult<()>;

    /// Replace an account's data if it is still at `expected_version`.
    ///
    /// Returns the new version.
    async fn commit(
        &self,
        account: &AccountKey,
        expected_version: u64,
        data: Vec<u8>,
    ) -> LedgerResult<u64>;

    /// All account keys, sorted.
    async fn accounts(&self) -> LedgerResult<Vec<AccountKey>>;
}
