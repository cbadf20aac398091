//! In-memory ledger for tests and embedding.

use super::traits::*;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory ledger. Clones share the same accounts.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    accounts: Arc<Mutex<BTreeMap<AccountKey, AccountRecord>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite an account record (for test setup).
    pub async fn put_record(&self, account: AccountKey, record: AccountRecord) {
        self.accounts.lock().await.insert(account, record);
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn get(&self, account: &AccountKey) -> LedgerResult<AccountRecord> {
        self.accounts
            .lock()
            .await
            .get(account)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(*account))
    }

    async fn create(&self, account: &AccountKey, data: Vec<u8>) -> LedgerResult<()> {
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(account) {
            return Err(LedgerError::AccountExists(*account));
        }
        accounts.insert(*account, AccountRecord { version: 1, data });
        Ok(())
    }

    async fn commit(
        &self,
        account: &AccountKey,
        expected_version: u64,
        data: Vec<u8>,
    ) -> LedgerResult<u64> {
        let mut accounts = self.accounts.lock().await;
        let record = accounts
            .get_mut(account)
            .ok_or(LedgerError::AccountNotFound(*account))?;

        if record.version != expected_version {
            return Err(LedgerError::VersionConflict {
                account: *account,
                expected: expected_version,
                actual: record.version,
            });
        }

        record.version += 1;
        record.data = data;
        Ok(record.version)
    }

    async fn accounts(&self) -> LedgerResult<Vec<AccountKey>> {
        Ok(self.accounts.lock().await.keys().copied().collect())
    }
}
