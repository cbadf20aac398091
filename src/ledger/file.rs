//! File-backed ledger.
//!
//! One CBOR file per account under a root directory, named by the account
//! key in hex. Writes go to a uniquely named temporary file that is renamed
//! over the old record, so a crash never leaves a half-written account
//! behind.
//!
//! `create` and `commit` hold an exclusive lock on `<hex>.lock` for the whole
//! read-check-write. The lock is an OS file lock, so it also serializes
//! separate processes (and separate handles) sharing one directory. Reads
//! take no lock: the rename makes every record visible all at once.

use super::traits::*;
use crate::serialization::{from_cbor, to_cbor};
use async_trait::async_trait;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const RECORD_EXTENSION: &str = "cbor";
const LOCK_EXTENSION: &str = "lock";

/// Ledger persisted under a directory.
#[derive(Debug, Clone)]
pub struct FileLedger {
    root: PathBuf,
}

fn io_error(path: &Path, e: std::io::Error) -> LedgerError {
    LedgerError::Io(format!("{}: {}", path.display(), e))
}

impl FileLedger {
    /// Open a ledger rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, account: &AccountKey) -> PathBuf {
        self.root.join(format!("{}.{}", account, RECORD_EXTENSION))
    }

    fn lock_path(&self, account: &AccountKey) -> PathBuf {
        self.root.join(format!("{}.{}", account, LOCK_EXTENSION))
    }

    /// Run blocking file work off the async runtime.
    async fn blocking<T, F>(&self, work: F) -> LedgerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&FileLedger) -> LedgerResult<T> + Send + 'static,
    {
        let ledger = self.clone();
        tokio::task::spawn_blocking(move || work(&ledger))
            .await
            .map_err(|e| LedgerError::Io(format!("ledger task failed: {}", e)))?
    }

    /// Exclusive lock on one account. Released when the file is dropped.
    fn lock_account(&self, account: &AccountKey) -> LedgerResult<File> {
        fs::create_dir_all(&self.root).map_err(|e| io_error(&self.root, e))?;

        let path = self.lock_path(account);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;
        file.lock().map_err(|e| io_error(&path, e))?;
        Ok(file)
    }

    fn read_record(&self, account: &AccountKey) -> LedgerResult<Option<AccountRecord>> {
        let path = self.record_path(account);
        match fs::read(&path) {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes = bytes.len(), "Read ledger record");
                let record =
                    from_cbor(&bytes).map_err(|e| LedgerError::Corrupt(e.to_string()))?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    /// Caller must hold the account lock.
    fn write_record(&self, account: &AccountKey, record: &AccountRecord) -> LedgerResult<()> {
        let path = self.record_path(account);
        let bytes = to_cbor(record).map_err(|e| LedgerError::Corrupt(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(&self.root).map_err(|e| io_error(&self.root, e))?;
        tmp.write_all(&bytes).map_err(|e| io_error(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| io_error(tmp.path(), e))?;
        tmp.persist(&path).map_err(|e| io_error(&path, e.error))?;

        debug!(
            path = %path.display(),
            version = record.version,
            bytes = bytes.len(),
            "Wrote ledger record"
        );
        Ok(())
    }

    fn create_locked(&self, account: &AccountKey, data: Vec<u8>) -> LedgerResult<()> {
        let _lock = self.lock_account(account)?;
        if self.read_record(account)?.is_some() {
            return Err(LedgerError::AccountExists(*account));
        }
        self.write_record(account, &AccountRecord { version: 1, data })
    }

    fn commit_locked(
        &self,
        account: &AccountKey,
        expected_version: u64,
        data: Vec<u8>,
    ) -> LedgerResult<u64> {
        let _lock = self.lock_account(account)?;
        let current = self
            .read_record(account)?
            .ok_or(LedgerError::AccountNotFound(*account))?;

        if current.version != expected_version {
            return Err(LedgerError::VersionConflict {
                account: *account,
                expected: expected_version,
                actual: current.version,
            });
        }

        let record = AccountRecord {
            version: current.version + 1,
            data,
        };
        self.write_record(account, &record)?;
        Ok(record.version)
    }

    fn list_accounts(&self) -> LedgerResult<Vec<AccountKey>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.root, e)),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error(&self.root, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let key = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| hex::decode(stem).ok())
                .and_then(|bytes| AccountKey::from_slice(&bytes));
            if let Some(key) = key {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl Ledger for FileLedger {
    async fn get(&self, account: &AccountKey) -> LedgerResult<AccountRecord> {
        let account = *account;
        self.blocking(move |ledger| {
            ledger
                .read_record(&account)?
                .ok_or(LedgerError::AccountNotFound(account))
        })
        .await
    }

    async fn create(&self, account: &AccountKey, data: Vec<u8>) -> LedgerResult<()> {
        let account = *account;
        self.blocking(move |ledger| ledger.create_locked(&account, data))
            .await
    }

    async fn commit(
        &self,
        account: &AccountKey,
        expected_version: u64,
        data: Vec<u8>,
    ) -> LedgerResult<u64> {
        let account = *account;
        self.blocking(move |ledger| ledger.commit_locked(&account, expected_version, data))
            .await
    }

    async fn accounts(&self) -> LedgerResult<Vec<AccountKey>> {
        self.blocking(|ledger| ledger.list_accounts()).await
    }
}
