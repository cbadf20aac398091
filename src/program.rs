//! Multisig program: the engine bound to a ledger.
//!
//! Each submitted request is one ledger transition:
//! 1. Read the account and its version
//! 2. Authenticate and apply the request to the decoded state
//! 3. Commit the new state against the version read in step 1
//!
//! A request that fails at any step leaves the stored account untouched.
//! Concurrent writers lose with `VersionConflict` and may resubmit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info};

use crate::crypto::derive_address;
use crate::ledger::{AccountKey, Ledger, LedgerError};
use crate::multisig::{
    ActionError, ActionExecutor, AuthorizationEngine, Invocation, Multisig, MultisigAddress,
    MultisigError, Outcome, OwnerId, OwnerSet, SignatureVerifier, SignedRequest,
};
use crate::serialization::{from_cbor, to_cbor, SerializationError};

/// Current account layout version.
pub const ACCOUNT_SCHEMA_VERSION: u32 = 1;

/// Invocation accepted by an executed proposal, waiting for the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub sequence: u64,
    pub target: String,
    pub data: Vec<u8>,
}

/// Persisted multisig account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigAccount {
    pub schema_version: u32,
    pub address: MultisigAddress,
    pub creator: OwnerId,
    pub create_key: [u8; 32],
    pub multisig: Multisig,

    /// Invocations released by executed proposals, oldest first.
    #[serde(default)]
    pub outbox: Vec<DispatchRecord>,
}

/// Program layer errors.
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error(transparent)]
    Multisig(#[from] MultisigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error("Stored account {stored} does not match requested address {requested}")]
    AddressMismatch {
        stored: MultisigAddress,
        requested: MultisigAddress,
    },
}

pub type ProgramResult<T> = Result<T, ProgramError>;

/// Stages invocations for configured targets into the account outbox.
struct Outbox<'a> {
    targets: &'a BTreeSet<String>,
    staged: Vec<DispatchRecord>,
}

impl<'a> Outbox<'a> {
    fn new(targets: &'a BTreeSet<String>) -> Self {
        Self {
            targets,
            staged: Vec::new(),
        }
    }
}

impl ActionExecutor for Outbox<'_> {
    fn invoke(&mut self, sequence: u64, invocation: &Invocation) -> Result<(), ActionError> {
        if !self.targets.contains(&invocation.target) {
            return Err(ActionError::UnknownTarget(invocation.target.clone()));
        }
        self.staged.push(DispatchRecord {
            sequence,
            target: invocation.target.clone(),
            data: invocation.data.clone(),
        });
        Ok(())
    }
}

fn account_key(address: &MultisigAddress) -> AccountKey {
    AccountKey::new(*address.as_bytes())
}

/// Multisig engine bound to a ledger.
pub struct MultisigProgram<L, V> {
    ledger: L,
    engine: AuthorizationEngine<V>,
    targets: BTreeSet<String>,
}

impl<L: Ledger, V: SignatureVerifier> MultisigProgram<L, V> {
    pub fn new(ledger: L, verifier: V) -> Self {
        Self {
            ledger,
            engine: AuthorizationEngine::new(verifier),
            targets: BTreeSet::new(),
        }
    }

    /// Accept invocations for these targets.
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets.extend(targets.into_iter().map(Into::into));
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn targets(&self) -> &BTreeSet<String> {
        &self.targets
    }

    /// Create a multisig account. Returns its address.
    pub async fn initialize(
        &self,
        creator: OwnerId,
        owners: Vec<OwnerId>,
        threshold: u16,
        create_key: [u8; 32],
    ) -> ProgramResult<MultisigAddress> {
        let owner_set = OwnerSet::new(owners, threshold)?;
        let address = derive_address(&creator, &create_key);

        let account = MultisigAccount {
            schema_version: ACCOUNT_SCHEMA_VERSION,
            address,
            creator,
            create_key,
            multisig: Multisig::new(owner_set),
            outbox: Vec::new(),
        };
        let bytes = to_cbor(&account)?;
        self.ledger.create(&account_key(&address), bytes).await?;

        info!(
            multisig = %address,
            creator = %creator.short(),
            owners = account.multisig.owners().len(),
            threshold,
            "Multisig initialized"
        );
        Ok(address)
    }

    /// Read the current account state.
    pub async fn load(&self, address: &MultisigAddress) -> ProgramResult<MultisigAccount> {
        Ok(self.load_versioned(address).await?.0)
    }

    /// Nonce the owner's next request against `address` must carry.
    pub async fn nonce(&self, address: &MultisigAddress, owner: &OwnerId) -> ProgramResult<u64> {
        Ok(self.load(address).await?.multisig.nonce(owner))
    }

    /// Addresses of all accounts in the ledger.
    pub async fn list(&self) -> ProgramResult<Vec<MultisigAddress>> {
        let keys = self.ledger.accounts().await?;
        Ok(keys
            .into_iter()
            .map(|key| MultisigAddress::new(*key.as_bytes()))
            .collect())
    }

    /// Authenticate, apply and commit one signed request.
    pub async fn submit(
        &self,
        address: &MultisigAddress,
        signed: &SignedRequest,
    ) -> ProgramResult<Outcome> {
        let (mut account, version) = self.load_versioned(address).await?;

        let mut outbox = Outbox::new(&self.targets);
        let outcome = self
            .engine
            .process(&mut account.multisig, address, signed, &mut outbox)?;
        account.outbox.extend(outbox.staged);

        let bytes = to_cbor(&account)?;
        let committed = self
            .ledger
            .commit(&account_key(address), version, bytes)
            .await?;

        info!(
            multisig = %address,
            request = signed.request.name(),
            signer = %signed.signer.short(),
            version = committed,
            "Request committed"
        );
        Ok(outcome)
    }

    /// Invocations waiting for the host, oldest first.
    pub async fn outbox(&self, address: &MultisigAddress) -> ProgramResult<Vec<DispatchRecord>> {
        Ok(self.load(address).await?.outbox)
    }

    /// Drop delivered invocations up to and including `up_to_sequence`.
    ///
    /// Returns the removed records. Nothing is committed when none match.
    pub async fn ack_dispatch(
        &self,
        address: &MultisigAddress,
        up_to_sequence: u64,
    ) -> ProgramResult<Vec<DispatchRecord>> {
        let (mut account, version) = self.load_versioned(address).await?;

        let (acked, remaining): (Vec<_>, Vec<_>) = account
            .outbox
            .into_iter()
            .partition(|record| record.sequence <= up_to_sequence);
        account.outbox = remaining;
        if acked.is_empty() {
            return Ok(acked);
        }

        let bytes = to_cbor(&account)?;
        let committed = self
            .ledger
            .commit(&account_key(address), version, bytes)
            .await?;

        info!(
            multisig = %address,
            up_to_sequence,
            acked = acked.len(),
            remaining = account.outbox.len(),
            version = committed,
            "Dispatch acknowledged"
        );
        Ok(acked)
    }

    async fn load_versioned(
        &self,
        address: &MultisigAddress,
    ) -> ProgramResult<(MultisigAccount, u64)> {
        let record = self.ledger.get(&account_key(address)).await?;
        let account: MultisigAccount = from_cbor(&record.data)?;
        if account.address != *address {
            return Err(ProgramError::AddressMismatch {
                stored: account.address,
                requested: *address,
            });
        }

        debug!(multisig = %address, version = record.version, "Loaded account");
        Ok((account, record.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Ed25519Verifier, OwnerKeypair};
    use crate::ledger::{AccountRecord, LedgerResult, MemoryLedger};
    use crate::multisig::{Action, ProposalStatus, Request};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Ledger that lands a competing record just before the next commit.
    #[derive(Default)]
    struct InterleavedLedger {
        inner: MemoryLedger,
        competing: Mutex<Option<Vec<u8>>>,
    }

    #[async_trait]
    impl Ledger for InterleavedLedger {
        async fn get(&self, account: &AccountKey) -> LedgerResult<AccountRecord> {
            self.inner.get(account).await
        }

        async fn create(&self, account: &AccountKey, data: Vec<u8>) -> LedgerResult<()> {
            self.inner.create(account, data).await
        }

        async fn commit(
            &self,
            account: &AccountKey,
            expected_version: u64,
            data: Vec<u8>,
        ) -> LedgerResult<u64> {
            let competing = self.competing.lock().unwrap().take();
            if let Some(competing) = competing {
                self.inner
                    .commit(account, expected_version, competing)
                    .await?;
            }
            self.inner.commit(account, expected_version, data).await
        }

        async fn accounts(&self) -> LedgerResult<Vec<AccountKey>> {
            self.inner.accounts().await
        }
    }

    struct Fixture {
        program: MultisigProgram<MemoryLedger, Ed25519Verifier>,
        keys: Vec<OwnerKeypair>,
        address: MultisigAddress,
    }

    async fn fixture(threshold: u16) -> Fixture {
        let keys: Vec<OwnerKeypair> = (0..3).map(|_| OwnerKeypair::generate().unwrap()).collect();
        let program = MultisigProgram::new(MemoryLedger::new(), Ed25519Verifier)
            .with_targets(["treasury"]);
        let address = program
            .initialize(
                keys[0].owner_id(),
                keys.iter().map(|k| k.owner_id()).collect(),
                threshold,
                [7; 32],
            )
            .await
            .unwrap();
        Fixture {
            program,
            keys,
            address,
        }
    }

    async fn submit(f: &Fixture, signer: usize, request: Request) -> ProgramResult<Outcome> {
        let key = &f.keys[signer];
        let nonce = f.program.nonce(&f.address, &key.owner_id()).await?;
        let signed = key.sign_request(&f.address, nonce, request)?;
        f.program.submit(&f.address, &signed).await
    }

    fn invoke(target: &str) -> Action {
        Action::Invoke(Invocation {
            target: target.to_string(),
            data: vec![1, 2],
        })
    }

    #[tokio::test]
    async fn test_initialize_twice() {
        let f = fixture(2).await;
        let again = f
            .program
            .initialize(
                f.keys[0].owner_id(),
                vec![f.keys[0].owner_id()],
                1,
                [7; 32],
            )
            .await;
        assert!(matches!(
            again,
            Err(ProgramError::Ledger(LedgerError::AccountExists(_)))
        ));
    }

    #[tokio::test]
    async fn test_initialize_invalid_threshold() {
        let program = MultisigProgram::new(MemoryLedger::new(), Ed25519Verifier);
        let owner = OwnerId::new([1; 32]);
        let result = program.initialize(owner, vec![owner], 2, [0; 32]).await;
        assert!(matches!(
            result,
            Err(ProgramError::Multisig(MultisigError::InvalidThreshold { .. }))
        ));
        assert!(program.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_execute_stages_outbox() {
        let f = fixture(2).await;
        submit(
            &f,
            0,
            Request::CreateProposal {
                action: invoke("treasury"),
                memo: None,
            },
        )
        .await
        .unwrap();
        submit(&f, 1, Request::Approve { sequence: 1, memo: None })
            .await
            .unwrap();
        submit(&f, 2, Request::Execute { sequence: 1 })
            .await
            .unwrap();

        let account = f.program.load(&f.address).await.unwrap();
        assert_eq!(
            account.outbox,
            vec![DispatchRecord {
                sequence: 1,
                target: "treasury".to_string(),
                data: vec![1, 2],
            }]
        );
        assert_eq!(
            account.multisig.status(1).unwrap(),
            ProposalStatus::Executed
        );
    }

    #[tokio::test]
    async fn test_unknown_target_not_committed() {
        let f = fixture(1).await;
        submit(
            &f,
            0,
            Request::CreateProposal {
                action: invoke("elsewhere"),
                memo: None,
            },
        )
        .await
        .unwrap();

        let version_before = f
            .program
            .ledger()
            .get(&account_key(&f.address))
            .await
            .unwrap()
            .version;
        let result = submit(&f, 0, Request::Execute { sequence: 1 }).await;
        assert!(matches!(
            result,
            Err(ProgramError::Multisig(MultisigError::UnderlyingActionFailed(
                ActionError::UnknownTarget(_)
            )))
        ));

        let record = f
            .program
            .ledger()
            .get(&account_key(&f.address))
            .await
            .unwrap();
        assert_eq!(record.version, version_before);
        let account: MultisigAccount = from_cbor(&record.data).unwrap();
        assert_eq!(account.multisig.status(1).unwrap(), ProposalStatus::Pending);
        assert!(account.outbox.is_empty());
    }

    #[tokio::test]
    async fn test_replayed_nonce_rejected() {
        let f = fixture(2).await;
        let key = &f.keys[0];

        // Two requests signed against the same nonce: only one can land
        let first = key
            .sign_request(
                &f.address,
                0,
                Request::CreateProposal {
                    action: invoke("treasury"),
                    memo: None,
                },
            )
            .unwrap();
        let second = key
            .sign_request(
                &f.address,
                0,
                Request::CreateProposal {
                    action: invoke("treasury"),
                    memo: Some("dup".to_string()),
                },
            )
            .unwrap();

        f.program.submit(&f.address, &first).await.unwrap();
        let result = f.program.submit(&f.address, &second).await;
        assert!(matches!(
            result,
            Err(ProgramError::Multisig(MultisigError::InvalidNonce { .. }))
        ));
        assert_eq!(
            f.program.load(&f.address).await.unwrap().multisig.proposals().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_load_wrong_address() {
        let f = fixture(1).await;
        let record = f
            .program
            .ledger()
            .get(&account_key(&f.address))
            .await
            .unwrap();
        let other = MultisigAddress::new([0xee; 32]);
        f.program
            .ledger()
            .put_record(account_key(&other), record)
            .await;

        assert!(matches!(
            f.program.load(&other).await,
            Err(ProgramError::AddressMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_version_conflict_leaves_state() {
        let keys: Vec<OwnerKeypair> = (0..3).map(|_| OwnerKeypair::generate().unwrap()).collect();
        let program = MultisigProgram::new(InterleavedLedger::default(), Ed25519Verifier);
        let address = program
            .initialize(
                keys[0].owner_id(),
                keys.iter().map(|k| k.owner_id()).collect(),
                2,
                [3; 32],
            )
            .await
            .unwrap();
        let key = account_key(&address);

        // Owner 0's proposal, computed off to the side against version 1
        let side = MultisigProgram::new(MemoryLedger::new(), Ed25519Verifier);
        side.ledger()
            .put_record(key, program.ledger().get(&key).await.unwrap())
            .await;
        let first = keys[0]
            .sign_request(
                &address,
                0,
                Request::CreateProposal {
                    action: invoke("treasury"),
                    memo: None,
                },
            )
            .unwrap();
        side.submit(&address, &first).await.unwrap();
        let competing = side.ledger().get(&key).await.unwrap().data;
        *program.ledger().competing.lock().unwrap() = Some(competing.clone());

        // Owner 1 read version 1 too, so its commit must lose
        let second = keys[1]
            .sign_request(
                &address,
                0,
                Request::CreateProposal {
                    action: invoke("treasury"),
                    memo: Some("second".to_string()),
                },
            )
            .unwrap();
        let result = program.submit(&address, &second).await;
        assert!(matches!(
            result,
            Err(ProgramError::Ledger(LedgerError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            }))
        ));

        let record = program.ledger().get(&key).await.unwrap();
        assert_eq!(record.version, 2);
        assert_eq!(record.data, competing);
        let account = program.load(&address).await.unwrap();
        assert_eq!(account.multisig.proposals().len(), 1);
        assert_eq!(account.multisig.nonce(&keys[1].owner_id()), 0);

        // Resubmitting the same request lands on the fresh state
        let outcome = program.submit(&address, &second).await.unwrap();
        assert_eq!(outcome, Outcome::Created { sequence: 2 });
        assert_eq!(program.ledger().get(&key).await.unwrap().version, 3);
    }

    #[tokio::test]
    async fn test_ack_dispatch_drains_outbox() {
        let f = fixture(1).await;
        for _ in 0..3 {
            submit(
                &f,
                0,
                Request::CreateProposal {
                    action: invoke("treasury"),
                    memo: None,
                },
            )
            .await
            .unwrap();
        }
        for sequence in 1..=3 {
            submit(&f, 1, Request::Execute { sequence }).await.unwrap();
        }

        let pending = f.program.outbox(&f.address).await.unwrap();
        let sequences: Vec<u64> = pending.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);

        let acked = f.program.ack_dispatch(&f.address, 2).await.unwrap();
        assert_eq!(acked, pending[..2].to_vec());
        assert_eq!(f.program.outbox(&f.address).await.unwrap(), pending[2..].to_vec());

        // Nothing left at or below 2: no commit
        let version = f
            .program
            .ledger()
            .get(&account_key(&f.address))
            .await
            .unwrap()
            .version;
        assert!(f.program.ack_dispatch(&f.address, 2).await.unwrap().is_empty());
        assert_eq!(
            f.program
                .ledger()
                .get(&account_key(&f.address))
                .await
                .unwrap()
                .version,
            version
        );

        f.program.ack_dispatch(&f.address, u64::MAX).await.unwrap();
        assert!(f.program.outbox(&f.address).await.unwrap().is_empty());
        // Executed proposals are unaffected
        let account = f.program.load(&f.address).await.unwrap();
        assert_eq!(account.multisig.status(3).unwrap(), ProposalStatus::Executed);
    }
}
