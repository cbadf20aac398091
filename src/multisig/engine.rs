//! Authorization engine.
//!
//! [`Multisig`] is the complete state of one multisig account: owner set,
//! proposals, per-owner request nonces and the audit log. Its operations
//! take an already-authenticated signer.
//!
//! [`AuthorizationEngine`] sits in front of it: it authenticates a
//! [`SignedRequest`] through an injected [`SignatureVerifier`], applies the
//! request to a draft copy of the state and swaps the draft in only when
//! every step succeeded.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::multisig::action::Action;
use crate::multisig::audit::{AuditKind, AuditLog};
use crate::multisig::dispatcher::{self, ActionExecutor, ExecutionEffect};
use crate::multisig::error::{MultisigError, MultisigResult};
use crate::multisig::owner_set::{OwnerId, OwnerSet};
use crate::multisig::proposal::{Proposal, ProposalStatus, ProposalStore};
use crate::multisig::request::{MultisigAddress, Request, SignedRequest};

/// Signature capability supplied by the host.
pub trait SignatureVerifier {
    /// Check `signature` by `signer` over `message`.
    fn verify(&self, signer: &OwnerId, message: &[u8], signature: &[u8]) -> bool;
}

/// Result of an accepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created {
        sequence: u64,
    },
    /// `approvals` and `threshold` are read from the committed state.
    Approved {
        sequence: u64,
        approvals: usize,
        threshold: u16,
        executable: bool,
    },
    Rejected {
        sequence: u64,
        status: ProposalStatus,
    },
    Executed {
        sequence: u64,
        effect: ExecutionEffect,
    },
}

/// State of one multisig account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multisig {
    owners: OwnerSet,
    proposals: ProposalStore,
    #[serde(default)]
    nonces: BTreeMap<OwnerId, u64>,
    #[serde(default)]
    audit: AuditLog,
}

impl Multisig {
    pub fn new(owners: OwnerSet) -> Self {
        Self {
            owners,
            proposals: ProposalStore::new(),
            nonces: BTreeMap::new(),
            audit: AuditLog::new(),
        }
    }

    pub fn owners(&self) -> &OwnerSet {
        &self.owners
    }

    pub fn proposals(&self) -> &ProposalStore {
        &self.proposals
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Nonce the owner's next signed request must carry.
    pub fn nonce(&self, owner: &OwnerId) -> u64 {
        self.nonces.get(owner).copied().unwrap_or(0)
    }

    pub fn get(&self, sequence: u64) -> MultisigResult<&Proposal> {
        self.proposals.get(sequence)
    }

    pub fn status(&self, sequence: u64) -> MultisigResult<ProposalStatus> {
        self.proposals.status(&self.owners, sequence)
    }

    /// Approvals counted against the current owner set.
    pub fn approval_count(&self, sequence: u64) -> MultisigResult<usize> {
        self.proposals.approval_count(&self.owners, sequence)
    }

    /// Whether proposal `sequence` is pending with enough current approvals.
    ///
    /// Recomputed on every call. False for unknown sequences.
    pub fn can_execute(&self, sequence: u64) -> bool {
        match self.proposals.get(sequence) {
            Ok(proposal) => {
                proposal.status(&self.owners) == ProposalStatus::Pending
                    && proposal.meets_threshold(&self.owners)
            }
            Err(_) => false,
        }
    }

    /// Create a proposal. Returns its sequence.
    pub fn create_proposal(
        &mut self,
        proposer: OwnerId,
        action: Action,
        memo: Option<String>,
    ) -> MultisigResult<u64> {
        if let Action::Config(actions) = &action {
            if actions.is_empty() {
                return Err(MultisigError::NoActions);
            }
        }

        let summary = action.to_string();
        let sequence = self.proposals.create(&self.owners, proposer, action)?;
        self.audit.record(sequence, proposer, AuditKind::Created, memo);

        info!(
            sequence,
            proposer = %proposer.short(),
            action = %summary,
            "Proposal created"
        );
        Ok(sequence)
    }

    /// Approve a pending proposal.
    pub fn approve(
        &mut self,
        sequence: u64,
        signer: OwnerId,
        memo: Option<String>,
    ) -> MultisigResult<usize> {
        self.proposals.approve(&self.owners, sequence, signer)?;
        self.audit.record(sequence, signer, AuditKind::Approved, memo);

        let approvals = self.approval_count(sequence)?;
        info!(
            sequence,
            owner = %signer.short(),
            approvals,
            threshold = self.owners.threshold(),
            "Proposal approved"
        );
        Ok(approvals)
    }

    /// Reject a pending proposal. Returns the resulting status.
    pub fn reject(
        &mut self,
        sequence: u64,
        signer: OwnerId,
        memo: Option<String>,
    ) -> MultisigResult<ProposalStatus> {
        let status = self.proposals.reject(&self.owners, sequence, signer)?;
        self.audit.record(sequence, signer, AuditKind::Rejected, memo);

        info!(
            sequence,
            owner = %signer.short(),
            status = %status,
            "Proposal rejected"
        );
        Ok(status)
    }

    /// Execute an approved proposal.
    pub fn execute<E: ActionExecutor + ?Sized>(
        &mut self,
        sequence: u64,
        caller: OwnerId,
        executor: &mut E,
    ) -> MultisigResult<ExecutionEffect> {
        let effect =
            dispatcher::execute(&mut self.owners, &mut self.proposals, sequence, executor)?;
        self.audit.record(sequence, caller, AuditKind::Executed, None);

        info!(
            sequence,
            caller = %caller.short(),
            effect = ?effect,
            "Proposal executed"
        );
        Ok(effect)
    }

    fn bump_nonce(&mut self, owner: OwnerId) {
        let next = self.nonce(&owner).saturating_add(1);
        self.nonces.insert(owner, next);
    }
}

/// Authenticates signed requests and applies them to a [`Multisig`].
#[derive(Debug, Clone)]
pub struct AuthorizationEngine<V> {
    verifier: V,
}

impl<V: SignatureVerifier> AuthorizationEngine<V> {
    pub fn new(verifier: V) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Check signer, nonce and signature without touching state.
    pub fn authenticate(
        &self,
        multisig: &Multisig,
        address: &MultisigAddress,
        signed: &SignedRequest,
    ) -> MultisigResult<()> {
        if !multisig.owners().is_owner(&signed.signer) {
            return Err(MultisigError::NotAnOwner(signed.signer));
        }

        let expected = multisig.nonce(&signed.signer);
        if signed.nonce != expected {
            return Err(MultisigError::InvalidNonce {
                owner: signed.signer,
                expected,
                got: signed.nonce,
            });
        }

        // An unencodable request cannot carry a valid signature
        let message = signed
            .message(address)
            .map_err(|_| MultisigError::InvalidSignature(signed.signer))?;
        if !self
            .verifier
            .verify(&signed.signer, &message, &signed.signature)
        {
            return Err(MultisigError::InvalidSignature(signed.signer));
        }
        Ok(())
    }

    /// Authenticate and apply `signed`.
    ///
    /// `multisig` is replaced only when the whole request succeeds, and the
    /// signer's nonce advances in the same step.
    pub fn process<E: ActionExecutor + ?Sized>(
        &self,
        multisig: &mut Multisig,
        address: &MultisigAddress,
        signed: &SignedRequest,
        executor: &mut E,
    ) -> MultisigResult<Outcome> {
        let result = self
            .authenticate(multisig, address, signed)
            .and_then(|()| {
                let mut draft = multisig.clone();
                let outcome = Self::apply(&mut draft, signed, executor)?;
                draft.bump_nonce(signed.signer);
                Ok((draft, outcome))
            });

        match result {
            Ok((draft, outcome)) => {
                *multisig = draft;
                Ok(outcome)
            }
            Err(e) => {
                warn!(
                    request = signed.request.name(),
                    signer = %signed.signer.short(),
                    error = %e,
                    "Request rejected"
                );
                Err(e)
            }
        }
    }

    fn apply<E: ActionExecutor + ?Sized>(
        draft: &mut Multisig,
        signed: &SignedRequest,
        executor: &mut E,
    ) -> MultisigResult<Outcome> {
        let signer = signed.signer;
        match &signed.request {
            Request::CreateProposal { action, memo } => {
                let sequence = draft.create_proposal(signer, action.clone(), memo.clone())?;
                Ok(Outcome::Created { sequence })
            }
            Request::Approve { sequence, memo } => {
                let approvals = draft.approve(*sequence, signer, memo.clone())?;
                Ok(Outcome::Approved {
                    sequence: *sequence,
                    approvals,
                    threshold: draft.owners().threshold(),
                    executable: draft.can_execute(*sequence),
                })
            }
            Request::Reject { sequence, memo } => {
                let status = draft.reject(*sequence, signer, memo.clone())?;
                Ok(Outcome::Rejected {
                    sequence: *sequence,
                    status,
                })
            }
            Request::Execute { sequence } => {
                let effect = draft.execute(*sequence, signer, executor)?;
                Ok(Outcome::Executed {
                    sequence: *sequence,
                    effect,
                })
            }
        }
    }
}
