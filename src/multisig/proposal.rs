//! Proposal store.
//!
//! Owns every proposal of a multisig and the approvals recorded against it.
//! Approval and rejection sets hold raw ids. They are never rewritten when
//! the owner set changes; removed owners are discounted whenever votes are
//! counted, via [`OwnerSet::count_current`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::multisig::action::Action;
use crate::multisig::error::{MultisigError, MultisigResult};
use crate::multisig::owner_set::{OwnerId, OwnerSet};
use crate::multisig::sequence::SequenceCounter;

/// Lifecycle status of a proposal.
///
/// `Pending` is the only non-terminal status. `Stale` is never stored: it is
/// reported for pending config proposals created under an older owner set.
///
/// `Rejected` is stored, and only a rejection vote sets it. An owner-set
/// change that leaves a proposal unreachable does not reject it: the
/// proposal stays `Pending` and open to votes, since a rejecting owner may
/// still switch to approve or a later change may lower the threshold again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Pending,
    Executed,
    Rejected,
    Stale,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProposalStatus::Pending)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Executed => "executed",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Stale => "stale",
        };
        f.write_str(label)
    }
}

/// A proposed action awaiting approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    sequence: u64,
    proposer: OwnerId,
    action: Action,
    approvals: BTreeSet<OwnerId>,
    #[serde(default)]
    rejections: BTreeSet<OwnerId>,
    status: ProposalStatus,

    /// Owner-set epoch at creation.
    #[serde(default)]
    config_epoch: u64,
}

impl Proposal {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn proposer(&self) -> &OwnerId {
        &self.proposer
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Raw approval set, including owners that have since been removed.
    pub fn approvals(&self) -> &BTreeSet<OwnerId> {
        &self.approvals
    }

    /// Raw rejection set, including owners that have since been removed.
    pub fn rejections(&self) -> &BTreeSet<OwnerId> {
        &self.rejections
    }

    pub fn config_epoch(&self) -> u64 {
        self.config_epoch
    }

    /// Status as observed against the current owner set.
    pub fn status(&self, owners: &OwnerSet) -> ProposalStatus {
        if self.status == ProposalStatus::Pending
            && self.action.is_config()
            && self.config_epoch < owners.config_epoch()
        {
            return ProposalStatus::Stale;
        }
        self.status
    }

    /// Approvals from current owners.
    pub fn approval_count(&self, owners: &OwnerSet) -> usize {
        owners.count_current(&self.approvals)
    }

    /// Rejections from current owners.
    pub fn rejection_count(&self, owners: &OwnerSet) -> usize {
        owners.count_current(&self.rejections)
    }

    /// Whether current-owner approvals reach the current threshold.
    pub fn meets_threshold(&self, owners: &OwnerSet) -> bool {
        self.approval_count(owners) >= usize::from(owners.threshold())
    }

    /// Whether enough current owners rejected that the threshold can no
    /// longer be reached.
    fn is_blocked(&self, owners: &OwnerSet) -> bool {
        let cutoff = owners.len() - usize::from(owners.threshold());
        self.rejection_count(owners) > cutoff
    }
}

/// Proposals of one multisig, keyed by sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProposalStore {
    sequence: SequenceCounter,
    proposals: BTreeMap<u64, Proposal>,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending proposal. The proposer's approval is recorded.
    pub fn create(
        &mut self,
        owners: &OwnerSet,
        proposer: OwnerId,
        action: Action,
    ) -> MultisigResult<u64> {
        if !owners.is_owner(&proposer) {
            return Err(MultisigError::NotAnOwner(proposer));
        }

        let sequence = self.sequence.next()?;
        self.proposals.insert(
            sequence,
            Proposal {
                sequence,
                proposer,
                action,
                approvals: BTreeSet::from([proposer]),
                rejections: BTreeSet::new(),
                status: ProposalStatus::Pending,
                config_epoch: owners.config_epoch(),
            },
        );
        Ok(sequence)
    }

    pub fn get(&self, sequence: u64) -> MultisigResult<&Proposal> {
        self.proposals
            .get(&sequence)
            .ok_or(MultisigError::NotFound(sequence))
    }

    /// Record an approval. A prior rejection by the same owner is withdrawn.
    pub fn approve(
        &mut self,
        owners: &OwnerSet,
        sequence: u64,
        signer: OwnerId,
    ) -> MultisigResult<()> {
        let proposal = self.vote_target(owners, sequence, &signer)?;
        if proposal.approvals.contains(&signer) {
            return Err(MultisigError::AlreadyApproved {
                sequence,
                owner: signer,
            });
        }

        proposal.rejections.remove(&signer);
        proposal.approvals.insert(signer);
        Ok(())
    }

    /// Record a rejection. A prior approval by the same owner is withdrawn.
    ///
    /// Returns the resulting status, which becomes `Rejected` once the
    /// remaining owners could no longer reach the threshold. The check runs
    /// against the owner set current at this vote.
    pub fn reject(
        &mut self,
        owners: &OwnerSet,
        sequence: u64,
        signer: OwnerId,
    ) -> MultisigResult<ProposalStatus> {
        let proposal = self.vote_target(owners, sequence, &signer)?;
        if proposal.rejections.contains(&signer) {
            return Err(MultisigError::AlreadyRejected {
                sequence,
                owner: signer,
            });
        }

        proposal.approvals.remove(&signer);
        proposal.rejections.insert(signer);
        if proposal.is_blocked(owners) {
            proposal.status = ProposalStatus::Rejected;
        }
        Ok(proposal.status)
    }

    /// Approvals from current owners.
    pub fn approval_count(&self, owners: &OwnerSet, sequence: u64) -> MultisigResult<usize> {
        Ok(self.get(sequence)?.approval_count(owners))
    }

    /// Status as observed against the current owner set.
    pub fn status(&self, owners: &OwnerSet, sequence: u64) -> MultisigResult<ProposalStatus> {
        Ok(self.get(sequence)?.status(owners))
    }

    /// Flip a pending proposal to `Executed`.
    pub(crate) fn mark_executed(&mut self, sequence: u64) -> MultisigResult<()> {
        let proposal = self
            .proposals
            .get_mut(&sequence)
            .ok_or(MultisigError::NotFound(sequence))?;
        proposal.status = ProposalStatus::Executed;
        Ok(())
    }

    /// All proposals in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    /// Proposals still open for votes under the current owner set.
    pub fn pending<'a>(&'a self, owners: &'a OwnerSet) -> impl Iterator<Item = &'a Proposal> {
        self.iter()
            .filter(move |p| p.status(owners) == ProposalStatus::Pending)
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// Sequence the next created proposal will receive.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.peek()
    }

    fn vote_target(
        &mut self,
        owners: &OwnerSet,
        sequence: u64,
        signer: &OwnerId,
    ) -> MultisigResult<&mut Proposal> {
        let proposal = self
            .proposals
            .get_mut(&sequence)
            .ok_or(MultisigError::NotFound(sequence))?;
        if !owners.is_owner(signer) {
            return Err(MultisigError::NotAnOwner(*signer));
        }
        let status = proposal.status(owners);
        if status != ProposalStatus::Pending {
            return Err(MultisigError::ProposalNotPending { sequence, status });
        }
        Ok(proposal)
    }
}
