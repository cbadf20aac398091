//! Multisig engine errors.

use thiserror::Error;

use crate::multisig::action::ActionError;
use crate::multisig::owner_set::OwnerId;
use crate::multisig::proposal::ProposalStatus;

/// Error returned by any rejected multisig operation.
///
/// A rejected operation never leaves partial writes behind, so every
/// variant describes a request that had no effect on state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error("Signer is not an owner of the multisig: {0}")]
    NotAnOwner(OwnerId),

    #[error("Proposal not found: {0}")]
    NotFound(u64),

    #[error("Owner {owner} already approved proposal {sequence}")]
    AlreadyApproved { sequence: u64, owner: OwnerId },

    #[error("Owner {owner} already rejected proposal {sequence}")]
    AlreadyRejected { sequence: u64, owner: OwnerId },

    #[error("Proposal {sequence} is not pending (status: {status})")]
    ProposalNotPending {
        sequence: u64,
        status: ProposalStatus,
    },

    #[error("Threshold not met for proposal {sequence}: {approvals}/{threshold} approvals")]
    ThresholdNotMet {
        sequence: u64,
        approvals: usize,
        threshold: u16,
    },

    #[error("Invalid threshold {threshold} for {owners} owners")]
    InvalidThreshold { threshold: u16, owners: usize },

    #[error("Owner set cannot be empty")]
    EmptyOwnerSet,

    #[error("Owner is already part of the multisig: {0}")]
    DuplicateOwner(OwnerId),

    #[error("Owner set exceeds maximum size: {count} > {max}")]
    TooManyOwners { count: usize, max: usize },

    #[error("No actions provided for the config change")]
    NoActions,

    /// The sequence counter reached `u64::MAX`. Fatal for this multisig.
    #[error("Sequence counter exhausted")]
    SequenceExhausted,

    #[error("Invalid signature from {0}")]
    InvalidSignature(OwnerId),

    #[error("Invalid nonce for {owner}: expected {expected}, got {got}")]
    InvalidNonce {
        owner: OwnerId,
        expected: u64,
        got: u64,
    },

    #[error("Underlying action failed: {0}")]
    UnderlyingActionFailed(#[from] ActionError),
}

/// Result type for multisig operations.
pub type MultisigResult<T> = Result<T, MultisigError>;
