//! Threshold multisig core.
//!
//! Synchronous, host-independent state machine:
//! - Owner set with an approval threshold
//! - Proposals keyed by a strictly increasing sequence
//! - Approval counting against the current owner set
//! - Atomic execution of approved actions
//! - Signed request processing with per-owner nonces

pub mod action;
pub mod audit;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod owner_set;
pub mod proposal;
pub mod request;
pub mod sequence;

#[cfg(test)]
mod proptests;

pub use action::{Action, ActionError, ConfigAction, Invocation};
pub use audit::{AuditEntry, AuditKind, AuditLog, AuditQuery};
pub use dispatcher::{ActionExecutor, ExecutionEffect};
pub use engine::{AuthorizationEngine, Multisig, Outcome, SignatureVerifier};
pub use error::{MultisigError, MultisigResult};
pub use owner_set::{OwnerId, OwnerSet, MAX_OWNERS};
pub use proposal::{Proposal, ProposalStatus, ProposalStore};
pub use request::{MultisigAddress, Request, SignedRequest};
