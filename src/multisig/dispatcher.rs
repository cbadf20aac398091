//! Execution dispatcher.
//!
//! Applies an approved proposal's action as a single transition. Checks run
//! in a fixed order (existence, status, threshold) and the action is applied
//! only when all of them pass. A failing action leaves the proposal pending
//! and the owner set untouched.

use crate::multisig::action::{resolve_config, Action, ActionError, Invocation};
use crate::multisig::error::{MultisigError, MultisigResult};
use crate::multisig::owner_set::OwnerSet;
use crate::multisig::proposal::{ProposalStatus, ProposalStore};

/// Host-side handler for external invocations.
///
/// Effects must be staged so the caller can commit them together with the
/// proposal's status change, or drop them if the transition is abandoned.
pub trait ActionExecutor {
    fn invoke(&mut self, sequence: u64, invocation: &Invocation) -> Result<(), ActionError>;
}

/// Result of a successful execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEffect {
    /// The owner set was replaced.
    OwnersChanged { owners: usize, threshold: u16 },
    /// An invocation was accepted by the executor.
    Invoked { target: String },
}

/// Execute proposal `sequence`.
///
/// On success the proposal is `Executed`. On any error neither `owners` nor
/// `store` has been modified.
pub fn execute<E: ActionExecutor + ?Sized>(
    owners: &mut OwnerSet,
    store: &mut ProposalStore,
    sequence: u64,
    executor: &mut E,
) -> MultisigResult<ExecutionEffect> {
    let proposal = store.get(sequence)?;

    let status = proposal.status(owners);
    if status != ProposalStatus::Pending {
        return Err(MultisigError::ProposalNotPending { sequence, status });
    }

    if !proposal.meets_threshold(owners) {
        return Err(MultisigError::ThresholdNotMet {
            sequence,
            approvals: proposal.approval_count(owners),
            threshold: owners.threshold(),
        });
    }

    let effect = match proposal.action() {
        Action::Config(actions) => {
            let next = resolve_config(owners, actions)?;
            let effect = ExecutionEffect::OwnersChanged {
                owners: next.len(),
                threshold: next.threshold(),
            };
            store.mark_executed(sequence)?;
            *owners = next;
            effect
        }
        Action::Invoke(invocation) => {
            let target = invocation.target.clone();
            executor.invoke(sequence, invocation)?;
            store.mark_executed(sequence)?;
            ExecutionEffect::Invoked { target }
        }
    };

    Ok(effect)
}
