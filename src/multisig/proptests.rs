//! Property-based tests for the multisig state machine
//!
//! Tests for:
//! - Sequence uniqueness across arbitrary create/vote/execute interleavings
//! - Status monotonicity: nothing ever returns to Pending
//! - At-most-once execution
//! - Approval discounting against the current owner set
//! - Rejected operations leave state untouched

use super::action::{Action, ActionError, ConfigAction, Invocation};
use super::audit::AuditKind;
use super::dispatcher::ActionExecutor;
use super::engine::Multisig;
use super::owner_set::{OwnerId, OwnerSet};
use super::proposal::ProposalStatus;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn owner(id: u8) -> OwnerId {
    OwnerId::new([id; 32])
}

struct Noop;

impl ActionExecutor for Noop {
    fn invoke(&mut self, _sequence: u64, _invocation: &Invocation) -> Result<(), ActionError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Op {
    CreateInvoke { actor: u8 },
    CreateConfig { actor: u8, subject: u8, threshold: u16 },
    Approve { actor: u8, sequence: u64 },
    Reject { actor: u8, sequence: u64 },
    Execute { actor: u8, sequence: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let actor = 1u8..=5;
    let sequence = 1u64..=8;
    prop_oneof![
        actor.clone().prop_map(|actor| Op::CreateInvoke { actor }),
        (actor.clone(), 1u8..=5, 1u16..=4).prop_map(|(actor, subject, threshold)| {
            Op::CreateConfig {
                actor,
                subject,
                threshold,
            }
        }),
        (actor.clone(), sequence.clone()).prop_map(|(actor, sequence)| Op::Approve { actor, sequence }),
        (actor.clone(), sequence.clone()).prop_map(|(actor, sequence)| Op::Reject { actor, sequence }),
        (actor, sequence).prop_map(|(actor, sequence)| Op::Execute { actor, sequence }),
    ]
}

fn initial() -> Multisig {
    Multisig::new(OwnerSet::new([owner(1), owner(2), owner(3)], 2).unwrap())
}

/// Apply `op`. Returns whether it was accepted.
fn apply(multisig: &mut Multisig, op: &Op) -> bool {
    match *op {
        Op::CreateInvoke { actor } => {
            let action = Action::Invoke(Invocation {
                target: "noop".to_string(),
                data: vec![actor],
            });
            multisig.create_proposal(owner(actor), action, None).is_ok()
        }
        Op::CreateConfig {
            actor,
            subject,
            threshold,
        } => {
            let change = if multisig.owners().is_owner(&owner(subject)) {
                ConfigAction::RemoveOwner {
                    owner: owner(subject),
                }
            } else {
                ConfigAction::AddOwner {
                    owner: owner(subject),
                }
            };
            let action = Action::Config(vec![change, ConfigAction::ChangeThreshold { threshold }]);
            multisig.create_proposal(owner(actor), action, None).is_ok()
        }
        Op::Approve { actor, sequence } => multisig.approve(sequence, owner(actor), None).is_ok(),
        Op::Reject { actor, sequence } => multisig.reject(sequence, owner(actor), None).is_ok(),
        Op::Execute { actor, sequence } => multisig.execute(sequence, owner(actor), &mut Noop).is_ok(),
    }
}

proptest! {
    /// Property: Sequences are unique and strictly increasing
    #[test]
    fn sequences_unique_and_increasing(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut multisig = initial();
        for op in &ops {
            apply(&mut multisig, op);
        }

        let sequences: Vec<u64> = multisig.proposals().iter().map(|p| p.sequence()).collect();
        let unique: BTreeSet<u64> = sequences.iter().copied().collect();
        prop_assert_eq!(unique.len(), sequences.len());
        prop_assert!(sequences.windows(2).all(|w| w[0] < w[1]));
        if let Some(first) = sequences.first() {
            prop_assert_eq!(*first, 1);
        }
        prop_assert_eq!(multisig.proposals().next_sequence(), sequences.len() as u64 + 1);
    }

    /// Property: Once a proposal leaves Pending it never returns
    #[test]
    fn status_is_monotonic(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut multisig = initial();
        let mut seen: BTreeMap<u64, ProposalStatus> = BTreeMap::new();

        for op in &ops {
            apply(&mut multisig, op);

            for proposal in multisig.proposals().iter() {
                let status = proposal.status(multisig.owners());
                if let Some(previous) = seen.get(&proposal.sequence()) {
                    if previous.is_terminal() {
                        prop_assert_eq!(*previous, status);
                    }
                }
                seen.insert(proposal.sequence(), status);
            }
        }
    }

    /// Property: A proposal is executed at most once
    #[test]
    fn execution_at_most_once(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut multisig = initial();
        for op in &ops {
            apply(&mut multisig, op);
        }

        let mut executions: BTreeMap<u64, usize> = BTreeMap::new();
        for entry in multisig.audit_log().entries() {
            if entry.kind == AuditKind::Executed {
                *executions.entry(entry.sequence).or_default() += 1;
            }
        }
        prop_assert!(executions.values().all(|&count| count == 1));
    }

    /// Property: Approval counts only include current owners
    #[test]
    fn approvals_discounted_against_current_owners(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut multisig = initial();
        for op in &ops {
            apply(&mut multisig, op);
        }

        let owners = multisig.owners();
        prop_assert!(usize::from(owners.threshold()) <= owners.len());
        for proposal in multisig.proposals().iter() {
            let expected = proposal.approvals().intersection(owners.owners()).count();
            prop_assert_eq!(proposal.approval_count(owners), expected);
            prop_assert!(proposal.approval_count(owners) <= owners.len());
            prop_assert!(proposal.approvals().is_disjoint(proposal.rejections()));
        }
    }

    /// Property: Rejected operations do not change state
    #[test]
    fn rejected_ops_leave_state(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut multisig = initial();
        for op in &ops {
            let before = multisig.clone();
            if !apply(&mut multisig, op) {
                prop_assert_eq!(&multisig, &before);
            }
        }
    }
}
