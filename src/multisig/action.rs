//! Proposal actions.
//!
//! An action is what a proposal does once it executes:
//! - `Config`: an ordered list of owner-set changes, validated as a whole
//! - `Invoke`: an opaque call handed to the host through an executor

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::multisig::error::{MultisigError, MultisigResult};
use crate::multisig::owner_set::{OwnerId, OwnerSet};

/// A single owner-set change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigAction {
    /// Add an owner.
    AddOwner { owner: OwnerId },
    /// Remove an owner.
    RemoveOwner { owner: OwnerId },
    /// Set a new approval threshold.
    ChangeThreshold { threshold: u16 },
}

/// External call carried by a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Name of the host target that handles the call.
    pub target: String,
    /// Opaque payload for the target.
    pub data: Vec<u8>,
}

/// Action applied when a proposal executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Change the multisig's own owners and threshold.
    Config(Vec<ConfigAction>),
    /// Invoke an external target.
    Invoke(Invocation),
}

impl Action {
    /// Whether this action targets the owner set itself.
    pub fn is_config(&self) -> bool {
        matches!(self, Action::Config(_))
    }
}

impl fmt::Display for ConfigAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigAction::AddOwner { owner } => write!(f, "add owner {}", owner),
            ConfigAction::RemoveOwner { owner } => write!(f, "remove owner {}", owner),
            ConfigAction::ChangeThreshold { threshold } => {
                write!(f, "change threshold to {}", threshold)
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Config(actions) => {
                let parts: Vec<String> = actions.iter().map(|a| a.to_string()).collect();
                write!(f, "config: {}", parts.join(", "))
            }
            Action::Invoke(invocation) => write!(
                f,
                "invoke {} ({} bytes)",
                invocation.target,
                invocation.data.len()
            ),
        }
    }
}

/// Failure of the host side of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("Unknown invocation target: {0}")]
    UnknownTarget(String),

    #[error("Invocation rejected by {target}: {reason}")]
    Rejected { target: String, reason: String },
}

/// Resolve config actions against the current owner set.
///
/// Actions apply in order to a draft, and the owner-set invariants are only
/// checked on the final result. That lets a removal and a threshold
/// reduction commit together. Returns the owner set that would result,
/// with its config epoch advanced. `current` is never modified.
pub fn resolve_config(current: &OwnerSet, actions: &[ConfigAction]) -> MultisigResult<OwnerSet> {
    if actions.is_empty() {
        return Err(MultisigError::NoActions);
    }

    let mut owners = current.owners().clone();
    let mut threshold = current.threshold();

    for action in actions {
        match action {
            ConfigAction::AddOwner { owner } => {
                if !owners.insert(*owner) {
                    return Err(MultisigError::DuplicateOwner(*owner));
                }
            }
            ConfigAction::RemoveOwner { owner } => {
                if !owners.remove(owner) {
                    return Err(MultisigError::NotAnOwner(*owner));
                }
            }
            ConfigAction::ChangeThreshold { threshold: new } => threshold = *new,
        }
    }

    let mut next = current.clone();
    next.apply_change(owners, threshold)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(id: u8) -> OwnerId {
        OwnerId::new([id; 32])
    }

    fn abc(threshold: u16) -> OwnerSet {
        OwnerSet::new([owner(1), owner(2), owner(3)], threshold).unwrap()
    }

    #[test]
    fn test_empty_actions_rejected() {
        assert_eq!(resolve_config(&abc(2), &[]), Err(MultisigError::NoActions));
    }

    #[test]
    fn test_remove_with_threshold_reduction() {
        let current = abc(3);
        // Removing alone would leave threshold 3 with 2 owners
        let alone = resolve_config(&current, &[ConfigAction::RemoveOwner { owner: owner(3) }]);
        assert!(matches!(alone, Err(MultisigError::InvalidThreshold { .. })));

        let bundled = resolve_config(
            &current,
            &[
                ConfigAction::RemoveOwner { owner: owner(3) },
                ConfigAction::ChangeThreshold { threshold: 2 },
            ],
        )
        .unwrap();
        assert_eq!(bundled.len(), 2);
        assert_eq!(bundled.threshold(), 2);
        assert_eq!(bundled.config_epoch(), current.config_epoch() + 1);
    }

    #[test]
    fn test_threshold_above_owner_count() {
        let result = resolve_config(&abc(2), &[ConfigAction::ChangeThreshold { threshold: 4 }]);
        assert_eq!(
            result,
            Err(MultisigError::InvalidThreshold {
                threshold: 4,
                owners: 3
            })
        );
    }

    #[test]
    fn test_duplicate_and_missing_owner() {
        let current = abc(2);
        assert_eq!(
            resolve_config(&current, &[ConfigAction::AddOwner { owner: owner(1) }]),
            Err(MultisigError::DuplicateOwner(owner(1)))
        );
        assert_eq!(
            resolve_config(&current, &[ConfigAction::RemoveOwner { owner: owner(9) }]),
            Err(MultisigError::NotAnOwner(owner(9)))
        );
    }

    #[test]
    fn test_remove_last_owner() {
        let single = OwnerSet::new([owner(1)], 1).unwrap();
        let result = resolve_config(&single, &[ConfigAction::RemoveOwner { owner: owner(1) }]);
        assert_eq!(result, Err(MultisigError::EmptyOwnerSet));
    }

    #[test]
    fn test_action_display() {
        let action = Action::Invoke(Invocation {
            target: "treasury".to_string(),
            data: vec![1, 2, 3],
        });
        assert_eq!(action.to_string(), "invoke treasury (3 bytes)");
        assert!(!action.is_config());

        let config = Action::Config(vec![ConfigAction::ChangeThreshold { threshold: 1 }]);
        assert_eq!(config.to_string(), "config: change threshold to 1");
        assert!(config.is_config());
    }
}
