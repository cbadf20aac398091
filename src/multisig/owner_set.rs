//! Owner set and approval threshold.
//!
//! The owner set is the single authoritative record of who may propose and
//! approve. It is only replaced wholesale through [`OwnerSet::apply_change`],
//! which enforces `1 <= threshold <= |owners|` on every observable state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::multisig::error::{MultisigError, MultisigResult};

/// Maximum number of owners a multisig may hold.
pub const MAX_OWNERS: usize = 10;

/// Owner identity (32-byte Ed25519 public key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerId([u8; 32]);

impl OwnerId {
    /// Create from a 32-byte array.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from a slice. Returns `None` unless it is exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    /// Get bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First four bytes as hex, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Error parsing a hex-encoded owner id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OwnerIdParseError {
    #[error("Invalid owner id hex: {0}")]
    Hex(String),

    #[error("Invalid owner id length: expected 32 bytes, got {0}")]
    Length(usize),
}

impl FromStr for OwnerId {
    type Err = OwnerIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|e| OwnerIdParseError::Hex(e.to_string()))?;
        Self::from_slice(&bytes).ok_or(OwnerIdParseError::Length(bytes.len()))
    }
}

/// Owners and approval threshold of a multisig.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSet {
    owners: BTreeSet<OwnerId>,
    threshold: u16,

    /// Number of executed config changes. Pending config proposals created
    /// under an older epoch are stale.
    #[serde(default)]
    config_epoch: u64,
}

impl OwnerSet {
    /// Create a validated owner set.
    ///
    /// Duplicate ids in `owners` are rejected rather than collapsed.
    pub fn new(owners: impl IntoIterator<Item = OwnerId>, threshold: u16) -> MultisigResult<Self> {
        let mut set = BTreeSet::new();
        for owner in owners {
            if !set.insert(owner) {
                return Err(MultisigError::DuplicateOwner(owner));
            }
        }
        Self::validate(&set, threshold)?;

        Ok(Self {
            owners: set,
            threshold,
            config_epoch: 0,
        })
    }

    /// Check whether `id` is a current owner.
    pub fn is_owner(&self, id: &OwnerId) -> bool {
        self.owners.contains(id)
    }

    /// Current approval threshold.
    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    /// Current owners.
    pub fn owners(&self) -> &BTreeSet<OwnerId> {
        &self.owners
    }

    /// Number of owners.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Always false for a validated set; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn config_epoch(&self) -> u64 {
        self.config_epoch
    }

    /// Count how many of `ids` are current owners.
    pub fn count_current<'a>(&self, ids: impl IntoIterator<Item = &'a OwnerId>) -> usize {
        ids.into_iter().filter(|id| self.owners.contains(id)).count()
    }

    /// Replace owners and threshold in one step.
    ///
    /// Either both fields change or neither does.
    pub fn apply_change(
        &mut self,
        new_owners: BTreeSet<OwnerId>,
        new_threshold: u16,
    ) -> MultisigResult<()> {
        Self::validate(&new_owners, new_threshold)?;

        self.owners = new_owners;
        self.threshold = new_threshold;
        self.config_epoch = self.config_epoch.saturating_add(1);
        Ok(())
    }

    fn validate(owners: &BTreeSet<OwnerId>, threshold: u16) -> MultisigResult<()> {
        if owners.is_empty() {
            return Err(MultisigError::EmptyOwnerSet);
        }
        if owners.len() > MAX_OWNERS {
            return Err(MultisigError::TooManyOwners {
                count: owners.len(),
                max: MAX_OWNERS,
            });
        }
        if threshold == 0 || usize::from(threshold) > owners.len() {
            return Err(MultisigError::InvalidThreshold {
                threshold,
                owners: owners.len(),
            });
        }
        Ok(())
    }
}
