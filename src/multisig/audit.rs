//! Append-only audit log of accepted multisig operations.
//!
//! Every state-changing request that is accepted appends exactly one entry.
//! Rejected requests leave no trace. Entries carry a log index instead of a
//! wall-clock timestamp so replaying the same requests yields the same log.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::multisig::owner_set::OwnerId;

/// Kind of accepted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditKind {
    Created,
    Approved,
    Rejected,
    Executed,
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuditKind::Created => "Created",
            AuditKind::Approved => "Approved",
            AuditKind::Rejected => "Rejected",
            AuditKind::Executed => "Executed",
        };
        f.write_str(label)
    }
}

/// Single audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the log, starting at 1.
    pub index: u64,
    /// Proposal the operation targeted.
    pub sequence: u64,
    /// Owner that signed the request.
    pub actor: OwnerId,
    pub kind: AuditKind,
    /// Free-form note attached by the signer.
    #[serde(default)]
    pub memo: Option<String>,
}

/// Append-only list of audit entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its index.
    pub fn record(
        &mut self,
        sequence: u64,
        actor: OwnerId,
        kind: AuditKind,
        memo: Option<String>,
    ) -> u64 {
        let index = self.entries.len() as u64 + 1;
        self.entries.push(AuditEntry {
            index,
            sequence,
            actor,
            kind,
            memo,
        });
        index
    }

    /// Entries in append order.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Query options for the audit log.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    pub kind: Option<AuditKind>,
    pub actor: Option<OwnerId>,
    pub sequence: Option<u64>,
    /// Limit number of results (most recent first).
    pub limit: Option<usize>,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            kind: None,
            actor: None,
            sequence: None,
            limit: Some(50),
        }
    }
}

/// Query the audit log with filters.
///
/// Returns entries newest first.
pub fn query_audit_log(entries: &[AuditEntry], query: &AuditQuery) -> Vec<AuditEntry> {
    let mut filtered: Vec<AuditEntry> = entries
        .iter()
        .filter(|entry| {
            if let Some(kind) = query.kind {
                if entry.kind != kind {
                    return false;
                }
            }

            if let Some(ref actor) = query.actor {
                if &entry.actor != actor {
                    return false;
                }
            }

            if let Some(sequence) = query.sequence {
                if entry.sequence != sequence {
                    return false;
                }
            }

            true
        })
        .cloned()
        .collect();

    filtered.sort_by(|a, b| b.index.cmp(&a.index));

    if let Some(limit) = query.limit {
        filtered.truncate(limit);
    }

    filtered
}

/// Format audit entries for terminal display.
pub fn format_audit_log(entries: &[AuditEntry]) -> String {
    if entries.is_empty() {
        return "No audit entries found.".to_string();
    }

    let mut output = String::from("Audit log\n\n");

    for entry in entries {
        output.push_str(&format!(
            "#{} {} proposal {} by {}..\n",
            entry.index,
            entry.kind,
            entry.sequence,
            entry.actor.short()
        ));
        if let Some(ref memo) = entry.memo {
            output.push_str(&format!("  memo: {}\n", memo));
        }
    }

    output.trim_end().to_string()
}
