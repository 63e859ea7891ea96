//! Configuration audit shown to the machine authority
//!
//! Issues found here never change evaluation results. They point the authority
//! at configuration that will make mints fail for everyone else.

use crate::allowlist::{duplicate_entries, Allowlists};
use crate::guards::GuardKind;
use crate::types::EligibilityGroup;
use serde::Serialize;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ConfigIssue {
    /// Group has an allowList guard but no list was supplied
    AllowlistMissing { label: String },
    /// Supplied list hashes to a different root than the guard stores
    MerkleRootMismatch {
        label: String,
        configured: String,
        computed: String,
    },
    DuplicateAllowlistEntries { label: String, entries: Vec<String> },
    /// Freeze guards need their escrow initialized before the first mint
    FreezeEscrowRequired { label: String, guard: GuardKind },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllowlistMissing { label } => {
                write!(f, "Group {label}: allowList guard configured but no allowlist supplied")
            }
            Self::MerkleRootMismatch { label, configured, computed } => write!(
                f,
                "Group {label}: allowlist merkle root {computed} does not match configured root {configured}"
            ),
            Self::DuplicateAllowlistEntries { label, entries } => write!(
                f,
                "Group {label}: {} duplicate allowlist entries ({})",
                entries.len(),
                entries.join(", ")
            ),
            Self::FreezeEscrowRequired { label, guard } => write!(
                f,
                "Group {label}: {guard:?} requires the freeze escrow to be initialized"
            ),
        }
    }
}

fn encode_root(root: &[u8; 32]) -> String {
    bs58::encode(root).into_string()
}

/// Inspect every group's configuration and log what is found
pub fn audit_configuration(groups: &[EligibilityGroup], allowlists: &Allowlists) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    for group in groups {
        let label = &group.label;

        if let Some(allow_list) = &group.guards.allow_list {
            match (allowlists.get(label), allowlists.merkle_root(label)) {
                (Some(entries), Some(computed)) => {
                    if computed != allow_list.merkle_root {
                        issues.push(ConfigIssue::MerkleRootMismatch {
                            label: label.clone(),
                            configured: encode_root(&allow_list.merkle_root),
                            computed: encode_root(&computed),
                        });
                    }

                    let duplicates = duplicate_entries(entries);
                    if !duplicates.is_empty() {
                        issues.push(ConfigIssue::DuplicateAllowlistEntries {
                            label: label.clone(),
                            entries: duplicates,
                        });
                    }
                }
                _ => issues.push(ConfigIssue::AllowlistMissing { label: label.clone() }),
            }
        }

        for guard in [GuardKind::FreezeSolPayment, GuardKind::FreezeTokenPayment] {
            if group.guards.is_present(guard) {
                issues.push(ConfigIssue::FreezeEscrowRequired { label: label.clone(), guard });
            }
        }
    }

    for issue in &issues {
        warn!("{}", issue);
    }
    issues
}
