//! Allowlist data and merkle roots
//!
//! Allowlists are supplied per group label as base58 address strings. The
//! candy guard only stores the merkle root, so the root is recomputed here to
//! detect lists that drifted from the on-chain configuration.

use serde::{Deserialize, Serialize};
use solana_sdk::{keccak::hashv, pubkey::Pubkey};
use std::collections::{BTreeMap, HashSet};

/// Allowlisted addresses keyed by group label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allowlists {
    lists: BTreeMap<String, Vec<String>>,
}

impl Allowlists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, label: impl Into<String>, addresses: Vec<String>) {
        self.lists.insert(label.into(), addresses);
    }

    pub fn get(&self, label: &str) -> Option<&[String]> {
        self.lists.get(label).map(Vec::as_slice)
    }

    /// `None` when no list is registered for `label`
    pub fn contains(&self, label: &str, address: &Pubkey) -> Option<bool> {
        let encoded = address.to_string();
        self.get(label)
            .map(|entries| entries.iter().any(|entry| *entry == encoded))
    }

    /// Merkle root of the list registered for `label`
    pub fn merkle_root(&self, label: &str) -> Option<[u8; 32]> {
        self.get(label).map(merkle_root)
    }
}

fn leaf_hash(entry: &str) -> [u8; 32] {
    hashv(&[entry.as_bytes()]).to_bytes()
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    if left <= right {
        hashv(&[left.as_ref(), right.as_ref()]).to_bytes()
    } else {
        hashv(&[right.as_ref(), left.as_ref()]).to_bytes()
    }
}

/// Root of a sorted-pair keccak256 tree over the entries; an odd node is
/// carried up unchanged
pub fn merkle_root(entries: &[String]) -> [u8; 32] {
    let mut level: Vec<[u8; 32]> = entries.iter().map(|e| leaf_hash(e)).collect();
    if level.is_empty() {
        return [0u8; 32];
    }

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_pair(left, right),
                _ => pair[0],
            })
            .collect();
    }

    level[0]
}

/// Entries appearing more than once
pub fn duplicate_entries(entries: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|entry| !seen.insert(entry.as_str()))
        .cloned()
        .collect()
}
