//! Counter lookups turning mint-limit guards into remaining allowances

use crate::counters::CounterKey;
use crate::guards::{Allocation, CollectionMintLimit, MintLimit};
use crate::predicates::remaining_allowance;
use crate::services::CounterStore;
use crate::types::{GuardWarning, MachineState, OwnedAsset, OwnedCoreAsset, OwnedToken, ResolvedMintLimit};
use futures::future::join_all;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, error, warn};

/// Per-asset mint limits resolved against one guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintLimitResolution<A> {
    /// Collection members with allowance left
    pub eligible: Vec<A>,
    /// Copy of all holdings, collection members annotated
    pub holdings: Vec<A>,
}

/// Remaining mints of the caller under a `mintLimit` guard
pub async fn resolve_wallet_mint_limit(
    counters: &dyn CounterStore,
    guard: &MintLimit,
    user: Pubkey,
    machine: &MachineState,
) -> u64 {
    let key = CounterKey::mint_limit(guard.id, user, machine);
    match counters.fetch_counter(&key).await {
        Ok(consumed) => remaining_allowance(u64::from(guard.limit), consumed),
        Err(e) => {
            error!(
                "Failed to fetch mint counter {}: {}",
                counters.counter_address(&key),
                e
            );
            0
        }
    }
}

/// Remaining allocation of a group, with a warning when the tracker is missing
pub async fn resolve_allocation(
    counters: &dyn CounterStore,
    guard: &Allocation,
    machine: &MachineState,
) -> (u64, Option<GuardWarning>) {
    let key = CounterKey::allocation(guard.id, machine);
    match counters.fetch_counter(&key).await {
        Ok(Some(consumed)) => (remaining_allowance(u64::from(guard.limit), Some(consumed)), None),
        Ok(None) => {
            let warning = GuardWarning::AllocationNotInitialized { id: guard.id };
            warn!("{}", warning);
            (u64::from(guard.limit), Some(warning))
        }
        Err(e) => {
            error!(
                "Failed to fetch allocation tracker {}: {}",
                counters.counter_address(&key),
                e
            );
            (0, None)
        }
    }
}

pub async fn resolve_nft_mint_limit(
    counters: &dyn CounterStore,
    guard: &CollectionMintLimit,
    tokens: &[OwnedToken],
    machine: &MachineState,
) -> MintLimitResolution<OwnedToken> {
    resolve_collection_mint_limit(counters, guard, tokens, machine, CounterKey::nft_mint_limit).await
}

pub async fn resolve_asset_mint_limit(
    counters: &dyn CounterStore,
    guard: &CollectionMintLimit,
    assets: &[OwnedCoreAsset],
    machine: &MachineState,
) -> MintLimitResolution<OwnedCoreAsset> {
    resolve_collection_mint_limit(counters, guard, assets, machine, CounterKey::asset_mint_limit)
        .await
}

async fn resolve_collection_mint_limit<A, F>(
    counters: &dyn CounterStore,
    guard: &CollectionMintLimit,
    holdings: &[A],
    machine: &MachineState,
    counter_key: F,
) -> MintLimitResolution<A>
where
    A: OwnedAsset,
    F: Fn(u8, Pubkey, &MachineState) -> CounterKey,
{
    let limit = u64::from(guard.limit);
    let members: Vec<usize> = holdings
        .iter()
        .enumerate()
        .filter(|(_, asset)| asset.belongs_to(&guard.required_collection))
        .map(|(index, _)| index)
        .collect();

    let lookups = members.iter().map(|&index| {
        let key = counter_key(guard.id, holdings[index].asset_key(), machine);
        resolve_one(counters, key, limit)
    });
    let resolved = join_all(lookups).await;

    let mut annotated = holdings.to_vec();
    let mut eligible = Vec::new();
    for (index, mint_limit) in members.into_iter().zip(resolved) {
        annotated[index].set_mint_limit(mint_limit);
        if mint_limit.remaining > 0 {
            eligible.push(annotated[index].clone());
        }
    }

    debug!(
        "Mint limit {}: {} of {} holdings eligible",
        guard.id,
        eligible.len(),
        holdings.len()
    );
    MintLimitResolution { eligible, holdings: annotated }
}

async fn resolve_one(counters: &dyn CounterStore, key: CounterKey, limit: u64) -> ResolvedMintLimit {
    let address = counters.counter_address(&key);
    match counters.fetch_counter(&key).await {
        Ok(Some(consumed)) => ResolvedMintLimit {
            remaining: remaining_allowance(limit, Some(consumed)),
            counter: Some(address),
        },
        Ok(None) => ResolvedMintLimit { remaining: limit, counter: None },
        Err(e) => {
            // Treated as an uninitialised counter
            debug!("Counter {} unavailable: {}", address, e);
            ResolvedMintLimit { remaining: limit, counter: None }
        }
    }
}
