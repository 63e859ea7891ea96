//! Shared remote state, fetched once per evaluation pass

use crate::services::{InventoryService, LedgerService, Services};
use crate::types::{DenialReason, EligibilityGroup, OwnedCoreAsset, OwnedToken};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, error};

/// Which shared data the union of all groups needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataRequirements {
    pub sol_balance: bool,
    pub tokens: bool,
    pub core_assets: bool,
}

impl DataRequirements {
    pub fn from_groups(groups: &[EligibilityGroup]) -> Self {
        groups
            .iter()
            .flat_map(|group| group.guards.active_kinds())
            .fold(Self::default(), |req, kind| Self {
                sol_balance: req.sol_balance || kind.needs_sol_balance(),
                tokens: req.tokens || kind.needs_tokens(),
                core_assets: req.core_assets || kind.needs_core_assets(),
            })
    }
}

/// Read-only data shared by every group of a pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedState {
    pub sol_balance: u64,
    pub tokens: Vec<OwnedToken>,
    pub core_assets: Vec<OwnedCoreAsset>,
}

/// A shared fetch failed; the whole pass is denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    AccountNotFound,
    AccountUnavailable,
    InventoryUnavailable,
}

impl FetchFailure {
    pub fn reason(self) -> DenialReason {
        match self {
            Self::AccountNotFound => DenialReason::WalletNotFound,
            Self::AccountUnavailable => DenialReason::AccountUnavailable,
            Self::InventoryUnavailable => DenialReason::InventoryUnavailable,
        }
    }
}

/// Fetch each required piece of shared state exactly once
pub async fn fetch_shared_state(
    services: &Services,
    owner: &Pubkey,
    requirements: DataRequirements,
) -> std::result::Result<SharedState, FetchFailure> {
    let mut state = SharedState::default();

    if requirements.sol_balance {
        state.sol_balance = fetch_sol_balance(services.ledger.as_ref(), owner).await?;
    }

    if requirements.tokens {
        state.tokens = services
            .inventory
            .fetch_owned_tokens(owner)
            .await
            .map_err(|e| {
                error!("Failed to fetch token holdings of {}: {}", owner, e);
                FetchFailure::InventoryUnavailable
            })?;
        debug!("Owner {} holds {} tokens", owner, state.tokens.len());
    }

    if requirements.core_assets {
        state.core_assets = fetch_core_assets(services.inventory.as_ref(), owner).await?;
    }

    Ok(state)
}

async fn fetch_sol_balance(
    ledger: &dyn LedgerService,
    owner: &Pubkey,
) -> std::result::Result<u64, FetchFailure> {
    match ledger.get_balance(owner).await {
        Ok(Some(lamports)) => Ok(lamports),
        Ok(None) => {
            debug!("Wallet account {} does not exist", owner);
            Err(FetchFailure::AccountNotFound)
        }
        Err(e) => {
            error!("Failed to fetch balance of {}: {}", owner, e);
            Err(FetchFailure::AccountUnavailable)
        }
    }
}

async fn fetch_core_assets(
    inventory: &dyn InventoryService,
    owner: &Pubkey,
) -> std::result::Result<Vec<OwnedCoreAsset>, FetchFailure> {
    let assets = inventory.fetch_owned_core_assets(owner).await.map_err(|e| {
        error!("Failed to fetch core assets of {}: {}", owner, e);
        FetchFailure::InventoryUnavailable
    })?;
    debug!("Owner {} holds {} core assets", owner, assets.len());
    Ok(assets)
}

/// Current ledger time: block time of the current slot, `0` when unknown
pub async fn fetch_ledger_time(ledger: &dyn LedgerService) -> crate::Result<i64> {
    let slot = ledger.get_slot().await?;
    Ok(ledger.get_block_time(slot).await?.unwrap_or(0))
}
