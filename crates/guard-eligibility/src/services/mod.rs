//! Remote collaborators of the evaluator
//!
//! The evaluator only talks to these traits. `rpc` and `das` provide the
//! production adapters; tests substitute mocks.

pub mod das;
pub mod rpc;

pub use das::DasInventory;
pub use rpc::{RpcCounterStore, RpcLedger};

use crate::counters::CounterKey;
use crate::types::{OwnedCoreAsset, OwnedToken};
use crate::Result;
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

/// Ledger account state and clock
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerService: Send + Sync {
    /// Lamport balance, `None` when the account does not exist
    async fn get_balance(&self, address: &Pubkey) -> Result<Option<u64>>;

    async fn get_slot(&self) -> Result<u64>;

    /// Block time of `slot`, `None` when the cluster has none for it
    async fn get_block_time(&self, slot: u64) -> Result<Option<i64>>;
}

/// Remote consumption counters
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Consumed count, `None` when the counter does not exist yet
    async fn fetch_counter(&self, key: &CounterKey) -> Result<Option<u32>>;

    /// Address tracking `key`
    fn counter_address(&self, key: &CounterKey) -> Pubkey;
}

/// Owned-asset inventory
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Fungible tokens and token-metadata NFTs
    async fn fetch_owned_tokens(&self, owner: &Pubkey) -> Result<Vec<OwnedToken>>;

    async fn fetch_owned_core_assets(&self, owner: &Pubkey) -> Result<Vec<OwnedCoreAsset>>;
}

/// Bundle of the services one evaluation pass needs
#[derive(Clone)]
pub struct Services {
    pub ledger: Arc<dyn LedgerService>,
    pub counters: Arc<dyn CounterStore>,
    pub inventory: Arc<dyn InventoryService>,
}

impl Services {
    pub fn new(
        ledger: Arc<dyn LedgerService>,
        counters: Arc<dyn CounterStore>,
        inventory: Arc<dyn InventoryService>,
    ) -> Self {
        Self { ledger, counters, inventory }
    }
}
