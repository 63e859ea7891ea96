//! JSON-RPC backed ledger and counter adapters

use super::{CounterStore, LedgerService};
use crate::counters::CounterKey;
use crate::Result;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::sync::Arc;
use tracing::debug;

/// Ledger queries through a Solana RPC node
pub struct RpcLedger {
    rpc_client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcLedger {
    pub fn new(rpc_client: Arc<RpcClient>, commitment: CommitmentConfig) -> Self {
        Self { rpc_client, commitment }
    }
}

#[async_trait]
impl LedgerService for RpcLedger {
    async fn get_balance(&self, address: &Pubkey) -> Result<Option<u64>> {
        let response = self
            .rpc_client
            .get_account_with_commitment(address, self.commitment)
            .await?;
        Ok(response.value.map(|account| account.lamports))
    }

    async fn get_slot(&self) -> Result<u64> {
        Ok(self.rpc_client.get_slot_with_commitment(self.commitment).await?)
    }

    async fn get_block_time(&self, slot: u64) -> Result<Option<i64>> {
        match self.rpc_client.get_block_time(slot).await {
            Ok(timestamp) => Ok(Some(timestamp)),
            Err(e) => {
                debug!("No block time for slot {}: {}", slot, e);
                Ok(None)
            }
        }
    }
}

/// Mint counters read from candy guard program accounts
pub struct RpcCounterStore {
    rpc_client: Arc<RpcClient>,
    commitment: CommitmentConfig,
    program_id: Pubkey,
}

impl RpcCounterStore {
    pub fn new(rpc_client: Arc<RpcClient>, commitment: CommitmentConfig, program_id: Pubkey) -> Self {
        Self { rpc_client, commitment, program_id }
    }
}

#[async_trait]
impl CounterStore for RpcCounterStore {
    async fn fetch_counter(&self, key: &CounterKey) -> Result<Option<u32>> {
        let address = self.counter_address(key);
        let response = self
            .rpc_client
            .get_account_with_commitment(&address, self.commitment)
            .await?;

        match response.value {
            Some(account) => key.decode_count(&address, &account.data).map(Some),
            None => {
                debug!("Counter {} not initialized", address);
                Ok(None)
            }
        }
    }

    fn counter_address(&self, key: &CounterKey) -> Pubkey {
        key.address(&self.program_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MachineState;
    use crate::CANDY_GUARD_PROGRAM_ID;

    #[tokio::test]
    async fn test_counter_address_uses_configured_program() {
        let rpc_client = Arc::new(RpcClient::new("http://localhost:8899".to_string()));
        let other_program = Pubkey::new_unique();
        let store = RpcCounterStore::new(rpc_client.clone(), CommitmentConfig::confirmed(), other_program);
        let default_store =
            RpcCounterStore::new(rpc_client, CommitmentConfig::confirmed(), CANDY_GUARD_PROGRAM_ID);

        let machine = MachineState {
            address: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            mint_authority: Pubkey::new_unique(),
            items_available: 1,
            items_redeemed: 0,
        };
        let key = CounterKey::allocation(1, &machine);

        assert_eq!(store.counter_address(&key), key.address(&other_program));
        assert_ne!(store.counter_address(&key), default_store.counter_address(&key));
    }
}
