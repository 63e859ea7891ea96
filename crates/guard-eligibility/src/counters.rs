//! Mint counter keys, addresses and account decoding

use crate::types::MachineState;
use crate::{CheckerError, Result};
use borsh::BorshDeserialize;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

const ANCHOR_DISCRIMINATOR_LEN: usize = 8;

/// Identifies one remote consumption counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterKey {
    /// Per-wallet counter of the `mintLimit` guard
    MintLimit {
        id: u8,
        user: Pubkey,
        candy_guard: Pubkey,
        candy_machine: Pubkey,
    },
    /// Per-NFT counter of the `nftMintLimit` guard
    NftMintLimit {
        id: u8,
        mint: Pubkey,
        candy_guard: Pubkey,
        candy_machine: Pubkey,
    },
    /// Per-asset counter of the `assetMintLimit` guard
    AssetMintLimit {
        id: u8,
        asset: Pubkey,
        candy_guard: Pubkey,
        candy_machine: Pubkey,
    },
    /// Group-wide tracker of the `allocation` guard
    Allocation {
        id: u8,
        candy_guard: Pubkey,
        candy_machine: Pubkey,
    },
}

impl CounterKey {
    pub fn mint_limit(id: u8, user: Pubkey, machine: &MachineState) -> Self {
        Self::MintLimit {
            id,
            user,
            candy_guard: machine.mint_authority,
            candy_machine: machine.address,
        }
    }

    pub fn nft_mint_limit(id: u8, mint: Pubkey, machine: &MachineState) -> Self {
        Self::NftMintLimit {
            id,
            mint,
            candy_guard: machine.mint_authority,
            candy_machine: machine.address,
        }
    }

    pub fn asset_mint_limit(id: u8, asset: Pubkey, machine: &MachineState) -> Self {
        Self::AssetMintLimit {
            id,
            asset,
            candy_guard: machine.mint_authority,
            candy_machine: machine.address,
        }
    }

    pub fn allocation(id: u8, machine: &MachineState) -> Self {
        Self::Allocation {
            id,
            candy_guard: machine.mint_authority,
            candy_machine: machine.address,
        }
    }

    pub fn seed_prefix(&self) -> &'static [u8] {
        match self {
            Self::MintLimit { .. } => b"mint_limit",
            Self::NftMintLimit { .. } => b"nft_mint_limit",
            Self::AssetMintLimit { .. } => b"asset_mint_limit",
            Self::Allocation { .. } => b"allocation",
        }
    }

    /// Program-derived address of the counter account
    pub fn address(&self, program_id: &Pubkey) -> Pubkey {
        let prefix = self.seed_prefix();
        let (address, _bump) = match self {
            Self::MintLimit { id, user: subject, candy_guard, candy_machine }
            | Self::NftMintLimit { id, mint: subject, candy_guard, candy_machine }
            | Self::AssetMintLimit { id, asset: subject, candy_guard, candy_machine } => {
                Pubkey::find_program_address(
                    &[
                        prefix,
                        &[*id],
                        subject.as_ref(),
                        candy_guard.as_ref(),
                        candy_machine.as_ref(),
                    ],
                    program_id,
                )
            }
            Self::Allocation { id, candy_guard, candy_machine } => Pubkey::find_program_address(
                &[prefix, &[*id], candy_guard.as_ref(), candy_machine.as_ref()],
                program_id,
            ),
        };
        address
    }

    /// Decode the consumed count from raw account data
    pub fn decode_count(&self, address: &Pubkey, data: &[u8]) -> Result<u32> {
        let mut body = data
            .get(ANCHOR_DISCRIMINATOR_LEN..)
            .ok_or(CheckerError::InvalidAccountData(*address))?;

        let count = match self {
            Self::Allocation { .. } => AllocationTracker::deserialize(&mut body)
                .map(|tracker| tracker.count),
            _ => MintCounter::deserialize(&mut body).map(|counter| u32::from(counter.count)),
        };
        count.map_err(|_| CheckerError::InvalidAccountData(*address))
    }
}

/// Layout shared by the wallet, nft and asset mint counters
#[derive(Debug, BorshDeserialize)]
struct MintCounter {
    count: u16,
}

#[derive(Debug, BorshDeserialize)]
struct AllocationTracker {
    count: u32,
}
