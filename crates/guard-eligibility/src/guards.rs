//! Guard configuration tree
//!
//! Mirrors the candy guard account layout: one optional configuration per
//! guard kind, grouped under labels. Field names follow the on-chain guard
//! names so exported JSON configurations deserialize unchanged.

use crate::types::{serde_pubkey, EligibilityGroup};
use crate::DEFAULT_GROUP_LABEL;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

// ================================
// Guard Configurations
// ================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressGate {
    #[serde(with = "serde_pubkey")]
    pub address: Pubkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: u8,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowList {
    pub merkle_root: [u8; 32],
}

/// Collection requirement shared by the burn, gate and payment guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredCollection {
    #[serde(with = "serde_pubkey")]
    pub required_collection: Pubkey,
}

/// Collection requirement consuming `num` assets per mint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredCollectionMulti {
    #[serde(with = "serde_pubkey")]
    pub required_collection: Pubkey,
    pub num: u8,
}

/// Per-asset mint limit (nft and asset variants)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMintLimit {
    pub id: u8,
    pub limit: u16,
    #[serde(with = "serde_pubkey")]
    pub required_collection: Pubkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintLimit {
    pub id: u8,
    pub limit: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateGuard {
    /// Unix timestamp in seconds
    pub date: i64,
}

/// Lamport amount charged per mint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolAmount {
    pub lamports: u64,
}

/// Token amount of `mint` required per mint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub amount: u64,
    #[serde(with = "serde_pubkey")]
    pub mint: Pubkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemedAmount {
    pub maximum: u64,
}

/// Active guards of one group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardSet {
    pub address_gate: Option<AddressGate>,
    pub allocation: Option<Allocation>,
    pub allow_list: Option<AllowList>,
    pub asset_burn: Option<RequiredCollection>,
    pub asset_burn_multi: Option<RequiredCollectionMulti>,
    pub asset_gate: Option<RequiredCollection>,
    pub asset_mint_limit: Option<CollectionMintLimit>,
    pub asset_payment: Option<RequiredCollection>,
    pub asset_payment_multi: Option<RequiredCollectionMulti>,
    pub end_date: Option<DateGuard>,
    pub freeze_sol_payment: Option<SolAmount>,
    pub freeze_token_payment: Option<TokenAmount>,
    pub mint_limit: Option<MintLimit>,
    pub nft_burn: Option<RequiredCollection>,
    pub nft_gate: Option<RequiredCollection>,
    pub nft_mint_limit: Option<CollectionMintLimit>,
    pub nft_payment: Option<RequiredCollection>,
    pub redeemed_amount: Option<RedeemedAmount>,
    pub sol_fixed_fee: Option<SolAmount>,
    pub sol_payment: Option<SolAmount>,
    pub start_date: Option<DateGuard>,
    pub token2022_payment: Option<TokenAmount>,
    pub token_burn: Option<TokenAmount>,
    pub token_gate: Option<TokenAmount>,
    pub token_payment: Option<TokenAmount>,
}

// ================================
// Guard Kinds
// ================================

/// Every guard kind the evaluator understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GuardKind {
    AddressGate,
    Allocation,
    AllowList,
    AssetBurn,
    AssetBurnMulti,
    AssetGate,
    AssetMintLimit,
    AssetPayment,
    AssetPaymentMulti,
    EndDate,
    FreezeSolPayment,
    FreezeTokenPayment,
    MintLimit,
    NftBurn,
    NftGate,
    NftMintLimit,
    NftPayment,
    RedeemedAmount,
    SolFixedFee,
    SolPayment,
    StartDate,
    Token2022Payment,
    TokenBurn,
    TokenGate,
    TokenPayment,
}

impl GuardKind {
    /// Evaluation order within a group, the first denial is reported
    pub const ORDER: [GuardKind; 25] = [
        GuardKind::AddressGate,
        GuardKind::Allocation,
        GuardKind::AllowList,
        GuardKind::AssetBurn,
        GuardKind::AssetBurnMulti,
        GuardKind::AssetGate,
        GuardKind::AssetMintLimit,
        GuardKind::AssetPayment,
        GuardKind::AssetPaymentMulti,
        GuardKind::EndDate,
        GuardKind::FreezeSolPayment,
        GuardKind::MintLimit,
        GuardKind::FreezeTokenPayment,
        GuardKind::NftBurn,
        GuardKind::NftMintLimit,
        GuardKind::NftGate,
        GuardKind::NftPayment,
        GuardKind::RedeemedAmount,
        GuardKind::SolFixedFee,
        GuardKind::SolPayment,
        GuardKind::StartDate,
        GuardKind::TokenBurn,
        GuardKind::TokenGate,
        GuardKind::TokenPayment,
        GuardKind::Token2022Payment,
    ];

    /// Guards needing the caller's lamport balance
    pub fn needs_sol_balance(self) -> bool {
        matches!(
            self,
            GuardKind::FreezeSolPayment | GuardKind::SolFixedFee | GuardKind::SolPayment
        )
    }

    /// Guards needing fungible token or token-metadata NFT holdings
    pub fn needs_tokens(self) -> bool {
        matches!(
            self,
            GuardKind::FreezeTokenPayment
                | GuardKind::NftBurn
                | GuardKind::NftGate
                | GuardKind::NftMintLimit
                | GuardKind::NftPayment
                | GuardKind::Token2022Payment
                | GuardKind::TokenBurn
                | GuardKind::TokenGate
                | GuardKind::TokenPayment
        )
    }

    /// Guards needing core asset holdings
    pub fn needs_core_assets(self) -> bool {
        matches!(
            self,
            GuardKind::AssetBurn
                | GuardKind::AssetBurnMulti
                | GuardKind::AssetGate
                | GuardKind::AssetMintLimit
                | GuardKind::AssetPayment
                | GuardKind::AssetPaymentMulti
        )
    }
}

impl GuardSet {
    pub fn is_present(&self, kind: GuardKind) -> bool {
        match kind {
            GuardKind::AddressGate => self.address_gate.is_some(),
            GuardKind::Allocation => self.allocation.is_some(),
            GuardKind::AllowList => self.allow_list.is_some(),
            GuardKind::AssetBurn => self.asset_burn.is_some(),
            GuardKind::AssetBurnMulti => self.asset_burn_multi.is_some(),
            GuardKind::AssetGate => self.asset_gate.is_some(),
            GuardKind::AssetMintLimit => self.asset_mint_limit.is_some(),
            GuardKind::AssetPayment => self.asset_payment.is_some(),
            GuardKind::AssetPaymentMulti => self.asset_payment_multi.is_some(),
            GuardKind::EndDate => self.end_date.is_some(),
            GuardKind::FreezeSolPayment => self.freeze_sol_payment.is_some(),
            GuardKind::FreezeTokenPayment => self.freeze_token_payment.is_some(),
            GuardKind::MintLimit => self.mint_limit.is_some(),
            GuardKind::NftBurn => self.nft_burn.is_some(),
            GuardKind::NftGate => self.nft_gate.is_some(),
            GuardKind::NftMintLimit => self.nft_mint_limit.is_some(),
            GuardKind::NftPayment => self.nft_payment.is_some(),
            GuardKind::RedeemedAmount => self.redeemed_amount.is_some(),
            GuardKind::SolFixedFee => self.sol_fixed_fee.is_some(),
            GuardKind::SolPayment => self.sol_payment.is_some(),
            GuardKind::StartDate => self.start_date.is_some(),
            GuardKind::Token2022Payment => self.token2022_payment.is_some(),
            GuardKind::TokenBurn => self.token_burn.is_some(),
            GuardKind::TokenGate => self.token_gate.is_some(),
            GuardKind::TokenPayment => self.token_payment.is_some(),
        }
    }

    /// Present guard kinds in evaluation order
    pub fn active_kinds(&self) -> impl Iterator<Item = GuardKind> + '_ {
        GuardKind::ORDER
            .into_iter()
            .filter(|kind| self.is_present(*kind))
    }
}

// ================================
// Candy Guard
// ================================

/// Guard configuration of a candy machine: default guards plus named groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandyGuardConfig {
    pub guards: GuardSet,
    pub groups: Vec<EligibilityGroup>,
}

impl CandyGuardConfig {
    /// Configured groups followed by the implicit default group
    pub fn eligibility_groups(&self) -> Vec<EligibilityGroup> {
        self.groups
            .iter()
            .cloned()
            .chain(std::iter::once(EligibilityGroup {
                label: DEFAULT_GROUP_LABEL.to_string(),
                guards: self.guards.clone(),
            }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_covers_every_kind_once() {
        let mut sorted = GuardKind::ORDER.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), GuardKind::ORDER.len());
    }

    #[test]
    fn test_active_kinds_follow_order() {
        let guards = GuardSet {
            start_date: Some(DateGuard { date: 10 }),
            address_gate: Some(AddressGate { address: Pubkey::new_unique() }),
            sol_payment: Some(SolAmount { lamports: 5 }),
            ..GuardSet::default()
        };
        let kinds: Vec<_> = guards.active_kinds().collect();
        assert_eq!(
            kinds,
            vec![GuardKind::AddressGate, GuardKind::SolPayment, GuardKind::StartDate]
        );
    }

    #[test]
    fn test_limits_precede_holdings_checks() {
        let collection = Pubkey::new_unique();
        let token = TokenAmount { amount: 1, mint: Pubkey::new_unique() };
        let guards = GuardSet {
            token2022_payment: Some(token),
            token_payment: Some(token),
            freeze_token_payment: Some(token),
            mint_limit: Some(MintLimit { id: 1, limit: 2 }),
            nft_gate: Some(RequiredCollection { required_collection: collection }),
            nft_mint_limit: Some(CollectionMintLimit { id: 1, limit: 2, required_collection: collection }),
            ..GuardSet::default()
        };
        let kinds: Vec<_> = guards.active_kinds().collect();
        assert_eq!(
            kinds,
            vec![
                GuardKind::MintLimit,
                GuardKind::FreezeTokenPayment,
                GuardKind::NftMintLimit,
                GuardKind::NftGate,
                GuardKind::TokenPayment,
                GuardKind::Token2022Payment,
            ]
        );
    }

    #[test]
    fn test_default_group_appended_last() {
        let config = CandyGuardConfig {
            guards: GuardSet {
                end_date: Some(DateGuard { date: 100 }),
                ..GuardSet::default()
            },
            groups: vec![
                EligibilityGroup { label: "OG".to_string(), guards: GuardSet::default() },
                EligibilityGroup { label: "WL".to_string(), guards: GuardSet::default() },
            ],
        };
        let labels: Vec<_> = config
            .eligibility_groups()
            .into_iter()
            .map(|g| g.label)
            .collect();
        assert_eq!(labels, vec!["OG", "WL", "default"]);
        assert_eq!(config.groups.len(), 2);
    }

    #[test]
    fn test_guard_set_from_camel_case_json() {
        let json = r#"{
            "solPayment": { "lamports": 1000000000, "destination": "11111111111111111111111111111112" },
            "mintLimit": { "id": 1, "limit": 3 },
            "token2022Payment": { "amount": 5, "mint": "11111111111111111111111111111113" }
        }"#;
        let guards: GuardSet = serde_json::from_str(json).unwrap();
        assert_eq!(guards.sol_payment, Some(SolAmount { lamports: 1_000_000_000 }));
        assert_eq!(guards.mint_limit, Some(MintLimit { id: 1, limit: 3 }));
        assert!(guards.is_present(GuardKind::Token2022Payment));
        assert!(!guards.is_present(GuardKind::TokenPayment));
    }
}
