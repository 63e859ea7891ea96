//! Common types for guard-eligibility

use crate::guards::GuardSet;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;

// ================================
// Machine & Groups
// ================================

/// Snapshot of the candy machine the guards are attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineState {
    #[serde(with = "serde_pubkey")]
    pub address: Pubkey,
    #[serde(with = "serde_pubkey")]
    pub authority: Pubkey,
    /// The candy guard account acting as mint authority
    #[serde(with = "serde_pubkey")]
    pub mint_authority: Pubkey,
    pub items_available: u64,
    pub items_redeemed: u64,
}

impl MachineState {
    /// Remaining machine-wide supply
    pub fn items_remaining(&self) -> u64 {
        self.items_available.saturating_sub(self.items_redeemed)
    }

    pub fn is_minted_out(&self) -> bool {
        self.items_remaining() == 0
    }
}

/// A labelled bundle of guards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityGroup {
    pub label: String,
    pub guards: GuardSet,
}

// ================================
// Evaluation Results
// ================================

/// Why a group denies minting
///
/// The variant is the stable code for programmatic consumers, `Display`
/// renders the text shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    WalletNotConnected,
    MintedOut,
    WalletNotFound,
    AccountUnavailable,
    InventoryUnavailable,
    WrongAddress,
    AllocationReached,
    NotAllowlisted,
    NoAssetToBurn,
    NoAssetHeld,
    NoAssetToPay,
    AssetMintLimitReached,
    MintEnded,
    MintNotStarted,
    NotEnoughSol,
    WalletMintLimitReached,
    NotEnoughTokens,
    NoNftToBurn,
    NoNftHeld,
    NftMintLimitReached,
    NoNftToPay,
    RedeemedAmountReached,
}

impl DenialReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::WalletNotConnected => "Please connect your wallet to mint",
            Self::MintedOut => "Sorry, we are minted out!",
            Self::WalletNotFound => "Wallet does not exist. Do you have SOL?",
            Self::AccountUnavailable => "Could not load your wallet. Please try again.",
            Self::InventoryUnavailable => "Could not load your wallet holdings. Please try again.",
            Self::WrongAddress => "AddressGate: Wrong Address",
            Self::AllocationReached => "Allocation of this guard reached",
            Self::NotAllowlisted => "Wallet not allowlisted",
            Self::NoAssetToBurn => "No Asset to burn!",
            Self::NoAssetHeld => "No Asset of the required collection held!",
            Self::NoAssetToPay => "No Asset to pay!",
            Self::AssetMintLimitReached => "Asset Mint limit of all owned NFT reached",
            Self::MintEnded => "Mint time is over!",
            Self::MintNotStarted => "StartDate not reached!",
            Self::NotEnoughSol => "Not enough SOL!",
            Self::WalletMintLimitReached => "Mint limit of this wallet reached",
            Self::NotEnoughTokens => "Not enough tokens!",
            Self::NoNftToBurn => "No NFT to burn!",
            Self::NoNftHeld => "No NFT of the required collection held!",
            Self::NftMintLimitReached => "NFT Mint limit of all owned NFT reached",
            Self::NoNftToPay => "No NFT to pay with!",
            Self::RedeemedAmountReached => "Too many NFTs redeemed!",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Non-fatal condition surfaced alongside a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GuardWarning {
    /// The allocation tracker account does not exist yet, minting will fail
    AllocationNotInitialized { id: u8 },
}

impl fmt::Display for GuardWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationNotInitialized { id } => {
                write!(f, "Allocation guard {id} not initialized! Minting will fail!")
            }
        }
    }
}

/// Per-group outcome of an evaluation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardEvaluationResult {
    pub label: String,
    pub allowed: bool,
    pub reason: Option<DenialReason>,
    /// User-facing text of `reason`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub max_amount: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<GuardWarning>,
}

impl GuardEvaluationResult {
    pub fn allowed(label: impl Into<String>, max_amount: u64) -> Self {
        Self {
            label: label.into(),
            allowed: true,
            reason: None,
            message: None,
            max_amount,
            warnings: Vec::new(),
        }
    }

    pub fn denied(label: impl Into<String>, reason: DenialReason) -> Self {
        Self {
            label: label.into(),
            allowed: false,
            reason: Some(reason),
            message: Some(reason.to_string()),
            max_amount: 0,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<GuardWarning>) -> Self {
        self.warnings = warnings;
        self
    }
}

// ================================
// Owned Holdings
// ================================

/// Remaining allowance resolved from a per-asset mint counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMintLimit {
    pub remaining: u64,
    /// Counter account, `None` when the counter was not found
    #[serde(default, with = "serde_option_pubkey")]
    pub counter: Option<Pubkey>,
}

/// Collection reference from token metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataCollection {
    #[serde(with = "serde_pubkey")]
    pub key: Pubkey,
    pub verified: bool,
}

/// Fungible token or token-metadata NFT held by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedToken {
    #[serde(with = "serde_pubkey")]
    pub mint: Pubkey,
    pub amount: u64,
    pub collection: Option<MetadataCollection>,
    pub mint_limit: Option<ResolvedMintLimit>,
}

/// Core asset held by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedCoreAsset {
    #[serde(with = "serde_pubkey")]
    pub address: Pubkey,
    /// Collection address for collection members, otherwise the update authority
    #[serde(with = "serde_pubkey")]
    pub update_authority: Pubkey,
    pub mint_limit: Option<ResolvedMintLimit>,
}

/// Shared behaviour of holdings that can satisfy collection guards
pub trait OwnedAsset: Clone {
    /// Address the per-asset mint counter is keyed by
    fn asset_key(&self) -> Pubkey;

    fn belongs_to(&self, collection: &Pubkey) -> bool;

    fn mint_limit(&self) -> Option<ResolvedMintLimit>;

    fn set_mint_limit(&mut self, limit: ResolvedMintLimit);
}

impl OwnedAsset for OwnedToken {
    fn asset_key(&self) -> Pubkey {
        self.mint
    }

    fn belongs_to(&self, collection: &Pubkey) -> bool {
        self.collection
            .is_some_and(|c| c.verified && c.key == *collection)
    }

    fn mint_limit(&self) -> Option<ResolvedMintLimit> {
        self.mint_limit
    }

    fn set_mint_limit(&mut self, limit: ResolvedMintLimit) {
        self.mint_limit = Some(limit);
    }
}

impl OwnedAsset for OwnedCoreAsset {
    fn asset_key(&self) -> Pubkey {
        self.address
    }

    fn belongs_to(&self, collection: &Pubkey) -> bool {
        self.update_authority == *collection
    }

    fn mint_limit(&self) -> Option<ResolvedMintLimit> {
        self.mint_limit
    }

    fn set_mint_limit(&mut self, limit: ResolvedMintLimit) {
        self.mint_limit = Some(limit);
    }
}

// ================================
// Serde helpers
// ================================

/// Base58 string representation for `Pubkey` fields
pub mod serde_pubkey {
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Pubkey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s)
            .map_err(|e| serde::de::Error::custom(format!("Invalid pubkey {s}: {e}")))
    }
}

pub mod serde_option_pubkey {
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S>(key: &Option<Pubkey>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match key {
            Some(key) => serializer.collect_str(key),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Pubkey>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| {
                Pubkey::from_str(&s)
                    .map_err(|e| serde::de::Error::custom(format!("Invalid pubkey {s}: {e}")))
            })
            .transpose()
    }
}
