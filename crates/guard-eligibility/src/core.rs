//! Core checker types: configuration and error handling

use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use thiserror::Error;

/// Program id of the core candy guard, owner of every mint counter account
pub const CANDY_GUARD_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("CMAGAKJ67e9hRZgfC5SFTbZH8MgEmtqazKXjmkaJjWTJ");

/// Label of the implicit group carrying the top-level guards
pub const DEFAULT_GROUP_LABEL: &str = "default";

// ================================
// Configuration Types
// ================================

/// Checker configuration
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// RPC endpoint URL
    pub rpc_url: String,

    /// DAS read API endpoint URL (usually the same provider as `rpc_url`)
    pub das_url: String,

    /// Commitment level for RPC queries
    pub commitment: CommitmentConfig,

    /// Program owning the mint counter and allocation tracker accounts
    pub candy_guard_program: Pubkey,

    /// Upper bound applied to every mintable amount
    pub max_mint_amount: Option<u64>,

    /// Page size for DAS `getAssetsByOwner`
    pub das_page_limit: u32,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            das_url: "https://api.mainnet-beta.solana.com".to_string(),
            commitment: CommitmentConfig::confirmed(),
            candy_guard_program: CANDY_GUARD_PROGRAM_ID,
            max_mint_amount: None,
            das_page_limit: 1000,
        }
    }
}

impl CheckerConfig {
    /// Reject settings that would deny every group
    pub fn validate(&self) -> Result<()> {
        if self.max_mint_amount == Some(0) {
            return Err(CheckerError::InvalidConfiguration(
                "max_mint_amount must be positive".to_string(),
            ));
        }
        if self.das_page_limit == 0 {
            return Err(CheckerError::InvalidConfiguration(
                "das_page_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ================================
// Error Types
// ================================

#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("RPC error: {0}")]
    Rpc(Box<solana_client::client_error::ClientError>),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("DAS error {code}: {message}")]
    Das { code: i64, message: String },

    #[error("Invalid account data for {0}")]
    InvalidAccountData(Pubkey),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<solana_client::client_error::ClientError> for CheckerError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        Self::Rpc(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CheckerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checker_config_default() {
        let config = CheckerConfig::default();
        assert_eq!(config.candy_guard_program, CANDY_GUARD_PROGRAM_ID);
        assert_eq!(config.commitment, CommitmentConfig::confirmed());
        assert!(config.max_mint_amount.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_mint_cap_rejected() {
        let config = CheckerConfig { max_mint_amount: Some(0), ..CheckerConfig::default() };
        assert!(matches!(config.validate(), Err(CheckerError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_das_error_display() {
        let err = CheckerError::Das {
            code: -32000,
            message: "owner not found".to_string(),
        };
        assert_eq!(err.to_string(), "DAS error -32000: owner not found");
    }
}
