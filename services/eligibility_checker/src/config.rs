//! Service configuration

use anyhow::{bail, Context, Result};
use guard_eligibility::{Allowlists, CandyGuardConfig, CheckerConfig, MachineState, CANDY_GUARD_PROGRAM_ID};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

#[derive(Debug, Clone)]
pub struct Config {
    /// Solana RPC URL
    pub rpc_url: String,

    /// DAS read API URL, defaults to `rpc_url`
    pub das_url: String,

    /// Wallet to evaluate, unset means no wallet connected
    pub wallet: Option<Pubkey>,

    /// JSON file holding the machine state and its candy guard
    pub machine_config_path: String,

    /// JSON file of allowlists keyed by group label
    pub allowlist_path: Option<String>,

    /// Upper bound on every mintable amount
    pub max_mint_amount: Option<u64>,

    /// Candy guard program owning the counter accounts
    pub candy_guard_program: Pubkey,
}

/// Contents of the machine configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineFile {
    pub machine: MachineState,
    pub candy_guard: Option<CandyGuardConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let rpc_url =
            std::env::var("RPC_URL").unwrap_or_else(|_| "http://localhost:8899".to_string());

        let wallet = match std::env::var("WALLET") {
            Ok(wallet) => Some(wallet.parse().context("Invalid WALLET")?),
            Err(_) => None,
        };

        let machine_config_path = std::env::var("MACHINE_CONFIG").context("MACHINE_CONFIG not set")?;

        let max_mint_amount = match std::env::var("MAX_MINT_AMOUNT") {
            Ok(value) => {
                let amount: u64 = value.parse().context("Invalid MAX_MINT_AMOUNT")?;
                if amount == 0 {
                    bail!("MAX_MINT_AMOUNT must be positive");
                }
                Some(amount)
            }
            Err(_) => None,
        };

        let candy_guard_program = match std::env::var("CANDY_GUARD_PROGRAM_ID") {
            Ok(id) => id.parse().context("Invalid CANDY_GUARD_PROGRAM_ID")?,
            Err(_) => CANDY_GUARD_PROGRAM_ID,
        };

        Ok(Config {
            das_url: std::env::var("DAS_URL").unwrap_or_else(|_| rpc_url.clone()),
            rpc_url,
            wallet,
            machine_config_path: shellexpand::tilde(&machine_config_path).to_string(),
            allowlist_path: std::env::var("ALLOWLIST_PATH")
                .ok()
                .map(|path| shellexpand::tilde(&path).to_string()),
            max_mint_amount,
            candy_guard_program,
        })
    }

    pub fn checker_config(&self) -> CheckerConfig {
        CheckerConfig {
            rpc_url: self.rpc_url.clone(),
            das_url: self.das_url.clone(),
            candy_guard_program: self.candy_guard_program,
            max_mint_amount: self.max_mint_amount,
            ..CheckerConfig::default()
        }
    }

    pub fn load_machine(&self) -> Result<MachineFile> {
        let contents = std::fs::read_to_string(&self.machine_config_path)
            .with_context(|| format!("Failed to read {}", self.machine_config_path))?;
        serde_json::from_str(&contents).context("Failed to parse machine configuration")
    }

    pub fn load_allowlists(&self) -> Result<Allowlists> {
        let Some(path) = &self.allowlist_path else {
            return Ok(Allowlists::new());
        };
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
        Allowlists::from_json(&contents).context("Failed to parse allowlists")
    }
}
