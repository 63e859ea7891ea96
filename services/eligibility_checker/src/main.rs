//! Candy Guard Eligibility Checker
//!
//! Runs one eligibility pass for a wallet against a live cluster and prints
//! the per-group report as JSON.

mod config;

use anyhow::{Context, Result};
use guard_eligibility::{EligibilityChecker, EligibilityRequest};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Candy Guard Eligibility Checker");

    // Load configuration
    let config = config::Config::from_env()?;
    let machine_file = config.load_machine()?;
    let allowlists = config.load_allowlists()?;

    let checker = EligibilityChecker::from_config(config.checker_config())
        .context("Invalid checker configuration")?;
    let now = checker
        .ledger_time()
        .await
        .context("Failed to fetch ledger time")?;
    info!("Ledger time: {}", now);

    let request = EligibilityRequest {
        identity: config.wallet,
        now,
        machine: Some(machine_file.machine),
        guard_config: machine_file.candy_guard,
        allowlists,
    };
    let report = checker.check(&request).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
