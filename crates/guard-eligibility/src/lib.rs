//! Candy Guard Eligibility
//!
//! Off-chain evaluation of candy guard mint eligibility. For every guard group
//! the checker decides whether the connected wallet may mint, how many items it
//! may mint, and why not when it cannot. Nothing here signs or sends
//! transactions.

// ================================
// Module Declarations
// ================================

pub mod core;
pub mod types;

// Guard configuration and counter accounts
pub mod allowlist;
pub mod counters;
pub mod guards;

// Evaluation pipeline
pub mod audit;
pub mod checker;
pub mod evaluator;
pub mod fetchers;
pub mod mint_limits;
pub mod predicates;

// Ledger, counter and inventory access
pub mod services;

// ================================
// Public API Re-exports
// ================================

// Configuration and errors
pub use crate::core::{CheckerConfig, CheckerError, Result, CANDY_GUARD_PROGRAM_ID, DEFAULT_GROUP_LABEL};

// Evaluation
pub use checker::{EligibilityChecker, EligibilityReport, EligibilityRequest};
pub use evaluator::{EvaluationContext, GroupEvaluator, GroupOutcome};
pub use fetchers::{fetch_ledger_time, DataRequirements, FetchFailure, SharedState};

// Configuration tree
pub use allowlist::Allowlists;
pub use audit::ConfigIssue;
pub use guards::{CandyGuardConfig, GuardKind, GuardSet};

// Services
pub use services::{CounterStore, InventoryService, LedgerService, Services};

// Common types
pub use types::{
    DenialReason, EligibilityGroup, GuardEvaluationResult, GuardWarning, MachineState,
    OwnedCoreAsset, OwnedToken, ResolvedMintLimit,
};
