//! Eligibility checker: one evaluation pass over every group of a candy guard

use crate::allowlist::Allowlists;
use crate::audit::audit_configuration;
use crate::core::CheckerConfig;
use crate::evaluator::{EvaluationContext, GroupEvaluator, GroupOutcome};
use crate::fetchers::{fetch_ledger_time, fetch_shared_state, DataRequirements};
use crate::guards::CandyGuardConfig;
use crate::services::{DasInventory, RpcCounterStore, RpcLedger, Services};
use crate::types::{
    DenialReason, EligibilityGroup, GuardEvaluationResult, MachineState, OwnedAsset,
    OwnedCoreAsset, OwnedToken,
};
use crate::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::{info, warn};

/// Input of one evaluation pass
#[derive(Debug, Clone, Default)]
pub struct EligibilityRequest {
    /// Connected wallet, `None` when no wallet is connected
    pub identity: Option<Pubkey>,
    /// Ledger time in unix seconds
    pub now: i64,
    pub machine: Option<MachineState>,
    pub guard_config: Option<CandyGuardConfig>,
    pub allowlists: Allowlists,
}

/// Per-group results in group order, default group last
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityReport {
    pub results: Vec<GuardEvaluationResult>,
    /// Token holdings with resolved nft mint limits
    pub tokens: Vec<OwnedToken>,
    /// Core asset holdings with resolved asset mint limits
    pub core_assets: Vec<OwnedCoreAsset>,
}

impl EligibilityReport {
    fn denied_all(groups: &[EligibilityGroup], reason: DenialReason) -> Self {
        Self {
            results: groups
                .iter()
                .map(|group| GuardEvaluationResult::denied(&group.label, reason))
                .collect(),
            ..Self::default()
        }
    }

    /// Result of the group labelled `label`
    pub fn result(&self, label: &str) -> Option<&GuardEvaluationResult> {
        self.results.iter().find(|result| result.label == label)
    }
}

pub struct EligibilityChecker {
    services: Services,
    config: CheckerConfig,
}

impl EligibilityChecker {
    pub fn new(services: Services, config: CheckerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { services, config })
    }

    /// Checker backed by the RPC and DAS endpoints of `config`
    pub fn from_config(config: CheckerConfig) -> Result<Self> {
        info!("Connecting eligibility checker to {}", config.rpc_url);

        let rpc_client = Arc::new(RpcClient::new_with_commitment(
            config.rpc_url.clone(),
            config.commitment,
        ));
        let services = Services::new(
            Arc::new(RpcLedger::new(rpc_client.clone(), config.commitment)),
            Arc::new(RpcCounterStore::new(
                rpc_client,
                config.commitment,
                config.candy_guard_program,
            )),
            Arc::new(DasInventory::new(config.das_url.clone(), config.das_page_limit)),
        );

        Self::new(services, config)
    }

    /// Current ledger time used as `now` for date guards
    pub async fn ledger_time(&self) -> Result<i64> {
        fetch_ledger_time(self.services.ledger.as_ref()).await
    }

    /// Evaluate every group of the request's guard configuration
    pub async fn check(&self, request: &EligibilityRequest) -> EligibilityReport {
        let (Some(guard_config), Some(machine)) = (&request.guard_config, &request.machine) else {
            info!("No candy guard configuration loaded, nothing to evaluate");
            return EligibilityReport::default();
        };
        let groups = guard_config.eligibility_groups();

        let Some(caller) = request.identity.filter(|key| *key != Pubkey::default()) else {
            info!("No wallet connected");
            return EligibilityReport::denied_all(&groups, DenialReason::WalletNotConnected);
        };

        if machine.is_minted_out() {
            info!("Candy machine {} is minted out", machine.address);
            return EligibilityReport::denied_all(&groups, DenialReason::MintedOut);
        }

        info!(
            "Evaluating {} group(s) of candy machine {} for {}",
            groups.len(),
            machine.address,
            caller
        );

        if caller == machine.authority {
            let issues = audit_configuration(&groups, &request.allowlists);
            info!("Authority audit found {} issue(s)", issues.len());
        }

        let requirements = DataRequirements::from_groups(&groups);
        let shared = match fetch_shared_state(&self.services, &caller, requirements).await {
            Ok(shared) => shared,
            Err(failure) => {
                warn!("Shared state unavailable, denying all groups: {:?}", failure);
                return EligibilityReport::denied_all(&groups, failure.reason());
            }
        };

        let ctx = EvaluationContext {
            machine,
            caller,
            now: request.now,
            allowlists: &request.allowlists,
            max_mint_amount: self.config.max_mint_amount,
            counters: self.services.counters.as_ref(),
            shared: &shared,
        };
        let evaluator = GroupEvaluator::new(&ctx);
        let outcomes = join_all(groups.iter().map(|group| evaluator.evaluate(group))).await;

        let mut report = EligibilityReport {
            results: Vec::with_capacity(outcomes.len()),
            tokens: shared.tokens.clone(),
            core_assets: shared.core_assets.clone(),
        };
        for GroupOutcome { result, tokens, core_assets } in outcomes {
            if let Some(annotated) = tokens {
                merge_annotations(&mut report.tokens, &annotated);
            }
            if let Some(annotated) = core_assets {
                merge_annotations(&mut report.core_assets, &annotated);
            }
            report.results.push(result);
        }

        let allowed = report.results.iter().filter(|r| r.allowed).count();
        info!("Evaluation finished: {} of {} group(s) allowed", allowed, report.results.len());
        report
    }
}

/// Copy resolved mint limits onto `base`; later groups overwrite earlier ones
fn merge_annotations<A: OwnedAsset>(base: &mut [A], annotated: &[A]) {
    for source in annotated {
        let Some(limit) = source.mint_limit() else {
            continue;
        };
        let key = source.asset_key();
        base.iter_mut()
            .filter(|target| target.asset_key() == key)
            .for_each(|target| target.set_mint_limit(limit));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guards::{GuardSet, MintLimit, SolAmount};
    use crate::services::{MockCounterStore, MockInventoryService, MockLedgerService};
    use crate::types::ResolvedMintLimit;

    fn machine(redeemed: u64) -> MachineState {
        MachineState {
            address: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            mint_authority: Pubkey::new_unique(),
            items_available: 10,
            items_redeemed: redeemed,
        }
    }

    fn config() -> CandyGuardConfig {
        CandyGuardConfig {
            guards: GuardSet {
                sol_payment: Some(SolAmount { lamports: 4 }),
                ..GuardSet::default()
            },
            groups: vec![EligibilityGroup {
                label: "WL".to_string(),
                guards: GuardSet {
                    mint_limit: Some(MintLimit { id: 1, limit: 2 }),
                    ..GuardSet::default()
                },
            }],
        }
    }

    fn silent_checker() -> EligibilityChecker {
        let mut ledger = MockLedgerService::new();
        ledger.expect_get_balance().times(0);
        let mut counters = MockCounterStore::new();
        counters.expect_fetch_counter().times(0);
        let mut inventory = MockInventoryService::new();
        inventory.expect_fetch_owned_tokens().times(0);
        inventory.expect_fetch_owned_core_assets().times(0);
        EligibilityChecker::new(
            Services::new(Arc::new(ledger), Arc::new(counters), Arc::new(inventory)),
            CheckerConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_without_configuration_returns_nothing() {
        let request = EligibilityRequest {
            identity: Some(Pubkey::new_unique()),
            machine: Some(machine(0)),
            ..EligibilityRequest::default()
        };
        assert_eq!(silent_checker().check(&request).await, EligibilityReport::default());
    }

    #[tokio::test]
    async fn test_system_address_counts_as_disconnected() {
        let request = EligibilityRequest {
            identity: Some(Pubkey::default()),
            machine: Some(machine(0)),
            guard_config: Some(config()),
            ..EligibilityRequest::default()
        };
        let report = silent_checker().check(&request).await;
        assert_eq!(report.results.len(), 2);
        assert!(report
            .results
            .iter()
            .all(|r| r.reason == Some(DenialReason::WalletNotConnected)));
    }

    #[tokio::test]
    async fn test_minted_out_skips_fetches() {
        let request = EligibilityRequest {
            identity: Some(Pubkey::new_unique()),
            machine: Some(machine(10)),
            guard_config: Some(config()),
            ..EligibilityRequest::default()
        };
        let report = silent_checker().check(&request).await;
        assert_eq!(
            report.result("default"),
            Some(&GuardEvaluationResult::denied("default", DenialReason::MintedOut))
        );
    }

    #[tokio::test]
    async fn test_groups_in_order_with_default_last() {
        let mut ledger = MockLedgerService::new();
        ledger.expect_get_balance().times(1).returning(|_| Ok(Some(9)));
        let mut counters = MockCounterStore::new();
        counters.expect_fetch_counter().times(1).returning(|_| Ok(Some(1)));
        counters.expect_counter_address().returning(|_| Pubkey::new_unique());
        let inventory = MockInventoryService::new();
        let checker = EligibilityChecker::new(
            Services::new(Arc::new(ledger), Arc::new(counters), Arc::new(inventory)),
            CheckerConfig::default(),
        )
        .unwrap();

        let request = EligibilityRequest {
            identity: Some(Pubkey::new_unique()),
            machine: Some(machine(0)),
            guard_config: Some(config()),
            ..EligibilityRequest::default()
        };
        let report = checker.check(&request).await;
        assert_eq!(
            report.results,
            vec![
                GuardEvaluationResult::allowed("WL", 1),
                GuardEvaluationResult::allowed("default", 2),
            ]
        );
    }

    #[test]
    fn test_zero_mint_cap_rejected_at_construction() {
        let services = Services::new(
            Arc::new(MockLedgerService::new()),
            Arc::new(MockCounterStore::new()),
            Arc::new(MockInventoryService::new()),
        );
        let config = CheckerConfig { max_mint_amount: Some(0), ..CheckerConfig::default() };
        assert!(matches!(
            EligibilityChecker::new(services, config),
            Err(crate::CheckerError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_merge_annotations_by_asset_key() {
        let key = Pubkey::new_unique();
        let plain = OwnedCoreAsset { address: key, update_authority: key, mint_limit: None };
        let mut base = vec![plain.clone(), OwnedCoreAsset { address: Pubkey::new_unique(), ..plain.clone() }];
        let limit = ResolvedMintLimit { remaining: 4, counter: None };
        let annotated = vec![OwnedCoreAsset { mint_limit: Some(limit), ..plain }];

        merge_annotations(&mut base, &annotated);
        assert_eq!(base[0].mint_limit, Some(limit));
        assert_eq!(base[1].mint_limit, None);
    }
}
