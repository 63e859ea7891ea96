//! Per-group guard evaluation
//!
//! A group starts with the remaining machine supply as its mintable amount and
//! walks its guards in [`GuardKind::ORDER`]. Each guard either denies, ending
//! the group, or lowers the mintable amount. Holdings are borrowed from the
//! shared snapshot and only copied when a mint-limit guard annotates them.

use crate::allowlist::Allowlists;
use crate::fetchers::SharedState;
use crate::guards::GuardKind;
use crate::mint_limits::{
    resolve_allocation, resolve_asset_mint_limit, resolve_nft_mint_limit,
    resolve_wallet_mint_limit,
};
use crate::predicates::{self, clamp_mintable, GuardCheck};
use crate::services::CounterStore;
use crate::types::{
    DenialReason, EligibilityGroup, GuardEvaluationResult, GuardWarning, MachineState,
    OwnedCoreAsset, OwnedToken,
};
use solana_sdk::pubkey::Pubkey;
use std::borrow::Cow;
use tracing::debug;

/// Everything a group evaluation reads; shared by all groups of a pass
pub struct EvaluationContext<'a> {
    pub machine: &'a MachineState,
    pub caller: Pubkey,
    /// Ledger time in unix seconds
    pub now: i64,
    pub allowlists: &'a Allowlists,
    pub max_mint_amount: Option<u64>,
    pub counters: &'a dyn CounterStore,
    pub shared: &'a SharedState,
}

/// Result of one group plus its annotated holdings, if any were produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    pub result: GuardEvaluationResult,
    pub tokens: Option<Vec<OwnedToken>>,
    pub core_assets: Option<Vec<OwnedCoreAsset>>,
}

struct GroupState<'a> {
    mintable: u64,
    tokens: Cow<'a, [OwnedToken]>,
    core_assets: Cow<'a, [OwnedCoreAsset]>,
    warnings: Vec<GuardWarning>,
}

fn into_annotated<T: Clone>(holdings: Cow<'_, [T]>) -> Option<Vec<T>> {
    match holdings {
        Cow::Owned(annotated) => Some(annotated),
        Cow::Borrowed(_) => None,
    }
}

pub struct GroupEvaluator<'a> {
    ctx: &'a EvaluationContext<'a>,
}

impl<'a> GroupEvaluator<'a> {
    pub fn new(ctx: &'a EvaluationContext<'a>) -> Self {
        Self { ctx }
    }

    pub async fn evaluate(&self, group: &EligibilityGroup) -> GroupOutcome {
        let remaining = self.ctx.machine.items_remaining();
        let mut state = GroupState {
            mintable: clamp_mintable(remaining, remaining, self.ctx.max_mint_amount),
            tokens: Cow::Borrowed(self.ctx.shared.tokens.as_slice()),
            core_assets: Cow::Borrowed(self.ctx.shared.core_assets.as_slice()),
            warnings: Vec::new(),
        };

        let mut denial = None;
        for kind in group.guards.active_kinds() {
            match self.apply(kind, group, &mut state).await {
                Ok(Some(allowance)) => {
                    state.mintable =
                        clamp_mintable(state.mintable, allowance, self.ctx.max_mint_amount);
                    debug!("Group {}: {:?} allows {}", group.label, kind, allowance);
                }
                Ok(None) => debug!("Group {}: {:?} passed", group.label, kind),
                Err(reason) => {
                    debug!("Group {}: {:?} denied: {}", group.label, kind, reason);
                    denial = Some(reason);
                    break;
                }
            }
        }

        let result = match denial {
            Some(reason) => GuardEvaluationResult::denied(&group.label, reason),
            None => GuardEvaluationResult::allowed(&group.label, state.mintable),
        }
        .with_warnings(state.warnings);

        GroupOutcome {
            result,
            tokens: into_annotated(state.tokens),
            core_assets: into_annotated(state.core_assets),
        }
    }

    async fn apply(
        &self,
        kind: GuardKind,
        group: &EligibilityGroup,
        state: &mut GroupState<'a>,
    ) -> GuardCheck {
        let ctx = self.ctx;
        let guards = &group.guards;
        let balance = ctx.shared.sol_balance;

        match kind {
            GuardKind::AddressGate => guards
                .address_gate
                .as_ref()
                .map_or(Ok(None), |gate| predicates::address_gate(&ctx.caller, gate)),
            GuardKind::Allocation => {
                let Some(guard) = &guards.allocation else {
                    return Ok(None);
                };
                let (remaining, warning) =
                    resolve_allocation(ctx.counters, guard, ctx.machine).await;
                state.warnings.extend(warning);
                predicates::allocation(remaining)
            }
            GuardKind::AllowList => {
                predicates::allow_list(&ctx.caller, &group.label, ctx.allowlists)
            }
            GuardKind::AssetBurn => guards.asset_burn.as_ref().map_or(Ok(None), |burn| {
                predicates::collection_payment(&state.core_assets, burn, DenialReason::NoAssetToBurn)
            }),
            GuardKind::AssetBurnMulti => guards.asset_burn_multi.as_ref().map_or(Ok(None), |burn| {
                predicates::collection_payment_multi(
                    &state.core_assets,
                    burn,
                    DenialReason::NoAssetToBurn,
                )
            }),
            GuardKind::AssetGate => guards.asset_gate.as_ref().map_or(Ok(None), |gate| {
                predicates::collection_gate(&state.core_assets, gate, DenialReason::NoAssetHeld)
            }),
            GuardKind::AssetMintLimit => {
                let Some(guard) = &guards.asset_mint_limit else {
                    return Ok(None);
                };
                let resolution =
                    resolve_asset_mint_limit(ctx.counters, guard, &state.core_assets, ctx.machine)
                        .await;
                state.core_assets = Cow::Owned(resolution.holdings);
                predicates::collection_mint_limit(
                    &resolution.eligible,
                    DenialReason::AssetMintLimitReached,
                )
            }
            GuardKind::AssetPayment => guards.asset_payment.as_ref().map_or(Ok(None), |payment| {
                predicates::collection_payment(&state.core_assets, payment, DenialReason::NoAssetToPay)
            }),
            GuardKind::AssetPaymentMulti => {
                guards.asset_payment_multi.as_ref().map_or(Ok(None), |payment| {
                    predicates::collection_payment_multi(
                        &state.core_assets,
                        payment,
                        DenialReason::NoAssetToPay,
                    )
                })
            }
            GuardKind::EndDate => guards
                .end_date
                .as_ref()
                .map_or(Ok(None), |gate| predicates::end_date(ctx.now, gate)),
            GuardKind::FreezeSolPayment => guards
                .freeze_sol_payment
                .as_ref()
                .map_or(Ok(None), |payment| predicates::freeze_sol_payment(balance, payment)),
            GuardKind::FreezeTokenPayment => guards
                .freeze_token_payment
                .as_ref()
                .map_or(Ok(None), |payment| predicates::token_payment(&state.tokens, payment)),
            GuardKind::MintLimit => {
                let Some(guard) = &guards.mint_limit else {
                    return Ok(None);
                };
                let remaining =
                    resolve_wallet_mint_limit(ctx.counters, guard, ctx.caller, ctx.machine).await;
                predicates::wallet_mint_limit(remaining)
            }
            GuardKind::NftBurn => guards.nft_burn.as_ref().map_or(Ok(None), |burn| {
                predicates::collection_payment(&state.tokens, burn, DenialReason::NoNftToBurn)
            }),
            GuardKind::NftGate => guards.nft_gate.as_ref().map_or(Ok(None), |gate| {
                predicates::collection_gate(&state.tokens, gate, DenialReason::NoNftHeld)
            }),
            GuardKind::NftMintLimit => {
                let Some(guard) = &guards.nft_mint_limit else {
                    return Ok(None);
                };
                let resolution =
                    resolve_nft_mint_limit(ctx.counters, guard, &state.tokens, ctx.machine).await;
                state.tokens = Cow::Owned(resolution.holdings);
                predicates::collection_mint_limit(
                    &resolution.eligible,
                    DenialReason::NftMintLimitReached,
                )
            }
            GuardKind::NftPayment => guards.nft_payment.as_ref().map_or(Ok(None), |payment| {
                predicates::collection_payment(&state.tokens, payment, DenialReason::NoNftToPay)
            }),
            GuardKind::RedeemedAmount => guards.redeemed_amount.as_ref().map_or(Ok(None), |gate| {
                predicates::redeemed_amount(ctx.machine.items_redeemed, gate)
            }),
            // Evaluated together with solPayment when both are present
            GuardKind::SolFixedFee => match (&guards.sol_payment, &guards.sol_fixed_fee) {
                (None, Some(fee)) => predicates::sol_payment(balance, None, Some(fee)),
                _ => Ok(None),
            },
            GuardKind::SolPayment => predicates::sol_payment(
                balance,
                guards.sol_payment.as_ref(),
                guards.sol_fixed_fee.as_ref(),
            ),
            GuardKind::StartDate => guards
                .start_date
                .as_ref()
                .map_or(Ok(None), |gate| predicates::start_date(ctx.now, gate)),
            GuardKind::Token2022Payment => guards
                .token2022_payment
                .as_ref()
                .map_or(Ok(None), |payment| predicates::token_payment(&state.tokens, payment)),
            GuardKind::TokenBurn => guards
                .token_burn
                .as_ref()
                .map_or(Ok(None), |burn| predicates::token_payment(&state.tokens, burn)),
            GuardKind::TokenGate => guards
                .token_gate
                .as_ref()
                .map_or(Ok(None), |gate| predicates::token_gate(&state.tokens, gate)),
            GuardKind::TokenPayment => guards
                .token_payment
                .as_ref()
                .map_or(Ok(None), |payment| predicates::token_payment(&state.tokens, payment)),
        }
    }
}
