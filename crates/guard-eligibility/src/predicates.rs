//! Guard predicates
//!
//! One pure function per guard kind. Predicates take data that was already
//! fetched and never perform I/O. A predicate either admits (optionally with
//! the number of units it allows) or denies with a [`DenialReason`].

use crate::allowlist::Allowlists;
use crate::guards::{
    AddressGate, DateGuard, RedeemedAmount, RequiredCollection, RequiredCollectionMulti,
    SolAmount, TokenAmount,
};
use crate::types::{DenialReason, OwnedAsset, OwnedToken};
use solana_sdk::pubkey::Pubkey;
use tracing::error;

/// Outcome of a single guard: `Ok(Some(n))` allows `n` units, `Ok(None)`
/// admits without a quantity
pub type GuardCheck = std::result::Result<Option<u64>, DenialReason>;

// ================================
// Arithmetic
// ================================

/// Lowers `current` to `candidate` and applies the optional global cap
pub fn clamp_mintable(current: u64, candidate: u64, cap: Option<u64>) -> u64 {
    let clamped = current.min(candidate);
    match cap {
        Some(cap) => clamped.min(cap),
        None => clamped,
    }
}

/// Whole units payable from `balance`; `None` when the cost is zero
pub fn units_affordable(balance: u64, unit_cost: u64) -> Option<u64> {
    balance.checked_div(unit_cost)
}

/// Remaining allowance of a counter, an absent counter counts as zero used
pub fn remaining_allowance(limit: u64, consumed: Option<u32>) -> u64 {
    limit.saturating_sub(consumed.map_or(0, u64::from))
}

// ================================
// Identity & Time
// ================================

pub fn address_gate(caller: &Pubkey, gate: &AddressGate) -> GuardCheck {
    if *caller == gate.address {
        Ok(None)
    } else {
        Err(DenialReason::WrongAddress)
    }
}

pub fn start_date(now: i64, gate: &DateGuard) -> GuardCheck {
    if now < gate.date {
        return Err(DenialReason::MintNotStarted);
    }
    Ok(None)
}

pub fn end_date(now: i64, gate: &DateGuard) -> GuardCheck {
    if now > gate.date {
        return Err(DenialReason::MintEnded);
    }
    Ok(None)
}

/// A group without a registered list is a configuration error and denies
pub fn allow_list(caller: &Pubkey, label: &str, allowlists: &Allowlists) -> GuardCheck {
    match allowlists.contains(label, caller) {
        Some(true) => Ok(None),
        Some(false) => Err(DenialReason::NotAllowlisted),
        None => {
            error!("Guard {}: allowlist missing from allowlist configuration", label);
            Err(DenialReason::NotAllowlisted)
        }
    }
}

// ================================
// SOL
// ================================

/// Combined `solPayment` + `solFixedFee` cost
pub fn sol_payment(
    balance: u64,
    payment: Option<&SolAmount>,
    fixed_fee: Option<&SolAmount>,
) -> GuardCheck {
    let cost = payment
        .map_or(0, |p| p.lamports)
        .saturating_add(fixed_fee.map_or(0, |f| f.lamports));

    match units_affordable(balance, cost) {
        Some(0) => Err(DenialReason::NotEnoughSol),
        units => Ok(units),
    }
}

pub fn freeze_sol_payment(balance: u64, payment: &SolAmount) -> GuardCheck {
    if balance < payment.lamports {
        return Err(DenialReason::NotEnoughSol);
    }
    Ok(units_affordable(balance, payment.lamports))
}

// ================================
// Fungible Tokens
// ================================

/// Total amount of `mint` across the caller's token holdings
pub fn held_amount(tokens: &[OwnedToken], mint: &Pubkey) -> u64 {
    tokens
        .iter()
        .filter(|t| t.mint == *mint)
        .fold(0u64, |acc, t| acc.saturating_add(t.amount))
}

pub fn token_gate(tokens: &[OwnedToken], gate: &TokenAmount) -> GuardCheck {
    if held_amount(tokens, &gate.mint) < gate.amount {
        return Err(DenialReason::NotEnoughTokens);
    }
    Ok(None)
}

/// Burn, payment, freeze and token-2022 payment all consume `amount` per unit
pub fn token_payment(tokens: &[OwnedToken], payment: &TokenAmount) -> GuardCheck {
    let held = held_amount(tokens, &payment.mint);
    if held == 0 || held < payment.amount {
        return Err(DenialReason::NotEnoughTokens);
    }
    Ok(units_affordable(held, payment.amount))
}

// ================================
// Collections
// ================================

pub fn count_in_collection<A: OwnedAsset>(assets: &[A], collection: &Pubkey) -> u64 {
    assets.iter().filter(|a| a.belongs_to(collection)).count() as u64
}

pub fn collection_gate<A: OwnedAsset>(
    assets: &[A],
    gate: &RequiredCollection,
    reason: DenialReason,
) -> GuardCheck {
    if count_in_collection(assets, &gate.required_collection) == 0 {
        return Err(reason);
    }
    Ok(None)
}

/// Burn and payment guards consume one owned asset per unit
pub fn collection_payment<A: OwnedAsset>(
    assets: &[A],
    payment: &RequiredCollection,
    reason: DenialReason,
) -> GuardCheck {
    match count_in_collection(assets, &payment.required_collection) {
        0 => Err(reason),
        count => Ok(Some(count)),
    }
}

/// Multi variants consume `num` owned assets per unit
pub fn collection_payment_multi<A: OwnedAsset>(
    assets: &[A],
    payment: &RequiredCollectionMulti,
    reason: DenialReason,
) -> GuardCheck {
    let count = count_in_collection(assets, &payment.required_collection);
    match count / u64::from(payment.num.max(1)) {
        0 => Err(reason),
        units => Ok(Some(units)),
    }
}

/// Sum of per-asset remaining allowances
pub fn collection_mint_limit<A: OwnedAsset>(eligible: &[A], reason: DenialReason) -> GuardCheck {
    let total = eligible
        .iter()
        .filter_map(OwnedAsset::mint_limit)
        .fold(0u64, |acc, limit| acc.saturating_add(limit.remaining));

    if total == 0 {
        return Err(reason);
    }
    Ok(Some(total))
}

// ================================
// Counters
// ================================

pub fn wallet_mint_limit(remaining: u64) -> GuardCheck {
    if remaining == 0 {
        return Err(DenialReason::WalletMintLimitReached);
    }
    Ok(Some(remaining))
}

pub fn allocation(remaining: u64) -> GuardCheck {
    if remaining == 0 {
        return Err(DenialReason::AllocationReached);
    }
    Ok(Some(remaining))
}

pub fn redeemed_amount(items_redeemed: u64, gate: &RedeemedAmount) -> GuardCheck {
    if items_redeemed >= gate.maximum {
        return Err(DenialReason::RedeemedAmountReached);
    }
    Ok(Some(gate.maximum - items_redeemed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MetadataCollection, OwnedCoreAsset, ResolvedMintLimit};
    use proptest::prelude::*;

    fn token(mint: Pubkey, amount: u64) -> OwnedToken {
        OwnedToken { mint, amount, collection: None, mint_limit: None }
    }

    fn nft(collection: Pubkey, verified: bool) -> OwnedToken {
        OwnedToken {
            mint: Pubkey::new_unique(),
            amount: 1,
            collection: Some(MetadataCollection { key: collection, verified }),
            mint_limit: None,
        }
    }

    fn core_asset(collection: Pubkey, remaining: Option<u64>) -> OwnedCoreAsset {
        OwnedCoreAsset {
            address: Pubkey::new_unique(),
            update_authority: collection,
            mint_limit: remaining.map(|remaining| ResolvedMintLimit { remaining, counter: None }),
        }
    }

    #[test]
    fn test_address_gate() {
        let caller = Pubkey::new_unique();
        assert_eq!(address_gate(&caller, &AddressGate { address: caller }), Ok(None));
        assert_eq!(
            address_gate(&caller, &AddressGate { address: Pubkey::new_unique() }),
            Err(DenialReason::WrongAddress)
        );
    }

    #[test]
    fn test_date_gates_are_inclusive() {
        let gate = DateGuard { date: 1_700_000_000 };
        assert_eq!(start_date(1_700_000_000, &gate), Ok(None));
        assert_eq!(start_date(1_699_999_999, &gate), Err(DenialReason::MintNotStarted));
        assert_eq!(end_date(1_700_000_000, &gate), Ok(None));
        assert_eq!(end_date(1_700_000_001, &gate), Err(DenialReason::MintEnded));
    }

    #[test]
    fn test_allow_list_missing_label_denies() {
        let caller = Pubkey::new_unique();
        let mut lists = Allowlists::new();
        lists.insert("WL", vec![caller.to_string()]);

        assert_eq!(allow_list(&caller, "WL", &lists), Ok(None));
        assert_eq!(allow_list(&caller, "OG", &lists), Err(DenialReason::NotAllowlisted));
        assert_eq!(
            allow_list(&Pubkey::new_unique(), "WL", &lists),
            Err(DenialReason::NotAllowlisted)
        );
    }

    #[test]
    fn test_sol_payment_floor_division() {
        let payment = SolAmount { lamports: 2 };
        let fee = SolAmount { lamports: 1 };
        assert_eq!(sol_payment(10, Some(&payment), Some(&fee)), Ok(Some(3)));
        assert_eq!(sol_payment(2, Some(&payment), Some(&fee)), Err(DenialReason::NotEnoughSol));
    }

    #[test]
    fn test_sol_payment_zero_cost_is_unconstrained() {
        let free = SolAmount { lamports: 0 };
        assert_eq!(sol_payment(0, Some(&free), None), Ok(None));
        assert_eq!(sol_payment(10, None, None), Ok(None));
    }

    #[test]
    fn test_freeze_sol_payment() {
        let payment = SolAmount { lamports: 4 };
        assert_eq!(freeze_sol_payment(9, &payment), Ok(Some(2)));
        assert_eq!(freeze_sol_payment(3, &payment), Err(DenialReason::NotEnoughSol));
        assert_eq!(freeze_sol_payment(0, &SolAmount { lamports: 0 }), Ok(None));
    }

    #[test]
    fn test_token_payment_and_gate() {
        let mint = Pubkey::new_unique();
        let tokens = vec![token(mint, 7), token(Pubkey::new_unique(), 100)];
        let required = TokenAmount { amount: 3, mint };

        assert_eq!(token_payment(&tokens, &required), Ok(Some(2)));
        assert_eq!(token_gate(&tokens, &required), Ok(None));

        let too_much = TokenAmount { amount: 8, mint };
        assert_eq!(token_payment(&tokens, &too_much), Err(DenialReason::NotEnoughTokens));
        assert_eq!(token_gate(&tokens, &too_much), Err(DenialReason::NotEnoughTokens));
        assert_eq!(
            token_payment(&[], &required),
            Err(DenialReason::NotEnoughTokens)
        );
    }

    #[test]
    fn test_held_amount_sums_accounts_of_same_mint() {
        let mint = Pubkey::new_unique();
        let tokens = vec![token(mint, 2), token(mint, 3)];
        assert_eq!(held_amount(&tokens, &mint), 5);
    }

    #[test]
    fn test_collection_counts_only_verified() {
        let collection = Pubkey::new_unique();
        let nfts = vec![
            nft(collection, true),
            nft(collection, false),
            nft(Pubkey::new_unique(), true),
        ];
        let required = RequiredCollection { required_collection: collection };

        assert_eq!(
            collection_payment(&nfts, &required, DenialReason::NoNftToPay),
            Ok(Some(1))
        );
        assert_eq!(collection_gate(&nfts, &required, DenialReason::NoNftHeld), Ok(None));
        assert_eq!(
            collection_payment(&nfts[1..], &required, DenialReason::NoNftToBurn),
            Err(DenialReason::NoNftToBurn)
        );
    }

    #[test]
    fn test_collection_payment_multi_divides() {
        let collection = Pubkey::new_unique();
        let assets: Vec<_> = (0..5).map(|_| core_asset(collection, None)).collect();
        let per_mint = RequiredCollectionMulti { required_collection: collection, num: 2 };

        assert_eq!(
            collection_payment_multi(&assets, &per_mint, DenialReason::NoAssetToPay),
            Ok(Some(2))
        );
        assert_eq!(
            collection_payment_multi(&assets[..1], &per_mint, DenialReason::NoAssetToBurn),
            Err(DenialReason::NoAssetToBurn)
        );
    }

    #[test]
    fn test_collection_mint_limit_sums_remaining() {
        let collection = Pubkey::new_unique();
        let eligible = vec![core_asset(collection, Some(2)), core_asset(collection, Some(3))];
        assert_eq!(
            collection_mint_limit(&eligible, DenialReason::AssetMintLimitReached),
            Ok(Some(5))
        );
        assert_eq!(
            collection_mint_limit::<OwnedCoreAsset>(&[], DenialReason::AssetMintLimitReached),
            Err(DenialReason::AssetMintLimitReached)
        );
    }

    #[test]
    fn test_remaining_allowance() {
        assert_eq!(remaining_allowance(5, Some(3)), 2);
        assert_eq!(remaining_allowance(5, None), 5);
        assert_eq!(remaining_allowance(5, Some(9)), 0);
    }

    #[test]
    fn test_redeemed_amount() {
        let gate = RedeemedAmount { maximum: 100 };
        assert_eq!(redeemed_amount(60, &gate), Ok(Some(40)));
        assert_eq!(redeemed_amount(100, &gate), Err(DenialReason::RedeemedAmountReached));
        assert_eq!(redeemed_amount(150, &gate), Err(DenialReason::RedeemedAmountReached));
    }

    #[test]
    fn test_counter_guards_deny_at_zero() {
        assert_eq!(wallet_mint_limit(0), Err(DenialReason::WalletMintLimitReached));
        assert_eq!(wallet_mint_limit(2), Ok(Some(2)));
        assert_eq!(allocation(0), Err(DenialReason::AllocationReached));
    }

    #[test]
    fn test_clamp_applies_cap() {
        assert_eq!(clamp_mintable(10, 7, None), 7);
        assert_eq!(clamp_mintable(10, 7, Some(3)), 3);
        assert_eq!(clamp_mintable(2, 7, Some(3)), 2);
    }

    proptest! {
        #[test]
        fn prop_sol_payment_never_overspends(balance in 0u64..1_000_000_000, cost in 1u64..10_000_000) {
            let payment = SolAmount { lamports: cost };
            match sol_payment(balance, Some(&payment), None) {
                Ok(Some(units)) => {
                    prop_assert!(units * cost <= balance);
                    prop_assert!((units + 1) * cost > balance);
                }
                Ok(None) => prop_assert!(false, "non-zero cost must yield a quantity"),
                Err(reason) => {
                    prop_assert_eq!(reason, DenialReason::NotEnoughSol);
                    prop_assert!(balance < cost);
                }
            }
        }

        #[test]
        fn prop_clamp_is_minimum(current in any::<u64>(), candidate in any::<u64>(), cap in proptest::option::of(any::<u64>())) {
            let clamped = clamp_mintable(current, candidate, cap);
            prop_assert!(clamped <= current);
            prop_assert!(clamped <= candidate);
            if let Some(cap) = cap {
                prop_assert!(clamped <= cap);
            }
        }
    }
}
