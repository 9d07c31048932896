use super::*;
use crate::{BalanceError, ContractConfig};
use swapledger_engine::{BatchCache, InMemoryWorldState};
use swapledger_types::{Amount, AssetAmount, TxId};

const NOW: u64 = 1_700_000_000;

fn alice() -> Address {
    Address(Hash::from_bytes(b"alice"))
}

fn secret_hash() -> Hash {
    Hash::from_bytes(b"abc")
}

fn coordinator(contract: &str, kind: SwapKind) -> SwapCoordinator {
    SwapCoordinator::new(kind, &ContractConfig::new(contract))
}

fn ctx<'c>(parent: &'c mut dyn StateCache, contract: &str, seed: &[u8], ts: u64) -> TxContext<'c> {
    TxContext::new(
        parent,
        TxId::from_seed(seed),
        ts,
        Hash::ZERO,
        ContractId::new(contract),
    )
}

#[test]
fn test_open_from_side_debits_native_balance() {
    let mut world = InMemoryWorldState::new();
    let mut batch = BatchCache::new(&mut world);
    let swaps = coordinator("CC", SwapKind::Single);

    let mut tx = ctx(&mut batch, "CC", b"open", NOW);
    tx.token_balance_add(&alice(), Amount(100), "mint").unwrap();
    let id = swaps
        .open(&mut tx, &alice(), "CC", SwapAssets::Single(Amount(60)), "VT", secret_hash())
        .unwrap();
    assert_eq!(id, TxId::from_seed(b"open"));
    assert_eq!(tx.token_balance_of(&alice()).unwrap(), Amount(40));

    let stored = swaps.get(tx.state(), &id).unwrap();
    assert_eq!(stored.creator, alice());
    assert_eq!(stored.from, "CC");
    assert_eq!(stored.timeout, NOW + 10800);

    let effects = tx.finish(None);
    assert_eq!(effects.created_swaps.len(), 1);
    assert!(effects.created_multi_swaps.is_empty());
}

#[test]
fn test_open_to_side_debits_allowed_balance() {
    let mut world = InMemoryWorldState::new();
    let mut batch = BatchCache::new(&mut world);
    let swaps = coordinator("CC", SwapKind::Single);

    let mut tx = ctx(&mut batch, "CC", b"open", NOW);
    tx.allowed_balance_add("VT", &alice(), Amount(10), "seed").unwrap();
    swaps
        .open(&mut tx, &alice(), "VT", SwapAssets::Single(Amount(10)), "VT", secret_hash())
        .unwrap();
    assert_eq!(tx.allowed_balance_of("VT", &alice()).unwrap(), Amount::ZERO);
}

#[test]
fn test_open_rejects_unrelated_token_and_shortfall() {
    let mut world = InMemoryWorldState::new();
    let mut batch = BatchCache::new(&mut world);
    let swaps = coordinator("CC", SwapKind::Single);

    let mut tx = ctx(&mut batch, "CC", b"open", NOW);
    tx.token_balance_add(&alice(), Amount(5), "mint").unwrap();
    assert_eq!(
        swaps.open(&mut tx, &alice(), "XX", SwapAssets::Single(Amount(1)), "VT", secret_hash()),
        Err(SwapError::Incorrect)
    );
    assert_eq!(
        swaps.open(&mut tx, &alice(), "CC", SwapAssets::Single(Amount(6)), "VT", secret_hash()),
        Err(SwapError::Balance(BalanceError::Insufficient))
    );
    assert_eq!(tx.token_balance_of(&alice()).unwrap(), Amount(5));
}

#[test]
fn test_single_symbol_matches_grouped_token() {
    let mut world = InMemoryWorldState::new();
    let mut batch = BatchCache::new(&mut world);
    let swaps = coordinator("CC", SwapKind::Single);

    let mut tx = ctx(&mut batch, "CC", b"open", NOW);
    tx.industrial_balance_add("CC_G1", &alice(), Amount(3), "mint").unwrap();
    swaps
        .open(&mut tx, &alice(), "CC_G1", SwapAssets::Single(Amount(3)), "VT", secret_hash())
        .unwrap();
    assert_eq!(tx.industrial_balance_of("G1", &alice()).unwrap(), Amount::ZERO);
}

#[test]
fn test_multi_rejects_empty_and_mismatched_assets() {
    let mut world = InMemoryWorldState::new();
    let mut batch = BatchCache::new(&mut world);
    let multi = coordinator("CC", SwapKind::Multi);
    let single = coordinator("CC", SwapKind::Single);

    let mut tx = ctx(&mut batch, "CC", b"open", NOW);
    assert_eq!(
        multi.open(&mut tx, &alice(), "CC", SwapAssets::Multi(vec![]), "VT", secret_hash()),
        Err(SwapError::EmptyAssets)
    );
    assert_eq!(
        single.open(&mut tx, &alice(), "CC", SwapAssets::Multi(vec![]), "VT", secret_hash()),
        Err(SwapError::Incorrect)
    );
}

fn relayed(token: &str, assets: SwapAssets) -> SwapRecord {
    SwapRecord {
        id: TxId::from_seed(b"relayed"),
        creator: alice(),
        owner: alice(),
        token: token.to_string(),
        from: "CC".to_string(),
        to: "VT".to_string(),
        assets,
        hash: secret_hash(),
        timeout: NOW + 10800,
    }
}

#[test]
fn test_answer_and_claim_native_asset_on_responder() {
    let mut world = InMemoryWorldState::new();
    let mut batch = BatchCache::new(&mut world);
    let swaps = coordinator("VT", SwapKind::Single);
    let swap = relayed("VT", SwapAssets::Single(Amount(40)));
    let id = swap.id;

    let mut tx = ctx(&mut batch, "VT", b"seed", NOW);
    tx.given_balance_add("CC", Amount(100), "seed").unwrap();
    tx.finish(None);

    let mut tx = ctx(&mut batch, "VT", b"answer", NOW);
    swaps.answer(&mut tx, swap).unwrap();
    assert_eq!(tx.given_balance_of("CC").unwrap(), Amount(60));
    let stored = swaps.get(tx.state(), &id).unwrap();
    assert!(stored.is_answered());
    assert_eq!(stored.timeout, NOW + 300);
    tx.finish(None);

    let mut tx = ctx(&mut batch, "VT", b"claim-bad", NOW + 1);
    assert_eq!(swaps.claim(&mut tx, &id, "xyz"), Err(SwapError::IncorrectKey));
    assert!(swaps.get(tx.state(), &id).is_ok());
    assert_eq!(tx.token_balance_of(&alice()).unwrap(), Amount::ZERO);
    drop(tx);

    let mut tx = ctx(&mut batch, "VT", b"claim", NOW + 1);
    swaps.claim(&mut tx, &id, "abc").unwrap();
    assert_eq!(tx.token_balance_of(&alice()).unwrap(), Amount(40));
    assert_eq!(swaps.get(tx.state(), &id), Err(SwapError::NotFound));
    let event = tx.events().get(SWAP_KEY_EVENT).unwrap().clone();
    assert_eq!(event, format!("CC\t{}\tabc", id.to_hex()).into_bytes());
}

#[test]
fn test_claim_foreign_asset_credits_allowed_balance() {
    let mut world = InMemoryWorldState::new();
    let mut batch = BatchCache::new(&mut world);
    let swaps = coordinator("VT", SwapKind::Single);
    let swap = relayed("CC", SwapAssets::Single(Amount(7)));
    let id = swap.id;

    let mut tx = ctx(&mut batch, "VT", b"answer", NOW);
    swaps.answer(&mut tx, swap).unwrap();
    swaps.claim(&mut tx, &id, "abc").unwrap();
    assert_eq!(tx.allowed_balance_of("CC", &alice()).unwrap(), Amount(7));
}

#[test]
fn test_claim_rejects_unanswered_swap() {
    let mut world = InMemoryWorldState::new();
    let mut batch = BatchCache::new(&mut world);
    let swaps = coordinator("CC", SwapKind::Single);

    let mut tx = ctx(&mut batch, "CC", b"open", NOW);
    tx.token_balance_add(&alice(), Amount(1), "mint").unwrap();
    let id = swaps
        .open(&mut tx, &alice(), "CC", SwapAssets::Single(Amount(1)), "VT", secret_hash())
        .unwrap();
    assert_eq!(swaps.claim(&mut tx, &id, "abc"), Err(SwapError::Incorrect));
}

#[test]
fn test_reveal_credits_given_balance_of_counterpart() {
    let mut world = InMemoryWorldState::new();
    let mut batch = BatchCache::new(&mut world);
    let swaps = coordinator("CC", SwapKind::Multi);

    let mut tx = ctx(&mut batch, "CC", b"open", NOW);
    tx.industrial_balance_add("CC_A", &alice(), Amount(2), "mint").unwrap();
    tx.industrial_balance_add("CC_B", &alice(), Amount(3), "mint").unwrap();
    let assets = SwapAssets::Multi(vec![
        AssetAmount::new("CC_A", Amount(2)),
        AssetAmount::new("CC_B", Amount(3)),
    ]);
    let id = swaps
        .open(&mut tx, &alice(), "CC", assets, "VT", secret_hash())
        .unwrap();
    let remaining: u128 = tx
        .industrial_balances_of(&alice())
        .unwrap()
        .values()
        .map(|amount| amount.0)
        .sum();
    assert_eq!(remaining, 0);

    assert_eq!(swaps.reveal(&mut tx, &id, "nope"), Err(SwapError::IncorrectKey));
    swaps.reveal(&mut tx, &id, "abc").unwrap();
    assert_eq!(tx.given_balance_of("VT").unwrap(), Amount(5));
    assert_eq!(swaps.get(tx.state(), &id), Err(SwapError::NotFound));
}

#[test]
fn test_cancel_timing_and_exact_refund() {
    let mut world = InMemoryWorldState::new();
    let mut batch = BatchCache::new(&mut world);
    let swaps = coordinator("CC", SwapKind::Single);

    let mut tx = ctx(&mut batch, "CC", b"open", NOW);
    tx.token_balance_add(&alice(), Amount(100), "mint").unwrap();
    let id = swaps
        .open(&mut tx, &alice(), "CC", SwapAssets::Single(Amount(60)), "VT", secret_hash())
        .unwrap();
    tx.finish(None);

    let mut tx = ctx(&mut batch, "CC", b"early", NOW + 10799);
    let err = swaps.cancel(&mut tx, &alice(), &id).unwrap_err();
    assert_eq!(err.to_string(), "wait for timeout to end");
    drop(tx);

    let mut tx = ctx(&mut batch, "CC", b"other", NOW + 10800);
    assert_eq!(
        swaps.cancel(&mut tx, &Address::ZERO, &id),
        Err(SwapError::Unauthorized)
    );
    swaps.cancel(&mut tx, &alice(), &id).unwrap();
    assert_eq!(tx.token_balance_of(&alice()).unwrap(), Amount(100));
    assert_eq!(swaps.get(tx.state(), &id), Err(SwapError::NotFound));
}

#[test]
fn test_cancel_answered_swap_restores_given_balance() {
    let mut world = InMemoryWorldState::new();
    let mut batch = BatchCache::new(&mut world);
    let swaps = coordinator("VT", SwapKind::Multi);
    let swap = relayed(
        "VT",
        SwapAssets::Multi(vec![
            AssetAmount::new("VT_A", Amount(4)),
            AssetAmount::new("VT_B", Amount(6)),
        ]),
    );
    let id = swap.id;

    let mut tx = ctx(&mut batch, "VT", b"answer", NOW);
    tx.given_balance_add("CC", Amount(10), "seed").unwrap();
    swaps.answer(&mut tx, swap).unwrap();
    assert_eq!(tx.given_balance_of("CC").unwrap(), Amount::ZERO);
    tx.finish(None);

    let mut tx = ctx(&mut batch, "VT", b"cancel", NOW + 300);
    swaps.cancel(&mut tx, &Address::ZERO, &id).unwrap();
    assert_eq!(tx.given_balance_of("CC").unwrap(), Amount(10));
}

#[test]
fn test_multi_claim_credits_group_even_for_bare_name() {
    let mut world = InMemoryWorldState::new();
    let mut batch = BatchCache::new(&mut world);
    let swaps = coordinator("VT", SwapKind::Multi);
    let swap = relayed("VT", SwapAssets::Multi(vec![AssetAmount::new("GOLD", Amount(5))]));
    let id = swap.id;

    let mut tx = ctx(&mut batch, "VT", b"answer", NOW);
    tx.given_balance_add("CC", Amount(5), "seed").unwrap();
    swaps.answer(&mut tx, swap).unwrap();
    swaps.claim(&mut tx, &id, "abc").unwrap();

    assert_eq!(tx.industrial_balance_of("GOLD", &alice()).unwrap(), Amount(5));
    assert_eq!(tx.token_balance_of(&alice()).unwrap(), Amount::ZERO);
}

#[test]
fn test_expiry_overflow_is_rejected() {
    let mut world = InMemoryWorldState::new();
    let mut batch = BatchCache::new(&mut world);
    let swaps = coordinator("CC", SwapKind::Single);
    let late = u64::MAX - 5;

    let mut tx = ctx(&mut batch, "CC", b"open", late);
    tx.token_balance_add(&alice(), Amount(10), "mint").unwrap();
    assert_eq!(
        swaps.open(&mut tx, &alice(), "CC", SwapAssets::Single(Amount(10)), "VT", secret_hash()),
        Err(SwapError::TimeoutOverflow {
            now: late,
            window: 10800
        })
    );
    assert_eq!(tx.token_balance_of(&alice()).unwrap(), Amount(10));
    drop(tx);

    let answered = coordinator("VT", SwapKind::Single);
    let mut tx = ctx(&mut batch, "VT", b"answer", late);
    assert!(matches!(
        answered.answer(&mut tx, relayed("CC", SwapAssets::Single(Amount(1)))),
        Err(SwapError::TimeoutOverflow { window: 300, .. })
    ));
}
