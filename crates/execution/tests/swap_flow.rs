//! Hash-locked swaps between two contracts, relayed by hand.

use swapledger_engine::{InMemoryWorldState, WorldState};
use swapledger_execution::{
    Contract, ContractError, ExecutionError, InvokeResponse, OperationRegistry,
    StaticAccessControl, BATCH_EXECUTE, MULTI_SWAP_DONE, MULTI_SWAP_KEY_EVENT, SWAP_DONE,
};
use swapledger_test_helpers::{
    contract_config, invocation, robot_invocation, with_context, TestAccount, NONCE_BASE, NOW,
};
use swapledger_types::{Amount, Batch, BatchResponse, Hash, SwapAssets, SwapRecord, TxId};

const SECRET: &str = "abc";

fn contract(id: &str) -> Contract {
    let config = contract_config(id);
    let registry = OperationRegistry::builder()
        .with_swap_operations(&config)
        .build(&config);
    Contract::new(config, registry, StaticAccessControl::new()).unwrap()
}

fn channel(contract: &Contract) -> String {
    contract.config().contract_id.as_str().to_lowercase()
}

fn call(
    contract: &Contract,
    world: &mut dyn WorldState,
    seed: &str,
    timestamp: u64,
    function: &str,
    args: &[String],
) -> Result<InvokeResponse, ContractError> {
    let invocation = invocation(seed, &channel(contract), timestamp);
    contract.invoke(world, &invocation, function, args)
}

fn stage(
    contract: &Contract,
    world: &mut dyn WorldState,
    user: &TestAccount,
    seed: &str,
    method: &str,
    args: &[&str],
    nonce: u64,
) -> TxId {
    let id = contract.config().contract_id.as_str();
    let wire = user.sign_call(id, &channel(contract), method, args, nonce);
    call(contract, world, seed, NOW, method, &wire).unwrap();
    TxId::from_seed(seed.as_bytes())
}

fn execute(
    contract: &Contract,
    world: &mut dyn WorldState,
    timestamp: u64,
    batch: Batch,
) -> BatchResponse {
    let batch = batch.to_json().unwrap();
    let invocation = robot_invocation("batch", &channel(contract), timestamp);
    let response = contract
        .invoke(world, &invocation, BATCH_EXECUTE, &[batch])
        .unwrap();
    serde_json::from_slice(&response.payload.unwrap()).unwrap()
}

#[test]
fn test_multi_asset_swap_end_to_end() {
    let cc = contract("CC");
    let vt = contract("VT");
    let alice = TestAccount::new(1);
    let mut cc_world = InMemoryWorldState::new();
    let mut vt_world = InMemoryWorldState::new();
    with_context(&mut cc_world, "CC", |ctx| {
        ctx.industrial_balance_add("CC_A", &alice.address, Amount(60), "fixture")
            .unwrap();
        ctx.industrial_balance_add("CC_B", &alice.address, Amount(40), "fixture")
            .unwrap();
    });

    // Open on the initiating contract.
    let assets = r#"{"assets":[{"group":"CC_A","amount":"60"},{"group":"CC_B","amount":"40"}]}"#;
    let hash = Hash::from_bytes(SECRET.as_bytes()).to_hex();
    let id = stage(
        &cc,
        &mut cc_world,
        &alice,
        "open",
        "multiSwapBegin",
        &["CC", assets, "VT", &hash],
        NONCE_BASE,
    );
    let opened = execute(&cc, &mut cc_world, NOW, Batch::new(vec![id]));
    assert_eq!(opened.tx_responses[0].error, None);
    let record: SwapRecord = opened.created_multi_swaps[0].clone();
    assert_eq!(record.id, id);
    let left = with_context(&mut cc_world, "CC", |ctx| {
        ctx.industrial_balances_of(&alice.address).unwrap()
    });
    assert!(left.values().all(|amount| amount.is_zero()));

    // Relay the record to the responder.
    let answered = execute(
        &vt,
        &mut vt_world,
        NOW + 60,
        Batch::default().with_multi_swap(record),
    );
    assert_eq!(answered.swap_responses[0].error, None);

    // A wrong secret leaves everything in place.
    let err = call(
        &vt,
        &mut vt_world,
        "claim-bad",
        NOW + 61,
        MULTI_SWAP_DONE,
        &[id.to_hex(), "xyz".to_string()],
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "incorrect key");
    assert!(call(&vt, &mut vt_world, "get", NOW + 61, "multiSwapGet", &[id.to_hex()]).is_ok());

    // The right secret pays out on the responder and emits the key.
    let claimed = call(
        &vt,
        &mut vt_world,
        "claim",
        NOW + 62,
        MULTI_SWAP_DONE,
        &[id.to_hex(), SECRET.to_string()],
    )
    .unwrap();
    assert_eq!(claimed.events[0].name, MULTI_SWAP_KEY_EVENT);
    assert_eq!(
        claimed.events[0].payload,
        format!("CC\t{}\t{SECRET}", id.to_hex()).into_bytes()
    );
    let credited = with_context(&mut vt_world, "VT", |ctx| {
        (
            ctx.allowed_balance_of("CC_A", &alice.address).unwrap(),
            ctx.allowed_balance_of("CC_B", &alice.address).unwrap(),
        )
    });
    assert_eq!(credited, (Amount(60), Amount(40)));
    let gone = call(&vt, &mut vt_world, "get", NOW + 62, "multiSwapGet", &[id.to_hex()]);
    assert_eq!(gone.unwrap_err().to_string(), "swap doesn't exist");

    // Relay the secret back; the initiator now owes the responder.
    let revealed = execute(
        &cc,
        &mut cc_world,
        NOW + 120,
        Batch::default().with_multi_swap_key(id, SECRET),
    );
    assert_eq!(revealed.swap_key_responses[0].error, None);
    let owed = with_context(&mut cc_world, "CC", |ctx| ctx.given_balance_of("VT").unwrap());
    assert_eq!(owed, Amount(100));
    let gone = call(&cc, &mut cc_world, "get", NOW + 120, "multiSwapGet", &[id.to_hex()]);
    assert!(gone.is_err());
}

#[test]
fn test_single_swap_cancel_after_timeout() {
    let cc = contract("CC");
    let alice = TestAccount::new(1);
    let mut world = InMemoryWorldState::new();
    with_context(&mut world, "CC", |ctx| {
        ctx.token_balance_add(&alice.address, Amount(100), "fixture")
            .unwrap();
    });
    let hash = Hash::from_bytes(SECRET.as_bytes()).to_hex();
    let balance = |world: &mut InMemoryWorldState| {
        with_context(world, "CC", |ctx| ctx.token_balance_of(&alice.address).unwrap())
    };

    let id = stage(
        &cc,
        &mut world,
        &alice,
        "open",
        "swapBegin",
        &["CC", "VT", "30", &hash],
        NONCE_BASE,
    );
    execute(&cc, &mut world, NOW, Batch::new(vec![id]));
    assert_eq!(balance(&mut world), Amount(70));

    let early = stage(
        &cc,
        &mut world,
        &alice,
        "cancel-early",
        "swapCancel",
        &[&id.to_hex()],
        NONCE_BASE + 1,
    );
    let response = execute(&cc, &mut world, NOW + 10, Batch::new(vec![early]));
    assert_eq!(
        response.tx_responses[0].error.as_deref(),
        Some("wait for timeout to end")
    );
    assert_eq!(balance(&mut world), Amount(70));

    let late = stage(
        &cc,
        &mut world,
        &alice,
        "cancel-late",
        "swapCancel",
        &[&id.to_hex()],
        NONCE_BASE + 2,
    );
    let response = execute(&cc, &mut world, NOW + 10_800, Batch::new(vec![late]));
    assert_eq!(response.tx_responses[0].error, None);
    assert_eq!(balance(&mut world), Amount(100));
}

#[test]
fn test_swaps_can_be_disabled() {
    let config = contract_config("VT").with_swaps_disabled();
    let registry = OperationRegistry::builder()
        .with_swap_operations(&config)
        .build(&config);
    let vt = Contract::new(config, registry, StaticAccessControl::new()).unwrap();
    let mut world = InMemoryWorldState::new();

    let err = call(&vt, &mut world, "done", NOW, SWAP_DONE, &[]).unwrap_err();
    assert_eq!(err.to_string(), "swaps disabled");
    assert!(vt.registry().resolve("swapBegin").is_none());
    assert!(vt.registry().resolve("multiSwapBegin").is_some());
}

#[test]
fn test_answer_from_foreign_submitter_is_rejected() {
    let vt = contract("VT");
    let mallory = TestAccount::new(9);
    let mut world = InMemoryWorldState::new();
    let id = TxId::from_seed(b"forged");
    let forged = SwapRecord {
        id,
        creator: mallory.address,
        owner: mallory.address,
        token: "CC".to_string(),
        from: "CC".to_string(),
        to: "VT".to_string(),
        assets: SwapAssets::Single(Amount(1_000_000)),
        hash: Hash::from_bytes(b"x"),
        timeout: NOW + 10_800,
    };

    let batch = Batch::default().with_swap(forged).to_json().unwrap();
    let err = call(&vt, &mut world, "batch", NOW, BATCH_EXECUTE, &[batch]).unwrap_err();
    assert_eq!(
        err,
        ContractError::Execution(ExecutionError::UnauthorizedSubmitter(Hash::ZERO))
    );
    assert!(world.is_empty());

    let err = call(&vt, &mut world, "claim", NOW + 1, SWAP_DONE, &[id.to_hex(), "x".to_string()])
        .unwrap_err();
    assert_eq!(err.to_string(), "swap doesn't exist");
    let allowed = with_context(&mut world, "VT", |ctx| {
        ctx.allowed_balance_of("CC", &mallory.address).unwrap()
    });
    assert_eq!(allowed, Amount::ZERO);
}
