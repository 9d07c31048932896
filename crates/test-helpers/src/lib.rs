//! Test helpers for swapledger.
//!
//! Deterministic accounts with properly-signed request builders, funded
//! world states and a world state whose writes can be made to fail.

use swapledger_engine::{BatchCache, InMemoryWorldState, StorageError, WorldState};
use swapledger_execution::{ContractConfig, Invocation, SignedRequest, TxContext};
use swapledger_types::{Address, ContractId, Hash, KeyPair, TxId, WriteElement};

/// Batch and call timestamp used across tests, in seconds.
pub const NOW: u64 = 1_700_000_000;

/// First nonce handed out by [`TestAccount`], a millisecond timestamp.
pub const NONCE_BASE: u64 = 1_700_000_000_000;

/// A deterministic single-key account.
#[derive(Debug, Clone)]
pub struct TestAccount {
    pub keypair: KeyPair,
    pub address: Address,
}

impl TestAccount {
    pub fn new(seed: u8) -> Self {
        let keypair = KeyPair::from_seed(&[seed; 32]);
        let address = Address::from_public_keys(&[keypair.public_key()]);
        Self { keypair, address }
    }

    /// Wire arguments of a call to `method` signed by this account.
    pub fn sign_call(
        &self,
        contract: &str,
        channel: &str,
        method: &str,
        args: &[&str],
        nonce: u64,
    ) -> Vec<String> {
        SignedRequest::new(
            method,
            format!("{method}-{nonce}"),
            contract,
            channel,
            args.iter().map(|arg| arg.to_string()).collect(),
            nonce,
        )
        .sign(&[&self.keypair])
        .to_wire()
    }
}

/// Fingerprint of the identity that submits batches in tests.
pub fn robot() -> Hash {
    Hash::from_bytes(b"batch robot")
}

/// Config of `contract` with [`robot`] as its batch submitter.
pub fn contract_config(contract: &str) -> ContractConfig {
    ContractConfig::new(contract).with_batch_submitter(robot())
}

/// Ledger context of a client call made at `timestamp`.
pub fn invocation(seed: &str, channel: &str, timestamp: u64) -> Invocation {
    Invocation {
        tx_id: TxId::from_seed(seed.as_bytes()),
        timestamp,
        caller: Hash::ZERO,
        channel: channel.to_string(),
    }
}

/// Ledger context of a call submitted by [`robot`].
pub fn robot_invocation(seed: &str, channel: &str, timestamp: u64) -> Invocation {
    Invocation {
        caller: robot(),
        ..invocation(seed, channel, timestamp)
    }
}

/// Run `f` in a transaction context over `world` and commit its writes.
pub fn with_context<R>(
    world: &mut dyn WorldState,
    contract: &str,
    f: impl FnOnce(&mut TxContext<'_>) -> R,
) -> R {
    let mut cache = BatchCache::new(world);
    let mut ctx = TxContext::new(
        &mut cache,
        TxId::from_seed(b"fixture"),
        NOW,
        Hash::ZERO,
        ContractId::new(contract),
    );
    let result = f(&mut ctx);
    ctx.finish(None);
    cache.commit().expect("in-memory commit");
    result
}

/// A world state in which `contract` has minted `amount` native tokens to
/// every account.
pub fn funded_world(
    contract: &str,
    accounts: &[&TestAccount],
    amount: u128,
) -> InMemoryWorldState {
    let mut world = InMemoryWorldState::new();
    with_context(&mut world, contract, |ctx| {
        for account in accounts {
            ctx.token_balance_add(&account.address, amount.into(), "fixture")
                .expect("mint");
        }
    });
    world
}

/// In-memory world state whose backend runs out of room.
///
/// Each written element spends one unit of `write_budget`; once it is spent
/// every write fails. A [`WorldState::apply`] that fails part way through
/// leaves `inner` untouched.
#[derive(Debug, Clone, Default)]
pub struct FaultyWorldState {
    pub inner: InMemoryWorldState,
    /// `None` never fails.
    pub write_budget: Option<usize>,
}

impl FaultyWorldState {
    pub fn new(inner: InMemoryWorldState) -> Self {
        Self {
            inner,
            write_budget: None,
        }
    }

    /// Fail every write from now on.
    pub fn fail_now(&mut self) {
        self.write_budget = Some(0);
    }

    /// Accept `writes` more elements, then fail.
    pub fn fail_after(&mut self, writes: usize) {
        self.write_budget = Some(writes);
    }

    pub fn heal(&mut self) {
        self.write_budget = None;
    }

    fn spend(&mut self) -> Result<(), StorageError> {
        match &mut self.write_budget {
            Some(0) => Err(StorageError::Backend("disk full".to_string())),
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl WorldState for FaultyWorldState {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get(key)
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError> {
        self.spend()?;
        self.inner.put(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StorageError> {
        self.spend()?;
        self.inner.delete(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        self.inner.scan_prefix(prefix)
    }

    fn apply(&mut self, writes: Vec<WriteElement>) -> Result<(), StorageError> {
        let mut staged = self.inner.clone();
        for write in writes {
            self.spend()?;
            match write.live_value() {
                Some(value) => staged.put(write.key.clone(), value.to_vec())?,
                None => staged.delete(&write.key)?,
            }
        }
        self.inner = staged;
        Ok(())
    }
}
