//! Balance primitives.
//!
//! Balances live in the world state under structured keys:
//!
//! | kind | key |
//! |------|-----|
//! | native token | `(TokenBalance, address)` |
//! | token group | `(TokenBalance, address, group)` |
//! | allowed (cross-contract) | `(AllowedBalance, address, token)` |
//! | given (owed to a counterpart) | `(GivenBalance, contract)` |
//! | locked native / allowed | `(LockedTokenBalance, …)` / `(LockedAllowedBalance, …)` |
//!
//! Every accounted primitive on [`TxContext`] appends one accounting record.
//! Native balances are accounted under the contract id, groups under
//! `<contract>_<group>` and allowed balances under the token id.

use crate::{BalanceError, TxContext};
use std::collections::BTreeMap;
use swapledger_engine::{StateCache, StateCacheExt};
use swapledger_types::{token_group, Address, Amount, KeyTag, StateKey};

fn address_key(tag: KeyTag, address: &Address, path: Option<&str>) -> StateKey {
    let mut components = vec![address.to_hex()];
    if let Some(path) = path {
        components.push(path.to_string());
    }
    StateKey {
        tag,
        components,
    }
}

fn given_key(contract: &str) -> StateKey {
    StateKey::new(KeyTag::GivenBalance, [contract])
}

/// Read a balance; an absent key is zero.
pub fn balance_get(state: &dyn StateCache, key: &StateKey) -> Result<Amount, BalanceError> {
    let bytes = state.get_state(key)?;
    Ok(Amount::from_state_bytes(bytes.as_deref())?)
}

fn balance_add(state: &mut dyn StateCache, key: &StateKey, amount: Amount) -> Result<(), BalanceError> {
    let balance = balance_get(state, key)?.checked_add(amount)?;
    state.put_state(key, balance.to_state_bytes());
    Ok(())
}

fn balance_sub(state: &mut dyn StateCache, key: &StateKey, amount: Amount) -> Result<(), BalanceError> {
    let balance = balance_get(state, key)?.checked_sub(amount)?;
    state.put_state(key, balance.to_state_bytes());
    Ok(())
}

fn balance_move(
    state: &mut dyn StateCache,
    from: &StateKey,
    to: &StateKey,
    amount: Amount,
) -> Result<(), BalanceError> {
    balance_sub(state, from, amount)?;
    balance_add(state, to, amount)
}

/// Every sub-balance of `address` under `tag`, keyed by the path component.
pub fn balance_list(
    state: &dyn StateCache,
    tag: KeyTag,
    address: &Address,
) -> Result<BTreeMap<String, Amount>, BalanceError> {
    let prefix = StateKey::prefix(tag, &[address.to_hex()]);
    let mut balances = BTreeMap::new();
    for (key, value) in state.scan_prefix(&prefix)? {
        let key = StateKey::decode(&key).map_err(swapledger_engine::StorageError::from)?;
        if let Some(path) = key.components.get(1) {
            balances.insert(path.clone(), Amount::from_state_bytes(Some(&value))?);
        }
    }
    Ok(balances)
}

fn group_of(token: &str) -> &str {
    token_group(token).unwrap_or(token)
}

impl TxContext<'_> {
    fn native_token(&self) -> String {
        self.contract_id().to_string()
    }

    fn group_token(&self, group: &str) -> String {
        format!("{}_{}", self.contract_id(), group)
    }

    // Native token.

    pub fn token_balance_of(&self, address: &Address) -> Result<Amount, BalanceError> {
        balance_get(self.state(), &address_key(KeyTag::TokenBalance, address, None))
    }

    /// Mint native tokens to `address`.
    pub fn token_balance_add(
        &mut self,
        address: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        let token = self.native_token();
        balance_add(
            self.state_mut(),
            &address_key(KeyTag::TokenBalance, address, None),
            amount,
        )?;
        self.record_accounting(token, Address::ZERO, *address, amount, reason);
        Ok(())
    }

    /// Burn native tokens of `address`.
    pub fn token_balance_sub(
        &mut self,
        address: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        let token = self.native_token();
        balance_sub(
            self.state_mut(),
            &address_key(KeyTag::TokenBalance, address, None),
            amount,
        )?;
        self.record_accounting(token, *address, Address::ZERO, amount, reason);
        Ok(())
    }

    pub fn token_balance_transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        let token = self.native_token();
        balance_move(
            self.state_mut(),
            &address_key(KeyTag::TokenBalance, from, None),
            &address_key(KeyTag::TokenBalance, to, None),
            amount,
        )?;
        self.record_accounting(token, *from, *to, amount, reason);
        Ok(())
    }

    // Token groups. `token` may be a bare group or `<contract>_<group>`.

    /// Every group balance of `address`.
    pub fn industrial_balances_of(
        &self,
        address: &Address,
    ) -> Result<BTreeMap<String, Amount>, BalanceError> {
        balance_list(self.state(), KeyTag::TokenBalance, address)
    }

    pub fn industrial_balance_of(
        &self,
        token: &str,
        address: &Address,
    ) -> Result<Amount, BalanceError> {
        let key = address_key(KeyTag::TokenBalance, address, Some(group_of(token)));
        balance_get(self.state(), &key)
    }

    pub fn industrial_balance_add(
        &mut self,
        token: &str,
        address: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        let group = group_of(token);
        let accounted = self.group_token(group);
        let key = address_key(KeyTag::TokenBalance, address, Some(group));
        balance_add(self.state_mut(), &key, amount)?;
        self.record_accounting(accounted, Address::ZERO, *address, amount, reason);
        Ok(())
    }

    pub fn industrial_balance_sub(
        &mut self,
        token: &str,
        address: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        let group = group_of(token);
        let accounted = self.group_token(group);
        let key = address_key(KeyTag::TokenBalance, address, Some(group));
        balance_sub(self.state_mut(), &key, amount)?;
        self.record_accounting(accounted, *address, Address::ZERO, amount, reason);
        Ok(())
    }

    pub fn industrial_balance_transfer(
        &mut self,
        token: &str,
        from: &Address,
        to: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        let group = group_of(token);
        let accounted = self.group_token(group);
        balance_move(
            self.state_mut(),
            &address_key(KeyTag::TokenBalance, from, Some(group)),
            &address_key(KeyTag::TokenBalance, to, Some(group)),
            amount,
        )?;
        self.record_accounting(accounted, *from, *to, amount, reason);
        Ok(())
    }

    /// Credit `token` to `address`: a group balance when `token` names a
    /// group, the native balance otherwise.
    pub fn token_credit(
        &mut self,
        token: &str,
        address: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        match token_group(token) {
            Some(_) => self.industrial_balance_add(token, address, amount, reason),
            None => self.token_balance_add(address, amount, reason),
        }
    }

    /// Debit `token` from `address`; counterpart of [`TxContext::token_credit`].
    pub fn token_debit(
        &mut self,
        token: &str,
        address: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        match token_group(token) {
            Some(_) => self.industrial_balance_sub(token, address, amount, reason),
            None => self.token_balance_sub(address, amount, reason),
        }
    }

    // Allowed (cross-contract) balances.

    pub fn allowed_balance_of(&self, token: &str, address: &Address) -> Result<Amount, BalanceError> {
        balance_get(
            self.state(),
            &address_key(KeyTag::AllowedBalance, address, Some(token)),
        )
    }

    /// Every allowed balance of `address`, keyed by token.
    pub fn allowed_balances_of(
        &self,
        address: &Address,
    ) -> Result<BTreeMap<String, Amount>, BalanceError> {
        balance_list(self.state(), KeyTag::AllowedBalance, address)
    }

    pub fn allowed_balance_add(
        &mut self,
        token: &str,
        address: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        let key = address_key(KeyTag::AllowedBalance, address, Some(token));
        balance_add(self.state_mut(), &key, amount)?;
        self.record_accounting(token, Address::ZERO, *address, amount, reason);
        Ok(())
    }

    pub fn allowed_balance_sub(
        &mut self,
        token: &str,
        address: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        let key = address_key(KeyTag::AllowedBalance, address, Some(token));
        balance_sub(self.state_mut(), &key, amount)?;
        self.record_accounting(token, *address, Address::ZERO, amount, reason);
        Ok(())
    }

    pub fn allowed_balance_transfer(
        &mut self,
        token: &str,
        from: &Address,
        to: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        balance_move(
            self.state_mut(),
            &address_key(KeyTag::AllowedBalance, from, Some(token)),
            &address_key(KeyTag::AllowedBalance, to, Some(token)),
            amount,
        )?;
        self.record_accounting(token, *from, *to, amount, reason);
        Ok(())
    }

    // Given balances: obligations owed to a counterpart contract.

    pub fn given_balance_of(&self, contract: &str) -> Result<Amount, BalanceError> {
        balance_get(self.state(), &given_key(contract))
    }

    pub fn given_balance_add(
        &mut self,
        contract: &str,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        balance_add(self.state_mut(), &given_key(contract), amount)?;
        self.record_accounting(contract, Address::ZERO, Address::ZERO, amount, reason);
        Ok(())
    }

    pub fn given_balance_sub(
        &mut self,
        contract: &str,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        balance_sub(self.state_mut(), &given_key(contract), amount)?;
        self.record_accounting(contract, Address::ZERO, Address::ZERO, amount, reason);
        Ok(())
    }

    // Locked balances.

    pub fn locked_token_balance_of(&self, address: &Address) -> Result<Amount, BalanceError> {
        balance_get(
            self.state(),
            &address_key(KeyTag::LockedTokenBalance, address, None),
        )
    }

    /// Move native tokens of `address` into its locked balance.
    pub fn token_balance_lock(
        &mut self,
        address: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        let token = self.native_token();
        balance_move(
            self.state_mut(),
            &address_key(KeyTag::TokenBalance, address, None),
            &address_key(KeyTag::LockedTokenBalance, address, None),
            amount,
        )?;
        self.record_accounting(token, *address, *address, amount, reason);
        Ok(())
    }

    pub fn token_balance_unlock(
        &mut self,
        address: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        let token = self.native_token();
        balance_move(
            self.state_mut(),
            &address_key(KeyTag::LockedTokenBalance, address, None),
            &address_key(KeyTag::TokenBalance, address, None),
            amount,
        )?;
        self.record_accounting(token, *address, *address, amount, reason);
        Ok(())
    }

    /// Pay from the locked balance of `from` to the spendable balance of `to`.
    pub fn token_balance_transfer_locked(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        let token = self.native_token();
        balance_move(
            self.state_mut(),
            &address_key(KeyTag::LockedTokenBalance, from, None),
            &address_key(KeyTag::TokenBalance, to, None),
            amount,
        )?;
        self.record_accounting(token, *from, *to, amount, reason);
        Ok(())
    }

    pub fn token_balance_burn_locked(
        &mut self,
        address: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        let token = self.native_token();
        balance_sub(
            self.state_mut(),
            &address_key(KeyTag::LockedTokenBalance, address, None),
            amount,
        )?;
        self.record_accounting(token, *address, Address::ZERO, amount, reason);
        Ok(())
    }

    pub fn locked_allowed_balance_of(
        &self,
        token: &str,
        address: &Address,
    ) -> Result<Amount, BalanceError> {
        balance_get(
            self.state(),
            &address_key(KeyTag::LockedAllowedBalance, address, Some(token)),
        )
    }

    pub fn allowed_balance_lock(
        &mut self,
        token: &str,
        address: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        balance_move(
            self.state_mut(),
            &address_key(KeyTag::AllowedBalance, address, Some(token)),
            &address_key(KeyTag::LockedAllowedBalance, address, Some(token)),
            amount,
        )?;
        self.record_accounting(token, *address, *address, amount, reason);
        Ok(())
    }

    pub fn allowed_balance_unlock(
        &mut self,
        token: &str,
        address: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        balance_move(
            self.state_mut(),
            &address_key(KeyTag::LockedAllowedBalance, address, Some(token)),
            &address_key(KeyTag::AllowedBalance, address, Some(token)),
            amount,
        )?;
        self.record_accounting(token, *address, *address, amount, reason);
        Ok(())
    }

    pub fn allowed_balance_transfer_locked(
        &mut self,
        token: &str,
        from: &Address,
        to: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        balance_move(
            self.state_mut(),
            &address_key(KeyTag::LockedAllowedBalance, from, Some(token)),
            &address_key(KeyTag::AllowedBalance, to, Some(token)),
            amount,
        )?;
        self.record_accounting(token, *from, *to, amount, reason);
        Ok(())
    }

    pub fn allowed_balance_burn_locked(
        &mut self,
        token: &str,
        address: &Address,
        amount: Amount,
        reason: &str,
    ) -> Result<(), BalanceError> {
        balance_sub(
            self.state_mut(),
            &address_key(KeyTag::LockedAllowedBalance, address, Some(token)),
            amount,
        )?;
        self.record_accounting(token, *address, Address::ZERO, amount, reason);
        Ok(())
    }
}
