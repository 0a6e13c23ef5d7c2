//! Ledger: balances, total supply, allowances and the event log
//!
//! The trusted base layer underneath the fee and settlement logic:
//! - Balance tracking by address with checked credit/debit
//! - Genesis mint and supply-reducing burn
//! - Allowance bookkeeping (`u128::MAX` is an infinite allowance)
//! - Append-only event log
//!
//! Invariant: the sum of all balances equals `total_supply` after every
//! operation.

use ledger_types::ids::Address;
use std::collections::HashMap;

use crate::errors::LedgerError;
use crate::events::{Approval, ContractEvent, Destroyed, Transfer};

/// Ledger state captured at the start of an atomic call.
#[derive(Debug, Clone)]
pub(crate) struct LedgerSnapshot {
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
    total_supply: u128,
    events_len: usize,
}

/// Token ledger state.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    /// Balances: address -> amount
    balances: HashMap<Address, u128>,
    /// Allowances: (owner, spender) -> amount
    allowances: HashMap<(Address, Address), u128>,
    total_supply: u128,
    /// Emitted events log (append-only)
    events: Vec<ContractEvent>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // ───────────────────────── Balance Queries ─────────────────────────

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Sum over every stored balance, for conservation audits.
    pub fn sum_of_balances(&self) -> u128 {
        self.balances
            .values()
            .fold(0u128, |acc, v| acc.saturating_add(*v))
    }

    /// Number of addresses with a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|v| **v > 0).count()
    }

    // ───────────────────────── Supply ─────────────────────────

    /// Create `amount` new tokens for `to`. Only used at genesis.
    pub fn mint(&mut self, to: Address, amount: u128) -> Result<(), LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress { role: "mint recipient" });
        }
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.safe_credit(to, amount)?;
        self.total_supply = new_supply;

        self.events.push(ContractEvent::Transfer(Transfer {
            from: Address::ZERO,
            to,
            amount,
        }));
        Ok(())
    }

    /// Destroy `amount` tokens held by `from`, reducing total supply.
    pub fn burn(&mut self, from: Address, amount: u128) -> Result<(), LedgerError> {
        if from.is_zero() {
            return Err(LedgerError::ZeroAddress { role: "burn source" });
        }
        self.safe_debit(&from, amount)?;
        self.total_supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow)?;

        self.events.push(ContractEvent::Destroyed(Destroyed {
            from,
            amount,
            total_supply: self.total_supply,
        }));
        Ok(())
    }

    // ───────────────────────── Transfer ─────────────────────────

    /// Move `amount` from `from` to `to`. No fees, no policy.
    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<(), LedgerError> {
        if from.is_zero() {
            return Err(LedgerError::ZeroAddress { role: "sender" });
        }
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress { role: "recipient" });
        }
        self.safe_debit(&from, amount)?;
        self.safe_credit(to, amount)?;

        self.events.push(ContractEvent::Transfer(Transfer { from, to, amount }));
        Ok(())
    }

    // ───────────────────────── Allowances ─────────────────────────

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: u128) -> Result<(), LedgerError> {
        if owner.is_zero() {
            return Err(LedgerError::ZeroAddress { role: "approver" });
        }
        if spender.is_zero() {
            return Err(LedgerError::ZeroAddress { role: "spender" });
        }
        self.allowances.insert((owner, spender), amount);
        self.events.push(ContractEvent::Approval(Approval {
            owner,
            spender,
            amount,
        }));
        Ok(())
    }

    pub fn increase_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        added: u128,
    ) -> Result<(), LedgerError> {
        let current = self.allowance(&owner, &spender);
        let next = current.checked_add(added).ok_or(LedgerError::Overflow)?;
        self.approve(owner, spender, next)
    }

    pub fn decrease_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        subtracted: u128,
    ) -> Result<(), LedgerError> {
        let current = self.allowance(&owner, &spender);
        let next = current
            .checked_sub(subtracted)
            .ok_or(LedgerError::AllowanceUnderflow { spender })?;
        self.approve(owner, spender, next)
    }

    /// Consume `amount` of the allowance `owner` granted `spender`.
    ///
    /// An infinite allowance is left untouched.
    pub fn spend_allowance(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let current = self.allowance(owner, spender);
        if current == u128::MAX {
            return Ok(());
        }
        if current < amount {
            return Err(LedgerError::InsufficientAllowance {
                spender: *spender,
                required: amount,
                available: current,
            });
        }
        self.allowances.insert((*owner, *spender), current - amount);
        Ok(())
    }

    // ───────────────────────── Checkpoint ─────────────────────────

    /// Capture balances, allowances and supply. Events are captured by length
    /// only; the log is append-only within a call.
    pub(crate) fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            balances: self.balances.clone(),
            allowances: self.allowances.clone(),
            total_supply: self.total_supply,
            events_len: self.events.len(),
        }
    }

    pub(crate) fn restore(&mut self, snapshot: LedgerSnapshot) {
        self.balances = snapshot.balances;
        self.allowances = snapshot.allowances;
        self.total_supply = snapshot.total_supply;
        self.events.truncate(snapshot.events_len);
    }

    // ───────────────────────── Events ─────────────────────────

    pub(crate) fn record(&mut self, event: ContractEvent) {
        self.events.push(event);
    }

    /// Get all emitted events.
    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    /// Drain all events (consume and clear).
    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }

    // ───────────────────────── Safe Credit / Debit ─────────────────────────

    fn safe_credit(&mut self, account: Address, amount: u128) -> Result<(), LedgerError> {
        let current = self.balances.entry(account).or_insert(0);
        *current = current.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    fn safe_debit(&mut self, account: &Address, amount: u128) -> Result<(), LedgerError> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: *account,
                required: amount,
                available,
            });
        }
        if amount > 0 {
            self.balances.insert(*account, available - amount);
        }
        Ok(())
    }
}
