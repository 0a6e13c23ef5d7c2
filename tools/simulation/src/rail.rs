//! Payment rail with misbehaving destinations
//!
//! Destinations accept by default. A destination can refuse every push, or
//! accept only pushes up to a per-push budget (a wallet whose receive hook
//! runs out of gas on large amounts).

use fee_token::errors::PushError;
use fee_token::exchange::PaymentRail;
use ledger_types::ids::Address;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct WalletRail {
    delivered: HashMap<Address, u128>,
    refusing: HashSet<Address>,
    budgets: HashMap<Address, u128>,
    refused_pushes: u64,
}

impl WalletRail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse(&mut self, destination: Address) {
        self.refusing.insert(destination);
    }

    /// Accept pushes to `destination` only up to `max_amount` each.
    pub fn limit(&mut self, destination: Address, max_amount: u128) {
        self.budgets.insert(destination, max_amount);
    }

    /// Clear any refusal or budget for `destination`.
    pub fn accept(&mut self, destination: &Address) {
        self.refusing.remove(destination);
        self.budgets.remove(destination);
    }

    pub fn delivered_to(&self, destination: &Address) -> u128 {
        self.delivered.get(destination).copied().unwrap_or(0)
    }

    pub fn delivered_total(&self) -> u128 {
        self.delivered.values().sum()
    }

    pub fn refused_pushes(&self) -> u64 {
        self.refused_pushes
    }
}

impl PaymentRail for WalletRail {
    fn push(&mut self, to: Address, amount: u128) -> Result<(), PushError> {
        if self.refusing.contains(&to) {
            self.refused_pushes += 1;
            return Err(PushError::Rejected { destination: to });
        }
        if let Some(budget) = self.budgets.get(&to) {
            if amount > *budget {
                self.refused_pushes += 1;
                return Err(PushError::OutOfBudget {
                    destination: to,
                    amount,
                });
            }
        }
        let total = self.delivered.entry(to).or_insert(0);
        *total = total.saturating_add(amount);
        Ok(())
    }
}
