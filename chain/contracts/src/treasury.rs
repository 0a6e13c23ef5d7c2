//! Treasury: fee accumulators and contract-held currency
//!
//! Tracks how much of the contract's own token balance is earmarked for the
//! charity and liquidity sinks, the currency the contract holds, and the
//! charity proceeds a previous push failed to deliver.
//!
//! Invariants:
//! - `tokens_for_charity + tokens_for_liquidity <= balance(contract)`
//!   (maintained together with the ledger by the token)
//! - `pending_charity_currency <= currency_balance`

use ledger_types::fee::FeeBreakdown;
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    tokens_for_charity: u128,
    tokens_for_liquidity: u128,
    pending_charity_currency: u128,
    currency_balance: u128,
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens_for_charity(&self) -> u128 {
        self.tokens_for_charity
    }

    pub fn tokens_for_liquidity(&self) -> u128 {
        self.tokens_for_liquidity
    }

    /// Sum of both accumulators.
    pub fn earmarked_tokens(&self) -> u128 {
        self.tokens_for_charity.saturating_add(self.tokens_for_liquidity)
    }

    pub fn pending_charity_currency(&self) -> u128 {
        self.pending_charity_currency
    }

    pub fn currency_balance(&self) -> u128 {
        self.currency_balance
    }

    /// Currency not owed to the charity destination.
    pub fn surplus_currency(&self) -> u128 {
        self.currency_balance
            .saturating_sub(self.pending_charity_currency)
    }

    // ───────────────────────── Accumulators ─────────────────────────

    /// Add the retained shares of a fee to the accumulators.
    pub fn credit(&mut self, breakdown: &FeeBreakdown) -> Result<(), LedgerError> {
        let charity = self
            .tokens_for_charity
            .checked_add(breakdown.charity)
            .ok_or(LedgerError::Overflow)?;
        let liquidity = self
            .tokens_for_liquidity
            .checked_add(breakdown.liquidity)
            .ok_or(LedgerError::Overflow)?;
        self.tokens_for_charity = charity;
        self.tokens_for_liquidity = liquidity;
        Ok(())
    }

    /// Subtract processed work from each accumulator, floored at zero.
    pub fn settle(&mut self, processed_charity: u128, processed_liquidity: u128) {
        self.tokens_for_charity = self.tokens_for_charity.saturating_sub(processed_charity);
        self.tokens_for_liquidity = self
            .tokens_for_liquidity
            .saturating_sub(processed_liquidity);
    }

    // ───────────────────────── Currency ─────────────────────────

    pub fn credit_currency(&mut self, amount: u128) -> Result<(), LedgerError> {
        self.currency_balance = self
            .currency_balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    pub fn debit_currency(&mut self, amount: u128) -> Result<(), LedgerError> {
        if self.currency_balance < amount {
            return Err(LedgerError::InsufficientCurrency {
                required: amount,
                available: self.currency_balance,
            });
        }
        self.currency_balance -= amount;
        Ok(())
    }

    /// Record the amount a failed push still owes. Capped at the held balance.
    pub fn set_pending(&mut self, amount: u128) {
        self.pending_charity_currency = amount.min(self.currency_balance);
    }

    pub fn clear_pending(&mut self) {
        self.pending_charity_currency = 0;
    }
}
