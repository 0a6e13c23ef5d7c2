//! Seeded random trader
//!
//! Buys with wallet currency, sells a slice of its balance back to the
//! pair, or sends tokens to another trader. All choices come from a
//! seeded RNG so a run is reproducible from its seed.

use crate::chain::{trader_address, SimChain};
use ledger_types::ids::Address;
use ledger_types::numeric::{per_mille, to_base_units};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Configuration for the random trader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraderConfig {
    /// Probability of a buy (0.0 to 1.0)
    pub buy_ratio: f64,
    /// Probability that a non-buy is a send rather than a sell
    pub send_ratio: f64,
    /// Smallest buy, whole currency units
    pub min_buy: Decimal,
    /// Largest buy, whole currency units
    pub max_buy: Decimal,
    /// Largest slice of the balance sold or sent at once, per mille
    pub max_slice_per_mille: u32,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            buy_ratio: 0.5,
            send_ratio: 0.1,
            min_buy: Decimal::new(5, 2),
            max_buy: Decimal::from(2),
            max_slice_per_mille: 500,
        }
    }
}

/// What the trader decided to do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Buy { currency: u128 },
    Sell { tokens: u128 },
    Send { to: Address, tokens: u128 },
}

/// Random trader with deterministic seeded RNG.
pub struct Trader {
    pub index: u64,
    pub account: Address,
    pub config: TraderConfig,
    pub actions_submitted: usize,
    rng: ChaCha8Rng,
}

impl Trader {
    pub fn new(index: u64, config: TraderConfig, seed: u64) -> Self {
        Self {
            index,
            account: trader_address(index),
            config,
            actions_submitted: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Pick an action for a trader holding `balance` tokens among `peers`
    /// traders. Sells are capped at `max_sell`.
    ///
    /// Returns None when the pick needs tokens the trader does not have.
    pub fn decide(
        &mut self,
        balance: u128,
        max_sell: u128,
        peers: u64,
        currency_decimals: u8,
    ) -> Option<Intent> {
        if self.rng.gen_bool(self.config.buy_ratio) {
            let min_f = self.config.min_buy.to_f64().unwrap_or(0.0);
            let max_f = self.config.max_buy.to_f64().unwrap_or(min_f).max(min_f);
            let size_f: f64 = self.rng.gen_range(min_f..=max_f);
            let size = Decimal::from_f64(size_f).unwrap_or(self.config.min_buy);
            let currency = to_units(size, currency_decimals)?;
            if currency == 0 {
                return None;
            }
            return Some(Intent::Buy { currency });
        }

        if balance == 0 {
            return None;
        }
        let slice: u32 = self.rng.gen_range(1..=self.config.max_slice_per_mille.max(1));
        let tokens = per_mille(balance, slice)?.max(1);

        if peers > 1 && self.rng.gen_bool(self.config.send_ratio) {
            let mut peer = self.rng.gen_range(0..peers - 1);
            if peer >= self.index {
                peer += 1;
            }
            return Some(Intent::Send {
                to: trader_address(peer),
                tokens,
            });
        }
        Some(Intent::Sell {
            tokens: tokens.min(max_sell),
        })
    }

    /// Decide and submit one action. Returns true if an action was
    /// submitted, whether or not the chain accepted it.
    pub fn tick(&mut self, chain: &mut SimChain, peers: u64) -> bool {
        let balance = chain.balance_of(&self.account);
        let policy = chain.token.policy();
        let max_sell = if policy.limits_in_effect() {
            policy.max_transaction()
        } else {
            u128::MAX
        };

        let Some(intent) = self.decide(balance, max_sell, peers, chain.currency_decimals) else {
            return false;
        };
        // Rejections are recorded on the chain's event log.
        let _ = match intent {
            Intent::Buy { currency } => chain.buy(self.account, currency).map(|_| ()),
            Intent::Sell { tokens } => chain.sell(self.account, tokens).map(|_| ()),
            Intent::Send { to, tokens } => chain.send(self.account, to, tokens),
        };
        self.actions_submitted += 1;
        true
    }
}

/// Whole units to base units, truncating sub-unit dust.
fn to_units(amount: Decimal, decimals: u8) -> Option<u128> {
    let scale = Decimal::from_u128(to_base_units(1, decimals)?)?;
    amount.checked_mul(scale)?.trunc().to_u128()
}
