//! Policy registry
//!
//! Holds every rule the transfer path consults: fee tables, exclusion sets,
//! AMM-pair flags, the trading gate, transfer limits, settlement parameters
//! and the one-way configuration locks.
//!
//! Owner checks happen in the token before any mutator here is reached;
//! this module enforces locks, one-way transitions and floors.

use ledger_types::fee::{FeeSet, TradeDirection};
use ledger_types::ids::Address;
use ledger_types::numeric::mul_div;
use std::collections::HashSet;

use crate::errors::PolicyError;
use crate::security::{ConfigLock, LockSet, OneWayFlag};

/// Max transaction floor: 0.1% of supply.
pub const MAX_TX_FLOOR_PER_MILLE: u128 = 1;
/// Max wallet floor: 0.5% of supply.
pub const MAX_WALLET_FLOOR_PER_MILLE: u128 = 5;
/// Settlement threshold lower bound: 0.001% of supply.
pub const THRESHOLD_MIN_PER_100K: u128 = 1;
/// Settlement threshold upper bound: 0.5% of supply.
pub const THRESHOLD_MAX_PER_MILLE: u128 = 5;

/// Initial policy values fixed at genesis.
#[derive(Debug, Clone)]
pub struct PolicyParams {
    pub buy_fees: FeeSet,
    pub sell_fees: FeeSet,
    pub max_transaction: u128,
    pub max_wallet: u128,
    pub swap_threshold: u128,
    pub charity_wallet: Option<Address>,
}

#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    buy_fees: FeeSet,
    sell_fees: FeeSet,
    fee_excluded: HashSet<Address>,
    limit_excluded: HashSet<Address>,
    amm_pairs: HashSet<Address>,
    primary_pair: Option<Address>,
    locks: LockSet,
    trading: OneWayFlag,
    trading_enabled_at: Option<i64>,
    limits_removed: OneWayFlag,
    max_transaction: u128,
    max_wallet: u128,
    swap_threshold: u128,
    swap_enabled: bool,
    charity_wallet: Option<Address>,
}

impl PolicyRegistry {
    pub fn new(params: PolicyParams) -> Self {
        Self {
            buy_fees: params.buy_fees,
            sell_fees: params.sell_fees,
            fee_excluded: HashSet::new(),
            limit_excluded: HashSet::new(),
            amm_pairs: HashSet::new(),
            primary_pair: None,
            locks: LockSet::new(),
            trading: OneWayFlag::new(),
            trading_enabled_at: None,
            limits_removed: OneWayFlag::new(),
            max_transaction: params.max_transaction,
            max_wallet: params.max_wallet,
            swap_threshold: params.swap_threshold,
            swap_enabled: true,
            charity_wallet: params.charity_wallet,
        }
    }

    // ───────────────────────── Classification ─────────────────────────

    /// Direction of a transfer. Sell wins when both sides are pairs.
    pub fn classify(&self, from: &Address, to: &Address) -> TradeDirection {
        if self.is_amm_pair(to) {
            TradeDirection::Sell
        } else if self.is_amm_pair(from) {
            TradeDirection::Buy
        } else {
            TradeDirection::Transfer
        }
    }

    /// Neither party is fee-excluded.
    pub fn is_taxable(&self, from: &Address, to: &Address) -> bool {
        !self.is_fee_excluded(from) && !self.is_fee_excluded(to)
    }

    /// Fee table for a direction. Wallet-to-wallet transfers carry none.
    pub fn fees_for(&self, direction: TradeDirection) -> Option<&FeeSet> {
        match direction {
            TradeDirection::Buy => Some(&self.buy_fees),
            TradeDirection::Sell => Some(&self.sell_fees),
            TradeDirection::Transfer => None,
        }
    }

    // ───────────────────────── Accessors ─────────────────────────

    pub fn buy_fees(&self) -> &FeeSet {
        &self.buy_fees
    }

    pub fn sell_fees(&self) -> &FeeSet {
        &self.sell_fees
    }

    pub fn is_fee_excluded(&self, account: &Address) -> bool {
        self.fee_excluded.contains(account)
    }

    pub fn is_limit_excluded(&self, account: &Address) -> bool {
        self.limit_excluded.contains(account)
    }

    pub fn is_amm_pair(&self, account: &Address) -> bool {
        self.amm_pairs.contains(account)
    }

    pub fn primary_pair(&self) -> Option<Address> {
        self.primary_pair
    }

    pub fn is_locked(&self, lock: ConfigLock) -> bool {
        self.locks.is_locked(lock)
    }

    pub fn ensure_unlocked(&self, lock: ConfigLock) -> Result<(), PolicyError> {
        self.locks.ensure_unlocked(lock)
    }

    pub fn trading_active(&self) -> bool {
        self.trading.is_set()
    }

    pub fn trading_enabled_at(&self) -> Option<i64> {
        self.trading_enabled_at
    }

    pub fn limits_in_effect(&self) -> bool {
        !self.limits_removed.is_set()
    }

    pub fn max_transaction(&self) -> u128 {
        self.max_transaction
    }

    pub fn max_wallet(&self) -> u128 {
        self.max_wallet
    }

    pub fn swap_threshold(&self) -> u128 {
        self.swap_threshold
    }

    pub fn swap_enabled(&self) -> bool {
        self.swap_enabled
    }

    pub fn charity_wallet(&self) -> Option<Address> {
        self.charity_wallet
    }

    // ───────────────────────── Genesis ─────────────────────────

    /// Register the pair created at deployment. It can never be removed.
    pub(crate) fn register_primary_pair(&mut self, pair: Address) {
        self.primary_pair = Some(pair);
        self.amm_pairs.insert(pair);
        self.limit_excluded.insert(pair);
    }

    /// Grant both exclusions, bypassing the locks. Used only at genesis.
    pub(crate) fn exempt(&mut self, account: Address) {
        self.fee_excluded.insert(account);
        self.limit_excluded.insert(account);
    }

    // ───────────────────────── Mutators ─────────────────────────

    /// Open the trading gate. Irreversible.
    pub fn enable_trading(&mut self, now: i64) -> Result<(), PolicyError> {
        if !self.trading.trip() {
            return Err(PolicyError::TradingAlreadyActive);
        }
        self.trading_enabled_at = Some(now);
        Ok(())
    }

    /// Returns the previous destination.
    pub fn set_charity_wallet(&mut self, wallet: Address) -> Result<Option<Address>, PolicyError> {
        self.locks.ensure_unlocked(ConfigLock::CharityWallet)?;
        if wallet.is_zero() {
            return Err(PolicyError::ZeroAddress);
        }
        Ok(self.charity_wallet.replace(wallet))
    }

    pub fn exclude_from_fees(&mut self, account: Address, excluded: bool) -> Result<(), PolicyError> {
        self.locks.ensure_unlocked(ConfigLock::FeeExclusions)?;
        if excluded {
            self.fee_excluded.insert(account);
        } else {
            self.fee_excluded.remove(&account);
        }
        Ok(())
    }

    pub fn exclude_from_limits(&mut self, account: Address, excluded: bool) -> Result<(), PolicyError> {
        self.locks.ensure_unlocked(ConfigLock::LimitExclusions)?;
        if excluded {
            self.limit_excluded.insert(account);
        } else {
            self.limit_excluded.remove(&account);
        }
        Ok(())
    }

    /// Register or remove an AMM pair. Registration also exempts the pair
    /// from limits.
    pub fn set_amm_pair(&mut self, pair: Address, registered: bool) -> Result<(), PolicyError> {
        if pair.is_zero() {
            return Err(PolicyError::ZeroAddress);
        }
        if self.primary_pair == Some(pair) {
            return Err(PolicyError::PrimaryPairLocked);
        }
        if registered {
            self.amm_pairs.insert(pair);
            self.limit_excluded.insert(pair);
        } else {
            self.amm_pairs.remove(&pair);
        }
        Ok(())
    }

    pub fn lock(&mut self, lock: ConfigLock) -> Result<(), PolicyError> {
        self.locks.lock(lock)
    }

    /// Disable transfer limits permanently.
    pub fn remove_limits(&mut self) -> Result<(), PolicyError> {
        if !self.limits_removed.trip() {
            return Err(PolicyError::LimitsAlreadyRemoved);
        }
        Ok(())
    }

    pub fn update_max_transaction(&mut self, amount: u128, supply: u128) -> Result<(), PolicyError> {
        let min = floor_of(supply, MAX_TX_FLOOR_PER_MILLE, 1_000);
        if amount < min {
            return Err(PolicyError::LimitTooLow {
                limit: "max transaction",
                amount,
                min,
            });
        }
        self.max_transaction = amount;
        Ok(())
    }

    pub fn update_max_wallet(&mut self, amount: u128, supply: u128) -> Result<(), PolicyError> {
        let min = floor_of(supply, MAX_WALLET_FLOOR_PER_MILLE, 1_000);
        if amount < min {
            return Err(PolicyError::LimitTooLow {
                limit: "max wallet",
                amount,
                min,
            });
        }
        self.max_wallet = amount;
        Ok(())
    }

    pub fn update_swap_threshold(&mut self, amount: u128, supply: u128) -> Result<(), PolicyError> {
        let (min, max) = threshold_bounds(supply);
        if amount < min || amount > max {
            return Err(PolicyError::ThresholdOutOfRange { amount, min, max });
        }
        self.swap_threshold = amount;
        Ok(())
    }

    pub fn set_swap_enabled(&mut self, enabled: bool) {
        self.swap_enabled = enabled;
    }
}

/// Allowed `[min, max]` settlement threshold for a supply.
///
/// The lower bound never drops below one base unit: a zero threshold caps
/// every batch at zero and settlement could never run.
pub fn threshold_bounds(supply: u128) -> (u128, u128) {
    (
        floor_of(supply, THRESHOLD_MIN_PER_100K, 100_000).max(1),
        floor_of(supply, THRESHOLD_MAX_PER_MILLE, 1_000),
    )
}

fn floor_of(supply: u128, numerator: u128, denominator: u128) -> u128 {
    mul_div(supply, numerator, denominator).unwrap_or(u128::MAX)
}
