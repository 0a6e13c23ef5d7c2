//! Contract-specific error types
//!
//! Error taxonomy for the ledger, the policy registry, the external
//! collaborators and the top-level transfer path. Every variant except
//! `PushError` is a hard failure: the call that produced it is rolled back.
//! A `PushError` is only fatal on the rescue path; during settlement it is
//! recorded and retried.

use ledger_types::errors::TypesError;
use ledger_types::ids::Address;
use thiserror::Error;

use crate::security::ConfigLock;

/// Ledger-level errors (balances, allowances, currency holdings)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Zero address not allowed as {role}")]
    ZeroAddress { role: &'static str },

    #[error("Insufficient balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: Address,
        required: u128,
        available: u128,
    },

    #[error("Insufficient allowance for {spender}: required {required}, available {available}")]
    InsufficientAllowance {
        spender: Address,
        required: u128,
        available: u128,
    },

    #[error("Allowance for {spender} would drop below zero")]
    AllowanceUnderflow { spender: Address },

    #[error("Insufficient contract currency: required {required}, available {available}")]
    InsufficientCurrency { required: u128, available: u128 },

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,
}

/// Policy registry and administration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Unauthorized: caller is not the owner")]
    Unauthorized,

    #[error("Configuration locked: {0}")]
    Locked(ConfigLock),

    #[error("Configuration already locked: {0}")]
    AlreadyLocked(ConfigLock),

    #[error("Trading already active")]
    TradingAlreadyActive,

    #[error("Limits already removed")]
    LimitsAlreadyRemoved,

    #[error("The primary pair cannot be de-registered")]
    PrimaryPairLocked,

    #[error("Zero address not allowed")]
    ZeroAddress,

    #[error("Settlement threshold {amount} outside [{min}, {max}]")]
    ThresholdOutOfRange { amount: u128, min: u128, max: u128 },

    #[error("{limit} of {amount} is below the floor of {min}")]
    LimitTooLow {
        limit: &'static str,
        amount: u128,
        min: u128,
    },

    #[error("Rescue of {requested} exceeds the unearmarked {available}")]
    RescueExceedsSurplus { requested: u128, available: u128 },
}

/// Failures reported by the exchange collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("Pair already exists: {pair}")]
    PairExists { pair: Address },

    #[error("Unknown pair for path")]
    UnknownPair,

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Insufficient output: got {actual}, minimum {minimum}")]
    InsufficientOutput { actual: u128, minimum: u128 },

    #[error("Token callback failed: {reason}")]
    TokenCallback { reason: String },

    #[error("Router rejected the call: {reason}")]
    Rejected { reason: String },
}

/// Soft failure of a currency push. Recorded, never propagated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PushError {
    #[error("Destination {destination} rejected the payment")]
    Rejected { destination: Address },

    #[error("Destination {destination} ran out of budget accepting {amount}")]
    OutOfBudget { destination: Address, amount: u128 },
}

/// Genesis configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {direction} fee set: {source}")]
    InvalidFeeSet {
        direction: &'static str,
        source: TypesError,
    },

    #[error("Total supply must be positive")]
    ZeroSupply,

    #[error("Total supply overflows with {decimals} decimals")]
    SupplyOverflow { decimals: u8 },

    #[error("Invalid {field}: {value} bps")]
    InvalidBps { field: &'static str, value: u32 },

    #[error("Swap threshold of {bps} bps rounds to zero on a supply of {supply}")]
    ZeroThreshold { bps: u32, supply: u128 },

    #[error("Cannot read config {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Cannot parse config: {reason}")]
    Parse { reason: String },
}

/// Top-level error for every public token entry point
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("Trading is not active")]
    TradingNotActive,

    #[error("Transfer amount {amount} exceeds the max transaction amount {max}")]
    MaxTransactionExceeded { amount: u128, max: u128 },

    #[error("Resulting balance {resulting} exceeds the max wallet {max}")]
    MaxWalletExceeded { resulting: u128, max: u128 },

    #[error("Reentrancy detected: settlement already in progress")]
    Reentrancy,

    #[error("Router is in use by an outer call")]
    RouterBusy,

    #[error("Arithmetic overflow in fee calculation")]
    Overflow,

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Payment failed: {0}")]
    Push(#[from] PushError),
}

/// Broken ledger invariant found by an audit
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    #[error("Sum of balances {sum} differs from total supply {supply}")]
    SupplyMismatch { sum: u128, supply: u128 },

    #[error("Accumulators {earmarked} exceed the contract balance {held}")]
    AccumulatorsExceedBalance { earmarked: u128, held: u128 },

    #[error("Pending charity currency {pending} exceeds the held currency {held}")]
    PendingExceedsCurrency { pending: u128, held: u128 },
}
