//! Fee-diverting token ledger with batched settlement
//!
//! A fungible token whose taxable transfers divert a fee into three sinks:
//! permanent destruction, an auto-liquidity accumulator and a charity
//! accumulator. Accumulated tokens are periodically settled into currency,
//! paired into locked liquidity and forwarded to a charity destination.
//!
//! # Modules
//! - `ledger`: Balances, supply, allowances, event log
//! - `policy`: Fee tables, exclusions, AMM pairs, limits, locks, trading gate
//! - `fee_engine`: Taxability, direction and fee split for a transfer
//! - `settlement`: The `swap_back` settlement engine
//! - `treasury`: Fee accumulators and contract-held currency
//! - `token`: `FeeToken`, the transfer orchestrator and admin surface
//! - `exchange`: Router, payment rail and token-port traits
//! - `security`: Settlement mutex, ownership, one-way flags and locks
//! - `config`: Genesis configuration
//! - `events`: Contract events
//! - `errors`: Contract-specific error types
//! - `mock`: In-memory router and payment rail (tests and the `test-utils` feature)

pub mod config;
pub mod errors;
pub mod events;
pub mod exchange;
pub mod fee_engine;
pub mod ledger;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod policy;
pub mod security;
pub mod settlement;
pub mod token;
pub mod treasury;

pub use config::TokenConfig;
pub use errors::TokenError;
pub use token::FeeToken;
