//! Market simulation for the fee-diverting token
//!
//! Runs the token against a constant-product pool with seeded traders and
//! checks that the ledger invariants hold after every step.
//!
//! # Modules
//! - `pool`: Constant-product reference router
//! - `rail`: Payment rail with refusing and budget-limited wallets
//! - `chain`: Simulated chain holding the token, pool and rail
//! - `bots`: Seeded traders
//! - `scenarios`: Sell pressure, hostile charity, random flow
//! - `metrics`: Trade counters and fee/settlement totals
//! - `export`: JSON export of a run

pub mod bots;
pub mod chain;
pub mod export;
pub mod metrics;
pub mod pool;
pub mod rail;
pub mod scenarios;

/// Crate version constant
pub const VERSION: &str = "1.0.0";
