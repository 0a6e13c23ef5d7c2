//! Run export
//!
//! Serializes a scenario run (result, metrics and the final market state)
//! to JSON for external consumption.

use crate::chain::{SimChain, SimError};
use crate::metrics::SimMetrics;
use crate::scenarios::ScenarioResult;
use chrono::{DateTime, Utc};
use ledger_types::numeric::to_decimal;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Token and pool state at the end of a run, in whole units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub total_supply: Decimal,
    pub price: Option<Decimal>,
    pub reserve_token: Decimal,
    pub reserve_currency: Decimal,
    pub contract_tokens: Decimal,
    pub contract_currency: Decimal,
    pub pending_charity_currency: Decimal,
    pub charity_received: Decimal,
}

impl MarketSnapshot {
    pub fn capture(chain: &SimChain) -> Result<Self, SimError> {
        let token_decimals = chain.token.decimals();
        let currency_decimals = chain.currency_decimals;
        let tokens = |amount| whole(amount, token_decimals);
        let currency = |amount| whole(amount, currency_decimals);

        let pair = chain.pair_state()?;
        let charity_received = chain
            .token
            .policy()
            .charity_wallet()
            .map(|wallet| chain.rail().delivered_to(&wallet))
            .unwrap_or(0);

        Ok(Self {
            symbol: chain.token.symbol().to_string(),
            total_supply: tokens(chain.token.total_supply())?,
            price: chain.price(),
            reserve_token: tokens(pair.reserve_token)?,
            reserve_currency: currency(pair.reserve_currency)?,
            contract_tokens: tokens(chain.balance_of(&chain.token.address()))?,
            contract_currency: currency(chain.token.currency_balance())?,
            pending_charity_currency: currency(chain.token.pending_charity_currency())?,
            charity_received: currency(charity_received)?,
        })
    }
}

fn whole(amount: u128, decimals: u8) -> Result<Decimal, SimError> {
    to_decimal(amount, decimals).ok_or_else(|| SimError::Config {
        reason: format!("{amount} does not fit a decimal with {decimals} places"),
    })
}

/// Combined export containing all simulation outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationExport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub seed: u64,
    pub result: ScenarioResult,
    pub metrics: SimMetrics,
    pub market: MarketSnapshot,
    pub event_count: usize,
}

/// Build a complete simulation export.
pub fn build_export(
    chain: &SimChain,
    result: ScenarioResult,
    metrics: &SimMetrics,
    seed: u64,
) -> Result<SimulationExport, SimError> {
    Ok(SimulationExport {
        run_id: Uuid::now_v7(),
        generated_at: Utc::now(),
        version: crate::VERSION.to_string(),
        seed,
        result,
        metrics: metrics.clone(),
        market: MarketSnapshot::capture(chain)?,
        event_count: chain.events.len(),
    })
}

/// Export complete simulation data as JSON.
pub fn export_json(export: &SimulationExport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(export)
}

/// Write export to a file path.
pub fn write_to_file(export: &SimulationExport, path: impl AsRef<Path>) -> std::io::Result<()> {
    let json = export_json(export)?;
    std::fs::write(path, json)
}
