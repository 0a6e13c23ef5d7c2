//! Scenario simulation modules
//!
//! Each scenario drives the token through a specific market condition and
//! audits the ledger after every tick.

pub mod hostile_charity;
pub mod random_flow;
pub mod sell_pressure;

use crate::bots::trader::{Trader, TraderConfig};
use crate::chain::{trader_address, MarketConfig, SimChain, SimError, SimEvent};
use fee_token::events::ContractEvent;
use ledger_types::numeric::bps_of;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Market, population and run length shared by every scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub market: MarketConfig,
    pub traders: u64,
    /// Whole currency units minted to each trader
    pub trader_currency: u128,
    /// Tokens the deployer hands each trader, bps of supply
    pub trader_tokens_bps: u32,
    pub ticks: u64,
    pub seed: u64,
    pub trader: TraderConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            market: MarketConfig::default(),
            traders: 10,
            trader_currency: 50,
            trader_tokens_bps: 50,
            ticks: 1_000,
            seed: 42,
            trader: TraderConfig::default(),
        }
    }
}

impl ScenarioConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        serde_json::from_str(json).map_err(|e| SimError::Config {
            reason: e.to_string(),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| SimError::Config {
            reason: format!("{}: {e}", path.display()),
        })?;
        Self::from_json_str(&raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    RandomFlow,
    SellPressure,
    HostileCharity,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] = [
        ScenarioKind::RandomFlow,
        ScenarioKind::SellPressure,
        ScenarioKind::HostileCharity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::RandomFlow => "random_flow",
            ScenarioKind::SellPressure => "sell_pressure",
            ScenarioKind::HostileCharity => "hostile_charity",
        }
    }
}

impl FromStr for ScenarioKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| SimError::Config {
                reason: format!("unknown scenario {s}"),
            })
    }
}

/// Result of a scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub ticks_run: u64,
    pub actions_submitted: u64,
    pub settlements: u64,
    pub events_emitted: usize,
    pub passed: bool,
    pub details: String,
}

impl ScenarioResult {
    fn new(name: &str, chain: &SimChain, ticks_run: u64, actions_submitted: u64) -> Self {
        Self {
            name: name.to_string(),
            ticks_run,
            actions_submitted,
            settlements: settlement_count(&chain.events),
            events_emitted: chain.events.len(),
            passed: true,
            details: String::new(),
        }
    }

    fn failed(mut self, reason: impl Into<String>) -> Self {
        self.passed = false;
        self.details = reason.into();
        self
    }
}

/// Launch the market and run `kind` against it with the shared config.
pub fn run(kind: ScenarioKind, config: &ScenarioConfig) -> Result<(ScenarioResult, SimChain), SimError> {
    let mut chain = SimChain::launch(&config.market)?;
    let result = match kind {
        ScenarioKind::RandomFlow => random_flow::run(&mut chain, config)?,
        ScenarioKind::SellPressure => {
            sell_pressure::run(&mut chain, &sell_pressure::SellPressureConfig::default())?
        }
        ScenarioKind::HostileCharity => hostile_charity::run(
            &mut chain,
            config,
            &hostile_charity::HostileCharityConfig::default(),
        )?,
    };
    Ok((result, chain))
}

/// Fund the configured traders with currency and tokens.
pub fn populate(chain: &mut SimChain, config: &ScenarioConfig) -> Result<Vec<Trader>, SimError> {
    let currency = chain.currency_units(config.trader_currency)?;
    let tokens = bps_of(chain.token.total_supply(), config.trader_tokens_bps).unwrap_or(0);
    let deployer = chain.deployer;

    let mut traders = Vec::new();
    for index in 0..config.traders {
        let account = trader_address(index);
        chain.fund(account, currency)?;
        if tokens > 0 {
            chain.token.transfer(deployer, account, tokens)?;
        }
        traders.push(Trader::new(
            index,
            config.trader.clone(),
            config.seed.wrapping_add(index),
        ));
    }
    Ok(traders)
}

/// Let every trader act once per tick, auditing after each tick.
/// Stops at the first violation; returns the actions submitted and the
/// ticks completed.
pub fn trade_ticks(
    chain: &mut SimChain,
    traders: &mut [Trader],
    ticks: u64,
) -> (u64, u64, Result<(), SimError>) {
    let peers = traders.len() as u64;
    let mut submitted = 0;
    for tick in 0..ticks {
        for trader in traders.iter_mut() {
            if trader.tick(chain, peers) {
                submitted += 1;
            }
        }
        if let Err(err) = chain.audit() {
            return (submitted, tick + 1, Err(err));
        }
    }
    (submitted, ticks, Ok(()))
}

pub fn settlement_count(events: &[SimEvent]) -> u64 {
    events
        .iter()
        .filter(|event| {
            matches!(
                event,
                SimEvent::Contract {
                    event: ContractEvent::SettlementDetail(_),
                    ..
                }
            )
        })
        .count() as u64
}
