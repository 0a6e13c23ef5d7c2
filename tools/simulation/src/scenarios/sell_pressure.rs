//! Sell pressure scenario
//!
//! A handful of holders dump near the max transaction size in turn. Every
//! other sell or so pushes the contract over the threshold, so settlement
//! runs back to back while the price falls. Checks that each run stays
//! within its batch cap and that the charity is paid.

use crate::chain::{charity_address, trader_address, SimChain, SimError, SimEvent};
use crate::scenarios::ScenarioResult;
use fee_token::events::ContractEvent;
use fee_token::settlement::BATCH_MULTIPLIER;
use ledger_types::ids::Address;
use ledger_types::numeric::per_mille;
use serde::{Deserialize, Serialize};

const NAME: &str = "sell_pressure";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SellPressureConfig {
    pub sellers: u64,
    pub sells_per_seller: u64,
    /// Size of each sell, per mille of the max transaction amount
    pub sell_per_mille_of_max: u32,
}

impl Default for SellPressureConfig {
    fn default() -> Self {
        Self {
            sellers: 4,
            sells_per_seller: 10,
            sell_per_mille_of_max: 900,
        }
    }
}

pub fn run(chain: &mut SimChain, config: &SellPressureConfig) -> Result<ScenarioResult, SimError> {
    let chunk = per_mille(
        chain.token.policy().max_transaction(),
        config.sell_per_mille_of_max,
    )
    .unwrap_or(0);
    let deployer = chain.deployer;
    let sellers: Vec<_> = (0..config.sellers).map(trader_address).collect();
    for seller in &sellers {
        let allocation = chunk.saturating_mul(config.sells_per_seller as u128);
        chain.token.transfer(deployer, *seller, allocation)?;
    }

    let start = chain.events.len();
    let cap = chain
        .token
        .policy()
        .swap_threshold()
        .saturating_mul(BATCH_MULTIPLIER);

    let mut submitted = 0;
    let mut ticks_run = 0;
    let mut violation = None;
    'ticks: for _ in 0..config.sells_per_seller {
        ticks_run += 1;
        for seller in &sellers {
            // Rejections show up in the event log.
            let _ = chain.sell(*seller, chunk);
            submitted += 1;
            if let Err(err) = chain.audit() {
                violation = Some(err.to_string());
                break 'ticks;
            }
        }
    }

    let result = ScenarioResult::new(NAME, chain, ticks_run, submitted);
    if let Some(reason) = violation {
        return Ok(result.failed(reason));
    }

    let events = &chain.events[start..];
    let rejected = events
        .iter()
        .filter(|e| matches!(e, SimEvent::Rejected { .. }))
        .count();
    let oversized = events.iter().any(|e| {
        matches!(
            e,
            SimEvent::Contract {
                event: ContractEvent::SettlementDetail(detail),
                ..
            } if detail.tokens_processed > cap
        )
    });
    let delivered = chain.rail().delivered_to(&charity_address());

    let result = if rejected > 0 {
        result.failed(format!("{rejected} sells rejected"))
    } else if result.settlements == 0 {
        result.failed("no settlement ran")
    } else if oversized {
        result.failed(format!("a settlement exceeded the batch cap of {cap}"))
    } else if chain.token.policy().charity_wallet().is_some() && delivered == 0 {
        result.failed("charity received nothing")
    } else {
        let details = format!(
            "{} sells of {}, {} settlements, {} currency to charity, {} liquidity shares locked",
            submitted,
            chunk,
            result.settlements,
            delivered,
            chain.pool()?.shares_of(&Address::DEAD),
        );
        ScenarioResult { details, ..result }
    };
    Ok(result)
}
