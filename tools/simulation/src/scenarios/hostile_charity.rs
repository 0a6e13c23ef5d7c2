//! Hostile charity scenario
//!
//! The charity destination refuses payment (or runs out of budget on any
//! push) for the first stretch of the run while traders keep settlements
//! coming. Refused currency must stay in the contract as pending, never
//! block a transfer, and reach the charity once it accepts again.

use crate::chain::{SimChain, SimError, SimEvent};
use crate::scenarios::{populate, trade_ticks, ScenarioConfig, ScenarioResult};
use fee_token::events::ContractEvent;
use fee_token::settlement::CharityOutcome;
use serde::{Deserialize, Serialize};

const NAME: &str = "hostile_charity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hostility {
    /// Every push is refused
    Refuse,
    /// Pushes above one base unit run out of budget
    OutOfBudget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostileCharityConfig {
    pub hostility: Hostility,
    /// Ticks during which the charity misbehaves
    pub hostile_ticks: u64,
}

impl Default for HostileCharityConfig {
    fn default() -> Self {
        Self {
            hostility: Hostility::Refuse,
            hostile_ticks: 200,
        }
    }
}

pub fn run(
    chain: &mut SimChain,
    config: &ScenarioConfig,
    hostile: &HostileCharityConfig,
) -> Result<ScenarioResult, SimError> {
    let Some(charity) = chain.token.policy().charity_wallet() else {
        let result = ScenarioResult::new(NAME, chain, 0, 0);
        return Ok(result.failed("market has no charity wallet"));
    };
    let mut traders = populate(chain, config)?;
    let start = chain.events.len();

    match hostile.hostility {
        Hostility::Refuse => chain.rail_mut().refuse(charity),
        Hostility::OutOfBudget => chain.rail_mut().limit(charity, 1),
    }
    let hostile_ticks = hostile.hostile_ticks.min(config.ticks);
    let (mut submitted, mut ticks_run, audit) = trade_ticks(chain, &mut traders, hostile_ticks);
    if let Err(err) = audit {
        let result = ScenarioResult::new(NAME, chain, ticks_run, submitted);
        return Ok(result.failed(format!("while hostile: {err}")));
    }
    let pending_while_hostile = chain.token.pending_charity_currency();
    let failures = chain.rail().refused_pushes();

    chain.rail_mut().accept(&charity);
    let (more, more_ticks, audit) =
        trade_ticks(chain, &mut traders, config.ticks - hostile_ticks);
    submitted += more;
    ticks_run += more_ticks;
    if let Err(err) = audit {
        let result = ScenarioResult::new(NAME, chain, ticks_run, submitted);
        return Ok(result.failed(format!("after recovery: {err}")));
    }

    let retried = chain.retry_charity()?;
    chain.audit()?;

    let allocated: u128 = chain.events[start..]
        .iter()
        .filter_map(|e| match e {
            SimEvent::Contract {
                event: ContractEvent::SettlementDetail(detail),
                ..
            } => Some(detail.currency_for_charity),
            _ => None,
        })
        .sum();
    let delivered = chain.rail().delivered_to(&charity);
    let pending = chain.token.pending_charity_currency();

    let result = ScenarioResult::new(NAME, chain, ticks_run, submitted);
    let result = if pending != 0 {
        result.failed(format!("{pending} still pending after retry"))
    } else if delivered != allocated {
        result.failed(format!(
            "charity allocated {allocated} but received {delivered}"
        ))
    } else if result.settlements > 0 && failures == 0 && pending_while_hostile == 0 {
        result.failed("settlements ran but the charity never refused")
    } else {
        let details = format!(
            "{} refused pushes, {} pending at recovery, {} delivered, final retry {}",
            failures,
            pending_while_hostile,
            delivered,
            match retried {
                CharityOutcome::Delivered { .. } => "delivered",
                CharityOutcome::Deferred { .. } => "deferred",
                CharityOutcome::NoDestination { .. } => "had no destination",
                CharityOutcome::NotAttempted => "not needed",
            },
        );
        ScenarioResult { details, ..result }
    };
    Ok(result)
}
