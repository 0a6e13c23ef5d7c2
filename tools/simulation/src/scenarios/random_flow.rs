//! Random flow scenario
//!
//! Seeded traders buy, sell and pass tokens around. Settlements fire
//! whenever sells push the contract balance over the threshold; the
//! ledger and currency books must balance after every tick.

use crate::chain::{SimChain, SimError};
use crate::scenarios::{populate, trade_ticks, ScenarioConfig, ScenarioResult};

const NAME: &str = "random_flow";

pub fn run(chain: &mut SimChain, config: &ScenarioConfig) -> Result<ScenarioResult, SimError> {
    let mut traders = populate(chain, config)?;
    let (submitted, ticks_run, audit) = trade_ticks(chain, &mut traders, config.ticks);

    let result = ScenarioResult::new(NAME, chain, ticks_run, submitted);
    if let Err(err) = audit {
        return Ok(result.failed(format!("tick {ticks_run}: {err}")));
    }

    let details = format!(
        "{} traders, {} actions over {} ticks, {} settlements, price {}",
        traders.len(),
        submitted,
        ticks_run,
        result.settlements,
        chain
            .price()
            .map(|p| p.round_dp(12).to_string())
            .unwrap_or_else(|| "n/a".into()),
    );
    Ok(ScenarioResult { details, ..result })
}
