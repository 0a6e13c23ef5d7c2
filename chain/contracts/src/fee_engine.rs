//! Fee engine
//!
//! `assess` decides whether a transfer is taxed, in which direction, and how
//! the fee splits across the destroy, charity and liquidity sinks. It is pure.
//! `apply` carries an assessment out against the ledger and the accumulators.

use ledger_types::fee::{FeeBreakdown, TradeDirection};
use ledger_types::ids::Address;
use tracing::debug;

use crate::errors::TokenError;
use crate::events::{ContractEvent, FeeDiverted};
use crate::ledger::Ledger;
use crate::policy::PolicyRegistry;
use crate::treasury::Treasury;

/// Outcome of evaluating one transfer against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeAssessment {
    pub direction: TradeDirection,
    /// Neither party is fee-excluded.
    pub taxable: bool,
    pub breakdown: FeeBreakdown,
}

impl FeeAssessment {
    /// Amount the recipient receives.
    pub fn net_amount(&self, amount: u128) -> u128 {
        amount - self.breakdown.fee
    }
}

pub fn assess(
    policy: &PolicyRegistry,
    from: &Address,
    to: &Address,
    amount: u128,
) -> Result<FeeAssessment, TokenError> {
    let direction = policy.classify(from, to);
    let taxable = policy.is_taxable(from, to);

    let breakdown = match policy.fees_for(direction) {
        Some(fees) if taxable => fees.split(amount).ok_or(TokenError::Overflow)?,
        _ => FeeBreakdown::NONE,
    };

    Ok(FeeAssessment {
        direction,
        taxable,
        breakdown,
    })
}

/// Destroy the destroy share from `from`, move the retained share to
/// `contract` and credit the accumulators.
pub fn apply(
    ledger: &mut Ledger,
    treasury: &mut Treasury,
    contract: Address,
    from: Address,
    assessment: &FeeAssessment,
) -> Result<(), TokenError> {
    let b = &assessment.breakdown;
    if b.is_none() {
        return Ok(());
    }

    if b.destroyed > 0 {
        ledger.burn(from, b.destroyed)?;
    }
    let retained = b.retained();
    if retained > 0 {
        ledger.transfer(from, contract, retained)?;
        treasury.credit(b)?;
    }

    debug!(
        %from,
        direction = ?assessment.direction,
        destroyed = %b.destroyed,
        charity = %b.charity,
        liquidity = %b.liquidity,
        "fee diverted"
    );
    ledger.record(ContractEvent::FeeDiverted(FeeDiverted {
        from,
        direction: assessment.direction,
        destroyed: b.destroyed,
        charity: b.charity,
        liquidity: b.liquidity,
    }));
    Ok(())
}
