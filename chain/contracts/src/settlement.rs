//! Settlement engine (`swap_back`)
//!
//! Converts part of the contract's accumulated tokens into currency, pairs
//! half of the liquidity share with currency as permanently locked
//! liquidity, and forwards the rest of the currency to the charity
//! destination.
//!
//! Work per run is capped at `threshold * BATCH_MULTIPLIER` tokens.
//! Accumulators are reduced before liquidity is provisioned or currency is
//! pushed. Conversion and provisioning failures abort the enclosing call; a
//! refused charity push is carried as pending currency and retried.

use chrono::Utc;
use ledger_types::ids::Address;
use ledger_types::numeric::mul_div;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::TokenError;
use crate::events::{
    CharityForwardFailed, CharityForwarded, ContractEvent, LiquidityLocked, SettlementDetail,
};
use crate::exchange::{ExchangeRouter, LiquidityRequest, PaymentRail, SwapRequest};
use crate::token::FeeToken;
use crate::treasury::Treasury;

/// Max tokens processed per run, as a multiple of the trigger threshold.
pub const BATCH_MULTIPLIER: u128 = 20;

/// Token amounts for one run, fixed before any external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub batch: u128,
    /// Share of the batch attributed to the liquidity accumulator
    pub liquidity_tokens: u128,
    /// Liquidity tokens kept back to pair with currency
    pub half_liquidity: u128,
    pub to_convert: u128,
}

impl SettlementPlan {
    /// Returns `None` when there is nothing to settle.
    pub fn compute(held: u128, treasury: &Treasury, threshold: u128) -> Option<Self> {
        let total = treasury.earmarked_tokens();
        if held == 0 || total == 0 {
            return None;
        }
        let batch = held.min(threshold.saturating_mul(BATCH_MULTIPLIER));
        if batch == 0 {
            return None;
        }
        let liquidity_tokens = mul_div(batch, treasury.tokens_for_liquidity(), total)?;
        let half_liquidity = liquidity_tokens / 2;
        Some(Self {
            batch,
            liquidity_tokens,
            half_liquidity,
            to_convert: batch - half_liquidity,
        })
    }

    pub fn processed_charity(&self) -> u128 {
        self.batch - self.liquidity_tokens
    }

    pub fn processed_liquidity(&self) -> u128 {
        self.liquidity_tokens
    }
}

/// Split received currency between liquidity and charity.
///
/// Liquidity gets `received * half_liquidity / to_convert`; charity gets the
/// rest.
pub fn split_currency(received: u128, half_liquidity: u128, to_convert: u128) -> (u128, u128) {
    if to_convert == 0 {
        return (0, received);
    }
    let for_liquidity = mul_div(received, half_liquidity, to_convert)
        .unwrap_or(0)
        .min(received);
    (for_liquidity, received - for_liquidity)
}

/// What happened to the charity share of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CharityOutcome {
    /// No charity currency this run
    NotAttempted,
    /// Currency stays in the contract, unearmarked
    NoDestination { amount: u128 },
    Delivered { destination: Address, amount: u128 },
    /// Push refused; the amount is now pending
    Deferred { destination: Address, amount: u128 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub plan: SettlementPlan,
    pub currency_received: u128,
    pub currency_for_liquidity: u128,
    pub currency_for_charity: u128,
    pub liquidity_shares: u128,
    pub charity: CharityOutcome,
}

impl<R, P> FeeToken<R, P>
where
    R: ExchangeRouter + Clone,
    P: PaymentRail + Clone,
{
    /// Run one settlement. The caller holds the settlement mutex.
    pub(crate) fn swap_back(&mut self) -> Result<Option<SettlementReport>, TokenError> {
        if !self.policy.swap_enabled() {
            return Ok(None);
        }
        let held = self.ledger.balance_of(&self.address);
        let Some(plan) = SettlementPlan::compute(held, &self.treasury, self.policy.swap_threshold())
        else {
            return Ok(None);
        };
        let Some(mut router) = self.router.take() else {
            debug!(batch = %plan.batch, "router lent out, settlement deferred until it returns");
            self.settlement_deferred = true;
            return Ok(None);
        };

        let result = self.run_plan(&mut router, plan);
        self.router = Some(router);
        result.map(Some)
    }

    fn run_plan(&mut self, router: &mut R, plan: SettlementPlan) -> Result<SettlementReport, TokenError> {
        let contract = self.address;
        let router_address = router.address();
        let deadline = Utc::now().timestamp();

        let mut received = 0;
        if plan.to_convert > 0 {
            self.ledger.approve(contract, router_address, plan.to_convert)?;
            let before = self.treasury.currency_balance();
            let request = SwapRequest {
                amount_in: plan.to_convert,
                min_out: 0,
                path: vec![contract, router.wrapped_currency()],
                recipient: contract,
                deadline,
            };
            router.swap_exact_tokens_for_currency(self, request)?;
            received = self.treasury.currency_balance().saturating_sub(before);
        }

        let (for_liquidity, for_charity) =
            split_currency(received, plan.half_liquidity, plan.to_convert);

        self.treasury
            .settle(plan.processed_charity(), plan.processed_liquidity());

        let mut liquidity_shares = 0;
        if plan.half_liquidity > 0 && for_liquidity > 0 {
            self.ledger.approve(contract, router_address, plan.half_liquidity)?;
            self.treasury.debit_currency(for_liquidity)?;
            let request = LiquidityRequest {
                token: contract,
                amount_token_desired: plan.half_liquidity,
                min_token: 0,
                min_currency: 0,
                currency_value: for_liquidity,
                receiver: Address::DEAD,
                deadline,
            };
            let receipt = router.add_liquidity_currency(self, request)?;
            liquidity_shares = receipt.shares;
            self.ledger.record(ContractEvent::LiquidityLocked(LiquidityLocked {
                tokens: receipt.token_used,
                currency: receipt.currency_used,
                shares: receipt.shares,
                custody: Address::DEAD,
            }));
        }

        let charity = if for_charity == 0 {
            CharityOutcome::NotAttempted
        } else {
            match self.policy.charity_wallet() {
                Some(destination) => {
                    let payout = for_charity
                        .checked_add(self.treasury.pending_charity_currency())
                        .ok_or(TokenError::Overflow)?;
                    self.push_charity(destination, payout)?
                }
                None => CharityOutcome::NoDestination {
                    amount: for_charity,
                },
            }
        };

        self.ledger
            .record(ContractEvent::SettlementDetail(SettlementDetail {
                tokens_processed: plan.batch,
                liquidity_tokens: plan.liquidity_tokens,
                currency_for_liquidity: for_liquidity,
                currency_for_charity: for_charity,
            }));
        info!(
            batch = %plan.batch,
            converted = %plan.to_convert,
            received = %received,
            for_liquidity = %for_liquidity,
            for_charity = %for_charity,
            "settlement complete"
        );

        Ok(SettlementReport {
            plan,
            currency_received: received,
            currency_for_liquidity: for_liquidity,
            currency_for_charity: for_charity,
            liquidity_shares,
            charity,
        })
    }

    /// Push `payout` to the charity destination.
    ///
    /// The currency leaves the treasury before the push. A refusal puts it
    /// back and records it as pending; it is never a hard failure.
    pub(crate) fn push_charity(
        &mut self,
        destination: Address,
        payout: u128,
    ) -> Result<CharityOutcome, TokenError> {
        self.treasury.debit_currency(payout)?;
        match self.rail.push(destination, payout) {
            Ok(()) => {
                self.treasury.clear_pending();
                self.ledger
                    .record(ContractEvent::CharityForwarded(CharityForwarded {
                        destination,
                        amount: payout,
                    }));
                Ok(CharityOutcome::Delivered {
                    destination,
                    amount: payout,
                })
            }
            Err(err) => {
                self.treasury.credit_currency(payout)?;
                self.treasury.set_pending(payout);
                warn!(%destination, amount = %payout, error = %err, "charity push refused, carrying as pending");
                self.ledger
                    .record(ContractEvent::CharityForwardFailed(CharityForwardFailed {
                        destination,
                        amount: payout,
                        reason: err.to_string(),
                    }));
                Ok(CharityOutcome::Deferred {
                    destination,
                    amount: payout,
                })
            }
        }
    }
}
