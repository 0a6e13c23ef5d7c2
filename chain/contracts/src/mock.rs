//! In-memory collaborators for tests and dry runs
//!
//! `FixedRateRouter` converts at a fixed rate and can be told to fail or to
//! re-enter the token mid-swap. `ScriptedRail` accepts or refuses pushes on
//! a script.

use ledger_types::ids::Address;
use ledger_types::numeric::mul_div;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::errors::{ExchangeError, PushError, TokenError};
use crate::exchange::{
    callback_error, ExchangeRouter, LiquidityReceipt, LiquidityRequest, PaymentRail, SwapRequest,
    TokenPort,
};

/// A transfer the router attempts through the port during a swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReentryProbe {
    pub from: Address,
    pub to: Address,
    pub amount: u128,
}

#[derive(Debug, Clone)]
pub struct FixedRateRouter {
    address: Address,
    wrapped: Address,
    pairs: HashMap<(Address, Address), Address>,
    /// Currency paid per `rate_den` tokens
    rate_num: u128,
    rate_den: u128,
    pub fail_swaps: bool,
    pub fail_liquidity: bool,
    /// Share of `currency_value` returned unused, per mille
    pub refund_per_mille: u128,
    probe: Option<ReentryProbe>,
    probe_result: Option<Result<(), TokenError>>,
    shares: HashMap<Address, u128>,
    currency_paid_out: HashMap<Address, u128>,
    swap_calls: usize,
    liquidity_calls: usize,
    last_swap: Option<SwapRequest>,
}

impl FixedRateRouter {
    pub fn new(rate_num: u128, rate_den: u128) -> Self {
        Self {
            address: Address::from_low_u64(0x7007e7),
            wrapped: Address::from_low_u64(0x3e7),
            pairs: HashMap::new(),
            rate_num,
            rate_den,
            fail_swaps: false,
            fail_liquidity: false,
            refund_per_mille: 0,
            probe: None,
            probe_result: None,
            shares: HashMap::new(),
            currency_paid_out: HashMap::new(),
            swap_calls: 0,
            liquidity_calls: 0,
            last_swap: None,
        }
    }

    /// Attempt `probe` through the port on the next swap.
    pub fn arm_reentry(&mut self, probe: ReentryProbe) {
        self.probe = Some(probe);
    }

    /// Outcome of the last reentrant attempt.
    pub fn probe_result(&self) -> Option<&Result<(), TokenError>> {
        self.probe_result.as_ref()
    }

    pub fn pair_for(&self, token: &Address) -> Option<Address> {
        self.pairs.get(&sorted(*token, self.wrapped)).copied()
    }

    pub fn shares_of(&self, holder: &Address) -> u128 {
        self.shares.get(holder).copied().unwrap_or(0)
    }

    pub fn currency_paid_to(&self, account: &Address) -> u128 {
        self.currency_paid_out.get(account).copied().unwrap_or(0)
    }

    pub fn swap_calls(&self) -> usize {
        self.swap_calls
    }

    pub fn liquidity_calls(&self) -> usize {
        self.liquidity_calls
    }

    pub fn last_swap(&self) -> Option<&SwapRequest> {
        self.last_swap.as_ref()
    }

    fn quote(&self, amount_in: u128) -> Result<u128, ExchangeError> {
        mul_div(amount_in, self.rate_num, self.rate_den).ok_or(ExchangeError::InsufficientLiquidity)
    }
}

impl ExchangeRouter for FixedRateRouter {
    fn address(&self) -> Address {
        self.address
    }

    fn wrapped_currency(&self) -> Address {
        self.wrapped
    }

    fn create_pair(&mut self, token_a: Address, token_b: Address) -> Result<Address, ExchangeError> {
        let key = sorted(token_a, token_b);
        if let Some(pair) = self.pairs.get(&key) {
            return Err(ExchangeError::PairExists { pair: *pair });
        }
        let pair = Address::from_low_u64(0xfa17 + self.pairs.len() as u64);
        self.pairs.insert(key, pair);
        Ok(pair)
    }

    fn swap_exact_tokens_for_currency(
        &mut self,
        port: &mut dyn TokenPort,
        request: SwapRequest,
    ) -> Result<(), ExchangeError> {
        self.swap_calls += 1;
        self.last_swap = Some(request.clone());
        if self.fail_swaps {
            return Err(ExchangeError::Rejected {
                reason: "swaps disabled".into(),
            });
        }
        let token = port.token_address();
        if request.path != [token, self.wrapped] {
            return Err(ExchangeError::UnknownPair);
        }
        let pair = self.pair_for(&token).ok_or(ExchangeError::UnknownPair)?;

        let before = port.balance_of(&pair);
        port.transfer_from(self.address, token, pair, request.amount_in)
            .map_err(callback_error)?;
        let received = port.balance_of(&pair).saturating_sub(before);

        if let Some(probe) = self.probe.take() {
            self.probe_result = Some(port.transfer_from(
                self.address,
                probe.from,
                probe.to,
                probe.amount,
            ));
        }

        let out = self.quote(received)?;
        if out < request.min_out {
            return Err(ExchangeError::InsufficientOutput {
                actual: out,
                minimum: request.min_out,
            });
        }
        if request.recipient == token {
            port.receive_currency(out).map_err(callback_error)?;
        }
        *self.currency_paid_out.entry(request.recipient).or_insert(0) += out;
        Ok(())
    }

    fn add_liquidity_currency(
        &mut self,
        port: &mut dyn TokenPort,
        request: LiquidityRequest,
    ) -> Result<LiquidityReceipt, ExchangeError> {
        self.liquidity_calls += 1;
        if self.fail_liquidity {
            return Err(ExchangeError::Rejected {
                reason: "liquidity disabled".into(),
            });
        }
        let pair = self
            .pair_for(&request.token)
            .ok_or(ExchangeError::UnknownPair)?;
        port.transfer_from(self.address, request.token, pair, request.amount_token_desired)
            .map_err(callback_error)?;

        let refund = mul_div(request.currency_value, self.refund_per_mille, 1_000).unwrap_or(0);
        let currency_used = request.currency_value - refund;
        if refund > 0 {
            port.receive_currency(refund).map_err(callback_error)?;
        }

        let shares = request.amount_token_desired.min(currency_used);
        *self.shares.entry(request.receiver).or_insert(0) += shares;
        Ok(LiquidityReceipt {
            token_used: request.amount_token_desired,
            currency_used,
            shares,
        })
    }
}

fn sorted(a: Address, b: Address) -> (Address, Address) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// One push as seen by the rail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushAttempt {
    pub to: Address,
    pub amount: u128,
    pub accepted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedRail {
    received: HashMap<Address, u128>,
    attempts: Vec<PushAttempt>,
    reject_next: HashMap<Address, u32>,
    reject_always: HashSet<Address>,
}

impl ScriptedRail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next `count` pushes to `destination`.
    pub fn reject_next(&mut self, destination: Address, count: u32) {
        self.reject_next.insert(destination, count);
    }

    /// Refuse every push to `destination` until `accept` is called.
    pub fn reject_always(&mut self, destination: Address) {
        self.reject_always.insert(destination);
    }

    pub fn accept(&mut self, destination: &Address) {
        self.reject_always.remove(destination);
        self.reject_next.remove(destination);
    }

    pub fn received(&self, destination: &Address) -> u128 {
        self.received.get(destination).copied().unwrap_or(0)
    }

    pub fn attempts(&self) -> &[PushAttempt] {
        &self.attempts
    }
}

impl PaymentRail for ScriptedRail {
    fn push(&mut self, to: Address, amount: u128) -> Result<(), PushError> {
        let scripted = match self.reject_next.get_mut(&to) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        };
        let refused = scripted || self.reject_always.contains(&to);
        self.attempts.push(PushAttempt {
            to,
            amount,
            accepted: !refused,
        });
        if refused {
            return Err(PushError::Rejected { destination: to });
        }
        *self.received.entry(to).or_insert(0) += amount;
        Ok(())
    }
}
