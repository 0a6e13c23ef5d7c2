//! Constant-product reference router
//!
//! A single token/currency pair priced by `x * y = k` with a 0.3% input
//! fee. Token amounts live on the token's own ledger (the pair is an
//! ordinary holder); currency reserves and trader currency wallets live
//! here. Inputs are measured by balance delta, so fee-on-transfer legs
//! are priced on what actually arrives.
//!
//! Trader-facing calls (`buy`, `sell_surplus`, `add_liquidity_for`) take a
//! `TokenPort` and are meant to run inside `FeeToken::call_router`, which
//! restores the router if the call fails.

use fee_token::errors::ExchangeError;
use fee_token::exchange::{
    callback_error, ExchangeRouter, LiquidityReceipt, LiquidityRequest, SwapRequest, TokenPort,
};
use ledger_types::ids::Address;
use ledger_types::numeric::{mul_div, PER_MILLE};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Swap fee taken from the input, per mille
pub const SWAP_FEE_PER_MILLE: u128 = 3;

/// Router contract address
pub const ROUTER_ADDRESS: u64 = 0x0000_7007_e700;

/// Wrapped reference currency used in swap paths
pub const WRAPPED_CURRENCY: u64 = 0x0000_00e7_4e40;

const PAIR_ADDRESS: u64 = 0x0000_0000_9a12;

/// Reserves and share supply of the pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairState {
    pub address: Address,
    pub token: Address,
    pub reserve_token: u128,
    pub reserve_currency: u128,
    pub total_shares: u128,
}

#[derive(Debug, Clone)]
pub struct ConstantProductRouter {
    address: Address,
    wrapped: Address,
    pair: Option<PairState>,
    shares: HashMap<Address, u128>,
    wallets: HashMap<Address, u128>,
    /// Requests whose deadline is earlier than this are refused.
    pub block_time: i64,
}

impl ConstantProductRouter {
    pub fn new() -> Self {
        Self {
            address: Address::from_low_u64(ROUTER_ADDRESS),
            wrapped: Address::from_low_u64(WRAPPED_CURRENCY),
            pair: None,
            shares: HashMap::new(),
            wallets: HashMap::new(),
            block_time: 0,
        }
    }

    pub fn pair(&self) -> Option<&PairState> {
        self.pair.as_ref()
    }

    pub fn shares_of(&self, holder: &Address) -> u128 {
        self.shares.get(holder).copied().unwrap_or(0)
    }

    /// Currency held by `account` outside the token.
    pub fn currency_of(&self, account: &Address) -> u128 {
        self.wallets.get(account).copied().unwrap_or(0)
    }

    /// Currency across every wallet.
    pub fn wallet_total(&self) -> u128 {
        self.wallets.values().sum()
    }

    /// Mint currency into a wallet.
    pub fn fund(&mut self, account: Address, amount: u128) {
        let wallet = self.wallets.entry(account).or_insert(0);
        *wallet = wallet.saturating_add(amount);
    }

    /// Tokens a buyer would be sent for `currency_in`, before transfer fees.
    pub fn quote_buy(&self, currency_in: u128) -> Option<u128> {
        let pair = self.pair.as_ref()?;
        amount_out(currency_in, pair.reserve_currency, pair.reserve_token)
    }

    /// Currency paid for `tokens_in` arriving at the pair.
    pub fn quote_sell(&self, tokens_in: u128) -> Option<u128> {
        let pair = self.pair.as_ref()?;
        amount_out(tokens_in, pair.reserve_token, pair.reserve_currency)
    }

    /// Spend `currency_in` from `buyer`'s wallet on tokens sent from the
    /// pair. Returns the tokens the buyer actually received.
    pub fn buy(
        &mut self,
        port: &mut dyn TokenPort,
        buyer: Address,
        currency_in: u128,
        min_tokens: u128,
    ) -> Result<u128, ExchangeError> {
        let pair_address = self.pair_address()?;
        self.debit_wallet(buyer, currency_in)?;
        let out = self
            .quote_buy(currency_in)
            .filter(|out| *out > 0)
            .ok_or(ExchangeError::InsufficientLiquidity)?;
        if out < min_tokens {
            return Err(ExchangeError::InsufficientOutput {
                actual: out,
                minimum: min_tokens,
            });
        }

        let before = port.balance_of(&buyer);
        port.transfer(pair_address, buyer, out)
            .map_err(callback_error)?;
        let received = port.balance_of(&buyer).saturating_sub(before);

        let reserve_token = port.balance_of(&pair_address);
        let pair = self.pair_mut()?;
        pair.reserve_currency = pair
            .reserve_currency
            .checked_add(currency_in)
            .ok_or(ExchangeError::InsufficientLiquidity)?;
        pair.reserve_token = reserve_token;
        Ok(received)
    }

    /// Pay `seller` for tokens sent to the pair since the last sync.
    /// Returns the currency paid.
    pub fn sell_surplus(
        &mut self,
        port: &mut dyn TokenPort,
        seller: Address,
        min_out: u128,
    ) -> Result<u128, ExchangeError> {
        let out = self.absorb_surplus(port, min_out)?;
        if out > 0 {
            self.fund(seller, out);
        }
        Ok(out)
    }

    /// Seed or deepen the pair from `provider`'s tokens and wallet currency.
    /// `provider` must have approved the router for `tokens`.
    pub fn add_liquidity_for(
        &mut self,
        port: &mut dyn TokenPort,
        provider: Address,
        tokens: u128,
        currency: u128,
    ) -> Result<LiquidityReceipt, ExchangeError> {
        self.debit_wallet(provider, currency)?;
        let receipt = self.provide(port, provider, tokens, currency, 0, 0, provider)?;
        let refund = currency - receipt.currency_used;
        if refund > 0 {
            self.fund(provider, refund);
        }
        Ok(receipt)
    }

    fn pair_address(&self) -> Result<Address, ExchangeError> {
        self.pair
            .as_ref()
            .map(|pair| pair.address)
            .ok_or(ExchangeError::UnknownPair)
    }

    fn pair_mut(&mut self) -> Result<&mut PairState, ExchangeError> {
        self.pair.as_mut().ok_or(ExchangeError::UnknownPair)
    }

    fn debit_wallet(&mut self, account: Address, amount: u128) -> Result<(), ExchangeError> {
        let held = self.currency_of(&account);
        if held < amount {
            return Err(ExchangeError::Rejected {
                reason: format!("wallet {account} holds {held}, needs {amount}"),
            });
        }
        self.wallets.insert(account, held - amount);
        Ok(())
    }

    fn check_deadline(&self, deadline: i64) -> Result<(), ExchangeError> {
        if deadline < self.block_time {
            return Err(ExchangeError::Rejected {
                reason: format!("deadline {deadline} passed at {}", self.block_time),
            });
        }
        Ok(())
    }

    /// Price the tokens sitting in the pair above its reserve and take the
    /// matching currency out of the reserve.
    fn absorb_surplus(
        &mut self,
        port: &mut dyn TokenPort,
        min_out: u128,
    ) -> Result<u128, ExchangeError> {
        let pair_address = self.pair_address()?;
        let balance = port.balance_of(&pair_address);
        let pair = self.pair_mut()?;
        let amount_in = balance.saturating_sub(pair.reserve_token);
        if amount_in == 0 {
            return Ok(0);
        }
        let out = amount_out(amount_in, pair.reserve_token, pair.reserve_currency)
            .ok_or(ExchangeError::InsufficientLiquidity)?;
        if out < min_out {
            return Err(ExchangeError::InsufficientOutput {
                actual: out,
                minimum: min_out,
            });
        }
        pair.reserve_token = balance;
        pair.reserve_currency -= out;
        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn provide(
        &mut self,
        port: &mut dyn TokenPort,
        from: Address,
        tokens_desired: u128,
        currency_value: u128,
        min_token: u128,
        min_currency: u128,
        receiver: Address,
    ) -> Result<LiquidityReceipt, ExchangeError> {
        let pair_address = self.pair_address()?;
        let (tokens, currency_used) = {
            let pair = self.pair_mut()?;
            optimal_amounts(pair, tokens_desired, currency_value)
                .ok_or(ExchangeError::InsufficientLiquidity)?
        };
        if tokens < min_token {
            return Err(ExchangeError::InsufficientOutput {
                actual: tokens,
                minimum: min_token,
            });
        }
        if currency_used < min_currency {
            return Err(ExchangeError::InsufficientOutput {
                actual: currency_used,
                minimum: min_currency,
            });
        }

        let before = port.balance_of(&pair_address);
        port.transfer_from(self.address, from, pair_address, tokens)
            .map_err(callback_error)?;
        let balance = port.balance_of(&pair_address);
        let token_in = balance.saturating_sub(before);

        let pair = self.pair_mut()?;
        let shares = if pair.total_shares == 0 {
            (U256::from(token_in) * U256::from(currency_used))
                .integer_sqrt()
                .low_u128()
        } else {
            let by_token = mul_div(token_in, pair.total_shares, pair.reserve_token);
            let by_currency = mul_div(currency_used, pair.total_shares, pair.reserve_currency);
            by_token
                .zip(by_currency)
                .map(|(a, b)| a.min(b))
                .unwrap_or(0)
        };
        if shares == 0 {
            return Err(ExchangeError::InsufficientLiquidity);
        }

        pair.reserve_token = balance;
        pair.reserve_currency = pair
            .reserve_currency
            .checked_add(currency_used)
            .ok_or(ExchangeError::InsufficientLiquidity)?;
        pair.total_shares += shares;
        *self.shares.entry(receiver).or_insert(0) += shares;

        Ok(LiquidityReceipt {
            token_used: token_in,
            currency_used,
            shares,
        })
    }
}

impl Default for ConstantProductRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeRouter for ConstantProductRouter {
    fn address(&self) -> Address {
        self.address
    }

    fn wrapped_currency(&self) -> Address {
        self.wrapped
    }

    fn create_pair(&mut self, token_a: Address, token_b: Address) -> Result<Address, ExchangeError> {
        if let Some(pair) = &self.pair {
            return Err(ExchangeError::PairExists { pair: pair.address });
        }
        let token = match (token_a == self.wrapped, token_b == self.wrapped) {
            (false, true) => token_a,
            (true, false) => token_b,
            _ => return Err(ExchangeError::UnknownPair),
        };
        let address = Address::from_low_u64(PAIR_ADDRESS);
        self.pair = Some(PairState {
            address,
            token,
            reserve_token: 0,
            reserve_currency: 0,
            total_shares: 0,
        });
        Ok(address)
    }

    fn swap_exact_tokens_for_currency(
        &mut self,
        port: &mut dyn TokenPort,
        request: SwapRequest,
    ) -> Result<(), ExchangeError> {
        self.check_deadline(request.deadline)?;
        let token = port.token_address();
        if request.path != [token, self.wrapped] {
            return Err(ExchangeError::UnknownPair);
        }
        let pair_address = self.pair_address()?;

        port.transfer_from(self.address, token, pair_address, request.amount_in)
            .map_err(callback_error)?;
        let out = self.absorb_surplus(port, request.min_out)?;

        if request.recipient == token {
            port.receive_currency(out).map_err(callback_error)?;
        } else {
            self.fund(request.recipient, out);
        }
        Ok(())
    }

    fn add_liquidity_currency(
        &mut self,
        port: &mut dyn TokenPort,
        request: LiquidityRequest,
    ) -> Result<LiquidityReceipt, ExchangeError> {
        self.check_deadline(request.deadline)?;
        if request.token != port.token_address() {
            return Err(ExchangeError::UnknownPair);
        }
        let receipt = self.provide(
            port,
            request.token,
            request.amount_token_desired,
            request.currency_value,
            request.min_token,
            request.min_currency,
            request.receiver,
        )?;
        let refund = request.currency_value - receipt.currency_used;
        if refund > 0 {
            port.receive_currency(refund).map_err(callback_error)?;
        }
        Ok(receipt)
    }
}

/// Output of an exact-input swap against `reserve_in`/`reserve_out`.
pub fn amount_out(amount_in: u128, reserve_in: u128, reserve_out: u128) -> Option<u128> {
    if amount_in == 0 || reserve_in == 0 || reserve_out == 0 {
        return None;
    }
    let with_fee = amount_in.checked_mul(PER_MILLE - SWAP_FEE_PER_MILLE)?;
    let denominator = reserve_in.checked_mul(PER_MILLE)?.checked_add(with_fee)?;
    mul_div(with_fee, reserve_out, denominator)
}

/// Amounts deposited for a liquidity request: the desired tokens with the
/// currency that matches the current price, or fewer tokens when the
/// currency runs short. An empty pair takes both as given.
fn optimal_amounts(pair: &PairState, tokens: u128, currency: u128) -> Option<(u128, u128)> {
    if pair.reserve_token == 0 || pair.reserve_currency == 0 {
        return Some((tokens, currency));
    }
    let currency_optimal = mul_div(tokens, pair.reserve_currency, pair.reserve_token)?;
    if currency_optimal <= currency {
        return Some((tokens, currency_optimal));
    }
    let tokens_optimal = mul_div(currency, pair.reserve_token, pair.reserve_currency)?;
    Some((tokens_optimal, currency))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_out_takes_fee() {
        // 1000 in against 1:1 reserves of 1_000_000: 997 * 1e6 / (1e9 + 997)
        assert_eq!(amount_out(1_000, 1_000_000, 1_000_000), Some(996));
        assert_eq!(amount_out(0, 1_000_000, 1_000_000), None);
        assert_eq!(amount_out(10, 0, 1_000_000), None);
    }

    #[test]
    fn test_amount_out_never_drains_reserve() {
        let out = amount_out(u128::MAX / 2_000, 1, 1_000).unwrap();
        assert!(out < 1_000);
    }

    #[test]
    fn test_single_pair() {
        let mut router = ConstantProductRouter::new();
        let token = Address::from_low_u64(7);
        let wrapped = router.wrapped_currency();
        let pair = router.create_pair(token, wrapped).unwrap();
        assert_eq!(router.pair().unwrap().address, pair);
        assert_eq!(router.pair().unwrap().token, token);
        assert_eq!(
            router.create_pair(token, wrapped),
            Err(ExchangeError::PairExists { pair })
        );
    }

    #[test]
    fn test_pair_needs_wrapped_side() {
        let mut router = ConstantProductRouter::new();
        let result = router.create_pair(Address::from_low_u64(7), Address::from_low_u64(8));
        assert_eq!(result, Err(ExchangeError::UnknownPair));
    }

    #[test]
    fn test_optimal_amounts() {
        let pair = PairState {
            address: Address::from_low_u64(1),
            token: Address::from_low_u64(2),
            reserve_token: 4_000,
            reserve_currency: 1_000,
            total_shares: 2_000,
        };
        assert_eq!(optimal_amounts(&pair, 400, 500), Some((400, 100)));
        assert_eq!(optimal_amounts(&pair, 400, 50), Some((200, 50)));

        let empty = PairState {
            reserve_token: 0,
            reserve_currency: 0,
            total_shares: 0,
            ..pair
        };
        assert_eq!(optimal_amounts(&empty, 400, 50), Some((400, 50)));
    }

    #[test]
    fn test_wallets() {
        let mut router = ConstantProductRouter::new();
        let alice = Address::from_low_u64(0xa11ce);
        router.fund(alice, 500);
        router.fund(Address::from_low_u64(0xb0b), 250);
        assert_eq!(router.currency_of(&alice), 500);
        assert_eq!(router.wallet_total(), 750);

        router.debit_wallet(alice, 200).unwrap();
        assert_eq!(router.currency_of(&alice), 300);
        assert!(matches!(
            router.debit_wallet(alice, 301),
            Err(ExchangeError::Rejected { .. })
        ));
    }

    #[test]
    fn test_expired_deadline() {
        let mut router = ConstantProductRouter::new();
        router.block_time = 100;
        assert!(router.check_deadline(100).is_ok());
        assert!(matches!(
            router.check_deadline(99),
            Err(ExchangeError::Rejected { .. })
        ));
    }
}
