//! External collaborator interfaces
//!
//! The token never implements exchange mechanics or payments itself. It talks
//! to a router (pair factory, conversion, liquidity provisioning) and a
//! payment rail through the traits below.
//!
//! When the token calls into the router it hands itself over as a
//! `&mut dyn TokenPort`. Everything the router does to the token during that
//! call (pulling approved tokens, paying out currency) goes back through the
//! port, so reentrant calls run through the same checks as any other caller.

use ledger_types::ids::Address;
use serde::{Deserialize, Serialize};

use crate::errors::{ExchangeError, PushError, TokenError};

/// The token as seen by a collaborator during a call.
pub trait TokenPort {
    /// Address of the token contract.
    fn token_address(&self) -> Address;

    fn balance_of(&self, account: &Address) -> u128;

    /// Transfer from `caller`'s own balance.
    fn transfer(&mut self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError>;

    /// Transfer on behalf of `from`, consuming `spender`'s allowance.
    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError>;

    /// Pay currency into the token contract.
    fn receive_currency(&mut self, amount: u128) -> Result<(), TokenError>;
}

/// Exact-input conversion of tokens into currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub amount_in: u128,
    pub min_out: u128,
    /// `[token, wrapped_currency]`
    pub path: Vec<Address>,
    pub recipient: Address,
    /// Unix seconds
    pub deadline: i64,
}

/// Token plus currency liquidity provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityRequest {
    pub token: Address,
    pub amount_token_desired: u128,
    pub min_token: u128,
    pub min_currency: u128,
    /// Currency sent along with the call. Unused currency is refunded
    /// through `TokenPort::receive_currency`.
    pub currency_value: u128,
    /// Receiver of the liquidity shares.
    pub receiver: Address,
    pub deadline: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiquidityReceipt {
    pub token_used: u128,
    pub currency_used: u128,
    pub shares: u128,
}

/// Exchange router: pair factory, conversion and liquidity provisioning.
pub trait ExchangeRouter {
    fn address(&self) -> Address;

    /// Wrapped form of the reference currency used in swap paths.
    fn wrapped_currency(&self) -> Address;

    fn create_pair(&mut self, token_a: Address, token_b: Address) -> Result<Address, ExchangeError>;

    /// Convert tokens the caller approved into currency paid to
    /// `request.recipient`. The token measures the receipt by balance delta.
    fn swap_exact_tokens_for_currency(
        &mut self,
        port: &mut dyn TokenPort,
        request: SwapRequest,
    ) -> Result<(), ExchangeError>;

    fn add_liquidity_currency(
        &mut self,
        port: &mut dyn TokenPort,
        request: LiquidityRequest,
    ) -> Result<LiquidityReceipt, ExchangeError>;
}

/// Push-payment rail. The destination may refuse.
pub trait PaymentRail {
    fn push(&mut self, to: Address, amount: u128) -> Result<(), PushError>;
}

/// Map a token-side failure inside a router callback.
pub fn callback_error(err: TokenError) -> ExchangeError {
    ExchangeError::TokenCallback {
        reason: err.to_string(),
    }
}
