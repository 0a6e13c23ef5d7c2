//! Simulated chain
//!
//! One token deployed against the constant-product pool, with currency
//! wallets held by the pool and charity pushes going through `WalletRail`.
//! Every action is recorded as a `SimEvent`; failed actions are recorded
//! as `Rejected` and leave no trace on the token.

use fee_token::config::TokenConfig;
use fee_token::errors::{InvariantViolation, TokenError};
use fee_token::events::ContractEvent;
use fee_token::exchange::ExchangeRouter;
use fee_token::settlement::{CharityOutcome, SettlementReport};
use fee_token::FeeToken;
use ledger_types::ids::Address;
use ledger_types::numeric::{bps_of, to_base_units, to_decimal};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::pool::{ConstantProductRouter, PairState};
use crate::rail::WalletRail;

pub type SimToken = FeeToken<ConstantProductRouter, WalletRail>;

const DEPLOYER: u64 = 0xde91_0e7;
const CHARITY: u64 = 0xc4a_417;
const TRADER_BASE: u64 = 0x7_0000;

/// Charity destination used by the default market.
pub fn charity_address() -> Address {
    Address::from_low_u64(CHARITY)
}

/// Deterministic address of the `index`th trader.
pub fn trader_address(index: u64) -> Address {
    Address::from_low_u64(TRADER_BASE + index)
}

/// Token plus initial pool liquidity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub token: TokenConfig,
    /// Share of supply the deployer seeds into the pair, bps
    pub liquidity_bps: u32,
    /// Whole currency units seeded alongside
    pub liquidity_currency: u128,
    pub currency_decimals: u8,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            token: TokenConfig {
                charity_wallet: Some(charity_address()),
                ..TokenConfig::default()
            },
            liquidity_bps: 5_000,
            liquidity_currency: 500,
            currency_decimals: 18,
        }
    }
}

/// Simulation-level failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("Currency not conserved: minted {minted}, accounted {accounted}")]
    CurrencyLeak { minted: u128, accounted: u128 },

    #[error("Pair reserve {reserve} exceeds the pair's token balance {balance}")]
    ReserveExceedsBalance { reserve: u128, balance: u128 },

    #[error("Invalid market config: {reason}")]
    Config { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Buy,
    Sell,
    Send,
    Settle,
}

/// Events emitted by the simulated chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Bought {
        sequence: u64,
        account: Address,
        currency_in: u128,
        tokens_received: u128,
    },
    Sold {
        sequence: u64,
        account: Address,
        tokens_sent: u128,
        currency_received: u128,
    },
    Sent {
        sequence: u64,
        from: Address,
        to: Address,
        amount: u128,
    },
    Rejected {
        sequence: u64,
        account: Address,
        action: Action,
        reason: String,
    },
    /// Token event other than plain transfers and approvals
    Contract { sequence: u64, event: ContractEvent },
}

pub struct SimChain {
    pub token: SimToken,
    pub deployer: Address,
    pub pair: Address,
    pub currency_decimals: u8,
    pub events: Vec<SimEvent>,
    pub sequence: u64,
    minted_currency: u128,
}

impl SimChain {
    /// Deploy the token, seed the pair from the deployer and open trading.
    pub fn launch(config: &MarketConfig) -> Result<Self, SimError> {
        let deployer = Address::from_low_u64(DEPLOYER);
        let token = FeeToken::deploy(
            &config.token,
            deployer,
            ConstantProductRouter::new(),
            WalletRail::new(),
        )?;
        let pair = token
            .policy()
            .primary_pair()
            .ok_or_else(|| SimError::Config {
                reason: "token deployed without a pair".into(),
            })?;

        let mut chain = Self {
            token,
            deployer,
            pair,
            currency_decimals: config.currency_decimals,
            events: Vec::new(),
            sequence: 0,
            minted_currency: 0,
        };

        let tokens = bps_of(chain.token.total_supply(), config.liquidity_bps)
            .ok_or(TokenError::Overflow)?;
        let currency = chain.currency_units(config.liquidity_currency)?;
        chain.fund(deployer, currency)?;

        let router = chain.pool()?.address();
        chain.token.approve(deployer, router, tokens)?;
        chain
            .token
            .call_router(|pool, port| pool.add_liquidity_for(port, deployer, tokens, currency))?;
        chain.token.enable_trading(deployer)?;
        chain.collect_contract_events();

        debug!(%pair, tokens = %tokens, currency = %currency, "market launched");
        Ok(chain)
    }

    /// Whole currency units to base units.
    pub fn currency_units(&self, whole: u128) -> Result<u128, SimError> {
        to_base_units(whole, self.currency_decimals).ok_or_else(|| SimError::Config {
            reason: format!("{whole} currency overflows {} decimals", self.currency_decimals),
        })
    }

    pub fn pool(&self) -> Result<&ConstantProductRouter, SimError> {
        Ok(self.token.router().ok_or(TokenError::RouterBusy)?)
    }

    fn pool_mut(&mut self) -> Result<&mut ConstantProductRouter, SimError> {
        Ok(self.token.router_mut().ok_or(TokenError::RouterBusy)?)
    }

    pub fn pair_state(&self) -> Result<&PairState, SimError> {
        self.pool()?.pair().ok_or_else(|| SimError::Config {
            reason: "pool has no pair".into(),
        })
    }

    pub fn rail(&self) -> &WalletRail {
        self.token.rail()
    }

    pub fn rail_mut(&mut self) -> &mut WalletRail {
        self.token.rail_mut()
    }

    /// Mint currency into `account`'s wallet.
    pub fn fund(&mut self, account: Address, amount: u128) -> Result<(), SimError> {
        self.pool_mut()?.fund(account, amount);
        self.minted_currency = self.minted_currency.saturating_add(amount);
        Ok(())
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.token.balance_of(account)
    }

    pub fn currency_of(&self, account: &Address) -> u128 {
        self.pool().map(|pool| pool.currency_of(account)).unwrap_or(0)
    }

    /// Currency per whole token at the pair's reserves.
    pub fn price(&self) -> Option<Decimal> {
        let pair = self.pair_state().ok()?;
        let currency = to_decimal(pair.reserve_currency, self.currency_decimals)?;
        let tokens = to_decimal(pair.reserve_token, self.token.decimals())?;
        currency.checked_div(tokens)
    }

    // ───────────────────────── Actions ─────────────────────────

    /// Buy with `currency_in` from the buyer's wallet. Returns the tokens
    /// received after the buy fee.
    pub fn buy(&mut self, buyer: Address, currency_in: u128) -> Result<u128, TokenError> {
        let sequence = self.next_sequence();
        let result = self
            .token
            .call_router(|pool, port| pool.buy(port, buyer, currency_in, 0));
        let event = match &result {
            Ok(received) => SimEvent::Bought {
                sequence,
                account: buyer,
                currency_in,
                tokens_received: *received,
            },
            Err(err) => rejected(sequence, buyer, Action::Buy, err),
        };
        self.finish(event);
        result
    }

    /// Send `amount` to the pair and collect the currency it buys. The
    /// transfer may trigger a settlement before the pool is paid.
    pub fn sell(&mut self, seller: Address, amount: u128) -> Result<u128, TokenError> {
        let sequence = self.next_sequence();
        let result = self.token.transfer(seller, self.pair, amount).and_then(|()| {
            self.token
                .call_router(|pool, port| pool.sell_surplus(port, seller, 0))
        });
        let event = match &result {
            Ok(received) => SimEvent::Sold {
                sequence,
                account: seller,
                tokens_sent: amount,
                currency_received: *received,
            },
            Err(err) => rejected(sequence, seller, Action::Sell, err),
        };
        self.finish(event);
        result
    }

    pub fn send(&mut self, from: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        let sequence = self.next_sequence();
        let result = self.token.transfer(from, to, amount);
        let event = match &result {
            Ok(()) => SimEvent::Sent {
                sequence,
                from,
                to,
                amount,
            },
            Err(err) => rejected(sequence, from, Action::Send, err),
        };
        self.finish(event);
        result
    }

    /// Owner-forced settlement.
    pub fn settle(&mut self) -> Result<Option<SettlementReport>, TokenError> {
        let sequence = self.next_sequence();
        let result = self.token.settle_now(self.deployer);
        if let Err(err) = &result {
            self.events
                .push(rejected(sequence, self.deployer, Action::Settle, err));
        }
        self.collect_contract_events();
        result
    }

    pub fn retry_charity(&mut self) -> Result<CharityOutcome, TokenError> {
        let result = self.token.retry_charity_payout(self.deployer);
        self.collect_contract_events();
        result
    }

    /// Refuse router requests with deadlines before `timestamp`.
    pub fn set_block_time(&mut self, timestamp: i64) -> Result<(), SimError> {
        self.pool_mut()?.block_time = timestamp;
        Ok(())
    }

    // ───────────────────────── Audit ─────────────────────────

    /// Currency held anywhere on the chain.
    pub fn currency_accounted(&self) -> Result<u128, SimError> {
        let pool = self.pool()?;
        let reserve = pool.pair().map(|pair| pair.reserve_currency).unwrap_or(0);
        Ok(pool.wallet_total()
            + reserve
            + self.token.currency_balance()
            + self.rail().delivered_total())
    }

    /// Token invariants plus currency conservation and reserve backing.
    pub fn audit(&self) -> Result<(), SimError> {
        self.token.audit()?;

        let accounted = self.currency_accounted()?;
        if accounted != self.minted_currency {
            return Err(SimError::CurrencyLeak {
                minted: self.minted_currency,
                accounted,
            });
        }

        let pair = self.pair_state()?;
        let balance = self.token.balance_of(&pair.address);
        if pair.reserve_token > balance {
            return Err(SimError::ReserveExceedsBalance {
                reserve: pair.reserve_token,
                balance,
            });
        }
        Ok(())
    }

    pub fn minted_currency(&self) -> u128 {
        self.minted_currency
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn finish(&mut self, event: SimEvent) {
        self.events.push(event);
        self.collect_contract_events();
    }

    fn collect_contract_events(&mut self) {
        let sequence = self.sequence;
        for event in self.token.drain_events() {
            if matches!(
                event,
                ContractEvent::Transfer(_) | ContractEvent::Approval(_)
            ) {
                continue;
            }
            self.events.push(SimEvent::Contract { sequence, event });
        }
    }
}

fn rejected(sequence: u64, account: Address, action: Action, err: &TokenError) -> SimEvent {
    debug!(%account, ?action, error = %err, "action rejected");
    SimEvent::Rejected {
        sequence,
        account,
        action,
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_types::fee::FeeSet;

    /// 1M tokens, half seeded against 1M currency, no decimals.
    fn small_market() -> MarketConfig {
        MarketConfig {
            token: TokenConfig {
                decimals: 0,
                total_supply: 1_000_000,
                buy_fees: FeeSet::new(30, 10, 10),
                sell_fees: FeeSet::new(30, 10, 10),
                charity_wallet: Some(charity_address()),
                ..TokenConfig::default()
            },
            liquidity_bps: 5_000,
            liquidity_currency: 1_000_000,
            currency_decimals: 0,
        }
    }

    #[test]
    fn test_launch_seeds_pair() {
        let chain = SimChain::launch(&small_market()).unwrap();
        let pair = chain.pair_state().unwrap();
        assert_eq!(pair.reserve_token, 500_000);
        assert_eq!(pair.reserve_currency, 1_000_000);
        assert_eq!(chain.balance_of(&chain.pair), 500_000);
        assert_eq!(chain.balance_of(&chain.deployer), 500_000);
        assert!(chain.token.policy().trading_active());
        assert_eq!(chain.price(), Some(Decimal::from(2)));
        chain.audit().unwrap();
    }

    #[test]
    fn test_buy_pays_fee() {
        let mut chain = SimChain::launch(&small_market()).unwrap();
        let buyer = trader_address(1);
        chain.fund(buyer, 2_000).unwrap();

        let quoted = chain.pool().unwrap().quote_buy(2_000).unwrap();
        let received = chain.buy(buyer, 2_000).unwrap();
        assert!(received > 0 && received < quoted);
        assert_eq!(chain.balance_of(&buyer), received);
        assert_eq!(chain.currency_of(&buyer), 0);
        assert!(chain.token.tokens_for_charity() > 0);
        chain.audit().unwrap();
    }

    #[test]
    fn test_failed_buy_keeps_wallet() {
        let mut chain = SimChain::launch(&small_market()).unwrap();
        let buyer = trader_address(1);
        chain.fund(buyer, 100_000).unwrap();

        // Far past the 10_000 token max transaction
        let result = chain.buy(buyer, 100_000);
        assert!(matches!(result, Err(TokenError::Exchange(_))));
        assert_eq!(chain.currency_of(&buyer), 100_000);
        assert_eq!(chain.balance_of(&buyer), 0);
        assert!(matches!(
            chain.events.last(),
            Some(SimEvent::Rejected {
                action: Action::Buy,
                ..
            })
        ));
        chain.audit().unwrap();
    }

    #[test]
    fn test_sell_pays_seller() {
        let mut chain = SimChain::launch(&small_market()).unwrap();
        let seller = trader_address(2);
        let deployer = chain.deployer;
        chain.send(deployer, seller, 5_000).unwrap();

        let paid = chain.sell(seller, 5_000).unwrap();
        assert!(paid > 0);
        assert_eq!(chain.currency_of(&seller), paid);
        assert_eq!(chain.balance_of(&seller), 0);
        let pair = chain.pair_state().unwrap();
        assert_eq!(pair.reserve_token, chain.balance_of(&chain.pair));
        chain.audit().unwrap();
    }

    #[test]
    fn test_sells_trigger_settlement() {
        let mut chain = SimChain::launch(&small_market()).unwrap();
        let seller = trader_address(2);
        let deployer = chain.deployer;
        chain.send(deployer, seller, 20_000).unwrap();

        for _ in 0..4 {
            chain.sell(seller, 5_000).unwrap();
            chain.audit().unwrap();
        }
        let settled = chain
            .events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    SimEvent::Contract {
                        event: ContractEvent::SettlementDetail(_),
                        ..
                    }
                )
            })
            .count();
        assert!(settled >= 1);
        assert!(chain.rail().delivered_to(&charity_address()) > 0);
        assert!(chain.pool().unwrap().shares_of(&Address::DEAD) > 0);
    }

    #[test]
    fn test_expired_deadline_rolls_back_sell() {
        let mut chain = SimChain::launch(&small_market()).unwrap();
        let seller = trader_address(2);
        let deployer = chain.deployer;
        chain.send(deployer, seller, 20_000).unwrap();
        chain.set_block_time(i64::MAX).unwrap();

        // Two sells leave 400 tokens in the contract, under the 500
        // threshold. The third needs a settlement the router refuses.
        chain.sell(seller, 5_000).unwrap();
        chain.sell(seller, 5_000).unwrap();
        let held = chain.balance_of(&seller);
        let result = chain.sell(seller, 5_000);
        assert!(matches!(result, Err(TokenError::Exchange(_))));
        assert_eq!(chain.balance_of(&seller), held);
        chain.audit().unwrap();

        chain.set_block_time(0).unwrap();
        chain.sell(seller, 5_000).unwrap();
        chain.audit().unwrap();
    }

    #[test]
    fn test_refused_charity_is_carried() {
        let mut chain = SimChain::launch(&small_market()).unwrap();
        let seller = trader_address(2);
        let deployer = chain.deployer;
        chain.send(deployer, seller, 20_000).unwrap();
        chain.rail_mut().refuse(charity_address());

        for _ in 0..3 {
            chain.sell(seller, 5_000).unwrap();
        }
        let pending = chain.token.pending_charity_currency();
        assert!(pending > 0);
        chain.audit().unwrap();

        chain.rail_mut().accept(&charity_address());
        let outcome = chain.retry_charity().unwrap();
        assert_eq!(
            outcome,
            CharityOutcome::Delivered {
                destination: charity_address(),
                amount: pending
            }
        );
        assert_eq!(chain.token.pending_charity_currency(), 0);
        chain.audit().unwrap();
    }
}
