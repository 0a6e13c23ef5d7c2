//! Fee token: the transfer orchestrator and public contract surface
//!
//! Every transfer runs `gate -> limits -> fee engine -> settlement (maybe)
//! -> final credit`. Every public mutating call is all-or-nothing: state is
//! checkpointed on entry and restored if the call fails. Reentrant calls
//! made by collaborators through `TokenPort` checkpoint on their own entry,
//! and any failure they return to the outer call unwinds that too.

use chrono::Utc;
use ledger_types::fee::TradeDirection;
use ledger_types::ids::{Address, ADDRESS_LEN};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::TokenConfig;
use crate::errors::{InvariantViolation, LedgerError, PolicyError, TokenError};
use crate::events::{
    AmmPairUpdated, CharityWalletUpdated, ConfigLocked, ContractEvent, ExclusionSet,
    ExclusionUpdated, LimitsUpdated, OwnershipTransferred, Rescued, RescuedAsset,
    SettlementParamsUpdated, TradingEnabled,
};
use crate::exchange::{ExchangeRouter, PaymentRail, TokenPort};
use crate::fee_engine;
use crate::ledger::{Ledger, LedgerSnapshot};
use crate::policy::PolicyRegistry;
use crate::security::{ConfigLock, Ownership, SettlementMutex};
use crate::settlement::{CharityOutcome, SettlementReport};
use crate::treasury::Treasury;

/// Contract address for a deployment: first 20 bytes of
/// `sha256(deployer || salt)`.
pub fn derive_address(deployer: &Address, salt: u64) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(deployer.as_bytes());
    hasher.update(salt.to_be_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
    Address::new(bytes)
}

/// State restored when a call fails.
struct Checkpoint<R, P> {
    ledger: LedgerSnapshot,
    policy: PolicyRegistry,
    treasury: Treasury,
    ownership: Ownership,
    router: Option<R>,
    rail: P,
}

pub struct FeeToken<R, P> {
    pub(crate) address: Address,
    name: String,
    symbol: String,
    decimals: u8,
    pub(crate) ledger: Ledger,
    pub(crate) policy: PolicyRegistry,
    pub(crate) treasury: Treasury,
    pub(crate) ownership: Ownership,
    pub(crate) mutex: SettlementMutex,
    /// `None` while lent to an in-flight router call
    pub(crate) router: Option<R>,
    pub(crate) rail: P,
    /// A settlement was triggered while the router was lent out
    pub(crate) settlement_deferred: bool,
}

impl<R, P> FeeToken<R, P>
where
    R: ExchangeRouter + Clone,
    P: PaymentRail + Clone,
{
    // ───────────────────────── Genesis ─────────────────────────

    /// Deploy a token: create the primary pair, mint the supply to
    /// `deployer`, and hand it ownership.
    pub fn deploy(
        config: &TokenConfig,
        deployer: Address,
        mut router: R,
        rail: P,
    ) -> Result<Self, TokenError> {
        config.validate()?;
        if deployer.is_zero() {
            return Err(LedgerError::ZeroAddress { role: "deployer" }.into());
        }
        let address = derive_address(&deployer, config.salt);
        let supply = config.supply_base_units()?;

        let pair = router.create_pair(address, router.wrapped_currency())?;

        let mut policy = PolicyRegistry::new(config.policy_params(supply));
        policy.register_primary_pair(pair);
        for account in [deployer, address, Address::DEAD] {
            policy.exempt(account);
        }

        let mut ledger = Ledger::new();
        ledger.mint(deployer, supply)?;
        ledger.approve(address, router.address(), u128::MAX)?;
        ledger.record(ContractEvent::OwnershipTransferred(OwnershipTransferred {
            previous: None,
            current: Some(deployer),
        }));

        info!(
            token = %address,
            %pair,
            %deployer,
            supply = %supply,
            symbol = %config.symbol,
            "token deployed"
        );

        Ok(Self {
            address,
            name: config.name.clone(),
            symbol: config.symbol.clone(),
            decimals: config.decimals,
            ledger,
            policy,
            treasury: Treasury::new(),
            ownership: Ownership::new(deployer),
            mutex: SettlementMutex::new(),
            router: Some(router),
            rail,
            settlement_deferred: false,
        })
    }

    // ───────────────────────── Metadata / Queries ─────────────────────────

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn total_supply(&self) -> u128 {
        self.ledger.total_supply()
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.ledger.balance_of(account)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.ledger.allowance(owner, spender)
    }

    pub fn owner(&self) -> Option<Address> {
        self.ownership.owner()
    }

    pub fn policy(&self) -> &PolicyRegistry {
        &self.policy
    }

    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn tokens_for_charity(&self) -> u128 {
        self.treasury.tokens_for_charity()
    }

    pub fn tokens_for_liquidity(&self) -> u128 {
        self.treasury.tokens_for_liquidity()
    }

    pub fn pending_charity_currency(&self) -> u128 {
        self.treasury.pending_charity_currency()
    }

    pub fn currency_balance(&self) -> u128 {
        self.treasury.currency_balance()
    }

    pub fn is_settling(&self) -> bool {
        self.mutex.is_locked()
    }

    /// `None` while the router is lent to a call.
    pub fn router(&self) -> Option<&R> {
        self.router.as_ref()
    }

    pub fn router_mut(&mut self) -> Option<&mut R> {
        self.router.as_mut()
    }

    pub fn rail(&self) -> &P {
        &self.rail
    }

    pub fn rail_mut(&mut self) -> &mut P {
        &mut self.rail
    }

    pub fn events(&self) -> &[ContractEvent] {
        self.ledger.events()
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        self.ledger.drain_events()
    }

    /// Check the ledger-wide invariants.
    pub fn audit(&self) -> Result<(), InvariantViolation> {
        let sum = self.ledger.sum_of_balances();
        let supply = self.ledger.total_supply();
        if sum != supply {
            return Err(InvariantViolation::SupplyMismatch { sum, supply });
        }
        let earmarked = self.treasury.earmarked_tokens();
        let held = self.ledger.balance_of(&self.address);
        if earmarked > held {
            return Err(InvariantViolation::AccumulatorsExceedBalance { earmarked, held });
        }
        let pending = self.treasury.pending_charity_currency();
        let currency = self.treasury.currency_balance();
        if pending > currency {
            return Err(InvariantViolation::PendingExceedsCurrency {
                pending,
                held: currency,
            });
        }
        Ok(())
    }

    // ───────────────────────── Atomic Boundary ─────────────────────────

    fn checkpoint(&self) -> Checkpoint<R, P> {
        Checkpoint {
            ledger: self.ledger.snapshot(),
            policy: self.policy.clone(),
            treasury: self.treasury.clone(),
            ownership: self.ownership.clone(),
            router: self.router.clone(),
            rail: self.rail.clone(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint<R, P>) {
        self.ledger.restore(checkpoint.ledger);
        self.policy = checkpoint.policy;
        self.treasury = checkpoint.treasury;
        self.ownership = checkpoint.ownership;
        self.router = checkpoint.router;
        self.rail = checkpoint.rail;
    }

    /// Run `op`; on error, discard everything it did.
    fn atomically<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, TokenError>,
    ) -> Result<T, TokenError> {
        let checkpoint = self.checkpoint();
        let result = op(self);
        if result.is_err() {
            self.restore(checkpoint);
        }
        result
    }

    fn owner_call<T>(
        &mut self,
        caller: Address,
        op: impl FnOnce(&mut Self) -> Result<T, TokenError>,
    ) -> Result<T, TokenError> {
        self.atomically(|token| {
            token.ownership.ensure_owner(&caller)?;
            op(token)
        })
    }

    // ───────────────────────── Token Surface ─────────────────────────

    pub fn transfer(&mut self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        self.atomically(|token| token.execute_transfer(caller, to, amount))
    }

    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.atomically(|token| {
            token.ledger.spend_allowance(&from, &spender, amount)?;
            token.execute_transfer(from, to, amount)
        })
    }

    pub fn approve(&mut self, caller: Address, spender: Address, amount: u128) -> Result<(), TokenError> {
        self.atomically(|token| Ok(token.ledger.approve(caller, spender, amount)?))
    }

    pub fn increase_allowance(
        &mut self,
        caller: Address,
        spender: Address,
        added: u128,
    ) -> Result<(), TokenError> {
        self.atomically(|token| Ok(token.ledger.increase_allowance(caller, spender, added)?))
    }

    pub fn decrease_allowance(
        &mut self,
        caller: Address,
        spender: Address,
        subtracted: u128,
    ) -> Result<(), TokenError> {
        self.atomically(|token| {
            Ok(token
                .ledger
                .decrease_allowance(caller, spender, subtracted)?)
        })
    }

    /// Currency paid into the contract from outside.
    pub fn deposit_currency(&mut self, amount: u128) -> Result<(), TokenError> {
        self.atomically(|token| Ok(token.treasury.credit_currency(amount)?))
    }

    /// Lend the router to `op` with this token as its port.
    ///
    /// This is how outside callers trade against the pair. Fails with
    /// `RouterBusy` if the router is already lent out. A settlement
    /// triggered by a transfer inside `op` runs once the router is back,
    /// within the same call.
    pub fn call_router<T>(
        &mut self,
        op: impl FnOnce(&mut R, &mut dyn TokenPort) -> Result<T, crate::errors::ExchangeError>,
    ) -> Result<T, TokenError> {
        self.atomically(|token| {
            let mut router = token.router.take().ok_or(TokenError::RouterBusy)?;
            let result = op(&mut router, token);
            token.router = Some(router);
            let deferred = std::mem::take(&mut token.settlement_deferred);
            let value = result?;
            if deferred && token.ledger.balance_of(&token.address) >= token.policy.swap_threshold() {
                debug!("router returned, running deferred settlement");
                token.settle_guarded()?;
            }
            Ok(value)
        })
    }

    // ───────────────────────── Orchestration ─────────────────────────

    fn execute_transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        if from.is_zero() {
            return Err(LedgerError::ZeroAddress { role: "sender" }.into());
        }
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress { role: "recipient" }.into());
        }

        if !self.policy.trading_active()
            && !self.policy.is_fee_excluded(&from)
            && !self.policy.is_fee_excluded(&to)
        {
            return Err(TokenError::TradingNotActive);
        }

        if amount == 0 {
            self.ledger.transfer(from, to, 0)?;
            return Ok(());
        }

        let available = self.ledger.balance_of(&from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: from,
                required: amount,
                available,
            }
            .into());
        }

        self.check_limits(&from, &to, amount)?;

        let assessment = fee_engine::assess(&self.policy, &from, &to, amount)?;
        fee_engine::apply(
            &mut self.ledger,
            &mut self.treasury,
            self.address,
            from,
            &assessment,
        )?;

        if assessment.taxable
            && !self.mutex.is_locked()
            && !self.policy.is_amm_pair(&from)
            && self.ledger.balance_of(&self.address) >= self.policy.swap_threshold()
        {
            self.settle_guarded()?;
        }

        self.ledger
            .transfer(from, to, assessment.net_amount(amount))?;
        Ok(())
    }

    /// Transaction and wallet caps. Skipped while settling.
    fn check_limits(&self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        if !self.policy.limits_in_effect() || self.mutex.is_locked() {
            return Ok(());
        }
        if self.ownership.is_owner(from) || self.ownership.is_owner(to) || *to == Address::DEAD {
            return Ok(());
        }

        let max_tx = self.policy.max_transaction();
        let tx_cap = || {
            if amount > max_tx {
                return Err(TokenError::MaxTransactionExceeded {
                    amount,
                    max: max_tx,
                });
            }
            Ok(())
        };
        let wallet_cap = || {
            let max = self.policy.max_wallet();
            let resulting = self.ledger.balance_of(to).saturating_add(amount);
            if resulting > max {
                return Err(TokenError::MaxWalletExceeded { resulting, max });
            }
            Ok(())
        };

        match self.policy.classify(from, to) {
            TradeDirection::Buy if !self.policy.is_limit_excluded(to) => {
                tx_cap()?;
                wallet_cap()
            }
            TradeDirection::Sell if !self.policy.is_limit_excluded(from) => tx_cap(),
            TradeDirection::Transfer if !self.policy.is_limit_excluded(to) => wallet_cap(),
            _ => Ok(()),
        }
    }

    /// Run settlement under the mutex, releasing it on every path.
    fn settle_guarded(&mut self) -> Result<Option<SettlementReport>, TokenError> {
        if !self.mutex.acquire() {
            return Err(TokenError::Reentrancy);
        }
        let result = self.swap_back();
        self.mutex.release();
        result
    }

    // ───────────────────────── Settlement Control ─────────────────────────

    /// Settle now regardless of the threshold.
    pub fn settle_now(&mut self, caller: Address) -> Result<Option<SettlementReport>, TokenError> {
        self.owner_call(caller, |token| token.settle_guarded())
    }

    /// Push the pending charity currency on its own.
    pub fn retry_charity_payout(&mut self, caller: Address) -> Result<CharityOutcome, TokenError> {
        self.owner_call(caller, |token| {
            let pending = token.treasury.pending_charity_currency();
            if pending == 0 {
                return Ok(CharityOutcome::NotAttempted);
            }
            match token.policy.charity_wallet() {
                Some(destination) => token.push_charity(destination, pending),
                None => Ok(CharityOutcome::NoDestination { amount: pending }),
            }
        })
    }

    // ───────────────────────── Administration ─────────────────────────

    pub fn enable_trading(&mut self, caller: Address) -> Result<(), TokenError> {
        self.owner_call(caller, |token| {
            let now = Utc::now().timestamp();
            token.policy.enable_trading(now)?;
            token
                .ledger
                .record(ContractEvent::TradingEnabled(TradingEnabled { enabled_at: now }));
            info!(token = %token.address, "trading enabled");
            Ok(())
        })
    }

    pub fn set_charity_wallet(&mut self, caller: Address, wallet: Address) -> Result<(), TokenError> {
        self.owner_call(caller, |token| {
            let previous = token.policy.set_charity_wallet(wallet)?;
            token
                .ledger
                .record(ContractEvent::CharityWalletUpdated(CharityWalletUpdated {
                    previous,
                    current: wallet,
                }));
            Ok(())
        })
    }

    pub fn exclude_from_fees(
        &mut self,
        caller: Address,
        account: Address,
        excluded: bool,
    ) -> Result<(), TokenError> {
        self.owner_call(caller, |token| {
            token.policy.exclude_from_fees(account, excluded)?;
            token.record_exclusion(account, ExclusionSet::Fees, excluded);
            Ok(())
        })
    }

    pub fn exclude_from_limits(
        &mut self,
        caller: Address,
        account: Address,
        excluded: bool,
    ) -> Result<(), TokenError> {
        self.owner_call(caller, |token| {
            token.policy.exclude_from_limits(account, excluded)?;
            token.record_exclusion(account, ExclusionSet::Limits, excluded);
            Ok(())
        })
    }

    pub fn set_automated_market_maker_pair(
        &mut self,
        caller: Address,
        pair: Address,
        registered: bool,
    ) -> Result<(), TokenError> {
        self.owner_call(caller, |token| {
            token.policy.set_amm_pair(pair, registered)?;
            token
                .ledger
                .record(ContractEvent::AmmPairUpdated(AmmPairUpdated { pair, registered }));
            Ok(())
        })
    }

    /// Engage a configuration lock. Irreversible.
    pub fn lock(&mut self, caller: Address, lock: ConfigLock) -> Result<(), TokenError> {
        self.owner_call(caller, |token| {
            token.policy.lock(lock)?;
            token
                .ledger
                .record(ContractEvent::ConfigLocked(ConfigLocked { lock }));
            info!(token = %token.address, %lock, "configuration locked");
            Ok(())
        })
    }

    pub fn remove_limits(&mut self, caller: Address) -> Result<(), TokenError> {
        self.owner_call(caller, |token| {
            token.policy.remove_limits()?;
            token.record_limits();
            info!(token = %token.address, "limits removed");
            Ok(())
        })
    }

    pub fn update_max_transaction(&mut self, caller: Address, amount: u128) -> Result<(), TokenError> {
        self.owner_call(caller, |token| {
            let supply = token.ledger.total_supply();
            token.policy.update_max_transaction(amount, supply)?;
            token.record_limits();
            Ok(())
        })
    }

    pub fn update_max_wallet(&mut self, caller: Address, amount: u128) -> Result<(), TokenError> {
        self.owner_call(caller, |token| {
            let supply = token.ledger.total_supply();
            token.policy.update_max_wallet(amount, supply)?;
            token.record_limits();
            Ok(())
        })
    }

    pub fn update_swap_threshold(&mut self, caller: Address, amount: u128) -> Result<(), TokenError> {
        self.owner_call(caller, |token| {
            let supply = token.ledger.total_supply();
            token.policy.update_swap_threshold(amount, supply)?;
            token.record_settlement_params();
            Ok(())
        })
    }

    pub fn set_swap_enabled(&mut self, caller: Address, enabled: bool) -> Result<(), TokenError> {
        self.owner_call(caller, |token| {
            token.policy.set_swap_enabled(enabled);
            token.record_settlement_params();
            Ok(())
        })
    }

    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<(), TokenError> {
        self.atomically(|token| {
            let previous = token.ownership.transfer(&caller, new_owner)?;
            token
                .ledger
                .record(ContractEvent::OwnershipTransferred(OwnershipTransferred {
                    previous,
                    current: Some(new_owner),
                }));
            Ok(())
        })
    }

    pub fn renounce_ownership(&mut self, caller: Address) -> Result<(), TokenError> {
        self.atomically(|token| {
            let previous = token.ownership.renounce(&caller)?;
            token
                .ledger
                .record(ContractEvent::OwnershipTransferred(OwnershipTransferred {
                    previous,
                    current: None,
                }));
            info!(token = %token.address, "ownership renounced");
            Ok(())
        })
    }

    // ───────────────────────── Rescue ─────────────────────────

    /// Send currency not owed to the charity destination to `to`.
    pub fn rescue_currency(&mut self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        self.owner_call(caller, |token| {
            token.policy.ensure_unlocked(ConfigLock::Rescue)?;
            if to.is_zero() {
                return Err(PolicyError::ZeroAddress.into());
            }
            let available = token.treasury.surplus_currency();
            if amount > available {
                return Err(PolicyError::RescueExceedsSurplus {
                    requested: amount,
                    available,
                }
                .into());
            }
            token.treasury.debit_currency(amount)?;
            token.rail.push(to, amount)?;
            token.ledger.record(ContractEvent::Rescued(Rescued {
                asset: RescuedAsset::Currency,
                to,
                amount,
            }));
            Ok(())
        })
    }

    /// Send contract-held tokens not earmarked by the accumulators to `to`.
    pub fn rescue_tokens(&mut self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        self.owner_call(caller, |token| {
            token.policy.ensure_unlocked(ConfigLock::Rescue)?;
            if to.is_zero() {
                return Err(PolicyError::ZeroAddress.into());
            }
            let held = token.ledger.balance_of(&token.address);
            let available = held.saturating_sub(token.treasury.earmarked_tokens());
            if amount > available {
                return Err(PolicyError::RescueExceedsSurplus {
                    requested: amount,
                    available,
                }
                .into());
            }
            token.ledger.transfer(token.address, to, amount)?;
            token.ledger.record(ContractEvent::Rescued(Rescued {
                asset: RescuedAsset::Tokens,
                to,
                amount,
            }));
            Ok(())
        })
    }

    // ───────────────────────── Event Helpers ─────────────────────────

    fn record_exclusion(&mut self, account: Address, set: ExclusionSet, excluded: bool) {
        self.ledger
            .record(ContractEvent::ExclusionUpdated(ExclusionUpdated {
                account,
                set,
                excluded,
            }));
    }

    fn record_limits(&mut self) {
        self.ledger.record(ContractEvent::LimitsUpdated(LimitsUpdated {
            limits_in_effect: self.policy.limits_in_effect(),
            max_transaction: self.policy.max_transaction(),
            max_wallet: self.policy.max_wallet(),
        }));
    }

    fn record_settlement_params(&mut self) {
        self.ledger
            .record(ContractEvent::SettlementParamsUpdated(SettlementParamsUpdated {
                enabled: self.policy.swap_enabled(),
                threshold: self.policy.swap_threshold(),
            }));
    }
}

impl<R, P> TokenPort for FeeToken<R, P>
where
    R: ExchangeRouter + Clone,
    P: PaymentRail + Clone,
{
    fn token_address(&self) -> Address {
        self.address
    }

    fn balance_of(&self, account: &Address) -> u128 {
        self.ledger.balance_of(account)
    }

    fn transfer(&mut self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        FeeToken::transfer(self, caller, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        FeeToken::transfer_from(self, spender, from, to, amount)
    }

    fn receive_currency(&mut self, amount: u128) -> Result<(), TokenError> {
        self.deposit_currency(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FixedRateRouter, ScriptedRail};
    use ledger_types::fee::FeeSet;

    type TestToken = FeeToken<FixedRateRouter, ScriptedRail>;

    fn config() -> TokenConfig {
        TokenConfig {
            decimals: 0,
            total_supply: 1_000_000,
            buy_fees: FeeSet::new(30, 10, 10),
            sell_fees: FeeSet::new(30, 10, 10),
            ..TokenConfig::default()
        }
    }

    fn deploy() -> (TestToken, Address) {
        let deployer = Address::from_low_u64(0xd0);
        let token = FeeToken::deploy(
            &config(),
            deployer,
            FixedRateRouter::new(2, 1),
            ScriptedRail::new(),
        )
        .unwrap();
        (token, deployer)
    }

    #[test]
    fn test_derive_address_deterministic() {
        let deployer = Address::from_low_u64(1);
        assert_eq!(derive_address(&deployer, 7), derive_address(&deployer, 7));
        assert_ne!(derive_address(&deployer, 7), derive_address(&deployer, 8));
    }

    #[test]
    fn test_deploy_genesis_state() {
        let (token, deployer) = deploy();
        assert_eq!(token.total_supply(), 1_000_000);
        assert_eq!(token.balance_of(&deployer), 1_000_000);
        assert_eq!(token.owner(), Some(deployer));
        assert!(!token.policy().trading_active());
        assert!(token.policy().limits_in_effect());
        let pair = token.policy().primary_pair().unwrap();
        assert!(token.policy().is_amm_pair(&pair));
        for account in [deployer, token.address(), Address::DEAD] {
            assert!(token.policy().is_fee_excluded(&account));
            assert!(token.policy().is_limit_excluded(&account));
        }
        let router = token.router().unwrap().address();
        assert_eq!(token.allowance(&token.address(), &router), u128::MAX);
        token.audit().unwrap();
    }

    #[test]
    fn test_deploy_rejects_invalid_config() {
        let bad = TokenConfig {
            buy_fees: FeeSet::new(900, 100, 100),
            ..config()
        };
        let result = TestToken::deploy(
            &bad,
            Address::from_low_u64(1),
            FixedRateRouter::new(1, 1),
            ScriptedRail::new(),
        );
        assert!(matches!(result, Err(TokenError::Config(_))));
    }

    #[test]
    fn test_gate_blocks_until_trading() {
        let (mut token, deployer) = deploy();
        let alice = Address::from_low_u64(1);
        let bob = Address::from_low_u64(2);
        token.transfer(deployer, alice, 1_000).unwrap();
        assert_eq!(token.transfer(alice, bob, 10), Err(TokenError::TradingNotActive));
        token.enable_trading(deployer).unwrap();
        token.transfer(alice, bob, 10).unwrap();
        assert_eq!(token.balance_of(&bob), 10);
    }

    #[test]
    fn test_zero_amount_transfer() {
        let (mut token, deployer) = deploy();
        token.enable_trading(deployer).unwrap();
        let alice = Address::from_low_u64(1);
        token.transfer(alice, Address::from_low_u64(2), 0).unwrap();
        assert!(matches!(
            token.events().last(),
            Some(ContractEvent::Transfer(t)) if t.amount == 0
        ));
    }

    #[test]
    fn test_zero_address_rejected() {
        let (mut token, deployer) = deploy();
        assert!(matches!(
            token.transfer(deployer, Address::ZERO, 1),
            Err(TokenError::Ledger(LedgerError::ZeroAddress { .. }))
        ));
    }

    #[test]
    fn test_buy_wallet_cap() {
        let (mut token, deployer) = deploy();
        token.enable_trading(deployer).unwrap();
        let pair = token.policy().primary_pair().unwrap();
        token.transfer(deployer, pair, 100_000).unwrap();
        let buyer = Address::from_low_u64(1);
        // max tx 10_000, max wallet 20_000
        assert!(matches!(
            token.transfer(pair, buyer, 10_001),
            Err(TokenError::MaxTransactionExceeded { max: 10_000, .. })
        ));
        // 5% buy fee: each 10_000 buy lands 9_500
        token.transfer(pair, buyer, 10_000).unwrap();
        token.transfer(pair, buyer, 10_000).unwrap();
        assert_eq!(token.balance_of(&buyer), 19_000);
        token.transfer(pair, buyer, 1_000).unwrap();
        assert!(matches!(
            token.transfer(pair, buyer, 51),
            Err(TokenError::MaxWalletExceeded { .. })
        ));
    }

    #[test]
    fn test_failed_transfer_rolls_back_events() {
        let (mut token, deployer) = deploy();
        token.enable_trading(deployer).unwrap();
        let before = token.events().len();
        let alice = Address::from_low_u64(1);
        assert!(token.transfer(alice, deployer, 1).is_err());
        assert_eq!(token.events().len(), before);
    }

    #[test]
    fn test_call_router_restores_router() {
        let (mut token, _) = deploy();
        let wrapped = token
            .call_router(|router, port| Ok(router.wrapped_currency() == port.token_address()))
            .unwrap();
        assert!(!wrapped);
        assert!(token.router().is_some());
    }
}
