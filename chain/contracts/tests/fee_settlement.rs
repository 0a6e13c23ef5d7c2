//! Fee and settlement scenarios
//!
//! End-to-end runs through `FeeToken` with the in-memory router and rail:
//! - Buy-side fee split and supply reduction
//! - Threshold-triggered settlement, exactly once
//! - Per-run batch cap
//! - Charity push failure and retry convergence
//! - Hard failure of conversion and provisioning

use fee_token::errors::{ExchangeError, TokenError};
use fee_token::events::{ContractEvent, Destroyed, SettlementDetail};
use fee_token::exchange::ExchangeRouter;
use fee_token::mock::{FixedRateRouter, ScriptedRail};
use fee_token::settlement::CharityOutcome;
use fee_token::{FeeToken, TokenConfig};
use ledger_types::fee::FeeSet;
use ledger_types::ids::Address;

type Token = FeeToken<FixedRateRouter, ScriptedRail>;

const DEPLOYER: u64 = 0xd0;
const CHARITY: u64 = 0xc4a;
const SELLER: u64 = 0x5e11;
const BUYER: u64 = 0xb0b;

// ═══════════════════════════════════════════════════════════════════
// Fee Engine
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_buy_splits_fee_and_destroys() {
    let (mut token, deployer, pair) = launch(None);
    let buyer = addr(BUYER);

    // Deployer is fee-excluded: seeding the pair is untaxed
    token.transfer(deployer, pair, 1_000).unwrap();
    assert_eq!(token.balance_of(&pair), 1_000);
    assert_eq!(token.total_supply(), 1_000_000);

    token.transfer(pair, buyer, 1_000).unwrap();

    assert_eq!(token.balance_of(&buyer), 950);
    assert_eq!(token.total_supply(), 999_990);
    assert_eq!(token.tokens_for_charity(), 30);
    assert_eq!(token.tokens_for_liquidity(), 10);
    assert_eq!(token.balance_of(&token.address()), 40);
    assert!(token.events().iter().any(|e| matches!(
        e,
        ContractEvent::Destroyed(Destroyed { amount: 10, total_supply: 999_990, .. })
    )));
    token.audit().unwrap();
}

#[test]
fn test_wallet_transfer_untaxed() {
    let (mut token, deployer, _) = launch(None);
    let alice = addr(1);
    let bob = addr(2);
    token.transfer(deployer, alice, 5_000).unwrap();
    token.transfer(alice, bob, 5_000).unwrap();
    assert_eq!(token.balance_of(&bob), 5_000);
    assert_eq!(token.total_supply(), 1_000_000);
    assert_eq!(token.tokens_for_charity(), 0);
}

#[test]
fn test_transfer_to_dead_keeps_supply() {
    let (mut token, deployer, _) = launch(None);
    token.transfer(deployer, Address::DEAD, 10_000).unwrap();
    assert_eq!(token.total_supply(), 1_000_000);
    assert_eq!(token.balance_of(&Address::DEAD), 10_000);
}

#[test]
fn test_excluded_seller_not_taxed() {
    let (mut token, deployer, pair) = launch(None);
    let seller = addr(SELLER);
    token.transfer(deployer, seller, 2_000).unwrap();
    token.exclude_from_fees(deployer, seller, true).unwrap();
    token.transfer(seller, pair, 2_000).unwrap();
    assert_eq!(token.balance_of(&pair), 2_000);
    assert_eq!(token.total_supply(), 1_000_000);
}

// ═══════════════════════════════════════════════════════════════════
// Settlement Trigger
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_sells_cross_threshold_and_settle_once() {
    let (mut token, deployer, pair) = launch(Some(addr(CHARITY)));
    let seller = addr(SELLER);
    token.transfer(deployer, seller, 20_000).unwrap();

    // Each 2_000 sell retains 80 tokens; the 7th reaches 560 >= 500
    for _ in 0..6 {
        token.transfer(seller, pair, 2_000).unwrap();
    }
    assert_eq!(settlements(&token), 0);
    assert_eq!(token.balance_of(&token.address()), 480);

    token.transfer(seller, pair, 2_000).unwrap();
    assert_eq!(settlements(&token), 1);

    let detail = last_settlement(&token).unwrap();
    assert_eq!(detail.tokens_processed, 560);
    assert_eq!(detail.liquidity_tokens, 140);
    // 490 tokens converted at 2 currency each; 70/490 of it pairs with liquidity
    assert_eq!(detail.currency_for_liquidity, 140);
    assert_eq!(detail.currency_for_charity, 840);

    assert_eq!(token.tokens_for_charity(), 0);
    assert_eq!(token.tokens_for_liquidity(), 0);
    assert_eq!(token.rail().received(&addr(CHARITY)), 840);
    assert_eq!(token.router().unwrap().shares_of(&Address::DEAD), 70);
    assert!(!token.is_settling());
    token.audit().unwrap();
}

#[test]
fn test_buy_never_triggers_settlement() {
    let (mut token, deployer, pair) = launch(None);
    token.transfer(deployer, pair, 100_000).unwrap();
    for i in 0..20 {
        token.transfer(pair, addr(100 + i), 5_000).unwrap();
    }
    // 20 buys retain 200 each
    assert_eq!(token.balance_of(&token.address()), 4_000);
    assert_eq!(settlements(&token), 0);
}

#[test]
fn test_swap_request_shape() {
    let (mut token, deployer, pair) = launch(None);
    let seller = addr(SELLER);
    token.transfer(deployer, seller, 20_000).unwrap();
    for _ in 0..7 {
        token.transfer(seller, pair, 2_000).unwrap();
    }
    let router = token.router().unwrap();
    let swap = router.last_swap().unwrap();
    assert_eq!(swap.amount_in, 490);
    assert_eq!(swap.min_out, 0);
    assert_eq!(swap.recipient, token.address());
    assert_eq!(swap.path, vec![token.address(), router.wrapped_currency()]);
}

#[test]
fn test_batch_is_capped() {
    let (mut token, deployer, pair) = launch(None);
    let seller = addr(SELLER);
    token.remove_limits(deployer).unwrap();
    token.set_swap_enabled(deployer, false).unwrap();
    token.transfer(deployer, seller, 400_000).unwrap();

    token.transfer(seller, pair, 200_000).unwrap();
    token.transfer(seller, pair, 200_000).unwrap();
    assert_eq!(token.balance_of(&token.address()), 16_000);
    assert_eq!(settlements(&token), 0);

    let (charity_before, liquidity_before) = (token.tokens_for_charity(), token.tokens_for_liquidity());
    assert_eq!((charity_before, liquidity_before), (12_000, 4_000));

    token.set_swap_enabled(deployer, true).unwrap();
    let report = token.settle_now(deployer).unwrap().unwrap();

    // threshold 500 * 20
    assert_eq!(report.plan.batch, 10_000);
    assert_eq!(report.plan.liquidity_tokens, 2_500);
    assert_eq!(token.tokens_for_charity(), 4_500);
    assert_eq!(token.tokens_for_liquidity(), 1_500);
    assert!(token.tokens_for_charity() + token.tokens_for_liquidity() < charity_before + liquidity_before);
    assert_eq!(token.balance_of(&token.address()), 6_000);
    token.audit().unwrap();
}

#[test]
fn test_settlement_idempotent_on_empty_state() {
    let (mut token, deployer, _) = launch(Some(addr(CHARITY)));
    let events_before = token.events().len();
    let supply = token.total_supply();

    assert_eq!(token.settle_now(deployer).unwrap(), None);
    assert_eq!(token.settle_now(deployer).unwrap(), None);

    assert_eq!(token.events().len(), events_before);
    assert_eq!(token.total_supply(), supply);
    assert_eq!(token.router().unwrap().swap_calls(), 0);
}

#[test]
fn test_disabled_settlement_is_noop() {
    let (mut token, deployer, pair) = launch(None);
    let seller = addr(SELLER);
    token.set_swap_enabled(deployer, false).unwrap();
    token.transfer(deployer, seller, 20_000).unwrap();
    for _ in 0..10 {
        token.transfer(seller, pair, 2_000).unwrap();
    }
    assert_eq!(settlements(&token), 0);
    assert_eq!(token.balance_of(&token.address()), 800);
}

#[test]
fn test_no_charity_wallet_keeps_currency() {
    let (mut token, deployer, pair) = launch(None);
    let seller = addr(SELLER);
    token.transfer(deployer, seller, 20_000).unwrap();
    for _ in 0..7 {
        token.transfer(seller, pair, 2_000).unwrap();
    }
    assert_eq!(settlements(&token), 1);
    assert_eq!(token.currency_balance(), 840);
    assert_eq!(token.pending_charity_currency(), 0);
    assert!(token.rail().attempts().is_empty());
}

// ═══════════════════════════════════════════════════════════════════
// Charity Push Failure
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_refused_push_converges_on_next_settlement() {
    let charity = addr(CHARITY);
    let (mut token, deployer, pair) = launch(Some(charity));
    let seller = addr(SELLER);
    token.transfer(deployer, seller, 20_000).unwrap();
    token.transfer(deployer, seller, 8_000).unwrap();
    token.rail_mut().reject_next(charity, 1);

    for _ in 0..7 {
        token.transfer(seller, pair, 2_000).unwrap();
    }
    assert_eq!(settlements(&token), 1);
    assert_eq!(token.pending_charity_currency(), 840);
    assert_eq!(token.currency_balance(), 840);
    assert_eq!(token.rail().received(&charity), 0);
    assert!(token
        .events()
        .iter()
        .any(|e| matches!(e, ContractEvent::CharityForwardFailed(f) if f.amount == 840)));
    token.audit().unwrap();

    for _ in 0..7 {
        token.transfer(seller, pair, 2_000).unwrap();
    }
    assert_eq!(settlements(&token), 2);
    assert_eq!(token.pending_charity_currency(), 0);
    assert_eq!(token.rail().received(&charity), 840 + 840);
    assert_eq!(token.currency_balance(), 0);
    token.audit().unwrap();
}

#[test]
fn test_hostile_charity_never_blocks_transfers() {
    let charity = addr(CHARITY);
    let (mut token, deployer, pair) = launch(Some(charity));
    let seller = addr(SELLER);
    token.transfer(deployer, seller, 20_000).unwrap();
    token.rail_mut().reject_always(charity);

    for _ in 0..9 {
        token.transfer(seller, pair, 2_000).unwrap();
        token.audit().unwrap();
    }
    assert_eq!(settlements(&token), 1);
    assert!(token.pending_charity_currency() > 0);
    assert_eq!(token.rail().received(&charity), 0);
}

#[test]
fn test_manual_retry_delivers_pending() {
    let charity = addr(CHARITY);
    let (mut token, deployer, pair) = launch(Some(charity));
    let seller = addr(SELLER);
    token.transfer(deployer, seller, 20_000).unwrap();
    token.rail_mut().reject_next(charity, 1);
    for _ in 0..7 {
        token.transfer(seller, pair, 2_000).unwrap();
    }
    assert_eq!(token.pending_charity_currency(), 840);

    let outcome = token.retry_charity_payout(deployer).unwrap();
    assert_eq!(
        outcome,
        CharityOutcome::Delivered {
            destination: charity,
            amount: 840
        }
    );
    assert_eq!(token.pending_charity_currency(), 0);
    assert_eq!(token.rail().received(&charity), 840);

    // Nothing pending: no push attempted
    let attempts = token.rail().attempts().len();
    assert_eq!(
        token.retry_charity_payout(deployer).unwrap(),
        CharityOutcome::NotAttempted
    );
    assert_eq!(token.rail().attempts().len(), attempts);
}

// ═══════════════════════════════════════════════════════════════════
// Hard Failures
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_conversion_failure_rolls_back_trigger() {
    let (mut token, deployer, pair) = launch(Some(addr(CHARITY)));
    let seller = addr(SELLER);
    token.transfer(deployer, seller, 20_000).unwrap();
    for _ in 0..6 {
        token.transfer(seller, pair, 2_000).unwrap();
    }
    token.router_mut().unwrap().fail_swaps = true;

    let supply = token.total_supply();
    let seller_balance = token.balance_of(&seller);
    let events = token.events().len();

    let result = token.transfer(seller, pair, 2_000);
    assert!(matches!(
        result,
        Err(TokenError::Exchange(ExchangeError::Rejected { .. }))
    ));
    assert_eq!(token.total_supply(), supply);
    assert_eq!(token.balance_of(&seller), seller_balance);
    assert_eq!(token.tokens_for_charity(), 360);
    assert_eq!(token.events().len(), events);
    assert!(!token.is_settling());
    assert!(token.router().is_some());

    token.router_mut().unwrap().fail_swaps = false;
    token.transfer(seller, pair, 2_000).unwrap();
    assert_eq!(settlements(&token), 1);
}

#[test]
fn test_liquidity_failure_rolls_back_trigger() {
    let (mut token, deployer, pair) = launch(None);
    let seller = addr(SELLER);
    token.transfer(deployer, seller, 20_000).unwrap();
    for _ in 0..6 {
        token.transfer(seller, pair, 2_000).unwrap();
    }
    token.router_mut().unwrap().fail_liquidity = true;
    let balance_before = token.balance_of(&token.address());

    assert!(token.transfer(seller, pair, 2_000).is_err());
    assert_eq!(token.balance_of(&token.address()), balance_before);
    assert_eq!(token.currency_balance(), 0);
    // The rolled-back swap is forgotten by the restored router too
    assert_eq!(token.router().unwrap().swap_calls(), 0);
}

#[test]
fn test_liquidity_refund_returns_to_contract() {
    let (mut token, deployer, pair) = launch(None);
    let seller = addr(SELLER);
    token.router_mut().unwrap().refund_per_mille = 500;
    token.transfer(deployer, seller, 20_000).unwrap();
    for _ in 0..7 {
        token.transfer(seller, pair, 2_000).unwrap();
    }
    // 140 sent with the liquidity call, half refunded; 840 unforwarded
    assert_eq!(token.currency_balance(), 840 + 70);
    token.audit().unwrap();
}

// ═══════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════

fn addr(n: u64) -> Address {
    Address::from_low_u64(n)
}

fn config(charity: Option<Address>) -> TokenConfig {
    TokenConfig {
        name: "Scenario".into(),
        symbol: "SCN".into(),
        decimals: 0,
        total_supply: 1_000_000,
        buy_fees: FeeSet::new(30, 10, 10),
        sell_fees: FeeSet::new(30, 10, 10),
        swap_threshold_bps: 5,
        max_transaction_bps: 100,
        max_wallet_bps: 200,
        charity_wallet: charity,
        salt: 1,
    }
}

/// Deploy with trading enabled. Returns the token, deployer and pair.
fn launch(charity: Option<Address>) -> (Token, Address, Address) {
    let deployer = addr(DEPLOYER);
    let mut token = FeeToken::deploy(
        &config(charity),
        deployer,
        FixedRateRouter::new(2, 1),
        ScriptedRail::new(),
    )
    .unwrap();
    token.enable_trading(deployer).unwrap();
    let pair = token.policy().primary_pair().unwrap();
    (token, deployer, pair)
}

fn settlements(token: &Token) -> usize {
    token
        .events()
        .iter()
        .filter(|e| matches!(e, ContractEvent::SettlementDetail(_)))
        .count()
}

fn last_settlement(token: &Token) -> Option<SettlementDetail> {
    token.events().iter().rev().find_map(|e| match e {
        ContractEvent::SettlementDetail(d) => Some(d.clone()),
        _ => None,
    })
}
