//! Simulation metrics
//!
//! Trade counters, fee totals by sink, settlement totals and throughput.

use crate::chain::{Action, SimEvent};
use fee_token::events::ContractEvent;
use serde::{Deserialize, Serialize};

/// Aggregated simulation metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimMetrics {
    pub buys: u64,
    pub sells: u64,
    pub sends: u64,
    pub rejected_buys: u64,
    pub rejected_sells: u64,
    pub rejected_sends: u64,
    pub currency_spent_on_buys: u128,
    pub currency_paid_to_sellers: u128,
    pub tokens_destroyed: u128,
    pub tokens_to_charity_accumulator: u128,
    pub tokens_to_liquidity_accumulator: u128,
    pub settlements: u64,
    /// Largest single settlement batch
    pub max_batch: u128,
    pub tokens_settled: u128,
    pub liquidity_tokens_locked: u128,
    pub liquidity_currency_locked: u128,
    pub liquidity_shares_locked: u128,
    pub charity_forwarded: u128,
    pub charity_push_failures: u64,
    pub elapsed_ns: u64,
}

impl SimMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a single event into metrics.
    pub fn record_event(&mut self, event: &SimEvent) {
        match event {
            SimEvent::Bought { currency_in, .. } => {
                self.buys += 1;
                self.currency_spent_on_buys += *currency_in;
            }
            SimEvent::Sold {
                currency_received, ..
            } => {
                self.sells += 1;
                self.currency_paid_to_sellers += *currency_received;
            }
            SimEvent::Sent { .. } => {
                self.sends += 1;
            }
            SimEvent::Rejected { action, .. } => match action {
                Action::Buy => self.rejected_buys += 1,
                Action::Sell => self.rejected_sells += 1,
                Action::Send => self.rejected_sends += 1,
                Action::Settle => {}
            },
            SimEvent::Contract { event, .. } => self.record_contract_event(event),
        }
    }

    fn record_contract_event(&mut self, event: &ContractEvent) {
        match event {
            ContractEvent::FeeDiverted(fee) => {
                self.tokens_destroyed += fee.destroyed;
                self.tokens_to_charity_accumulator += fee.charity;
                self.tokens_to_liquidity_accumulator += fee.liquidity;
            }
            ContractEvent::SettlementDetail(detail) => {
                self.settlements += 1;
                self.tokens_settled += detail.tokens_processed;
                self.max_batch = self.max_batch.max(detail.tokens_processed);
            }
            ContractEvent::LiquidityLocked(locked) => {
                self.liquidity_tokens_locked += locked.tokens;
                self.liquidity_currency_locked += locked.currency;
                self.liquidity_shares_locked += locked.shares;
            }
            ContractEvent::CharityForwarded(forwarded) => {
                self.charity_forwarded += forwarded.amount;
            }
            ContractEvent::CharityForwardFailed(_) => {
                self.charity_push_failures += 1;
            }
            _ => {}
        }
    }

    /// Process all events from a chain.
    pub fn ingest_events(&mut self, events: &[SimEvent]) {
        for event in events {
            self.record_event(event);
        }
    }

    pub fn set_elapsed(&mut self, ns: u64) {
        self.elapsed_ns = ns;
    }

    pub fn actions(&self) -> u64 {
        self.buys
            + self.sells
            + self.sends
            + self.rejected_buys
            + self.rejected_sells
            + self.rejected_sends
    }

    pub fn rejected(&self) -> u64 {
        self.rejected_buys + self.rejected_sells + self.rejected_sends
    }

    /// Throughput: submitted actions per second.
    pub fn actions_per_second(&self) -> f64 {
        if self.elapsed_ns == 0 {
            return 0.0;
        }
        self.actions() as f64 / (self.elapsed_ns as f64 / 1_000_000_000.0)
    }

    /// Build a summary string.
    pub fn summary(&self) -> String {
        format!(
            "Buys: {} | Sells: {} | Sends: {} | Rejected: {} | Settlements: {} | Destroyed: {} | Charity forwarded: {} | Throughput: {:.0} actions/s",
            self.buys,
            self.sells,
            self.sends,
            self.rejected(),
            self.settlements,
            self.tokens_destroyed,
            self.charity_forwarded,
            self.actions_per_second(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fee_token::events::{CharityForwardFailed, FeeDiverted, SettlementDetail};
    use ledger_types::fee::TradeDirection;
    use ledger_types::ids::Address;

    fn contract(event: ContractEvent) -> SimEvent {
        SimEvent::Contract { sequence: 1, event }
    }

    #[test]
    fn test_counts_trades_and_rejections() {
        let mut metrics = SimMetrics::new();
        let account = Address::from_low_u64(1);
        metrics.ingest_events(&[
            SimEvent::Bought {
                sequence: 1,
                account,
                currency_in: 100,
                tokens_received: 40,
            },
            SimEvent::Sold {
                sequence: 2,
                account,
                tokens_sent: 40,
                currency_received: 90,
            },
            SimEvent::Rejected {
                sequence: 3,
                account,
                action: Action::Sell,
                reason: "Trading is not active".into(),
            },
        ]);
        assert_eq!(metrics.buys, 1);
        assert_eq!(metrics.sells, 1);
        assert_eq!(metrics.rejected_sells, 1);
        assert_eq!(metrics.actions(), 3);
        assert_eq!(metrics.currency_spent_on_buys, 100);
        assert_eq!(metrics.currency_paid_to_sellers, 90);
    }

    #[test]
    fn test_fee_and_settlement_totals() {
        let mut metrics = SimMetrics::new();
        metrics.ingest_events(&[
            contract(ContractEvent::FeeDiverted(FeeDiverted {
                from: Address::from_low_u64(1),
                direction: TradeDirection::Sell,
                destroyed: 10,
                charity: 30,
                liquidity: 10,
            })),
            contract(ContractEvent::SettlementDetail(SettlementDetail {
                tokens_processed: 600,
                liquidity_tokens: 150,
                currency_for_liquidity: 20,
                currency_for_charity: 120,
            })),
            contract(ContractEvent::SettlementDetail(SettlementDetail {
                tokens_processed: 400,
                liquidity_tokens: 100,
                currency_for_liquidity: 10,
                currency_for_charity: 70,
            })),
            contract(ContractEvent::CharityForwardFailed(CharityForwardFailed {
                destination: Address::from_low_u64(2),
                amount: 70,
                reason: "refused".into(),
            })),
        ]);
        assert_eq!(metrics.tokens_destroyed, 10);
        assert_eq!(metrics.tokens_to_charity_accumulator, 30);
        assert_eq!(metrics.settlements, 2);
        assert_eq!(metrics.tokens_settled, 1_000);
        assert_eq!(metrics.max_batch, 600);
        assert_eq!(metrics.charity_push_failures, 1);
    }

    #[test]
    fn test_throughput() {
        let mut metrics = SimMetrics::new();
        assert_eq!(metrics.actions_per_second(), 0.0);
        metrics.sends = 500;
        metrics.set_elapsed(500_000_000);
        assert!((metrics.actions_per_second() - 1_000.0).abs() < 1e-9);
    }
}
