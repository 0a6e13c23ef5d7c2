//! Contract events
//!
//! Events are immutable records appended to the token's event log by
//! ledger, fee, settlement and administrative operations. A call that fails
//! leaves no events behind.

use ledger_types::fee::TradeDirection;
use ledger_types::ids::Address;
use serde::{Deserialize, Serialize};

use crate::security::ConfigLock;

/// Tokens moved between two accounts (mint uses `Address::ZERO` as sender)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub amount: u128,
}

/// Allowance set by an owner for a spender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub owner: Address,
    pub spender: Address,
    pub amount: u128,
}

/// Tokens removed from supply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destroyed {
    pub from: Address,
    pub amount: u128,
    pub total_supply: u128,
}

/// Fee withheld from a taxable transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDiverted {
    pub from: Address,
    pub direction: TradeDirection,
    pub destroyed: u128,
    pub charity: u128,
    pub liquidity: u128,
}

/// Summary of one settlement run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementDetail {
    pub tokens_processed: u128,
    pub liquidity_tokens: u128,
    pub currency_for_liquidity: u128,
    pub currency_for_charity: u128,
}

/// Liquidity provisioned with its share receipt sent to permanent custody
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityLocked {
    pub tokens: u128,
    pub currency: u128,
    pub shares: u128,
    pub custody: Address,
}

/// Currency delivered to the charity destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharityForwarded {
    pub destination: Address,
    pub amount: u128,
}

/// Currency push refused; the amount is carried as pending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharityForwardFailed {
    pub destination: Address,
    pub amount: u128,
    pub reason: String,
}

/// Trading gate opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingEnabled {
    pub enabled_at: i64,
}

/// One-way configuration lock engaged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLocked {
    pub lock: ConfigLock,
}

/// Exclusion-set membership changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionUpdated {
    pub account: Address,
    pub set: ExclusionSet,
    pub excluded: bool,
}

/// Which exclusion set an `ExclusionUpdated` event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionSet {
    Fees,
    Limits,
}

/// AMM pair registered or removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmPairUpdated {
    pub pair: Address,
    pub registered: bool,
}

/// Charity destination changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharityWalletUpdated {
    pub previous: Option<Address>,
    pub current: Address,
}

/// Owner changed (`current == None` after renunciation)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipTransferred {
    pub previous: Option<Address>,
    pub current: Option<Address>,
}

/// Transfer limits changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsUpdated {
    pub limits_in_effect: bool,
    pub max_transaction: u128,
    pub max_wallet: u128,
}

/// Settlement parameters changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementParamsUpdated {
    pub enabled: bool,
    pub threshold: u128,
}

/// Owner recovered unearmarked funds from the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rescued {
    pub asset: RescuedAsset,
    pub to: Address,
    pub amount: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescuedAsset {
    Tokens,
    Currency,
}

/// Enum wrapper for all contract events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    Transfer(Transfer),
    Approval(Approval),
    Destroyed(Destroyed),
    FeeDiverted(FeeDiverted),
    SettlementDetail(SettlementDetail),
    LiquidityLocked(LiquidityLocked),
    CharityForwarded(CharityForwarded),
    CharityForwardFailed(CharityForwardFailed),
    TradingEnabled(TradingEnabled),
    ConfigLocked(ConfigLocked),
    ExclusionUpdated(ExclusionUpdated),
    AmmPairUpdated(AmmPairUpdated),
    CharityWalletUpdated(CharityWalletUpdated),
    OwnershipTransferred(OwnershipTransferred),
    LimitsUpdated(LimitsUpdated),
    SettlementParamsUpdated(SettlementParamsUpdated),
    Rescued(Rescued),
}
