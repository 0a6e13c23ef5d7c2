//! Genesis configuration
//!
//! Fixed once at deployment. Limits and the settlement threshold are given
//! in basis points of total supply and resolved to token amounts by
//! `policy_params`.

use ledger_types::fee::FeeSet;
use ledger_types::ids::Address;
use ledger_types::numeric::{bps_of, to_base_units};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::ConfigError;
use crate::policy::PolicyParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Whole tokens minted to the deployer
    pub total_supply: u128,
    pub buy_fees: FeeSet,
    pub sell_fees: FeeSet,
    /// Settlement trigger, bps of supply (1..=50)
    pub swap_threshold_bps: u32,
    /// Max transaction, bps of supply (10..=10000)
    pub max_transaction_bps: u32,
    /// Max wallet, bps of supply (50..=10000)
    pub max_wallet_bps: u32,
    pub charity_wallet: Option<Address>,
    /// Mixed into the contract address
    pub salt: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "Charity Token".into(),
            symbol: "CHRTY".into(),
            decimals: 18,
            total_supply: 1_000_000_000,
            buy_fees: FeeSet::new(30, 10, 10),
            sell_fees: FeeSet::new(30, 10, 10),
            swap_threshold_bps: 5,
            max_transaction_bps: 100,
            max_wallet_bps: 200,
            charity_wallet: None,
            salt: 0,
        }
    }
}

impl TokenConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.buy_fees
            .validate()
            .map_err(|source| ConfigError::InvalidFeeSet {
                direction: "buy",
                source,
            })?;
        self.sell_fees
            .validate()
            .map_err(|source| ConfigError::InvalidFeeSet {
                direction: "sell",
                source,
            })?;
        if self.total_supply == 0 {
            return Err(ConfigError::ZeroSupply);
        }
        let supply = self.supply_base_units()?;
        check_bps("swap threshold", self.swap_threshold_bps, 1, 50)?;
        if self.policy_params(supply).swap_threshold == 0 {
            return Err(ConfigError::ZeroThreshold {
                bps: self.swap_threshold_bps,
                supply,
            });
        }
        check_bps("max transaction", self.max_transaction_bps, 10, 10_000)?;
        check_bps("max wallet", self.max_wallet_bps, 50, 10_000)?;
        Ok(())
    }

    /// Total supply in base units.
    pub fn supply_base_units(&self) -> Result<u128, ConfigError> {
        to_base_units(self.total_supply, self.decimals).ok_or(ConfigError::SupplyOverflow {
            decimals: self.decimals,
        })
    }

    /// Resolve the bps parameters against `supply` (base units).
    pub fn policy_params(&self, supply: u128) -> PolicyParams {
        let of = |bps| bps_of(supply, bps).unwrap_or(supply);
        PolicyParams {
            buy_fees: self.buy_fees,
            sell_fees: self.sell_fees,
            max_transaction: of(self.max_transaction_bps),
            max_wallet: of(self.max_wallet_bps),
            swap_threshold: of(self.swap_threshold_bps),
            charity_wallet: self.charity_wallet,
        }
    }
}

fn check_bps(field: &'static str, value: u32, min: u32, max: u32) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::InvalidBps { field, value });
    }
    Ok(())
}
