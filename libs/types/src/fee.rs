//! Fee rate sets and fee breakdowns
//!
//! A `FeeSet` holds the three per-mille rates applied to one trade
//! direction. `FeeSet::split` turns a transfer amount into the amounts
//! routed to each sink.

use serde::{Deserialize, Serialize};

use crate::errors::TypesError;
use crate::numeric::{mul_div, per_mille, TokenAmount, PER_MILLE};

/// Direction of a transfer relative to the registered AMM pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeDirection {
    /// Tokens leave an AMM pair
    Buy,
    /// Tokens enter an AMM pair
    Sell,
    /// Neither side is an AMM pair
    Transfer,
}

/// Fee rates for one direction, in parts per thousand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeSet {
    pub charity: u16,
    pub destroy: u16,
    pub liquidity: u16,
}

impl FeeSet {
    pub const fn new(charity: u16, destroy: u16, liquidity: u16) -> Self {
        Self {
            charity,
            destroy,
            liquidity,
        }
    }

    /// A fee set that diverts nothing
    pub const fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// Sum of all three rates
    pub fn total(&self) -> u32 {
        self.charity as u32 + self.destroy as u32 + self.liquidity as u32
    }

    /// Reject sets that would divert more than the whole transfer.
    pub fn validate(&self) -> Result<(), TypesError> {
        let total = self.total();
        if total as u128 > PER_MILLE {
            return Err(TypesError::FeeSetTooLarge {
                total,
                max: PER_MILLE as u32,
            });
        }
        Ok(())
    }

    /// Split `amount` into destroy / charity / liquidity shares.
    ///
    /// `fee = amount*total/1000`, `destroyed = amount*destroy/1000`, and the
    /// remaining `fee - destroyed` is divided between charity and liquidity by
    /// their rate weights. The charity share floors, so any rounding residue
    /// lands in the liquidity share. `fee == destroyed + charity + liquidity`
    /// always holds. Returns `None` only on arithmetic overflow.
    pub fn split(&self, amount: TokenAmount) -> Option<FeeBreakdown> {
        let total = self.total();
        if total == 0 || amount == 0 {
            return Some(FeeBreakdown::NONE);
        }

        let fee = per_mille(amount, total)?;
        let destroyed = per_mille(amount, self.destroy as u32)?;
        let remain = fee.checked_sub(destroyed)?;

        let weight = self.charity as u128 + self.liquidity as u128;
        let (charity, liquidity) = if remain == 0 || weight == 0 {
            (0, remain)
        } else {
            let charity = mul_div(remain, self.charity as u128, weight)?;
            (charity, remain - charity)
        };

        Some(FeeBreakdown {
            fee,
            destroyed,
            charity,
            liquidity,
        })
    }
}

/// Result of applying a fee set to a single transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Total withheld from the transfer
    pub fee: TokenAmount,
    /// Removed from supply
    pub destroyed: TokenAmount,
    /// Credited to the charity accumulator
    pub charity: TokenAmount,
    /// Credited to the liquidity accumulator
    pub liquidity: TokenAmount,
}

impl FeeBreakdown {
    pub const NONE: FeeBreakdown = FeeBreakdown {
        fee: 0,
        destroyed: 0,
        charity: 0,
        liquidity: 0,
    };

    /// Portion moved to the contract's own balance
    pub fn retained(&self) -> TokenAmount {
        self.charity + self.liquidity
    }

    pub fn is_none(&self) -> bool {
        self.fee == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_split() {
        let fees = FeeSet::new(30, 10, 10);
        let b = fees.split(1_000).unwrap();
        assert_eq!(b.fee, 50);
        assert_eq!(b.destroyed, 10);
        assert_eq!(b.charity, 30);
        assert_eq!(b.liquidity, 10);
        assert_eq!(b.retained(), 40);
    }

    #[test]
    fn test_zero_set_diverts_nothing() {
        let b = FeeSet::zero().split(1_000_000).unwrap();
        assert!(b.is_none());
        assert_eq!(b, FeeBreakdown::NONE);
    }

    #[test]
    fn test_rounding_residue_goes_to_liquidity() {
        // remain = 7 split 2:1 -> charity floor(14/3)=4, liquidity 3
        let fees = FeeSet::new(20, 0, 10);
        let b = fees.split(234).unwrap();
        assert_eq!(b.fee, 7);
        assert_eq!(b.charity, 4);
        assert_eq!(b.liquidity, 3);
    }

    #[test]
    fn test_destroy_only() {
        let fees = FeeSet::new(0, 25, 0);
        let b = fees.split(1_000).unwrap();
        assert_eq!(b.destroyed, 25);
        assert_eq!(b.retained(), 0);
    }

    #[test]
    fn test_small_amount_rounds_to_zero() {
        let fees = FeeSet::new(30, 10, 10);
        let b = fees.split(19).unwrap();
        assert_eq!(b.fee, 0);
        assert_eq!(b.destroyed, 0);
    }

    #[test]
    fn test_validate() {
        assert!(FeeSet::new(30, 10, 10).validate().is_ok());
        assert!(FeeSet::new(400, 300, 300).validate().is_ok());
        assert_eq!(
            FeeSet::new(500, 300, 300).validate(),
            Err(TypesError::FeeSetTooLarge {
                total: 1100,
                max: 1000
            })
        );
    }

    #[test]
    fn test_direction_serialization() {
        let json = serde_json::to_string(&TradeDirection::Sell).unwrap();
        assert_eq!(json, "\"SELL\"");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// The breakdown always accounts for the whole fee and never
            /// exceeds the transfer.
            #[test]
            fn split_conserves_fee(
                charity in 0u16..400,
                destroy in 0u16..300,
                liquidity in 0u16..300,
                amount in 0u128..1_000_000_000_000_000_000_000_000u128,
            ) {
                let fees = FeeSet::new(charity, destroy, liquidity);
                let b = fees.split(amount).unwrap();
                prop_assert_eq!(b.fee, b.destroyed + b.charity + b.liquidity);
                prop_assert!(b.fee <= amount);
            }
        }
    }
}
