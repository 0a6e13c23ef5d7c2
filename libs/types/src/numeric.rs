//! Integer amount types and pro-rata arithmetic
//!
//! Token and currency amounts are unsigned integers in their smallest unit.
//! Every division floors; callers decide where the remainder goes.

use primitive_types::U256;
use rust_decimal::Decimal;

/// Token amount in base units
pub type TokenAmount = u128;

/// Reference-currency amount in base units
pub type CurrencyAmount = u128;

/// Denominator for fee rates (parts per thousand)
pub const PER_MILLE: u128 = 1_000;

/// Denominator for basis-point parameters
pub const BPS: u128 = 10_000;

/// `a * b / denominator`, floored.
///
/// The product is formed in 256 bits so pro-rata shares of large balances
/// never overflow. Returns `None` on a zero denominator or when the quotient
/// does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    if let Some(product) = a.checked_mul(b) {
        return Some(product / denominator);
    }
    let quotient = U256::from(a) * U256::from(b) / U256::from(denominator);
    if quotient > U256::from(u128::MAX) {
        return None;
    }
    Some(quotient.as_u128())
}

/// `amount * rate / 1000`, floored
pub fn per_mille(amount: u128, rate: u32) -> Option<u128> {
    mul_div(amount, rate as u128, PER_MILLE)
}

/// `amount * bps / 10_000`, floored
pub fn bps_of(amount: u128, bps: u32) -> Option<u128> {
    mul_div(amount, bps as u128, BPS)
}

/// Whole tokens to base units for a token with `decimals` decimals
pub fn to_base_units(whole: u128, decimals: u8) -> Option<u128> {
    10u128
        .checked_pow(decimals as u32)
        .and_then(|scale| whole.checked_mul(scale))
}

/// Human-readable decimal view of a base-unit amount.
///
/// Returns `None` when the amount exceeds the 96-bit decimal mantissa.
pub fn to_decimal(amount: u128, decimals: u8) -> Option<Decimal> {
    let signed = i128::try_from(amount).ok()?;
    Decimal::try_from_i128_with_scale(signed, decimals as u32).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_floors() {
        assert_eq!(mul_div(10, 3, 4), Some(7));
        assert_eq!(mul_div(40, 30, 40), Some(30));
    }

    #[test]
    fn test_mul_div_zero_denominator() {
        assert_eq!(mul_div(1, 1, 0), None);
    }

    #[test]
    fn test_mul_div_wide_product() {
        // u128::MAX * 3 overflows u128 but the quotient fits
        assert_eq!(mul_div(u128::MAX, 3, 3), Some(u128::MAX));
        assert_eq!(mul_div(u128::MAX, 2, 4), Some(u128::MAX / 2));
    }

    #[test]
    fn test_mul_div_quotient_overflow() {
        assert_eq!(mul_div(u128::MAX, 3, 2), None);
    }

    #[test]
    fn test_per_mille() {
        assert_eq!(per_mille(1_000, 50), Some(50));
        assert_eq!(per_mille(999, 10), Some(9));
        assert_eq!(per_mille(0, 50), Some(0));
    }

    #[test]
    fn test_bps_of() {
        assert_eq!(bps_of(1_000_000, 5), Some(500));
        assert_eq!(bps_of(1_000_000, 100), Some(10_000));
    }

    #[test]
    fn test_to_base_units() {
        assert_eq!(to_base_units(1, 18), Some(1_000_000_000_000_000_000));
        assert_eq!(to_base_units(5, 0), Some(5));
        assert_eq!(to_base_units(u128::MAX, 1), None);
    }

    #[test]
    fn test_to_decimal() {
        let d = to_decimal(1_500_000_000_000_000_000, 18).unwrap();
        assert_eq!(d, Decimal::new(15, 1));
        assert_eq!(to_decimal(u128::MAX, 18), None);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Pro-rata shares never exceed the whole.
            #[test]
            fn share_never_exceeds_whole(
                whole in 0u128..u128::MAX / 2,
                weight in 0u128..1_000_000u128,
                extra in 0u128..1_000_000u128,
            ) {
                let total = weight + extra;
                prop_assume!(total > 0);
                let share = mul_div(whole, weight, total).unwrap();
                prop_assert!(share <= whole);
            }
        }
    }
}
