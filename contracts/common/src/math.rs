//! Fixed-Point Conversion for usdvault
//!
//! Converts between native-currency amounts (18 decimals) and
//! unit-of-account values (6 decimals) using an 8-decimal oracle price.
//!
//! ```text
//! native_to_unit(x, p) = floor(x * p / 10^F)
//! unit_to_native(v, p) = floor(v * 10^F / p)
//! ```
//!
//! Both directions truncate, so a round trip never returns more native
//! currency than went in. Intermediates are computed in 256 bits.

#![allow(clippy::assign_op_pattern, clippy::ptr_offset_with_cast)]

use uint::construct_uint;

use crate::constants::scale;
use crate::errors::{VaultError, VaultResult};

construct_uint! {
    /// 256-bit unsigned integer for overflow-free intermediates
    pub struct U256(4);
}

/// Convert a native amount to its unit-of-account value.
///
/// # Arguments
/// * `amount_native` - Native amount (18 decimals)
/// * `price` - Native/USD price (8 decimals)
///
/// # Returns
/// Unit-of-account value (6 decimals), truncated toward zero
pub fn native_to_unit(amount_native: u128, price: u64) -> VaultResult<u64> {
    let value = U256::from(amount_native)
        .checked_mul(U256::from(price))
        .ok_or(VaultError::Overflow)?
        / U256::from(scale::SCALE);

    if value > U256::from(u64::MAX) {
        return Err(VaultError::Overflow);
    }
    Ok(value.low_u64())
}

/// Convert a unit-of-account value to the native amount it buys.
///
/// # Arguments
/// * `amount_unit` - Unit-of-account value (6 decimals)
/// * `price` - Native/USD price (8 decimals), must be positive
///
/// # Returns
/// Native amount (18 decimals), truncated toward zero
pub fn unit_to_native(amount_unit: u64, price: u64) -> VaultResult<u128> {
    if price == 0 {
        return Err(VaultError::DivisionByZero);
    }

    let amount = U256::from(amount_unit)
        .checked_mul(U256::from(scale::SCALE))
        .ok_or(VaultError::Overflow)?
        / U256::from(price);

    if amount > U256::from(u128::MAX) {
        return Err(VaultError::Overflow);
    }
    Ok(amount.as_u128())
}

/// Safe addition with overflow check
pub fn safe_add(a: u64, b: u64) -> VaultResult<u64> {
    a.checked_add(b).ok_or(VaultError::Overflow)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u64, b: u64) -> VaultResult<u64> {
    a.checked_sub(b).ok_or(VaultError::Underflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::scale::{ONE_NATIVE, ONE_USD};
    use proptest::prelude::*;

    /// $3956.14 with 8 decimals
    const PRICE_3956: u64 = 3_956_14_000_000;

    #[test]
    fn test_native_to_unit_reference_deposit() {
        // 0.01 native at $3956.14 -> $39.5614
        let value = native_to_unit(ONE_NATIVE / 100, PRICE_3956).unwrap();
        assert_eq!(value, 39_561_400);
    }

    #[test]
    fn test_one_native_is_worth_price() {
        let value = native_to_unit(ONE_NATIVE, PRICE_3956).unwrap();
        assert_eq!(value, 3_956 * ONE_USD + 140_000);
    }

    #[test]
    fn test_unit_to_native_inverse() {
        // $3956.14 buys exactly one native unit
        let amount = unit_to_native(3_956_140_000, PRICE_3956).unwrap();
        assert_eq!(amount, ONE_NATIVE);
    }

    #[test]
    fn test_truncation_toward_zero() {
        // 1 wei at any sane price is worth less than one base unit
        assert_eq!(native_to_unit(1, PRICE_3956).unwrap(), 0);

        // $1 at $3 per unit -> 0.333.. native, truncated
        let amount = unit_to_native(ONE_USD, 3_00_000_000).unwrap();
        assert_eq!(amount, 333_333_333_333_333_333);
    }

    #[test]
    fn test_zero_price_rejected() {
        assert_eq!(unit_to_native(1, 0), Err(VaultError::DivisionByZero));
        assert_eq!(native_to_unit(ONE_NATIVE, 0), Ok(0));
    }

    #[test]
    fn test_large_amounts_do_not_wrap() {
        // Fits the 256-bit intermediate, but not a u64 result
        let result = native_to_unit(u128::MAX, u64::MAX);
        assert_eq!(result, Err(VaultError::Overflow));

        // 1e12 native units at $1 fits comfortably
        let value = native_to_unit(1_000_000_000_000 * ONE_NATIVE, 1_00_000_000).unwrap();
        assert_eq!(value, 1_000_000_000_000 * ONE_USD);
    }

    #[test]
    fn test_safe_math() {
        assert_eq!(safe_add(1, 2), Ok(3));
        assert_eq!(safe_add(u64::MAX, 1), Err(VaultError::Overflow));
        assert_eq!(safe_sub(2, 1), Ok(1));
        assert_eq!(safe_sub(1, 2), Err(VaultError::Underflow));
    }

    proptest! {
        #[test]
        fn round_trip_never_gains(
            amount in 0u128..=1_000_000u128 * ONE_NATIVE,
            price in 1u64..=10_000_000_000_000u64,
        ) {
            let value = native_to_unit(amount, price).unwrap();
            let back = unit_to_native(value, price).unwrap();
            prop_assert!(back <= amount);
        }

        #[test]
        fn unit_round_trip_never_gains(
            value in 0u64..=1_000_000_000 * ONE_USD,
            price in 1u64..=10_000_000_000_000u64,
        ) {
            let amount = unit_to_native(value, price).unwrap();
            let back = native_to_unit(amount, price).unwrap();
            prop_assert!(back <= value);
        }
    }
}
