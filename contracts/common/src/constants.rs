//! Protocol Constants
//!
//! All fixed numbers used by the usdvault accounting engine.
//!
//! The scaling factor is derived from the decimal layout of the three
//! quantities involved in a conversion:
//!
//! ```text
//! native (18) + price (8) - SCALE_EXP (20) = accounting (6)
//! ```

/// Decimal layouts
pub mod decimals {
    /// Native currency decimals (wei-style)
    pub const NATIVE: u8 = 18;
    /// Oracle price decimals
    pub const PRICE: u8 = 8;
    /// Unit-of-account decimals (USD, 6 places)
    pub const ACCOUNTING: u8 = 6;
    /// External token decimals (USDC-style, 1:1 with the unit of account)
    pub const TOKEN: u8 = 6;
}

/// Fixed-point scaling between native amounts and unit-of-account values
pub mod scale {
    use super::decimals;

    /// Exponent `F` such that NATIVE + PRICE - F = ACCOUNTING
    pub const SCALE_EXP: u32 = (decimals::NATIVE + decimals::PRICE - decimals::ACCOUNTING) as u32;

    /// 10^F
    pub const SCALE: u128 = 10u128.pow(SCALE_EXP);

    /// One whole native unit (1e18)
    pub const ONE_NATIVE: u128 = 10u128.pow(decimals::NATIVE as u32);

    /// One US dollar in unit-of-account base units
    pub const ONE_USD: u64 = 1_000_000;
}

/// Oracle freshness parameters
pub mod oracle {
    /// Maximum age of a price quote, in seconds
    pub const HEARTBEAT_SECS: u64 = 3_600;
}

/// Asset identities
pub mod asset {
    use crate::types::Address;

    /// Reserved sentinel identity for the native currency
    pub const NATIVE: Address = [0u8; 32];
}
