//! usdvault Common Library
//!
//! Shared building blocks of a custodial vault that accepts a native
//! currency and one external token and books every holding in a single
//! USD unit of account (6 decimals).
//!
//! ## Modules
//!
//! - **constants**: decimal layout, scaling factor, oracle heartbeat
//! - **errors**: the `VaultError` taxonomy
//! - **types**: addresses, asset kinds, quotes, configuration
//! - **math**: fixed-point native <-> unit-of-account conversion
//! - **oracle**: price feed capability and the validating adapter
//! - **ledger**: per-account balances and global aggregates
//! - **events**: deposit / withdrawal notifications
//! - **access_control**: owner capability check
//!
//! The accounting engine that sequences these pieces lives in the
//! `usdvault-vault` crate.

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod oracle;
pub mod ledger;
pub mod events;
pub mod access_control;

// Re-exports for convenience
pub use errors::*;
pub use types::*;
pub use math::*;
pub use oracle::*;
pub use ledger::*;
pub use events::*;
pub use access_control::*;
