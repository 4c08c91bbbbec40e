//! Core Types for usdvault
//!
//! Fundamental data structures shared by the ledger, the oracle adapter and
//! the accounting engine.

use core::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::asset;
use crate::errors::{VaultError, VaultResult};

/// Type alias for account / contract identities (32-byte hash)
pub type Address = [u8; 32];

/// Lowercase hex of the first four bytes, for logs and error messages
pub fn short_hex(address: &Address) -> String {
    address[..4].iter().map(|b| format!("{:02x}", b)).collect()
}

// ============ Asset Types ============

/// The two asset kinds a vault instance accepts
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum AssetKind {
    /// The chain's base currency
    Native = 0,
    /// The single supported fungible token
    ExternalToken = 1,
}

impl AssetKind {
    /// Both asset kinds, in ledger order
    pub const ALL: [AssetKind; 2] = [AssetKind::Native, AssetKind::ExternalToken];

    /// Resolve an asset identity against the configured token.
    ///
    /// The native sentinel selects `Native`, the configured token selects
    /// `ExternalToken`; anything else is rejected.
    pub fn from_address(address: &Address, token: &Address) -> VaultResult<Self> {
        if *address == asset::NATIVE {
            Ok(AssetKind::Native)
        } else if address == token {
            Ok(AssetKind::ExternalToken)
        } else {
            Err(VaultError::InvalidToken { token: *address })
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Native => write!(f, "native"),
            AssetKind::ExternalToken => write!(f, "token"),
        }
    }
}

// ============ Oracle Types ============

/// Raw answer of an external price feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RoundData {
    /// Reported price (8 decimals); may be non-positive on a broken feed
    pub answer: i128,
    /// Unix timestamp of the last update
    pub updated_at: u64,
}

/// A validated, positive price quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PriceQuote {
    /// USD price of one native unit, 8 decimals
    pub price: u64,
    /// Unix timestamp of the quote
    pub as_of: u64,
}

// ============ Configuration ============

/// Immutable construction parameters of a vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct VaultConfig {
    owner: Address,
    token: Address,
    oracle: Address,
    withdrawal_threshold: u64,
    bank_cap: u64,
}

impl VaultConfig {
    /// Validates and freezes the vault configuration.
    ///
    /// # Errors
    /// - `InvalidToken` if `token` is the native sentinel
    /// - `InvalidConfig` for a zero owner/oracle, a zero cap or threshold,
    ///   or a threshold above the cap
    pub fn new(
        owner: Address,
        token: Address,
        oracle: Address,
        withdrawal_threshold: u64,
        bank_cap: u64,
    ) -> VaultResult<Self> {
        if token == asset::NATIVE {
            return Err(VaultError::InvalidToken { token });
        }
        if owner == [0u8; 32] {
            return Err(VaultError::InvalidConfig {
                param: "owner",
                reason: "cannot be zero address",
            });
        }
        if oracle == [0u8; 32] {
            return Err(VaultError::InvalidConfig {
                param: "oracle",
                reason: "cannot be zero address",
            });
        }
        if bank_cap == 0 {
            return Err(VaultError::InvalidConfig {
                param: "bank_cap",
                reason: "must be positive",
            });
        }
        if withdrawal_threshold == 0 {
            return Err(VaultError::InvalidConfig {
                param: "withdrawal_threshold",
                reason: "must be positive",
            });
        }
        if withdrawal_threshold > bank_cap {
            return Err(VaultError::InvalidConfig {
                param: "withdrawal_threshold",
                reason: "cannot exceed bank_cap",
            });
        }

        Ok(Self {
            owner,
            token,
            oracle,
            withdrawal_threshold,
            bank_cap,
        })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn oracle(&self) -> Address {
        self.oracle
    }

    pub fn withdrawal_threshold(&self) -> u64 {
        self.withdrawal_threshold
    }

    pub fn bank_cap(&self) -> u64 {
        self.bank_cap
    }

    /// Resolve an asset identity against this vault's token
    pub fn asset_kind(&self, address: &Address) -> VaultResult<AssetKind> {
        AssetKind::from_address(address, &self.token)
    }
}

// ============ Call Types ============

/// Per-call environment: who is calling, and when
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Caller identity
    pub caller: Address,
    /// Unix timestamp of the call
    pub timestamp: u64,
}

impl CallContext {
    pub fn new(caller: Address, timestamp: u64) -> Self {
        Self { caller, timestamp }
    }
}

/// Vault operations, for action-based dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum VaultAction {
    /// Deposit native currency attached to the call (native units)
    DepositNative { amount: u128 },
    /// Deposit external tokens (token units == unit of account)
    DepositToken { amount: u64 },
    /// Withdraw native currency worth `amount_usd` (unit of account)
    WithdrawNative { amount_usd: u64 },
    /// Withdraw external tokens
    WithdrawToken { amount: u64 },
}

/// Outcome of a successful operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Receipt {
    pub account: Address,
    pub asset: AssetKind,
    /// Amount moved, in the asset's own units
    pub native_amount: u128,
    /// Value credited or debited, in unit of account
    pub unit_value: u64,
}
