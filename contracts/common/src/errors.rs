//! Error Types for usdvault
//!
//! Every failure aborts the triggering operation and leaves the ledger
//! untouched. Errors carry the structured reason so callers can react
//! without parsing messages.

use thiserror::Error;

use crate::types::{short_hex, Address, AssetKind};

/// Result type alias for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Main error enum for all vault errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    // ============ Deposit Errors ============
    /// Zero-amount deposit attempted
    #[error("deposit amount must be greater than zero")]
    DepositAmountZero,

    /// Deposit would push total holdings, including payouts in flight, past the bank cap
    #[error("bank cap exceeded: total {current_total} + {attempted} > cap {cap}")]
    BankCapExceeded {
        current_total: u64,
        attempted: u64,
        cap: u64,
    },

    // ============ Withdrawal Errors ============
    /// Zero-amount withdrawal attempted
    #[error("withdrawal amount must be greater than zero")]
    WithdrawalAmountZero,

    /// Withdrawal exceeds the recorded (spendable) balance
    #[error("insufficient {asset} balance for {}: available {available}, requested {requested}", short_hex(.account))]
    InsufficientBalance {
        account: Address,
        asset: AssetKind,
        available: u64,
        requested: u64,
    },

    /// Withdrawal exceeds the per-call limit
    #[error("withdrawal of {requested} exceeds threshold {threshold}")]
    WithdrawalThresholdExceeded { requested: u64, threshold: u64 },

    // ============ Transfer Errors ============
    /// Outbound or inbound value movement was rejected
    #[error("transfer involving {} failed", short_hex(.recipient))]
    TransferFailed { recipient: Address },

    // ============ Oracle Errors ============
    /// Oracle reported a non-positive price
    #[error("oracle reported invalid price {answer}")]
    OracleInvalidPrice { answer: i128 },

    /// Oracle quote is older than the heartbeat
    #[error("oracle price is stale: age {age}s exceeds heartbeat {heartbeat}s")]
    OracleStalePrice { age: u64, heartbeat: u64 },

    /// Oracle quote timestamp is unset or lies in the future
    #[error("oracle timestamp {updated_at} is invalid at time {now}")]
    OracleInvalidTimestamp { updated_at: u64, now: u64 },

    /// The oracle could not be queried at all
    #[error("oracle unavailable")]
    OracleUnavailable,

    // ============ Asset / Config Errors ============
    /// Operation referenced an unsupported asset identity
    #[error("unsupported asset {}", short_hex(.token))]
    InvalidToken { token: Address },

    /// Construction parameter rejected
    #[error("invalid configuration `{param}`: {reason}")]
    InvalidConfig {
        param: &'static str,
        reason: &'static str,
    },

    // ============ Authorization Errors ============
    /// Caller is not the configured owner
    #[error("unauthorized caller {}", short_hex(.actual))]
    Unauthorized { expected: Address, actual: Address },

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    #[error("arithmetic overflow")]
    Overflow,

    /// Arithmetic underflow occurred
    #[error("arithmetic underflow")]
    Underflow,

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,
}

impl VaultError {
    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::DepositAmountZero => "E010_DEPOSIT_ZERO",
            Self::BankCapExceeded { .. } => "E011_BANK_CAP",
            Self::WithdrawalAmountZero => "E020_WITHDRAW_ZERO",
            Self::InsufficientBalance { .. } => "E021_INSUFFICIENT_BALANCE",
            Self::WithdrawalThresholdExceeded { .. } => "E022_THRESHOLD",
            Self::TransferFailed { .. } => "E030_TRANSFER_FAILED",
            Self::OracleInvalidPrice { .. } => "E040_ORACLE_INVALID_PRICE",
            Self::OracleStalePrice { .. } => "E041_ORACLE_STALE",
            Self::OracleInvalidTimestamp { .. } => "E042_ORACLE_TIMESTAMP",
            Self::OracleUnavailable => "E043_ORACLE_UNAVAILABLE",
            Self::InvalidToken { .. } => "E050_INVALID_TOKEN",
            Self::InvalidConfig { .. } => "E051_INVALID_CONFIG",
            Self::Unauthorized { .. } => "E060_UNAUTHORIZED",
            Self::Overflow => "E080_OVERFLOW",
            Self::Underflow => "E081_UNDERFLOW",
            Self::DivisionByZero => "E082_DIV_ZERO",
        }
    }

    /// Returns true if the caller can fix the condition and retry
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InsufficientBalance { .. } => true, // Deposit first
            Self::WithdrawalThresholdExceeded { .. } => true, // Split the withdrawal
            Self::OracleStalePrice { .. } => true, // Wait for update
            Self::TransferFailed { .. } => true, // Fix allowance / recipient
            _ => false,
        }
    }
}
