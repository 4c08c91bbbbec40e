//! Transfer Gateway
//!
//! The one place where value actually moves and where untrusted code may
//! run. The engine hands every transfer a [`VaultEntry`] handle so that
//! counterparty code can call back into the vault mid-transfer.
//!
//! [`LocalGateway`] is an in-process implementation: native balances per
//! account, a [`SampleToken`] for the external asset, and optional
//! per-account [`AccountHook`]s standing in for contract code.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use usdvault_common::{short_hex, Address};
use usdvault_token::{SampleToken, TokenError};

use crate::entry::VaultEntry;

// ============================================================================
// Capability
// ============================================================================

/// Why a value movement did not happen
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("insufficient native funds: available {available}, requested {requested}")]
    InsufficientNative { available: u128, requested: u128 },

    #[error("token transfer rejected: {0}")]
    Token(#[from] TokenError),

    #[error("counterparty rejected the transfer")]
    Rejected,

    #[error("native balance overflow")]
    Overflow,

    #[error("custody cannot pay into itself")]
    CustodySource,
}

/// Moves value between the vault's custody and accounts
pub trait TransferGateway {
    /// Settle native currency attached to a deposit call
    fn accept_native(
        &mut self,
        vault: &mut dyn VaultEntry,
        from: Address,
        amount: u128,
    ) -> Result<(), TransferError>;

    /// Pay native currency out of custody
    fn send_native(
        &mut self,
        vault: &mut dyn VaultEntry,
        to: Address,
        amount: u128,
    ) -> Result<(), TransferError>;

    /// Pull approved tokens into custody
    fn pull_token(
        &mut self,
        vault: &mut dyn VaultEntry,
        from: Address,
        amount: u64,
    ) -> Result<(), TransferError>;

    /// Pay tokens out of custody
    fn send_token(
        &mut self,
        vault: &mut dyn VaultEntry,
        to: Address,
        amount: u64,
    ) -> Result<(), TransferError>;

    /// Native currency held in custody
    fn native_balance(&self) -> u128;

    /// Tokens held in custody
    fn token_balance(&self) -> u64;
}

// ============================================================================
// Local implementation
// ============================================================================

/// Value movement seen from the vault's side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    NativeIn(u128),
    NativeOut(u128),
    TokenIn(u64),
    TokenOut(u64),
}

/// Code attached to an account, run whenever the vault moves value to or
/// from it. Returning an error rejects the transfer.
pub trait AccountHook: Send {
    fn on_movement(
        &mut self,
        gateway: &mut dyn TransferGateway,
        vault: &mut dyn VaultEntry,
        movement: Movement,
    ) -> Result<(), TransferError>;
}

/// In-process gateway backed by a native balance map and a sample token
pub struct LocalGateway {
    custody: Address,
    native: BTreeMap<Address, u128>,
    token: SampleToken,
    hooks: BTreeMap<Address, Box<dyn AccountHook>>,
}

impl LocalGateway {
    /// Gateway whose vault custody lives at `custody`
    pub fn new(custody: Address, token: SampleToken) -> Self {
        Self {
            custody,
            native: BTreeMap::new(),
            token,
            hooks: BTreeMap::new(),
        }
    }

    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn token(&self) -> &SampleToken {
        &self.token
    }

    pub fn token_mut(&mut self) -> &mut SampleToken {
        &mut self.token
    }

    /// Give `account` native currency out of thin air (genesis / faucet)
    pub fn fund_native(&mut self, account: Address, amount: u128) -> Result<(), TransferError> {
        let balance = self
            .native_balance_of(&account)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;
        self.native.insert(account, balance);
        Ok(())
    }

    pub fn native_balance_of(&self, account: &Address) -> u128 {
        self.native.get(account).copied().unwrap_or(0)
    }

    /// Attach contract code to `account`
    pub fn set_hook(&mut self, account: Address, hook: Box<dyn AccountHook>) {
        self.hooks.insert(account, hook);
    }

    pub fn remove_hook(&mut self, account: &Address) -> Option<Box<dyn AccountHook>> {
        self.hooks.remove(account)
    }

    /// Run `account`'s hook, if any.
    ///
    /// The hook is detached while it runs, so a nested transfer to the same
    /// account does not run it again.
    fn run_hook(
        &mut self,
        vault: &mut dyn VaultEntry,
        account: Address,
        movement: Movement,
    ) -> Result<(), TransferError> {
        let Some(mut hook) = self.hooks.remove(&account) else {
            return Ok(());
        };
        debug!(account = %short_hex(&account), ?movement, "running account hook");
        let result = hook.on_movement(self, vault, movement);
        self.hooks.entry(account).or_insert(hook);
        result
    }

    fn move_native(&mut self, from: Address, to: Address, amount: u128) -> Result<(), TransferError> {
        let available = self.native_balance_of(&from);
        if available < amount {
            return Err(TransferError::InsufficientNative {
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self
            .native_balance_of(&to)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        self.native.insert(from, available - amount);
        self.native.insert(to, to_balance);
        Ok(())
    }
}

impl TransferGateway for LocalGateway {
    fn accept_native(
        &mut self,
        vault: &mut dyn VaultEntry,
        from: Address,
        amount: u128,
    ) -> Result<(), TransferError> {
        if from == self.custody {
            return Err(TransferError::CustodySource);
        }
        self.run_hook(vault, from, Movement::NativeIn(amount))?;
        self.move_native(from, self.custody, amount)
    }

    fn send_native(
        &mut self,
        vault: &mut dyn VaultEntry,
        to: Address,
        amount: u128,
    ) -> Result<(), TransferError> {
        self.run_hook(vault, to, Movement::NativeOut(amount))?;
        self.move_native(self.custody, to, amount)
    }

    fn pull_token(
        &mut self,
        vault: &mut dyn VaultEntry,
        from: Address,
        amount: u64,
    ) -> Result<(), TransferError> {
        if from == self.custody {
            return Err(TransferError::CustodySource);
        }
        self.run_hook(vault, from, Movement::TokenIn(amount))?;
        let custody = self.custody;
        self.token.transfer_from(custody, from, custody, amount)?;
        Ok(())
    }

    fn send_token(
        &mut self,
        vault: &mut dyn VaultEntry,
        to: Address,
        amount: u64,
    ) -> Result<(), TransferError> {
        self.run_hook(vault, to, Movement::TokenOut(amount))?;
        let custody = self.custody;
        self.token.transfer(custody, to, amount)?;
        Ok(())
    }

    fn native_balance(&self) -> u128 {
        self.native_balance_of(&self.custody)
    }

    fn token_balance(&self) -> u64 {
        self.token.balance_of(&self.custody)
    }
}
