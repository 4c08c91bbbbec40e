//! usdvault Sample Token
//!
//! A 6-decimal fungible token (USDC-style) used as the external asset of a
//! vault. It implements the standard transfer / approve / transfer_from /
//! balance interface; only the owner can mint.
//!
//! The vault never depends on this crate directly: it talks to the token
//! through its transfer gateway. This implementation backs the in-process
//! gateway and the test suites.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use usdvault_common::{constants::decimals, short_hex, Address};

// ============ Constants ============

/// Token name
pub const NAME: &str = "USD Coin (sample)";
/// Token symbol
pub const SYMBOL: &str = "USDC";
/// One whole token in base units
pub const ONE: u64 = 1_000_000;

// ============ Errors ============

/// Token operation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: u64, requested: u64 },

    #[error("insufficient allowance: available {available}, requested {requested}")]
    InsufficientAllowance { available: u64, requested: u64 },

    #[error("transfer to the zero address")]
    ZeroAddress,

    #[error("only the token owner can mint")]
    MintUnauthorized { caller: Address },

    #[error("arithmetic overflow")]
    Overflow,
}

pub type TokenResult<T> = Result<T, TokenError>;

// ============ Events ============

/// Token notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum TokenEvent {
    Transfer { from: Address, to: Address, amount: u64 },
    Approval { owner: Address, spender: Address, amount: u64 },
    Mint { to: Address, amount: u64, new_total_supply: u64 },
}

// ============ Actions ============

/// Token operations, for action-based dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum TokenAction {
    Transfer { to: Address, amount: u64 },
    Approve { spender: Address, amount: u64 },
    TransferFrom { from: Address, to: Address, amount: u64 },
    Mint { to: Address, amount: u64 },
}

// ============ Token State ============

/// Account-model token state
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SampleToken {
    address: Address,
    owner: Address,
    total_supply: u64,
    balances: BTreeMap<Address, u64>,
    allowances: BTreeMap<(Address, Address), u64>,
    events: Vec<TokenEvent>,
}

// NOTE: Default is intentionally not implemented; a token always needs an
// explicit address and minting owner.

impl SampleToken {
    /// Create a token deployed at `address`, mintable by `owner`
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            total_supply: 0,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn name() -> &'static str {
        NAME
    }

    pub fn symbol() -> &'static str {
        SYMBOL
    }

    pub fn decimals() -> u8 {
        decimals::TOKEN
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    pub fn balance_of(&self, account: &Address) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    pub fn events(&self) -> &[TokenEvent] {
        &self.events
    }

    /// Dispatch an action on behalf of `caller`
    pub fn execute(&mut self, caller: Address, action: &TokenAction) -> TokenResult<()> {
        match action {
            TokenAction::Transfer { to, amount } => self.transfer(caller, *to, *amount),
            TokenAction::Approve { spender, amount } => self.approve(caller, *spender, *amount),
            TokenAction::TransferFrom { from, to, amount } => {
                self.transfer_from(caller, *from, *to, *amount)
            }
            TokenAction::Mint { to, amount } => self.mint(caller, *to, *amount),
        }
    }

    /// Mint new tokens (owner only)
    pub fn mint(&mut self, caller: Address, to: Address, amount: u64) -> TokenResult<()> {
        // 1. Only the owner mints
        if caller != self.owner {
            return Err(TokenError::MintUnauthorized { caller });
        }

        // 2. Amount and recipient must be valid
        if amount == 0 {
            return Err(TokenError::ZeroAmount);
        }
        if to == [0u8; 32] {
            return Err(TokenError::ZeroAddress);
        }

        // 3. Supply and balance must not overflow
        let new_supply = self.total_supply.checked_add(amount).ok_or(TokenError::Overflow)?;
        let new_balance = self.balance_of(&to).checked_add(amount).ok_or(TokenError::Overflow)?;

        self.total_supply = new_supply;
        self.balances.insert(to, new_balance);

        self.events.push(TokenEvent::Mint {
            to,
            amount,
            new_total_supply: new_supply,
        });
        Ok(())
    }

    /// Move `amount` from `caller` to `to`
    pub fn transfer(&mut self, caller: Address, to: Address, amount: u64) -> TokenResult<()> {
        self.move_balance(caller, to, amount)
    }

    /// Set `spender`'s allowance over `caller`'s balance
    pub fn approve(&mut self, caller: Address, spender: Address, amount: u64) -> TokenResult<()> {
        if spender == [0u8; 32] {
            return Err(TokenError::ZeroAddress);
        }

        self.allowances.insert((caller, spender), amount);
        self.events.push(TokenEvent::Approval {
            owner: caller,
            spender,
            amount,
        });
        Ok(())
    }

    /// Move `amount` from `from` to `to`, spending `caller`'s allowance
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: u64,
    ) -> TokenResult<()> {
        // 1. Allowance must cover the amount
        let allowance = self.allowance(&from, &caller);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                available: allowance,
                requested: amount,
            });
        }

        // 2. Move the balance; allowance is only spent on success
        self.move_balance(from, to, amount)?;
        self.allowances.insert((from, caller), allowance - amount);
        Ok(())
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: u64) -> TokenResult<()> {
        // 1. Amount must be positive
        if amount == 0 {
            return Err(TokenError::ZeroAmount);
        }

        // 2. Recipient must be a real account
        if to == [0u8; 32] {
            return Err(TokenError::ZeroAddress);
        }

        // 3. Sender must have enough balance
        let from_balance = self.balance_of(&from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                available: from_balance,
                requested: amount,
            });
        }

        // 4. Apply both sides
        self.balances.insert(from, from_balance - amount);
        let to_balance = self.balance_of(&to).checked_add(amount).ok_or(TokenError::Overflow)?;
        self.balances.insert(to, to_balance);

        debug!(from = %short_hex(&from), to = %short_hex(&to), amount, "token transfer");
        self.events.push(TokenEvent::Transfer { from, to, amount });
        Ok(())
    }
}

// ============ Tests ============
