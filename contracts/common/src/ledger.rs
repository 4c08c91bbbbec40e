//! Ledger Module
//!
//! Per-account, per-asset balances in unit of account, plus the global
//! aggregates.
//!
//! ## Invariants
//!
//! - `total_deposited == Σ balances`
//! - no balance is ever negative
//!
//! `credit` and `debit` are the only balance mutation paths and update the
//! balance and the total together. The cap and balance preconditions are
//! owned by the caller; the ledger does not re-check them, it only refuses
//! to wrap.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

use crate::errors::{VaultError, VaultResult};
use crate::math::{safe_add, safe_sub};
use crate::types::{Address, AssetKind};

/// Process-lifetime aggregates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct LedgerAggregates {
    /// Sum of every balance, in unit of account
    pub total_deposited: u64,
    /// Successful deposits
    pub deposit_count: u64,
    /// Successful withdrawals
    pub withdrawal_count: u64,
}

/// Balance store of a vault
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Ledger {
    balances: BTreeMap<(Address, AssetKind), u64>,
    aggregates: LedgerAggregates,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // ============ Mutations ============

    /// Increase `account`'s `asset` balance and the total by `amount`.
    ///
    /// Caller must already have checked the bank cap.
    pub fn credit(&mut self, account: Address, asset: AssetKind, amount: u64) -> VaultResult<()> {
        let balance = self.balance_of(&account, asset);
        let new_balance = safe_add(balance, amount)?;
        let new_total = safe_add(self.aggregates.total_deposited, amount)?;

        self.store((account, asset), new_balance);
        self.aggregates.total_deposited = new_total;
        Ok(())
    }

    /// Decrease `account`'s `asset` balance and the total by `amount`.
    ///
    /// Caller must already have checked `amount <= balance`.
    pub fn debit(&mut self, account: Address, asset: AssetKind, amount: u64) -> VaultResult<()> {
        let balance = self.balance_of(&account, asset);
        let new_balance = safe_sub(balance, amount)?;
        let new_total = safe_sub(self.aggregates.total_deposited, amount)?;

        self.store((account, asset), new_balance);
        self.aggregates.total_deposited = new_total;
        Ok(())
    }

    // Zero balances are never stored.
    fn store(&mut self, key: (Address, AssetKind), balance: u64) {
        if balance == 0 {
            self.balances.remove(&key);
        } else {
            self.balances.insert(key, balance);
        }
    }

    pub fn increment_deposit_count(&mut self) {
        self.aggregates.deposit_count = self.aggregates.deposit_count.saturating_add(1);
    }

    pub fn increment_withdrawal_count(&mut self) {
        self.aggregates.withdrawal_count = self.aggregates.withdrawal_count.saturating_add(1);
    }

    /// Undo an increment made by the current, failing operation
    pub fn decrement_deposit_count(&mut self) {
        self.aggregates.deposit_count = self.aggregates.deposit_count.saturating_sub(1);
    }

    /// Undo an increment made by the current, failing operation
    pub fn decrement_withdrawal_count(&mut self) {
        self.aggregates.withdrawal_count = self.aggregates.withdrawal_count.saturating_sub(1);
    }

    // ============ Queries ============

    /// Balance of `(account, asset)`; zero if never credited
    pub fn balance_of(&self, account: &Address, asset: AssetKind) -> u64 {
        self.balances.get(&(*account, asset)).copied().unwrap_or(0)
    }

    /// Sum of an account's balances across both assets
    pub fn total_balance_of(&self, account: &Address) -> u64 {
        AssetKind::ALL
            .iter()
            .map(|asset| self.balance_of(account, *asset))
            .fold(0u64, |acc, b| acc.saturating_add(b))
    }

    pub fn total_deposited(&self) -> u64 {
        self.aggregates.total_deposited
    }

    pub fn deposit_count(&self) -> u64 {
        self.aggregates.deposit_count
    }

    pub fn withdrawal_count(&self) -> u64 {
        self.aggregates.withdrawal_count
    }

    pub fn aggregates(&self) -> LedgerAggregates {
        self.aggregates
    }

    /// Every `(account, asset, balance)` entry, in key order
    pub fn entries(&self) -> impl Iterator<Item = (&Address, AssetKind, u64)> + '_ {
        self.balances
            .iter()
            .map(|((account, asset), balance)| (account, *asset, *balance))
    }

    /// Recomputed sum of all balances (u128, cannot overflow)
    pub fn sum_of_balances(&self) -> u128 {
        self.balances.values().map(|b| *b as u128).sum()
    }

    /// Serialize the ledger for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Restore a ledger from storage
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }

    /// SHA-256 commitment over the serialized ledger.
    ///
    /// Two ledgers have the same root iff they are byte-identical.
    pub fn state_root(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"usdvault:ledger:v1");
        hasher.update(self.to_bytes());
        hasher.finalize().into()
    }
}
