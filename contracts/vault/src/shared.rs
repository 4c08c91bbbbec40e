//! Shared Vault
//!
//! Thread-safe handle around a [`Vault`]. Every mutating call holds the
//! write lock from its first check to the end of its transfer, so two
//! operations never interleave. Queries take the read lock and therefore
//! see either the state before an operation or the state after it.
//!
//! Code that re-enters the vault from inside a transfer goes through the
//! [`VaultEntry`](crate::VaultEntry) handle it is given, never through this
//! lock, so re-entry cannot deadlock.

use std::sync::Arc;

use parking_lot::RwLock;

use usdvault_common::{
    Address, AssetKind, CallContext, PriceFeed, PriceQuote, Receipt, VaultAction, VaultResult,
};

use crate::gateway::TransferGateway;
use crate::vault::Vault;

/// Cloneable, lock-protected vault handle
#[derive(Debug)]
pub struct SharedVault<F> {
    inner: Arc<RwLock<Vault<F>>>,
}

impl<F> Clone for SharedVault<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: PriceFeed> SharedVault<F> {
    pub fn new(vault: Vault<F>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(vault)),
        }
    }

    // ============ Operations ============

    pub fn deposit_native(
        &self,
        call: &CallContext,
        gateway: &mut dyn TransferGateway,
        amount: u128,
    ) -> VaultResult<Receipt> {
        self.inner.write().deposit_native(call, gateway, amount)
    }

    pub fn deposit_token(
        &self,
        call: &CallContext,
        gateway: &mut dyn TransferGateway,
        amount: u64,
    ) -> VaultResult<Receipt> {
        self.inner.write().deposit_token(call, gateway, amount)
    }

    pub fn withdraw_native(
        &self,
        call: &CallContext,
        gateway: &mut dyn TransferGateway,
        amount_usd: u64,
    ) -> VaultResult<Receipt> {
        self.inner.write().withdraw_native(call, gateway, amount_usd)
    }

    pub fn withdraw_token(
        &self,
        call: &CallContext,
        gateway: &mut dyn TransferGateway,
        amount: u64,
    ) -> VaultResult<Receipt> {
        self.inner.write().withdraw_token(call, gateway, amount)
    }

    pub fn execute(
        &self,
        call: &CallContext,
        gateway: &mut dyn TransferGateway,
        action: &VaultAction,
    ) -> VaultResult<Receipt> {
        self.inner.write().execute(call, gateway, action)
    }

    // ============ Queries ============

    pub fn balance(&self, account: &Address, asset: AssetKind) -> u64 {
        self.inner.read().balance(account, asset)
    }

    pub fn total_balance(&self, account: &Address) -> u64 {
        self.inner.read().total_balance(account)
    }

    pub fn total_deposits_usd(&self) -> u64 {
        self.inner.read().total_deposits_usd()
    }

    pub fn deposit_count(&self) -> u64 {
        self.inner.read().deposit_count()
    }

    pub fn withdrawal_count(&self) -> u64 {
        self.inner.read().withdrawal_count()
    }

    pub fn current_price(&self, now: u64) -> VaultResult<PriceQuote> {
        self.inner.read().current_price(now)
    }

    /// Run `f` against one consistent snapshot
    pub fn read<R>(&self, f: impl FnOnce(&Vault<F>) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` with exclusive access, e.g. to push a feed update
    pub fn write<R>(&self, f: impl FnOnce(&mut Vault<F>) -> R) -> R {
        f(&mut self.inner.write())
    }
}
