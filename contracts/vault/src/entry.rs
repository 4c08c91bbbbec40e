//! Re-entry surface
//!
//! What code running inside a transfer can do to the vault that started it.
//! Nested calls share the outer call's timestamp.

use usdvault_common::{Address, AssetKind, Receipt, VaultResult};

use crate::gateway::TransferGateway;

/// Vault operations reachable from inside a transfer
pub trait VaultEntry {
    fn deposit_native(
        &mut self,
        gateway: &mut dyn TransferGateway,
        caller: Address,
        amount: u128,
    ) -> VaultResult<Receipt>;

    fn deposit_token(
        &mut self,
        gateway: &mut dyn TransferGateway,
        caller: Address,
        amount: u64,
    ) -> VaultResult<Receipt>;

    fn withdraw_native(
        &mut self,
        gateway: &mut dyn TransferGateway,
        caller: Address,
        amount_usd: u64,
    ) -> VaultResult<Receipt>;

    fn withdraw_token(
        &mut self,
        gateway: &mut dyn TransferGateway,
        caller: Address,
        amount: u64,
    ) -> VaultResult<Receipt>;

    /// Ledger balance as seen mid-operation
    fn balance_of(&self, account: &Address, asset: AssetKind) -> u64;

    /// Total holdings as seen mid-operation
    fn total_deposits_usd(&self) -> u64;
}
