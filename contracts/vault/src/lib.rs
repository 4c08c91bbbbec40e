//! usdvault Vault
//!
//! A custodial vault that accepts the chain's native currency and one
//! external token, values every deposit in a single USD unit of account
//! (6 decimals) and enforces a global bank cap and a per-withdrawal limit.
//!
//! ## Core Operations
//!
//! - **deposit_native**: credit the USD value of attached native currency
//! - **deposit_token**: pull approved tokens, credit them 1:1
//! - **withdraw_native**: debit USD, pay out its native equivalent
//! - **withdraw_token**: debit and pay out tokens
//!
//! ## Ordering
//!
//! Every operation checks, then writes the ledger, then moves value. Value
//! movement goes through a [`TransferGateway`], which may run counterparty
//! code that calls straight back into the vault through a [`VaultEntry`].
//! Such calls observe the already-updated ledger. A failed transfer undoes
//! the operation's own ledger write and nothing else.

pub mod engine;
pub mod entry;
pub mod gateway;
pub mod shared;
pub mod vault;

pub use engine::{AccountingEngine, VaultState};
pub use entry::VaultEntry;
pub use gateway::{AccountHook, LocalGateway, Movement, TransferError, TransferGateway};
pub use shared::SharedVault;
pub use vault::Vault;
