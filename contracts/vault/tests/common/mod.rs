#![allow(dead_code)]

use tracing_subscriber::EnvFilter;

use usdvault_common::{Address, CallContext, VaultConfig};
use usdvault_price_oracle::OperatorFeed;
use usdvault_token::SampleToken;
use usdvault_vault::{LocalGateway, Vault};

pub const OWNER: Address = [0x01; 32];
pub const TOKEN: Address = [0x70; 32];
pub const ORACLE: Address = [0x0a; 32];
pub const OPERATOR: Address = [0x0b; 32];
pub const CUSTODY: Address = [0xcc; 32];

pub const ALICE: Address = [0xa1; 32];
pub const BOB: Address = [0xb0; 32];
pub const MALLORY: Address = [0x66; 32];

pub const NOW: u64 = 1_700_000_000;
/// $3956.14 with 8 decimals
pub const PRICE: u64 = 395_614_000_000;
pub const BANK_CAP: u64 = 10_000_000_000;
pub const THRESHOLD: u64 = 1_000_000_000;

pub const ONE_NATIVE: u128 = 1_000_000_000_000_000_000;
/// 0.01 native units
pub const CENT_NATIVE: u128 = 10_000_000_000_000_000;

pub struct Harness {
    pub vault: Vault<OperatorFeed>,
    pub gateway: LocalGateway,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_limits(THRESHOLD, BANK_CAP)
    }

    pub fn with_limits(withdrawal_threshold: u64, bank_cap: u64) -> Self {
        let config = VaultConfig::new(OWNER, TOKEN, ORACLE, withdrawal_threshold, bank_cap)
            .expect("valid config");
        let feed = OperatorFeed::with_price(ORACLE, OWNER, OPERATOR, PRICE, NOW);
        let vault = Vault::new(config, feed).expect("vault deploys");
        let gateway = LocalGateway::new(CUSTODY, SampleToken::new(TOKEN, OWNER));
        Self { vault, gateway }
    }

    /// Mint `amount` tokens to `account` and approve the vault for all of it
    pub fn fund_tokens(&mut self, account: Address, amount: u64) {
        let token = self.gateway.token_mut();
        token.mint(OWNER, account, amount).expect("mint");
        token.approve(account, CUSTODY, u64::MAX).expect("approve");
    }

    pub fn fund_native(&mut self, account: Address, amount: u128) {
        self.gateway.fund_native(account, amount).expect("fund native");
    }
}

pub fn call(caller: Address) -> CallContext {
    CallContext::new(caller, NOW)
}

/// Opt-in log output: `RUST_LOG=usdvault_vault=debug cargo test`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
