//! Vault
//!
//! The public face of one vault instance: an [`AccountingEngine`] plus the
//! [`VaultState`] it operates on. Mutations take `&mut self`; for shared,
//! multi-threaded access wrap it in a [`SharedVault`](crate::SharedVault).

use tracing::info;

use usdvault_common::{
    access_control, constants::asset, short_hex, Address, AssetKind, CallContext, Ledger,
    PriceFeed, PriceOracleAdapter, PriceQuote, Receipt, VaultAction, VaultConfig, VaultError,
    VaultEvent, VaultResult,
};

use crate::engine::{AccountingEngine, VaultState};
use crate::gateway::TransferGateway;

/// A custodial vault booking native and token deposits in USD
#[derive(Debug)]
pub struct Vault<F> {
    engine: AccountingEngine<F>,
    state: VaultState,
}

impl<F: PriceFeed> Vault<F> {
    /// Deploy a vault priced by `feed` with the default heartbeat.
    ///
    /// # Errors
    /// - `InvalidConfig` if the feed is not 8-decimal or is not the
    ///   configured oracle
    pub fn new(config: VaultConfig, feed: F) -> VaultResult<Self> {
        Self::with_oracle(config, PriceOracleAdapter::new(feed)?)
    }

    /// Deploy a vault around an already configured oracle adapter
    pub fn with_oracle(config: VaultConfig, oracle: PriceOracleAdapter<F>) -> VaultResult<Self> {
        let engine = AccountingEngine::new(config, oracle)?;
        info!(
            owner = %short_hex(&engine.config().owner()),
            bank_cap = engine.config().bank_cap(),
            withdrawal_threshold = engine.config().withdrawal_threshold(),
            "vault deployed"
        );
        Ok(Self {
            engine,
            state: VaultState::new(),
        })
    }

    // ============ Operations ============

    /// Deposit `amount` native units attached to the call
    pub fn deposit_native(
        &mut self,
        call: &CallContext,
        gateway: &mut dyn TransferGateway,
        amount: u128,
    ) -> VaultResult<Receipt> {
        self.engine.deposit_native(&mut self.state, gateway, *call, amount)
    }

    /// Deposit `amount` approved tokens
    pub fn deposit_token(
        &mut self,
        call: &CallContext,
        gateway: &mut dyn TransferGateway,
        amount: u64,
    ) -> VaultResult<Receipt> {
        self.engine.deposit_token(&mut self.state, gateway, *call, amount)
    }

    /// Withdraw native currency worth `amount_usd`
    pub fn withdraw_native(
        &mut self,
        call: &CallContext,
        gateway: &mut dyn TransferGateway,
        amount_usd: u64,
    ) -> VaultResult<Receipt> {
        self.engine.withdraw_native(&mut self.state, gateway, *call, amount_usd)
    }

    /// Withdraw `amount` tokens
    pub fn withdraw_token(
        &mut self,
        call: &CallContext,
        gateway: &mut dyn TransferGateway,
        amount: u64,
    ) -> VaultResult<Receipt> {
        self.engine.withdraw_token(&mut self.state, gateway, *call, amount)
    }

    /// Deposit the asset identified by `asset_address`.
    ///
    /// The native sentinel selects a native deposit (`amount` in native
    /// units); the configured token selects a token deposit.
    pub fn deposit(
        &mut self,
        call: &CallContext,
        gateway: &mut dyn TransferGateway,
        asset_address: &Address,
        amount: u128,
    ) -> VaultResult<Receipt> {
        match self.engine.config().asset_kind(asset_address)? {
            AssetKind::Native => self.deposit_native(call, gateway, amount),
            AssetKind::ExternalToken => {
                let amount = u64::try_from(amount).map_err(|_| VaultError::Overflow)?;
                self.deposit_token(call, gateway, amount)
            }
        }
    }

    /// Withdraw `amount` unit of account from the asset at `asset_address`
    pub fn withdraw(
        &mut self,
        call: &CallContext,
        gateway: &mut dyn TransferGateway,
        asset_address: &Address,
        amount: u64,
    ) -> VaultResult<Receipt> {
        match self.engine.config().asset_kind(asset_address)? {
            AssetKind::Native => self.withdraw_native(call, gateway, amount),
            AssetKind::ExternalToken => self.withdraw_token(call, gateway, amount),
        }
    }

    /// Dispatch a [`VaultAction`]
    pub fn execute(
        &mut self,
        call: &CallContext,
        gateway: &mut dyn TransferGateway,
        action: &VaultAction,
    ) -> VaultResult<Receipt> {
        match *action {
            VaultAction::DepositNative { amount } => self.deposit_native(call, gateway, amount),
            VaultAction::DepositToken { amount } => self.deposit_token(call, gateway, amount),
            VaultAction::WithdrawNative { amount_usd } => {
                self.withdraw_native(call, gateway, amount_usd)
            }
            VaultAction::WithdrawToken { amount } => self.withdraw_token(call, gateway, amount),
        }
    }

    // ============ Queries ============

    pub fn balance(&self, account: &Address, asset: AssetKind) -> u64 {
        self.state.ledger().balance_of(account, asset)
    }

    /// Balance for an asset identity; fails with `InvalidToken` on an
    /// unsupported address
    pub fn balance_by_address(&self, account: &Address, asset_address: &Address) -> VaultResult<u64> {
        let asset = self.engine.config().asset_kind(asset_address)?;
        Ok(self.balance(account, asset))
    }

    /// Sum of an account's balances across both assets
    pub fn total_balance(&self, account: &Address) -> u64 {
        self.state.ledger().total_balance_of(account)
    }

    pub fn deposit_count(&self) -> u64 {
        self.state.ledger().deposit_count()
    }

    pub fn withdrawal_count(&self) -> u64 {
        self.state.ledger().withdrawal_count()
    }

    pub fn withdrawal_threshold(&self) -> u64 {
        self.engine.config().withdrawal_threshold()
    }

    pub fn bank_cap(&self) -> u64 {
        self.engine.config().bank_cap()
    }

    pub fn owner(&self) -> Address {
        self.engine.config().owner()
    }

    pub fn token_address(&self) -> Address {
        self.engine.config().token()
    }

    pub fn oracle_address(&self) -> Address {
        self.engine.config().oracle()
    }

    /// Address callers pass to select the native asset
    pub fn native_address(&self) -> Address {
        asset::NATIVE
    }

    pub fn total_deposits_usd(&self) -> u64 {
        self.state.ledger().total_deposited()
    }

    /// Native currency actually held in custody
    pub fn total_native_balance(&self, gateway: &dyn TransferGateway) -> u128 {
        gateway.native_balance()
    }

    /// Validated price at `now`
    pub fn current_price(&self, now: u64) -> VaultResult<PriceQuote> {
        self.engine.quote(now)
    }

    pub fn preview_deposit_native(&self, amount: u128, now: u64) -> VaultResult<u64> {
        self.engine.preview_deposit_native(amount, now)
    }

    pub fn preview_withdraw_native(&self, amount_usd: u64, now: u64) -> VaultResult<u128> {
        self.engine.preview_withdraw_native(amount_usd, now)
    }

    pub fn config(&self) -> &VaultConfig {
        self.engine.config()
    }

    pub fn ledger(&self) -> &Ledger {
        self.state.ledger()
    }

    /// SHA-256 commitment to balances and aggregates
    pub fn state_root(&self) -> [u8; 32] {
        self.state.ledger().state_root()
    }

    // ============ Events ============

    pub fn events(&self) -> &[VaultEvent] {
        self.state.events().events()
    }

    /// Drain the notification log
    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        self.state.events_mut().take()
    }

    // ============ Access Control ============

    pub fn is_authorized(&self, caller: &Address) -> bool {
        access_control::is_authorized(caller, &self.owner())
    }

    pub fn require_owner(&self, caller: &Address) -> VaultResult<()> {
        access_control::require_owner(caller, &self.owner())
    }

    // ============ Oracle ============

    pub fn feed(&self) -> &F {
        self.engine.oracle().feed()
    }

    /// Mutable access to the price source (feed updates happen out of band)
    pub fn feed_mut(&mut self) -> &mut F {
        self.engine.oracle_mut().feed_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::LocalGateway;
    use usdvault_common::{FeedError, RoundData};
    use usdvault_token::SampleToken;

    const OWNER: Address = [1u8; 32];
    const TOKEN: Address = [2u8; 32];
    const ORACLE: Address = [3u8; 32];
    const CUSTODY: Address = [5u8; 32];
    const ALICE: Address = [6u8; 32];
    const NOW: u64 = 1_700_000_000;

    struct StaticFeed {
        answer: i128,
        updated_at: u64,
    }

    impl PriceFeed for StaticFeed {
        fn address(&self) -> Address {
            ORACLE
        }

        fn decimals(&self) -> u8 {
            8
        }

        fn latest_round_data(&self) -> Result<RoundData, FeedError> {
            Ok(RoundData {
                answer: self.answer,
                updated_at: self.updated_at,
            })
        }
    }

    fn setup() -> (Vault<StaticFeed>, LocalGateway) {
        let config = VaultConfig::new(OWNER, TOKEN, ORACLE, 1_000_000_000, 10_000_000_000).unwrap();
        let feed = StaticFeed {
            answer: 395_614_000_000,
            updated_at: NOW,
        };
        let vault = Vault::new(config, feed).unwrap();

        let mut token = SampleToken::new(TOKEN, OWNER);
        token.mint(OWNER, ALICE, 5_000_000_000).unwrap();
        token.approve(ALICE, CUSTODY, u64::MAX).unwrap();
        let mut gateway = LocalGateway::new(CUSTODY, token);
        gateway.fund_native(ALICE, 100_000_000_000_000_000_000).unwrap();

        (vault, gateway)
    }

    #[test]
    fn test_accessors() {
        let (vault, gateway) = setup();
        assert_eq!(vault.owner(), OWNER);
        assert_eq!(vault.token_address(), TOKEN);
        assert_eq!(vault.oracle_address(), ORACLE);
        assert_eq!(vault.bank_cap(), 10_000_000_000);
        assert_eq!(vault.withdrawal_threshold(), 1_000_000_000);
        assert_eq!(vault.total_native_balance(&gateway), 0);
        assert_eq!(vault.current_price(NOW).unwrap().price, 395_614_000_000);
    }

    #[test]
    fn test_address_dispatch() {
        let (mut vault, mut gateway) = setup();
        let call = CallContext::new(ALICE, NOW);

        vault.deposit(&call, &mut gateway, &TOKEN, 1_000_000).unwrap();
        vault
            .deposit(&call, &mut gateway, &asset::NATIVE, 10_000_000_000_000_000)
            .unwrap();

        assert_eq!(vault.balance_by_address(&ALICE, &TOKEN), Ok(1_000_000));
        assert_eq!(vault.balance_by_address(&ALICE, &asset::NATIVE), Ok(39_561_400));
        assert_eq!(
            vault.balance_by_address(&ALICE, &[8u8; 32]),
            Err(VaultError::InvalidToken { token: [8u8; 32] })
        );
        assert_eq!(
            vault.deposit(&call, &mut gateway, &[8u8; 32], 1),
            Err(VaultError::InvalidToken { token: [8u8; 32] })
        );

        vault.withdraw(&call, &mut gateway, &TOKEN, 400_000).unwrap();
        assert_eq!(vault.total_balance(&ALICE), 600_000 + 39_561_400);
    }

    #[test]
    fn test_execute_action() {
        let (mut vault, mut gateway) = setup();
        let call = CallContext::new(ALICE, NOW);

        let receipt = vault
            .execute(&call, &mut gateway, &VaultAction::DepositToken { amount: 2_000_000 })
            .unwrap();
        assert_eq!(receipt.asset, AssetKind::ExternalToken);

        vault
            .execute(&call, &mut gateway, &VaultAction::WithdrawToken { amount: 500_000 })
            .unwrap();
        assert_eq!(vault.balance(&ALICE, AssetKind::ExternalToken), 1_500_000);
        assert_eq!(gateway.token_balance(), 1_500_000);
    }

    #[test]
    fn test_native_custody_tracks_deposits() {
        let (mut vault, mut gateway) = setup();
        let call = CallContext::new(ALICE, NOW);

        vault.deposit_native(&call, &mut gateway, 10_000_000_000_000_000).unwrap();
        assert_eq!(vault.total_native_balance(&gateway), 10_000_000_000_000_000);

        let receipt = vault.withdraw_native(&call, &mut gateway, 39_561_400).unwrap();
        assert_eq!(
            vault.total_native_balance(&gateway),
            10_000_000_000_000_000 - receipt.native_amount
        );
    }

    #[test]
    fn test_take_events_drains_log() {
        let (mut vault, mut gateway) = setup();
        let call = CallContext::new(ALICE, NOW);
        vault.deposit_token(&call, &mut gateway, 1_000_000).unwrap();

        let events = vault.take_events();
        assert_eq!(events.len(), 1);
        assert!(vault.events().is_empty());
    }

    #[test]
    fn test_owner_capability() {
        let (vault, _) = setup();
        assert!(vault.is_authorized(&OWNER));
        assert!(vault.require_owner(&ALICE).is_err());
    }

    #[test]
    fn test_preview_matches_operation() {
        let (mut vault, mut gateway) = setup();
        let call = CallContext::new(ALICE, NOW);

        let preview = vault.preview_deposit_native(10_000_000_000_000_000, NOW).unwrap();
        let receipt = vault
            .deposit_native(&call, &mut gateway, 10_000_000_000_000_000)
            .unwrap();
        assert_eq!(preview, receipt.unit_value);

        let preview = vault.preview_withdraw_native(1_000_000, NOW).unwrap();
        let receipt = vault.withdraw_native(&call, &mut gateway, 1_000_000).unwrap();
        assert_eq!(preview, receipt.native_amount);
    }

    #[test]
    fn test_stale_feed_blocks_native_but_not_token() {
        let (mut vault, mut gateway) = setup();
        let later = CallContext::new(ALICE, NOW + 3_601);

        assert!(matches!(
            vault.deposit_native(&later, &mut gateway, 1_000),
            Err(VaultError::OracleStalePrice { .. })
        ));
        vault.deposit_token(&later, &mut gateway, 1_000).unwrap();

        vault.feed_mut().updated_at = NOW + 3_601;
        vault.deposit_native(&later, &mut gateway, 1_000_000_000_000).unwrap();
    }
}
