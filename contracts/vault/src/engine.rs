//! Accounting Engine
//!
//! Sequences one operation per call in three phases:
//!
//! 1. CHECK: amounts, thresholds, balances, oracle quote, bank cap
//! 2. EFFECT: ledger write and counter increment
//! 3. INTERACTION: the value transfer, through the [`TransferGateway`]
//!
//! The ledger is written before the gateway is touched, so any code the
//! transfer runs (and any call it makes back into the vault) observes the
//! post-operation balances. When the transfer fails, the engine undoes only
//! its own effect; whatever nested calls committed meanwhile stands.
//!
//! Two in-flight reservations keep that compensating rollback safe:
//! a withdrawal's debited value still counts against the bank cap until its
//! payout settles, and a deposit's credit cannot be withdrawn until its
//! transfer-in settles.

use std::collections::BTreeMap;

use tracing::{debug, info, info_span, warn};

use usdvault_common::{
    native_to_unit, short_hex, unit_to_native, Address, AssetKind, CallContext, EventLog, Ledger,
    PriceFeed, PriceOracleAdapter, PriceQuote, Receipt, VaultConfig, VaultError, VaultEvent,
    VaultResult,
};

use crate::entry::VaultEntry;
use crate::gateway::{TransferError, TransferGateway};

// ============================================================================
// State
// ============================================================================

/// Everything a vault mutates, passed explicitly into every operation
#[derive(Debug, Clone, Default)]
pub struct VaultState {
    ledger: Ledger,
    events: EventLog,
    /// Value debited by withdrawals whose payout has not settled yet
    reserved_outflow: u64,
    /// Credits whose transfer-in has not settled yet
    unsettled: BTreeMap<(Address, AssetKind), u64>,
}

impl VaultState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog {
        &mut self.events
    }

    /// True when no transfer is in flight
    pub fn is_settled(&self) -> bool {
        self.reserved_outflow == 0 && self.unsettled.is_empty()
    }

    /// Balance a withdrawal may draw on
    pub fn spendable(&self, account: &Address, asset: AssetKind) -> u64 {
        let locked = self.unsettled.get(&(*account, asset)).copied().unwrap_or(0);
        self.ledger.balance_of(account, asset).saturating_sub(locked)
    }

    /// Holdings a new deposit is measured against
    fn committed_total(&self) -> u64 {
        self.ledger.total_deposited().saturating_add(self.reserved_outflow)
    }

    fn lock_unsettled(&mut self, key: (Address, AssetKind), value: u64) {
        let locked = self.unsettled.entry(key).or_insert(0);
        *locked = locked.saturating_add(value);
    }

    fn release_unsettled(&mut self, key: (Address, AssetKind), value: u64) {
        if let Some(locked) = self.unsettled.get_mut(&key) {
            *locked = locked.saturating_sub(value);
            if *locked == 0 {
                self.unsettled.remove(&key);
            }
        }
    }

    fn reserve_outflow(&mut self, value: u64) {
        self.reserved_outflow = self.reserved_outflow.saturating_add(value);
    }

    fn release_outflow(&mut self, value: u64) {
        self.reserved_outflow = self.reserved_outflow.saturating_sub(value);
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Inbound leg of a deposit
#[derive(Debug, Clone, Copy)]
enum Settlement {
    AcceptNative(u128),
    PullToken(u64),
}

/// Outbound leg of a withdrawal
#[derive(Debug, Clone, Copy)]
enum Payout {
    Native(u128),
    Token(u64),
}

/// Immutable half of a vault: configuration and price source
#[derive(Debug)]
pub struct AccountingEngine<F> {
    config: VaultConfig,
    oracle: PriceOracleAdapter<F>,
}

impl<F: PriceFeed> AccountingEngine<F> {
    /// Bind a configuration to its price source.
    ///
    /// # Errors
    /// `InvalidConfig` if the adapter's feed is not the configured oracle.
    pub fn new(config: VaultConfig, oracle: PriceOracleAdapter<F>) -> VaultResult<Self> {
        if oracle.address() != config.oracle() {
            return Err(VaultError::InvalidConfig {
                param: "oracle",
                reason: "does not match the price feed address",
            });
        }
        Ok(Self { config, oracle })
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn oracle(&self) -> &PriceOracleAdapter<F> {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut PriceOracleAdapter<F> {
        &mut self.oracle
    }

    /// Fresh validated quote
    pub fn quote(&self, now: u64) -> VaultResult<PriceQuote> {
        self.oracle.get_asset_price(now)
    }

    /// Unit-of-account value of `amount` native units at the current price
    pub fn preview_deposit_native(&self, amount: u128, now: u64) -> VaultResult<u64> {
        let quote = self.quote(now)?;
        native_to_unit(amount, quote.price)
    }

    /// Native units paid out for `amount_usd` at the current price
    pub fn preview_withdraw_native(&self, amount_usd: u64, now: u64) -> VaultResult<u128> {
        let quote = self.quote(now)?;
        unit_to_native(amount_usd, quote.price)
    }

    // ============ Deposits ============

    /// Credit the caller with the value of `amount` native units
    pub fn deposit_native(
        &self,
        state: &mut VaultState,
        gateway: &mut dyn TransferGateway,
        call: CallContext,
        amount: u128,
    ) -> VaultResult<Receipt> {
        let caller = short_hex(&call.caller);
        let _span = info_span!("deposit_native", %caller, amount = %amount).entered();

        let receipt = self.price_native_deposit(state, call, amount).map_err(rejected)?;
        self.commit_deposit(state, gateway, call, receipt, Settlement::AcceptNative(amount))
    }

    /// Pull `amount` tokens from the caller and credit them 1:1
    pub fn deposit_token(
        &self,
        state: &mut VaultState,
        gateway: &mut dyn TransferGateway,
        call: CallContext,
        amount: u64,
    ) -> VaultResult<Receipt> {
        let _span = info_span!("deposit_token", caller = %short_hex(&call.caller), amount).entered();

        let receipt = self.price_token_deposit(state, call, amount).map_err(rejected)?;
        self.commit_deposit(state, gateway, call, receipt, Settlement::PullToken(amount))
    }

    fn price_native_deposit(
        &self,
        state: &VaultState,
        call: CallContext,
        amount: u128,
    ) -> VaultResult<Receipt> {
        // 1. Amount must be positive
        if amount == 0 {
            return Err(VaultError::DepositAmountZero);
        }

        // 2. Value it at a fresh quote
        let quote = self.quote(call.timestamp)?;
        let unit_value = native_to_unit(amount, quote.price)?;

        // 3. Bank cap
        self.check_cap(state, unit_value)?;

        Ok(Receipt {
            account: call.caller,
            asset: AssetKind::Native,
            native_amount: amount,
            unit_value,
        })
    }

    fn price_token_deposit(
        &self,
        state: &VaultState,
        call: CallContext,
        amount: u64,
    ) -> VaultResult<Receipt> {
        // 1. Amount must be positive
        if amount == 0 {
            return Err(VaultError::DepositAmountZero);
        }

        // 2. Tokens are already in unit of account
        self.check_cap(state, amount)?;

        Ok(Receipt {
            account: call.caller,
            asset: AssetKind::ExternalToken,
            native_amount: u128::from(amount),
            unit_value: amount,
        })
    }

    fn check_cap(&self, state: &VaultState, value: u64) -> VaultResult<()> {
        let cap = self.config.bank_cap();
        let within_cap = state
            .committed_total()
            .checked_add(value)
            .is_some_and(|total| total <= cap);

        if !within_cap {
            return Err(VaultError::BankCapExceeded {
                current_total: state.committed_total(),
                attempted: value,
                cap,
            });
        }
        Ok(())
    }

    fn commit_deposit(
        &self,
        state: &mut VaultState,
        gateway: &mut dyn TransferGateway,
        call: CallContext,
        receipt: Receipt,
        settlement: Settlement,
    ) -> VaultResult<Receipt> {
        let key = (receipt.account, receipt.asset);

        // EFFECT
        state.ledger.credit(receipt.account, receipt.asset, receipt.unit_value)?;
        state.ledger.increment_deposit_count();
        state.lock_unsettled(key, receipt.unit_value);

        // INTERACTION
        let outcome = self.settle(state, gateway, call, settlement);
        state.release_unsettled(key, receipt.unit_value);

        match outcome {
            Ok(()) => {
                state.events.emit(VaultEvent::deposit(&receipt, call.timestamp));
                info!(
                    asset = %receipt.asset,
                    value = receipt.unit_value,
                    total = state.ledger.total_deposited(),
                    "deposit recorded"
                );
                Ok(receipt)
            }
            Err(err) => {
                warn!(%err, "deposit transfer failed, rolling back");
                state.ledger.debit(receipt.account, receipt.asset, receipt.unit_value)?;
                state.ledger.decrement_deposit_count();
                Err(VaultError::TransferFailed {
                    recipient: receipt.account,
                })
            }
        }
    }

    fn settle(
        &self,
        state: &mut VaultState,
        gateway: &mut dyn TransferGateway,
        call: CallContext,
        settlement: Settlement,
    ) -> Result<(), TransferError> {
        let mut session = Session::new(self, state, call.timestamp);
        match settlement {
            Settlement::AcceptNative(amount) => {
                gateway.accept_native(&mut session, call.caller, amount)
            }
            Settlement::PullToken(amount) => gateway.pull_token(&mut session, call.caller, amount),
        }
    }

    // ============ Withdrawals ============

    /// Debit `amount_usd` from the caller and pay out its native equivalent
    pub fn withdraw_native(
        &self,
        state: &mut VaultState,
        gateway: &mut dyn TransferGateway,
        call: CallContext,
        amount_usd: u64,
    ) -> VaultResult<Receipt> {
        let caller = short_hex(&call.caller);
        let _span = info_span!("withdraw_native", %caller, amount = amount_usd).entered();

        let receipt = self.price_native_withdrawal(state, call, amount_usd).map_err(rejected)?;
        let payout = Payout::Native(receipt.native_amount);
        self.commit_withdrawal(state, gateway, call, receipt, payout)
    }

    /// Debit `amount` tokens from the caller and send them out
    pub fn withdraw_token(
        &self,
        state: &mut VaultState,
        gateway: &mut dyn TransferGateway,
        call: CallContext,
        amount: u64,
    ) -> VaultResult<Receipt> {
        let _span = info_span!("withdraw_token", caller = %short_hex(&call.caller), amount).entered();

        self.check_withdrawal(state, call.caller, AssetKind::ExternalToken, amount)
            .map_err(rejected)?;
        let receipt = Receipt {
            account: call.caller,
            asset: AssetKind::ExternalToken,
            native_amount: u128::from(amount),
            unit_value: amount,
        };
        self.commit_withdrawal(state, gateway, call, receipt, Payout::Token(amount))
    }

    fn price_native_withdrawal(
        &self,
        state: &VaultState,
        call: CallContext,
        amount_usd: u64,
    ) -> VaultResult<Receipt> {
        self.check_withdrawal(state, call.caller, AssetKind::Native, amount_usd)?;

        // 4. Convert at a fresh quote
        let quote = self.quote(call.timestamp)?;
        let native_out = unit_to_native(amount_usd, quote.price)?;

        Ok(Receipt {
            account: call.caller,
            asset: AssetKind::Native,
            native_amount: native_out,
            unit_value: amount_usd,
        })
    }

    fn check_withdrawal(
        &self,
        state: &VaultState,
        account: Address,
        asset: AssetKind,
        amount: u64,
    ) -> VaultResult<()> {
        // 1. Amount must be positive
        if amount == 0 {
            return Err(VaultError::WithdrawalAmountZero);
        }

        // 2. Per-call limit
        let threshold = self.config.withdrawal_threshold();
        if amount > threshold {
            return Err(VaultError::WithdrawalThresholdExceeded {
                requested: amount,
                threshold,
            });
        }

        // 3. Caller's own settled balance
        let available = state.spendable(&account, asset);
        if amount > available {
            return Err(VaultError::InsufficientBalance {
                account,
                asset,
                available,
                requested: amount,
            });
        }
        Ok(())
    }

    fn commit_withdrawal(
        &self,
        state: &mut VaultState,
        gateway: &mut dyn TransferGateway,
        call: CallContext,
        receipt: Receipt,
        payout: Payout,
    ) -> VaultResult<Receipt> {
        // EFFECT
        state.ledger.debit(receipt.account, receipt.asset, receipt.unit_value)?;
        state.ledger.increment_withdrawal_count();
        state.reserve_outflow(receipt.unit_value);

        // INTERACTION
        let outcome = self.pay_out(state, gateway, call, payout);
        state.release_outflow(receipt.unit_value);

        match outcome {
            Ok(()) => {
                state.events.emit(VaultEvent::withdrawal(&receipt, call.timestamp));
                info!(
                    asset = %receipt.asset,
                    value = receipt.unit_value,
                    total = state.ledger.total_deposited(),
                    "withdrawal paid"
                );
                Ok(receipt)
            }
            Err(err) => {
                warn!(%err, "payout failed, rolling back");
                state.ledger.credit(receipt.account, receipt.asset, receipt.unit_value)?;
                state.ledger.decrement_withdrawal_count();
                Err(VaultError::TransferFailed {
                    recipient: receipt.account,
                })
            }
        }
    }

    fn pay_out(
        &self,
        state: &mut VaultState,
        gateway: &mut dyn TransferGateway,
        call: CallContext,
        payout: Payout,
    ) -> Result<(), TransferError> {
        let mut session = Session::new(self, state, call.timestamp);
        match payout {
            Payout::Native(amount) => gateway.send_native(&mut session, call.caller, amount),
            Payout::Token(amount) => gateway.send_token(&mut session, call.caller, amount),
        }
    }
}

fn rejected(err: VaultError) -> VaultError {
    debug!(code = err.code(), %err, "rejected");
    err
}

// ============================================================================
// Re-entry
// ============================================================================

/// Handle given to the gateway for the duration of one transfer
struct Session<'a, F> {
    engine: &'a AccountingEngine<F>,
    state: &'a mut VaultState,
    timestamp: u64,
}

impl<'a, F> Session<'a, F> {
    fn new(engine: &'a AccountingEngine<F>, state: &'a mut VaultState, timestamp: u64) -> Self {
        Self {
            engine,
            state,
            timestamp,
        }
    }

    fn call(&self, caller: Address) -> CallContext {
        CallContext::new(caller, self.timestamp)
    }
}

impl<F: PriceFeed> VaultEntry for Session<'_, F> {
    fn deposit_native(
        &mut self,
        gateway: &mut dyn TransferGateway,
        caller: Address,
        amount: u128,
    ) -> VaultResult<Receipt> {
        let call = self.call(caller);
        self.engine.deposit_native(self.state, gateway, call, amount)
    }

    fn deposit_token(
        &mut self,
        gateway: &mut dyn TransferGateway,
        caller: Address,
        amount: u64,
    ) -> VaultResult<Receipt> {
        let call = self.call(caller);
        self.engine.deposit_token(self.state, gateway, call, amount)
    }

    fn withdraw_native(
        &mut self,
        gateway: &mut dyn TransferGateway,
        caller: Address,
        amount_usd: u64,
    ) -> VaultResult<Receipt> {
        let call = self.call(caller);
        self.engine.withdraw_native(self.state, gateway, call, amount_usd)
    }

    fn withdraw_token(
        &mut self,
        gateway: &mut dyn TransferGateway,
        caller: Address,
        amount: u64,
    ) -> VaultResult<Receipt> {
        let call = self.call(caller);
        self.engine.withdraw_token(self.state, gateway, call, amount)
    }

    fn balance_of(&self, account: &Address, asset: AssetKind) -> u64 {
        self.state.ledger.balance_of(account, asset)
    }

    fn total_deposits_usd(&self) -> u64 {
        self.state.ledger.total_deposited()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use usdvault_common::{FeedError, RoundData};

    const OWNER: Address = [1u8; 32];
    const TOKEN: Address = [2u8; 32];
    const ORACLE: Address = [3u8; 32];
    const ALICE: Address = [4u8; 32];
    const NOW: u64 = 1_700_000_000;
    const PRICE: i128 = 395_614_000_000;

    struct FixedFeed;

    impl PriceFeed for FixedFeed {
        fn address(&self) -> Address {
            ORACLE
        }

        fn decimals(&self) -> u8 {
            8
        }

        fn latest_round_data(&self) -> Result<RoundData, FeedError> {
            Ok(RoundData {
                answer: PRICE,
                updated_at: NOW,
            })
        }
    }

    /// Gateway that records calls and never re-enters
    #[derive(Default)]
    struct RecordingGateway {
        fail: bool,
        calls: Vec<&'static str>,
    }

    impl RecordingGateway {
        fn outcome(&mut self, name: &'static str) -> Result<(), TransferError> {
            self.calls.push(name);
            if self.fail {
                Err(TransferError::Rejected)
            } else {
                Ok(())
            }
        }
    }

    impl TransferGateway for RecordingGateway {
        fn accept_native(
            &mut self,
            vault: &mut dyn VaultEntry,
            from: Address,
            _amount: u128,
        ) -> Result<(), TransferError> {
            // The credit is already visible while value moves.
            assert!(vault.balance_of(&from, AssetKind::Native) > 0);
            self.outcome("accept_native")
        }

        fn send_native(
            &mut self,
            _vault: &mut dyn VaultEntry,
            _to: Address,
            _amount: u128,
        ) -> Result<(), TransferError> {
            self.outcome("send_native")
        }

        fn pull_token(
            &mut self,
            _vault: &mut dyn VaultEntry,
            _from: Address,
            _amount: u64,
        ) -> Result<(), TransferError> {
            self.outcome("pull_token")
        }

        fn send_token(
            &mut self,
            _vault: &mut dyn VaultEntry,
            _to: Address,
            _amount: u64,
        ) -> Result<(), TransferError> {
            self.outcome("send_token")
        }

        fn native_balance(&self) -> u128 {
            0
        }

        fn token_balance(&self) -> u64 {
            0
        }
    }

    fn engine() -> AccountingEngine<FixedFeed> {
        let config = VaultConfig::new(OWNER, TOKEN, ORACLE, 1_000_000_000, 10_000_000_000).unwrap();
        AccountingEngine::new(config, PriceOracleAdapter::new(FixedFeed).unwrap()).unwrap()
    }

    fn call() -> CallContext {
        CallContext::new(ALICE, NOW)
    }

    #[test]
    fn test_oracle_must_match_config() {
        let config = VaultConfig::new(OWNER, TOKEN, [9u8; 32], 1, 1).unwrap();
        let result = AccountingEngine::new(config, PriceOracleAdapter::new(FixedFeed).unwrap());
        assert!(matches!(
            result,
            Err(VaultError::InvalidConfig { param: "oracle", .. })
        ));
    }

    #[test]
    fn test_deposit_native_credits_converted_value() {
        let engine = engine();
        let mut state = VaultState::new();
        let mut gateway = RecordingGateway::default();

        let receipt = engine
            .deposit_native(&mut state, &mut gateway, call(), 10_000_000_000_000_000)
            .unwrap();

        assert_eq!(receipt.unit_value, 39_561_400);
        assert_eq!(state.ledger().balance_of(&ALICE, AssetKind::Native), 39_561_400);
        assert_eq!(state.ledger().deposit_count(), 1);
        assert_eq!(state.events().len(), 1);
        assert_eq!(gateway.calls, vec!["accept_native"]);
        assert!(state.is_settled());
    }

    #[test]
    fn test_rejected_deposit_never_reaches_gateway() {
        let engine = engine();
        let mut state = VaultState::new();
        let mut gateway = RecordingGateway::default();

        let result = engine.deposit_token(&mut state, &mut gateway, call(), 10_000_000_001);

        assert!(matches!(result, Err(VaultError::BankCapExceeded { .. })));
        assert!(gateway.calls.is_empty());
        assert_eq!(state.ledger(), &Ledger::new());
    }

    #[test]
    fn test_failed_pull_rolls_back_credit() {
        let engine = engine();
        let mut state = VaultState::new();
        let mut gateway = RecordingGateway {
            fail: true,
            ..Default::default()
        };
        let before = state.ledger().state_root();

        let result = engine.deposit_token(&mut state, &mut gateway, call(), 5_000_000);

        assert_eq!(result, Err(VaultError::TransferFailed { recipient: ALICE }));
        assert_eq!(state.ledger().state_root(), before);
        assert!(state.events().is_empty());
        assert!(state.is_settled());
    }

    #[test]
    fn test_failed_payout_restores_balance() {
        let engine = engine();
        let mut state = VaultState::new();
        let mut gateway = RecordingGateway::default();
        engine.deposit_token(&mut state, &mut gateway, call(), 5_000_000).unwrap();
        let before = state.ledger().state_root();

        gateway.fail = true;
        let result = engine.withdraw_token(&mut state, &mut gateway, call(), 2_000_000);

        assert_eq!(result, Err(VaultError::TransferFailed { recipient: ALICE }));
        assert_eq!(state.ledger().state_root(), before);
        assert_eq!(state.ledger().withdrawal_count(), 0);
        assert_eq!(state.events().len(), 1);
    }

    #[test]
    fn test_withdraw_checks_in_order() {
        let engine = engine();
        let mut state = VaultState::new();
        let mut gateway = RecordingGateway::default();

        assert_eq!(
            engine.withdraw_native(&mut state, &mut gateway, call(), 0),
            Err(VaultError::WithdrawalAmountZero)
        );
        assert!(matches!(
            engine.withdraw_native(&mut state, &mut gateway, call(), 1_000_000_001),
            Err(VaultError::WithdrawalThresholdExceeded { .. })
        ));
        assert!(matches!(
            engine.withdraw_native(&mut state, &mut gateway, call(), 1),
            Err(VaultError::InsufficientBalance { available: 0, .. })
        ));
        assert!(gateway.calls.is_empty());
    }

    #[test]
    fn test_withdraw_native_pays_converted_amount() {
        let engine = engine();
        let mut state = VaultState::new();
        let mut gateway = RecordingGateway::default();
        engine
            .deposit_native(&mut state, &mut gateway, call(), 10_000_000_000_000_000)
            .unwrap();

        let receipt = engine
            .withdraw_native(&mut state, &mut gateway, call(), 39_561_400)
            .unwrap();

        // Round trip never pays out more than was deposited.
        assert!(receipt.native_amount <= 10_000_000_000_000_000);
        assert_eq!(state.ledger().total_deposited(), 0);
        assert_eq!(state.ledger().withdrawal_count(), 1);
    }

    #[test]
    fn test_spendable_excludes_unsettled_credit() {
        let mut state = VaultState::new();
        state.ledger.credit(ALICE, AssetKind::Native, 100).unwrap();
        state.lock_unsettled((ALICE, AssetKind::Native), 60);
        assert_eq!(state.spendable(&ALICE, AssetKind::Native), 40);

        state.release_unsettled((ALICE, AssetKind::Native), 60);
        assert_eq!(state.spendable(&ALICE, AssetKind::Native), 100);
        assert!(state.is_settled());
    }

    #[test]
    fn test_reserved_outflow_counts_against_cap() {
        let engine = engine();
        let mut state = VaultState::new();
        state.reserve_outflow(10_000_000_000);

        let result = engine.check_cap(&state, 1);
        assert_eq!(
            result,
            Err(VaultError::BankCapExceeded {
                current_total: 10_000_000_000,
                attempted: 1,
                cap: 10_000_000_000,
            })
        );
    }
}
