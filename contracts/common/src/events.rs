//! Vault Events
//!
//! Notifications emitted after an operation has fully succeeded. They can
//! be indexed off-chain for UIs, accounting exports and alerts.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::types::{Address, AssetKind, Receipt};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    DepositCompleted = 0x01,
    WithdrawalCompleted = 0x02,
}

/// Main event enum containing all vault notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum VaultEvent {
    /// Emitted when a deposit is recorded and settled
    DepositCompleted {
        account: Address,
        asset: AssetKind,
        native_amount: u128,
        unit_value: u64,
        timestamp: u64,
    },

    /// Emitted when a withdrawal is recorded and paid out
    WithdrawalCompleted {
        account: Address,
        asset: AssetKind,
        native_amount: u128,
        unit_value: u64,
        timestamp: u64,
    },
}

impl VaultEvent {
    /// Deposit notification for a receipt
    pub fn deposit(receipt: &Receipt, timestamp: u64) -> Self {
        Self::DepositCompleted {
            account: receipt.account,
            asset: receipt.asset,
            native_amount: receipt.native_amount,
            unit_value: receipt.unit_value,
            timestamp,
        }
    }

    /// Withdrawal notification for a receipt
    pub fn withdrawal(receipt: &Receipt, timestamp: u64) -> Self {
        Self::WithdrawalCompleted {
            account: receipt.account,
            asset: receipt.asset,
            native_amount: receipt.native_amount,
            unit_value: receipt.unit_value,
            timestamp,
        }
    }

    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::DepositCompleted { .. } => EventType::DepositCompleted,
            Self::WithdrawalCompleted { .. } => EventType::WithdrawalCompleted,
        }
    }

    /// Account the event concerns
    pub fn account(&self) -> &Address {
        match self {
            Self::DepositCompleted { account, .. } => account,
            Self::WithdrawalCompleted { account, .. } => account,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting events across operations
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<VaultEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: VaultEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Drain all events, leaving the log empty
    pub fn take(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&VaultEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt() -> Receipt {
        Receipt {
            account: [2u8; 32],
            asset: AssetKind::Native,
            native_amount: 10_000_000_000_000_000,
            unit_value: 39_561_400,
        }
    }

    #[test]
    fn test_event_type() {
        let event = VaultEvent::deposit(&receipt(), 100);
        assert_eq!(event.event_type(), EventType::DepositCompleted);
        assert_eq!(event.account(), &[2u8; 32]);

        let event = VaultEvent::withdrawal(&receipt(), 100);
        assert_eq!(event.event_type(), EventType::WithdrawalCompleted);
    }

    #[test]
    fn test_event_serialization() {
        let event = VaultEvent::withdrawal(&receipt(), 200);
        let restored = VaultEvent::from_bytes(&event.to_bytes()).unwrap();
        assert_eq!(event, restored);
    }

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();
        log.emit(VaultEvent::deposit(&receipt(), 1));
        log.emit(VaultEvent::deposit(&receipt(), 2));
        log.emit(VaultEvent::withdrawal(&receipt(), 3));

        assert_eq!(log.len(), 3);
        assert_eq!(log.filter_by_type(EventType::DepositCompleted).len(), 2);

        let drained = log.take();
        assert_eq!(drained.len(), 3);
        assert!(log.is_empty());
    }
}
