//! Price Oracle Feed
//!
//! Native/USD price feed for the usdvault protocol, answering with 8
//! decimals. Uses a trusted operator model: one operator submits answers,
//! one admin can replace the operator.
//!
//! The vault consumes this feed only through the `PriceFeed` capability,
//! so any external feed with the same shape can stand in for it.
//!
//! ## Update Rules
//!
//! - Only the operator submits answers
//! - Answers must be positive and inside a reasonable band
//! - Consecutive answers may not deviate more than `MAX_PRICE_DEVIATION_BPS`
//! - Timestamps never go backwards

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use usdvault_common::{
    access_control::is_authorized, constants::decimals, short_hex, Address, FeedError, PriceFeed,
    RoundData,
};

// ============ Constants ============

/// Maximum change between consecutive answers (BPS)
pub const MAX_PRICE_DEVIATION_BPS: u64 = 2_000; // 20%

/// Lowest accepted answer ($1)
pub const MIN_REASONABLE_PRICE: u64 = 1_00000000;

/// Highest accepted answer ($10,000,000)
pub const MAX_REASONABLE_PRICE: u64 = 10_000_000_00000000;

// ============ Errors ============

/// Rejected feed updates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedUpdateError {
    #[error("caller {} is not the operator", short_hex(.actual))]
    NotOperator { actual: Address },

    #[error("only the admin can change the operator")]
    AdminOnly,

    #[error("feed is inactive")]
    Inactive,

    #[error("price {price} outside accepted band")]
    OutOfRange { price: u64 },

    #[error("price moved {deviation_bps} bps, limit {max_deviation_bps} bps")]
    Deviation { deviation_bps: u64, max_deviation_bps: u64 },

    #[error("timestamp {timestamp} precedes last update {last_update}")]
    TimestampRegression { timestamp: u64, last_update: u64 },

    #[error("new operator is the current operator")]
    SameOperator,
}

pub type FeedUpdateResult<T> = Result<T, FeedUpdateError>;

// ============ Events ============

/// Feed notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum FeedEvent {
    PriceUpdated { old_price: u64, new_price: u64, timestamp: u64 },
    OperatorChanged { old_operator: Address, new_operator: Address },
}

// ============ Actions ============

/// Feed operations, for action-based dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum FeedAction {
    UpdatePrice { price: u64, timestamp: u64 },
    SetOperator { operator: Address },
    SetActive { active: bool },
}

// ============ Feed State ============

/// Operator-fed price feed state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct OperatorFeed {
    /// Feed identity
    pub address: Address,
    /// Latest answer (8 decimals); zero until the first update
    pub price: u64,
    /// Timestamp of the latest answer; zero until the first update
    pub updated_at: u64,
    /// Authorized operator (can update price)
    pub operator: Address,
    /// Admin (can change operator, toggle the feed)
    pub admin: Address,
    /// Whether the feed answers at all
    pub is_active: bool,
    /// Emitted notifications
    pub events: Vec<FeedEvent>,
}

impl OperatorFeed {
    /// Create a feed with no answer yet
    pub fn new(address: Address, admin: Address, operator: Address) -> Self {
        Self {
            address,
            price: 0,
            updated_at: 0,
            operator,
            admin,
            is_active: true,
            events: Vec::new(),
        }
    }

    /// Create a feed seeded with an initial answer
    pub fn with_price(
        address: Address,
        admin: Address,
        operator: Address,
        price: u64,
        updated_at: u64,
    ) -> Self {
        let mut feed = Self::new(address, admin, operator);
        feed.price = price;
        feed.updated_at = updated_at;
        feed
    }

    /// Dispatch an action on behalf of `signer`
    pub fn execute(&mut self, signer: Address, action: &FeedAction) -> FeedUpdateResult<()> {
        match action {
            FeedAction::UpdatePrice { price, timestamp } => {
                self.update_price(signer, *price, *timestamp)
            }
            FeedAction::SetOperator { operator } => self.set_operator(signer, *operator),
            FeedAction::SetActive { active } => self.set_active(signer, *active),
        }
    }

    /// Submit a new answer
    pub fn update_price(&mut self, signer: Address, price: u64, timestamp: u64) -> FeedUpdateResult<()> {
        // 1. Only operator can update price
        if !is_authorized(&signer, &self.operator) {
            return Err(FeedUpdateError::NotOperator { actual: signer });
        }

        // 2. Feed must be active
        if !self.is_active {
            return Err(FeedUpdateError::Inactive);
        }

        // 3. Price must be inside the band
        if !validate_price_format(price) {
            return Err(FeedUpdateError::OutOfRange { price });
        }

        // 4. Check deviation against the previous answer
        let old_price = self.price;
        if old_price != 0 {
            let deviation_bps = calculate_price_deviation(old_price, price);
            if deviation_bps > MAX_PRICE_DEVIATION_BPS {
                return Err(FeedUpdateError::Deviation {
                    deviation_bps,
                    max_deviation_bps: MAX_PRICE_DEVIATION_BPS,
                });
            }
        }

        // 5. Time only moves forward
        if timestamp < self.updated_at {
            return Err(FeedUpdateError::TimestampRegression {
                timestamp,
                last_update: self.updated_at,
            });
        }

        self.price = price;
        self.updated_at = timestamp;

        info!(old_price, new_price = price, timestamp, "feed price updated");
        self.events.push(FeedEvent::PriceUpdated {
            old_price,
            new_price: price,
            timestamp,
        });
        Ok(())
    }

    /// Replace the operator (admin only)
    pub fn set_operator(&mut self, signer: Address, new_operator: Address) -> FeedUpdateResult<()> {
        // 1. Only admin can change operator
        if !is_authorized(&signer, &self.admin) {
            return Err(FeedUpdateError::AdminOnly);
        }

        // 2. New operator must be different
        if new_operator == self.operator {
            return Err(FeedUpdateError::SameOperator);
        }

        let old_operator = self.operator;
        self.operator = new_operator;
        self.events.push(FeedEvent::OperatorChanged {
            old_operator,
            new_operator,
        });
        Ok(())
    }

    /// Switch the feed on or off (admin only)
    pub fn set_active(&mut self, signer: Address, active: bool) -> FeedUpdateResult<()> {
        if !is_authorized(&signer, &self.admin) {
            return Err(FeedUpdateError::AdminOnly);
        }
        self.is_active = active;
        Ok(())
    }
}

impl PriceFeed for OperatorFeed {
    fn address(&self) -> Address {
        self.address
    }

    fn decimals(&self) -> u8 {
        decimals::PRICE
    }

    fn latest_round_data(&self) -> Result<RoundData, FeedError> {
        if !self.is_active {
            return Err(FeedError::Inactive);
        }
        if self.updated_at == 0 {
            return Err(FeedError::NoData);
        }
        Ok(RoundData {
            answer: self.price as i128,
            updated_at: self.updated_at,
        })
    }
}

// ============ Helper Functions ============

/// Calculate price deviation in basis points
///
/// 100 bps = 1%, 10000 bps = 100%
pub fn calculate_price_deviation(old_price: u64, new_price: u64) -> u64 {
    if old_price == 0 {
        return 10000; // 100% if no previous price
    }

    let diff = old_price.abs_diff(new_price);

    // diff <= max(old, new), so diff * 10000 fits u128
    let deviation = (diff as u128 * 10000) / old_price as u128;
    deviation.min(u64::MAX as u128) as u64
}

/// Validate price is inside the accepted band (8 decimals)
pub fn validate_price_format(price: u64) -> bool {
    (MIN_REASONABLE_PRICE..=MAX_REASONABLE_PRICE).contains(&price)
}

// ============ Tests ============
