//! Oracle Module
//!
//! Wraps a single external native/USD price feed and turns its raw answer
//! into a validated [`PriceQuote`].
//!
//! ## Validation
//!
//! - **Positivity**: a non-positive answer is rejected
//! - **Timestamp sanity**: an unset or future `updated_at` is rejected
//! - **Staleness**: an answer older than the heartbeat is rejected
//!
//! Quotes are never cached. Every call re-queries the feed, and a rejected
//! quote aborts the calling operation without retry.

use thiserror::Error;
use tracing::{trace, warn};

use crate::constants::{decimals, oracle::HEARTBEAT_SECS};
use crate::errors::{VaultError, VaultResult};
use crate::types::{Address, PriceQuote, RoundData};

// ============================================================================
// Capability
// ============================================================================

/// Failure reported by a feed before any answer is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FeedError {
    /// Feed has never received an answer
    #[error("feed has no answer yet")]
    NoData,
    /// Feed is switched off
    #[error("feed is inactive")]
    Inactive,
}

/// An external price source for one asset pair
pub trait PriceFeed {
    /// Identity of the feed contract
    fn address(&self) -> Address;

    /// Decimals of the reported answer
    fn decimals(&self) -> u8;

    /// Latest `(answer, updated_at)` pair
    fn latest_round_data(&self) -> Result<RoundData, FeedError>;
}

// ============================================================================
// Adapter
// ============================================================================

/// Validating wrapper around a [`PriceFeed`]
#[derive(Debug, Clone)]
pub struct PriceOracleAdapter<F> {
    feed: F,
    heartbeat: u64,
}

impl<F: PriceFeed> PriceOracleAdapter<F> {
    /// Wrap a feed with the protocol heartbeat.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the feed does not report 8-decimal prices.
    pub fn new(feed: F) -> VaultResult<Self> {
        Self::with_heartbeat(feed, HEARTBEAT_SECS)
    }

    /// Wrap a feed with a custom heartbeat (seconds)
    pub fn with_heartbeat(feed: F, heartbeat: u64) -> VaultResult<Self> {
        if feed.decimals() != decimals::PRICE {
            return Err(VaultError::InvalidConfig {
                param: "oracle",
                reason: "feed must report 8-decimal prices",
            });
        }
        if heartbeat == 0 {
            return Err(VaultError::InvalidConfig {
                param: "heartbeat",
                reason: "must be positive",
            });
        }
        Ok(Self { feed, heartbeat })
    }

    /// Fetch and validate a fresh quote.
    ///
    /// # Errors
    /// - `OracleUnavailable` if the feed cannot answer
    /// - `OracleInvalidPrice` if the answer is not positive
    /// - `OracleInvalidTimestamp` if `updated_at` is unset or in the future
    /// - `OracleStalePrice` if the answer is older than the heartbeat
    pub fn get_asset_price(&self, now: u64) -> VaultResult<PriceQuote> {
        let round = self.feed.latest_round_data().map_err(|err| {
            warn!(%err, "price feed unavailable");
            VaultError::OracleUnavailable
        })?;

        let quote = validate_round(round, now, self.heartbeat).map_err(|err| {
            warn!(code = err.code(), answer = %round.answer, updated_at = round.updated_at, now, "rejected oracle quote");
            err
        })?;

        trace!(price = quote.price, as_of = quote.as_of, "accepted oracle quote");
        Ok(quote)
    }

    pub fn address(&self) -> Address {
        self.feed.address()
    }

    pub fn heartbeat(&self) -> u64 {
        self.heartbeat
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Mutable access to the wrapped feed (operator updates, tests)
    pub fn feed_mut(&mut self) -> &mut F {
        &mut self.feed
    }
}

/// Validate a raw feed answer at time `now`
pub fn validate_round(round: RoundData, now: u64, heartbeat: u64) -> VaultResult<PriceQuote> {
    if round.answer <= 0 {
        return Err(VaultError::OracleInvalidPrice {
            answer: round.answer,
        });
    }

    if round.updated_at == 0 || round.updated_at > now {
        return Err(VaultError::OracleInvalidTimestamp {
            updated_at: round.updated_at,
            now,
        });
    }

    let age = now - round.updated_at;
    if age > heartbeat {
        return Err(VaultError::OracleStalePrice { age, heartbeat });
    }

    let price = u64::try_from(round.answer).map_err(|_| VaultError::Overflow)?;

    Ok(PriceQuote {
        price,
        as_of: round.updated_at,
    })
}

// ============================================================================
// Tests
// ============================================================================
