//! Price feed read paths.

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::domain::RoundData;
use crate::error::TransportError;

/// Registry mapping base/quote pairs to feed contracts.
#[async_trait]
pub trait FeedRegistry: Send + Sync {
    async fn get_feed(&self, base: Address, quote: Address) -> Result<Address, TransportError>;
}

/// Direct aggregator reads.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn latest_round(&self, feed: Address) -> Result<RoundData, TransportError>;
}
