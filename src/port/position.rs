//! Read access to vault state.

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::domain::{PositionId, PositionSnapshot};
use crate::error::TransportError;

/// Reads current position state. Implementations must not cache.
#[async_trait]
pub trait PositionReader: Send + Sync {
    async fn read_position(&self, id: PositionId) -> Result<PositionSnapshot, TransportError>;

    /// Positions owned by `owner`, oldest first.
    async fn positions_of(&self, owner: Address) -> Result<Vec<PositionId>, TransportError>;
}
