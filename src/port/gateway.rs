//! Execution gateway port.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;

use super::chain::AccountHandle;
use crate::error::TransportError;

/// One atomic submission: `account.proxy` calls `target` with `payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub account: AccountHandle,
    pub target: Address,
    pub payload: Bytes,
    pub gas_limit: u64,
}

/// Unclassified record of what the environment did with a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutcome {
    /// True when the transaction was included and did not revert.
    pub succeeded: bool,
    pub gas_used: u64,
    /// Revert reason, when the environment reported one.
    pub revert_reason: Option<String>,
    pub emitted_data: Bytes,
    pub tx_hash: Option<B256>,
}

/// Submits payloads and waits for inclusion or rejection.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    async fn submit(&self, request: SubmitRequest) -> Result<RawOutcome, TransportError>;

    /// Gateway name for logging/debugging.
    fn gateway_name(&self) -> &'static str;
}
