//! Classified result of submitting a recipe.

use alloy_primitives::{Bytes, B256};

/// How the atomic unit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Every action ran and the effects were committed.
    Success,
    /// The environment rejected the unit; nothing was committed.
    Reverted { reason: String },
    /// Gas consumption reached the ceiling; nothing was committed.
    OutOfGas,
}

/// Outcome of one submission. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    status: OutcomeStatus,
    gas_used: u64,
    emitted_data: Bytes,
    tx_hash: Option<B256>,
}

impl ExecutionOutcome {
    #[must_use]
    pub const fn new(
        status: OutcomeStatus,
        gas_used: u64,
        emitted_data: Bytes,
        tx_hash: Option<B256>,
    ) -> Self {
        Self {
            status,
            gas_used,
            emitted_data,
            tx_hash,
        }
    }

    #[must_use]
    pub const fn status(&self) -> &OutcomeStatus {
        &self.status
    }

    #[must_use]
    pub const fn gas_used(&self) -> u64 {
        self.gas_used
    }

    /// Data emitted by the unit (return values or logs, gateway dependent).
    #[must_use]
    pub const fn emitted_data(&self) -> &Bytes {
        &self.emitted_data
    }

    #[must_use]
    pub const fn tx_hash(&self) -> Option<B256> {
        self.tx_hash
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success)
    }

    #[must_use]
    pub const fn is_reverted(&self) -> bool {
        matches!(self.status, OutcomeStatus::Reverted { .. })
    }

    #[must_use]
    pub const fn is_out_of_gas(&self) -> bool {
        matches!(self.status, OutcomeStatus::OutOfGas)
    }
}
