//! Recipe submission and outcome classification.

use std::sync::Arc;

use alloy_primitives::Address;
use tracing::{info, warn};

use crate::domain::{codec, ExecutionOutcome, OutcomeStatus, RecipeUnit};
use crate::error::{ExecutionError, TransportError};
use crate::port::{
    AccountHandle, AccountProvisioning, ExecutionGateway, RawOutcome, Registry, SubmitRequest,
};

/// Registry name of the contract that runs recipes inside the proxy.
pub const RECIPE_EXECUTOR_NAME: &str = "TaskExecutor";

/// Reason used when the environment rejects a unit without one.
const UNKNOWN_REVERT: &str = "execution reverted";

/// Submits recipe units as one atomic call through an execution account.
///
/// Holds no mutable state; independent units may be executed concurrently
/// from clones.
#[derive(Clone)]
pub struct RecipeExecutor {
    gateway: Arc<dyn ExecutionGateway>,
    account: AccountHandle,
    task_executor: Address,
}

impl RecipeExecutor {
    pub fn new(
        gateway: Arc<dyn ExecutionGateway>,
        account: AccountHandle,
        task_executor: Address,
    ) -> Self {
        Self {
            gateway,
            account,
            task_executor,
        }
    }

    /// Resolve the task executor and the owner's execution account.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when either lookup fails.
    pub async fn connect(
        gateway: Arc<dyn ExecutionGateway>,
        registry: &dyn Registry,
        provisioning: &dyn AccountProvisioning,
        owner: Address,
    ) -> Result<Self, TransportError> {
        let task_executor = registry.resolve_address(RECIPE_EXECUTOR_NAME).await?;
        let account = provisioning.get_or_create_execution_account(owner).await?;
        info!(
            owner = %account.owner,
            proxy = %account.proxy,
            task_executor = %task_executor,
            gateway = gateway.gateway_name(),
            "Recipe executor ready"
        );
        Ok(Self::new(gateway, account, task_executor))
    }

    #[must_use]
    pub const fn account(&self) -> AccountHandle {
        self.account
    }

    #[must_use]
    pub const fn task_executor(&self) -> Address {
        self.task_executor
    }

    /// Submit `unit` with `gas_ceiling` as the gas limit.
    ///
    /// Reverts and out-of-gas are outcomes, not errors: the caller decides
    /// what to do with them and nothing here retries.
    ///
    /// # Errors
    ///
    /// [`ExecutionError::CeilingBelowEstimate`] before any submission, or
    /// [`ExecutionError::Transport`] when the submission itself failed.
    pub async fn execute(
        &self,
        unit: &RecipeUnit,
        gas_ceiling: u64,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        if gas_ceiling < unit.gas_estimate() {
            return Err(ExecutionError::CeilingBelowEstimate {
                estimate: unit.gas_estimate(),
                ceiling: gas_ceiling,
            });
        }

        let request = SubmitRequest {
            account: self.account,
            target: self.task_executor,
            payload: codec::encode(unit),
            gas_limit: gas_ceiling,
        };
        let raw = self.gateway.submit(request).await.map_err(|e| {
            warn!(recipe = %unit.name(), error = %e, "Recipe submission failed");
            e
        })?;

        let outcome = classify(raw, gas_ceiling);
        match outcome.status() {
            OutcomeStatus::Success => info!(
                recipe = %unit.name(),
                actions = unit.len(),
                gas_used = outcome.gas_used(),
                "Recipe executed"
            ),
            OutcomeStatus::Reverted { reason } => warn!(
                recipe = %unit.name(),
                reason = %reason,
                gas_used = outcome.gas_used(),
                "Recipe reverted"
            ),
            OutcomeStatus::OutOfGas => warn!(
                recipe = %unit.name(),
                gas_used = outcome.gas_used(),
                ceiling = gas_ceiling,
                "Recipe ran out of gas"
            ),
        }
        Ok(outcome)
    }
}

fn classify(raw: RawOutcome, gas_ceiling: u64) -> ExecutionOutcome {
    let status = if raw.succeeded {
        OutcomeStatus::Success
    } else if raw.gas_used >= gas_ceiling {
        OutcomeStatus::OutOfGas
    } else {
        OutcomeStatus::Reverted {
            reason: raw
                .revert_reason
                .unwrap_or_else(|| UNKNOWN_REVERT.to_string()),
        }
    };
    ExecutionOutcome::new(status, raw.gas_used, raw.emitted_data, raw.tx_hash)
}

impl ExecutionOutcome {
    /// Turn a non-successful outcome into its terminal error.
    ///
    /// # Errors
    ///
    /// [`ExecutionError::Reverted`] or [`ExecutionError::OutOfGas`].
    pub fn into_result(self, gas_ceiling: u64) -> Result<Self, ExecutionError> {
        match self.status().clone() {
            OutcomeStatus::Success => Ok(self),
            OutcomeStatus::Reverted { reason } => Err(ExecutionError::Reverted { reason }),
            OutcomeStatus::OutOfGas => Err(ExecutionError::OutOfGas {
                gas_used: self.gas_used(),
                ceiling: gas_ceiling,
            }),
        }
    }
}
