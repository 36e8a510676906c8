//! Registry, account and token primitives provided by the chain.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use crate::error::TransportError;

/// Resolves deployed contract addresses by name.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn resolve_address(&self, name: &str) -> Result<Address, TransportError>;
}

/// Proxy account that executes recipes on behalf of its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountHandle {
    pub owner: Address,
    pub proxy: Address,
}

/// Finds or deploys the execution account of an owner.
#[async_trait]
pub trait AccountProvisioning: Send + Sync {
    async fn get_or_create_execution_account(
        &self,
        owner: Address,
    ) -> Result<AccountHandle, TransportError>;
}

/// Token balance and allowance primitives. `approve` acts for the signer.
#[async_trait]
pub trait Balances: Send + Sync {
    async fn balance_of(&self, asset: Address, holder: Address) -> Result<U256, TransportError>;

    async fn allowance(
        &self,
        asset: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, TransportError>;

    async fn approve(
        &self,
        asset: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), TransportError>;
}
