//! Ledger and exchange collaborators of the refill treasury.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use crate::error::TransportError;

/// Balance reads and value movements performed by the treasury.
///
/// Each mutating method is atomic on its own: it either fully applies or
/// leaves every balance it touches untouched.
#[async_trait]
pub trait TreasuryLedger: Send + Sync {
    async fn native_balance(&self, holder: Address) -> Result<U256, TransportError>;

    async fn token_balance(&self, asset: Address, holder: Address)
        -> Result<U256, TransportError>;

    /// Pull `amount` of `wrapped` from `from`, unwrap it and send the native
    /// currency to `to`.
    async fn refill_from_wrapped(
        &self,
        wrapped: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TransportError>;

    async fn transfer_token(
        &self,
        asset: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TransportError>;

    async fn transfer_native(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TransportError>;

    /// Set the allowance `holder` grants `spender` over `asset`.
    async fn approve_from(
        &self,
        asset: Address,
        holder: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), TransportError>;
}

/// Converts reserve assets into native currency.
#[async_trait]
pub trait ReserveExchange: Send + Sync {
    /// Pull as much `asset` from `from` as needed to buy exactly `native_out`
    /// and deliver it to `to`. Returns the amount of `asset` spent.
    async fn convert_and_send(
        &self,
        asset: Address,
        from: Address,
        to: Address,
        native_out: U256,
    ) -> Result<U256, TransportError>;
}
