//! Gas refill treasury.
//!
//! Keeps bot accounts supplied with native currency. Wrapped native held by
//! the fee holder is used first; when it is short, the reserve asset is
//! converted through the exchange collaborator. The owner can also withdraw
//! and approve fees accumulated by the fee holder.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::RefillPolicy;
use crate::error::TreasuryError;
use crate::port::{ReserveExchange, TreasuryLedger};

/// Where the native currency of a refill came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillSource {
    /// Unwrapped from the fee holder's wrapped-native balance.
    WrappedReserve,
    /// Bought with `spent` units of the reserve asset.
    ReserveConversion { spent: U256 },
}

/// Record of a completed refill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefillReceipt {
    pub recipient: Address,
    pub amount: U256,
    pub source: RefillSource,
}

pub struct GasRefillTreasury {
    policy: RwLock<RefillPolicy>,
    ledger: Arc<dyn TreasuryLedger>,
    exchange: Arc<dyn ReserveExchange>,
    /// Serializes refills against the shared reserve.
    refill_guard: Mutex<()>,
}

impl GasRefillTreasury {
    pub fn new(
        policy: RefillPolicy,
        ledger: Arc<dyn TreasuryLedger>,
        exchange: Arc<dyn ReserveExchange>,
    ) -> Self {
        Self {
            policy: RwLock::new(policy),
            ledger,
            exchange,
            refill_guard: Mutex::new(()),
        }
    }

    /// Current policy snapshot.
    #[must_use]
    pub fn policy(&self) -> RefillPolicy {
        self.policy.read().clone()
    }

    /// Send `amount` of native currency to `recipient`.
    ///
    /// # Errors
    ///
    /// Authorization, cap and recipient checks fail with
    /// [`TreasuryError::Unauthorized`], [`TreasuryError::CapExceeded`] and
    /// [`TreasuryError::RecipientNotAllowed`] before anything moves. A failed
    /// conversion is [`TreasuryError::ConversionFailed`] and a failed delivery
    /// is [`TreasuryError::Transport`]; neither spends the reserve.
    pub async fn refill(
        &self,
        caller: Address,
        amount: U256,
        recipient: Address,
    ) -> Result<RefillReceipt, TreasuryError> {
        let policy = self.policy();
        check_request(&policy, caller, amount, recipient)?;

        let _guard = self.refill_guard.lock().await;
        self.refill_locked(&policy, amount, recipient).await
    }

    /// Refill `recipient` up to the threshold balance, clipped to the cap.
    /// Returns `None` when the recipient is already at or above threshold.
    ///
    /// # Errors
    ///
    /// Same as [`Self::refill`].
    pub async fn top_up(
        &self,
        caller: Address,
        recipient: Address,
    ) -> Result<Option<RefillReceipt>, TreasuryError> {
        let policy = self.policy();
        authorize(&policy, caller)?;

        // The shortfall must be read under the guard or two top-ups overfill.
        let _guard = self.refill_guard.lock().await;
        let balance = self.ledger.native_balance(recipient).await?;
        let Some(amount) = policy.top_up_amount(balance) else {
            debug!(recipient = %recipient, balance = %balance, "No top-up needed");
            return Ok(None);
        };
        check_request(&policy, caller, amount, recipient)?;
        self.refill_locked(&policy, amount, recipient).await.map(Some)
    }

    /// Caller must hold `refill_guard`.
    async fn refill_locked(
        &self,
        policy: &RefillPolicy,
        amount: U256,
        recipient: Address,
    ) -> Result<RefillReceipt, TreasuryError> {
        let wrapped = self
            .ledger
            .token_balance(policy.wrapped_native, policy.fee_holder)
            .await?;

        let source = if wrapped >= amount {
            self.ledger
                .refill_from_wrapped(policy.wrapped_native, policy.fee_holder, recipient, amount)
                .await?;
            RefillSource::WrappedReserve
        } else {
            debug!(
                wrapped = %wrapped,
                amount = %amount,
                reserve = %policy.reserve_asset,
                "Wrapped reserve short, converting reserve asset"
            );
            let spent = self
                .exchange
                .convert_and_send(policy.reserve_asset, policy.fee_holder, recipient, amount)
                .await
                .map_err(|e| {
                    warn!(error = %e, amount = %amount, "Reserve conversion failed");
                    TreasuryError::ConversionFailed {
                        reason: e.to_string(),
                    }
                })?;
            RefillSource::ReserveConversion { spent }
        };

        info!(
            recipient = %recipient,
            amount = %amount,
            source = ?source,
            "Refill sent"
        );
        Ok(RefillReceipt {
            recipient,
            amount,
            source,
        })
    }

    /// Withdraw `asset` held by the fee holder. An `amount` of zero withdraws
    /// the whole balance. Returns the amount moved.
    ///
    /// # Errors
    ///
    /// [`TreasuryError::NotOwner`] unless `caller` owns the treasury.
    pub async fn withdraw_token(
        &self,
        caller: Address,
        asset: Address,
        to: Address,
        amount: U256,
    ) -> Result<U256, TreasuryError> {
        let policy = self.owner_policy(caller)?;
        let _guard = self.refill_guard.lock().await;

        let amount = if amount.is_zero() {
            self.ledger.token_balance(asset, policy.fee_holder).await?
        } else {
            amount
        };
        self.ledger
            .transfer_token(asset, policy.fee_holder, to, amount)
            .await?;
        info!(asset = %asset, to = %to, amount = %amount, "Fee holder token withdrawn");
        Ok(amount)
    }

    /// Withdraw native currency held by the fee holder. An `amount` of zero
    /// withdraws the whole balance. Returns the amount moved.
    ///
    /// # Errors
    ///
    /// [`TreasuryError::NotOwner`] unless `caller` owns the treasury.
    pub async fn withdraw_native(
        &self,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<U256, TreasuryError> {
        let policy = self.owner_policy(caller)?;
        let _guard = self.refill_guard.lock().await;

        let amount = if amount.is_zero() {
            self.ledger.native_balance(policy.fee_holder).await?
        } else {
            amount
        };
        self.ledger
            .transfer_native(policy.fee_holder, to, amount)
            .await?;
        info!(to = %to, amount = %amount, "Fee holder native withdrawn");
        Ok(amount)
    }

    /// Let `spender` pull up to `amount` of `asset` from the fee holder.
    ///
    /// # Errors
    ///
    /// [`TreasuryError::NotOwner`] unless `caller` owns the treasury.
    pub async fn approve_address(
        &self,
        caller: Address,
        asset: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), TreasuryError> {
        let policy = self.owner_policy(caller)?;
        self.ledger
            .approve_from(asset, policy.fee_holder, spender, amount)
            .await?;
        info!(asset = %asset, spender = %spender, amount = %amount, "Fee holder approval set");
        Ok(())
    }

    /// # Errors
    ///
    /// [`TreasuryError::NotOwner`] unless `caller` owns the treasury.
    pub fn set_authorized_caller(
        &self,
        caller: Address,
        new_caller: Address,
    ) -> Result<(), TreasuryError> {
        self.update(caller, |policy| policy.authorized_caller = new_caller)
    }

    /// Enable or disable an additional bot as a refill recipient.
    ///
    /// # Errors
    ///
    /// [`TreasuryError::NotOwner`] unless `caller` owns the treasury.
    pub fn set_additional_bot(
        &self,
        caller: Address,
        bot: Address,
        enabled: bool,
    ) -> Result<(), TreasuryError> {
        self.update(caller, |policy| {
            if enabled {
                policy.additional_bots.insert(bot);
            } else {
                policy.additional_bots.remove(&bot);
            }
        })
    }

    /// # Errors
    ///
    /// [`TreasuryError::NotOwner`] unless `caller` owns the treasury.
    pub fn set_per_call_cap(&self, caller: Address, cap: U256) -> Result<(), TreasuryError> {
        self.update(caller, |policy| policy.per_call_cap = cap)
    }

    /// # Errors
    ///
    /// [`TreasuryError::NotOwner`] unless `caller` owns the treasury.
    pub fn set_threshold(&self, caller: Address, threshold: U256) -> Result<(), TreasuryError> {
        self.update(caller, |policy| policy.threshold_balance = threshold)
    }

    fn owner_policy(&self, caller: Address) -> Result<RefillPolicy, TreasuryError> {
        let policy = self.policy();
        if caller != policy.owner {
            warn!(caller = %caller, "Treasury admin call from non-owner");
            return Err(TreasuryError::NotOwner { caller });
        }
        Ok(policy)
    }

    fn update(
        &self,
        caller: Address,
        change: impl FnOnce(&mut RefillPolicy),
    ) -> Result<(), TreasuryError> {
        let mut policy = self.policy.write();
        if caller != policy.owner {
            return Err(TreasuryError::NotOwner { caller });
        }
        change(&mut *policy);
        info!(owner = %caller, "Refill policy updated");
        Ok(())
    }
}

fn authorize(policy: &RefillPolicy, caller: Address) -> Result<(), TreasuryError> {
    if caller != policy.authorized_caller {
        warn!(caller = %caller, "Unauthorized refill attempt");
        return Err(TreasuryError::Unauthorized { caller });
    }
    Ok(())
}

fn check_request(
    policy: &RefillPolicy,
    caller: Address,
    amount: U256,
    recipient: Address,
) -> Result<(), TreasuryError> {
    authorize(policy, caller)?;
    if amount > policy.per_call_cap {
        return Err(TreasuryError::CapExceeded {
            requested: amount,
            cap: policy.per_call_cap,
        });
    }
    if !policy.allows_recipient(recipient) {
        return Err(TreasuryError::RecipientNotAllowed { recipient });
    }
    Ok(())
}
