//! Gas refill policy.

use std::collections::BTreeSet;

use alloy_primitives::{Address, U256};

/// Who may refill whom, how much, and from which reserve.
///
/// Created at treasury setup and changed only through owner calls on the
/// treasury; it never expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefillPolicy {
    /// Owner allowed to change the policy.
    pub owner: Address,
    /// Primary bot account kept topped up.
    pub operator_address: Address,
    /// Only account allowed to call `refill`.
    pub authorized_caller: Address,
    /// Maximum native amount per refill call.
    pub per_call_cap: U256,
    /// Asset converted into native currency when the wrapped reserve is short.
    pub reserve_asset: Address,
    /// Wrapped native token (e.g. WETH) drawn first.
    pub wrapped_native: Address,
    /// Account holding the reserves and approving the treasury.
    pub fee_holder: Address,
    /// Native balance below which an operator needs a top-up.
    pub threshold_balance: U256,
    /// Extra bot accounts allowed as refill recipients.
    pub additional_bots: BTreeSet<Address>,
}

impl RefillPolicy {
    /// Whether `recipient` may receive refills.
    #[must_use]
    pub fn allows_recipient(&self, recipient: Address) -> bool {
        recipient == self.operator_address || self.additional_bots.contains(&recipient)
    }

    /// Amount needed to bring `balance` back to the threshold, clipped to the cap.
    /// `None` when no top-up is needed.
    #[must_use]
    pub fn top_up_amount(&self, balance: U256) -> Option<U256> {
        if balance >= self.threshold_balance {
            return None;
        }
        Some((self.threshold_balance - balance).min(self.per_call_cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RefillPolicy {
        RefillPolicy {
            owner: Address::with_last_byte(1),
            operator_address: Address::with_last_byte(2),
            authorized_caller: Address::with_last_byte(3),
            per_call_cap: U256::from(5u64),
            reserve_asset: Address::with_last_byte(4),
            wrapped_native: Address::with_last_byte(5),
            fee_holder: Address::with_last_byte(6),
            threshold_balance: U256::from(8u64),
            additional_bots: BTreeSet::from([Address::with_last_byte(7)]),
        }
    }

    #[test]
    fn recipients_are_operator_or_additional_bots() {
        let policy = policy();
        assert!(policy.allows_recipient(Address::with_last_byte(2)));
        assert!(policy.allows_recipient(Address::with_last_byte(7)));
        assert!(!policy.allows_recipient(Address::with_last_byte(9)));
    }

    #[test]
    fn top_up_is_shortfall_clipped_to_cap() {
        let policy = policy();
        assert_eq!(policy.top_up_amount(U256::from(8u64)), None);
        assert_eq!(policy.top_up_amount(U256::from(6u64)), Some(U256::from(2u64)));
        assert_eq!(policy.top_up_amount(U256::ZERO), Some(U256::from(5u64)));
    }
}
