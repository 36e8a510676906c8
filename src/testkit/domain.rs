//! Fixed addresses and builders for domain values used across tests.

use std::collections::BTreeSet;

use alloy_primitives::{address, Address, U256};
use rust_decimal::Decimal;

use crate::domain::amount::WAD;
use crate::domain::{FeedRecord, RefillPolicy};
use crate::service::{LeverageConfig, UserCollateral};

pub const OWNER: Address = address!("00000000000000000000000000000000000000a1");
pub const USER: Address = address!("00000000000000000000000000000000000000a2");
pub const DAI: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");
pub const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
pub const JOIN_ETH: Address = address!("2f0b23f53734252bda2277357e97e1517d6b042a");
pub const MANAGER: Address = address!("5ef30b9986345249bc32d8928b7ee64de9435e39");
pub const TASK_EXECUTOR: Address = address!("00000000000000000000000000000000000000e0");
pub const FLASH_LENDER: Address = address!("00000000000000000000000000000000000000f1");
pub const EXCHANGE_WRAPPER: Address = address!("00000000000000000000000000000000000000e1");

pub const TREASURY_OWNER: Address = address!("00000000000000000000000000000000000000b0");
pub const REFILL_CALLER: Address = address!("00000000000000000000000000000000000000b1");
pub const OPERATOR: Address = address!("00000000000000000000000000000000000000b2");
pub const FEE_HOLDER: Address = address!("00000000000000000000000000000000000000b3");

/// `n` whole units of an 18-decimal asset.
pub fn wad(n: u64) -> U256 {
    U256::from(n) * WAD
}

/// Leveraged ETH-A opening over DAI with the fixture addresses.
pub fn leverage_config(
    principal: U256,
    leverage: Decimal,
    user_collateral: Option<U256>,
) -> LeverageConfig {
    LeverageConfig {
        debt_asset: DAI,
        collateral_asset: WETH,
        join: JOIN_ETH,
        manager: MANAGER,
        lender: FLASH_LENDER,
        exchange_wrapper: EXCHANGE_WRAPPER,
        principal,
        leverage,
        user_collateral: user_collateral.map(|amount| UserCollateral { from: USER, amount }),
    }
}

/// Refill policy over DAI/WETH reserves: cap 1 ETH, threshold 0.5 ETH.
pub fn refill_policy() -> RefillPolicy {
    RefillPolicy {
        owner: TREASURY_OWNER,
        operator_address: OPERATOR,
        authorized_caller: REFILL_CALLER,
        per_call_cap: wad(1),
        reserve_asset: DAI,
        wrapped_native: WETH,
        fee_holder: FEE_HOLDER,
        threshold_balance: WAD / U256::from(2u64),
        additional_bots: BTreeSet::new(),
    }
}

pub fn feed_record(name: &str, base: Address, quote: Address, feed: Address) -> FeedRecord {
    FeedRecord {
        name: name.to_string(),
        base,
        quote,
        expected_feed_address: feed,
        last_known_timestamp: None,
    }
}
