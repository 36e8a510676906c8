//! Integration tests for the gas refill treasury over the sandbox ledger.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use vaultsmith::error::TreasuryError;
use vaultsmith::port::Balances;
use vaultsmith::service::{GasRefillTreasury, RefillSource};
use vaultsmith::testkit::domain::{
    refill_policy, wad, DAI, FEE_HOLDER, OPERATOR, REFILL_CALLER, TREASURY_OWNER, WETH,
};
use vaultsmith::testkit::Sandbox;

/// Tenths of one wad.
fn tenths(n: u64) -> U256 {
    wad(n) / U256::from(10u64)
}

fn setup() -> (Arc<Sandbox>, GasRefillTreasury) {
    let sandbox = Arc::new(Sandbox::new());
    let treasury = GasRefillTreasury::new(refill_policy(), sandbox.clone(), sandbox.clone());
    (sandbox, treasury)
}

#[tokio::test]
async fn unauthorized_caller_moves_nothing() {
    let (sandbox, treasury) = setup();
    sandbox.fund(WETH, FEE_HOLDER, wad(2));
    sandbox.fund(DAI, FEE_HOLDER, wad(5_000));
    let stranger = Address::repeat_byte(0x99);

    let err = treasury
        .refill(stranger, tenths(1), OPERATOR)
        .await
        .unwrap_err();

    assert_eq!(err, TreasuryError::Unauthorized { caller: stranger });
    assert_eq!(sandbox.balance(WETH, FEE_HOLDER), wad(2));
    assert_eq!(sandbox.balance(DAI, FEE_HOLDER), wad(5_000));
    assert_eq!(sandbox.native(OPERATOR), U256::ZERO);
}

#[tokio::test]
async fn wrapped_reserve_is_used_first() {
    let (sandbox, treasury) = setup();
    sandbox.fund(WETH, FEE_HOLDER, wad(1));
    sandbox.fund(DAI, FEE_HOLDER, wad(5_000));

    let receipt = treasury
        .refill(REFILL_CALLER, tenths(3), OPERATOR)
        .await
        .unwrap();

    assert_eq!(receipt.source, RefillSource::WrappedReserve);
    assert_eq!(sandbox.native(OPERATOR), tenths(3));
    assert_eq!(sandbox.balance(WETH, FEE_HOLDER), tenths(7));
    assert_eq!(sandbox.balance(DAI, FEE_HOLDER), wad(5_000));
}

#[tokio::test]
async fn short_wrapped_reserve_converts_exactly_the_amount() {
    let (sandbox, treasury) = setup();
    sandbox.fund(WETH, FEE_HOLDER, tenths(1));
    sandbox.fund(DAI, FEE_HOLDER, wad(5_000));

    let receipt = treasury
        .refill(REFILL_CALLER, tenths(5), OPERATOR)
        .await
        .unwrap();

    assert_eq!(sandbox.native(OPERATOR), tenths(5));
    assert_eq!(
        receipt.source,
        RefillSource::ReserveConversion { spent: wad(1_000) }
    );
    assert_eq!(sandbox.balance(DAI, FEE_HOLDER), wad(4_000));
    assert_eq!(sandbox.balance(WETH, FEE_HOLDER), tenths(1));
}

#[tokio::test]
async fn failed_conversion_sends_nothing() {
    let (sandbox, treasury) = setup();
    sandbox.fund(DAI, FEE_HOLDER, wad(5_000));
    sandbox.fail_conversions(true);

    let err = treasury
        .refill(REFILL_CALLER, tenths(5), OPERATOR)
        .await
        .unwrap_err();

    assert!(matches!(err, TreasuryError::ConversionFailed { .. }));
    assert_eq!(sandbox.native(OPERATOR), U256::ZERO);
    assert_eq!(sandbox.balance(DAI, FEE_HOLDER), wad(5_000));
}

#[tokio::test]
async fn amount_above_cap_is_rejected() {
    let (sandbox, treasury) = setup();
    sandbox.fund(WETH, FEE_HOLDER, wad(5));

    let err = treasury
        .refill(REFILL_CALLER, wad(2), OPERATOR)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TreasuryError::CapExceeded {
            requested: wad(2),
            cap: wad(1)
        }
    );

    treasury.set_per_call_cap(TREASURY_OWNER, wad(3)).unwrap();
    treasury
        .refill(REFILL_CALLER, wad(2), OPERATOR)
        .await
        .unwrap();
    assert_eq!(sandbox.native(OPERATOR), wad(2));
}

#[tokio::test]
async fn only_registered_bots_receive_refills() {
    let (sandbox, treasury) = setup();
    sandbox.fund(WETH, FEE_HOLDER, wad(1));
    let bot = Address::repeat_byte(0x42);

    let err = treasury
        .refill(REFILL_CALLER, tenths(1), bot)
        .await
        .unwrap_err();
    assert_eq!(err, TreasuryError::RecipientNotAllowed { recipient: bot });

    treasury
        .set_additional_bot(TREASURY_OWNER, bot, true)
        .unwrap();
    treasury
        .refill(REFILL_CALLER, tenths(1), bot)
        .await
        .unwrap();
    assert_eq!(sandbox.native(bot), tenths(1));

    treasury
        .set_additional_bot(TREASURY_OWNER, bot, false)
        .unwrap();
    assert!(treasury.refill(REFILL_CALLER, tenths(1), bot).await.is_err());
}

#[tokio::test]
async fn policy_changes_require_owner() {
    let (_sandbox, treasury) = setup();

    let err = treasury
        .set_threshold(REFILL_CALLER, wad(9))
        .unwrap_err();
    assert_eq!(
        err,
        TreasuryError::NotOwner {
            caller: REFILL_CALLER
        }
    );
    assert_eq!(treasury.policy(), refill_policy());

    let replacement = Address::repeat_byte(0x77);
    treasury
        .set_authorized_caller(TREASURY_OWNER, replacement)
        .unwrap();
    assert_eq!(treasury.policy().authorized_caller, replacement);
}

#[tokio::test]
async fn top_up_fills_shortfall_once() {
    let (sandbox, treasury) = setup();
    sandbox.fund(WETH, FEE_HOLDER, wad(1));
    sandbox.fund_native(OPERATOR, tenths(2));

    let receipt = treasury
        .top_up(REFILL_CALLER, OPERATOR)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(receipt.amount, tenths(3));
    assert_eq!(sandbox.native(OPERATOR), tenths(5));

    assert_eq!(treasury.top_up(REFILL_CALLER, OPERATOR).await.unwrap(), None);

    treasury.set_threshold(TREASURY_OWNER, wad(3)).unwrap();
    let receipt = treasury
        .top_up(REFILL_CALLER, OPERATOR)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(receipt.amount, wad(1));
}

#[tokio::test]
async fn concurrent_refills_see_each_others_draws() {
    let (sandbox, treasury) = setup();
    sandbox.fund(WETH, FEE_HOLDER, tenths(5));
    sandbox.fund(DAI, FEE_HOLDER, wad(5_000));

    let (first, second) = tokio::join!(
        treasury.refill(REFILL_CALLER, tenths(4), OPERATOR),
        treasury.refill(REFILL_CALLER, tenths(4), OPERATOR),
    );
    let sources = [first.unwrap().source, second.unwrap().source];

    assert_eq!(sandbox.native(OPERATOR), tenths(8));
    assert_eq!(
        sources
            .iter()
            .filter(|s| **s == RefillSource::WrappedReserve)
            .count(),
        1
    );
    assert_eq!(sandbox.balance(WETH, FEE_HOLDER), tenths(1));
    assert_eq!(sandbox.balance(DAI, FEE_HOLDER), wad(4_200));
}

#[tokio::test]
async fn failed_send_keeps_reserve_intact() {
    let (sandbox, treasury) = setup();
    sandbox.fund(WETH, FEE_HOLDER, wad(2));
    sandbox.fund(DAI, FEE_HOLDER, wad(5_000));
    sandbox.fail_native_sends(true);

    let err = treasury
        .refill(REFILL_CALLER, wad(1), OPERATOR)
        .await
        .unwrap_err();
    assert!(matches!(err, TreasuryError::Transport(_)));
    assert_eq!(sandbox.balance(WETH, FEE_HOLDER), wad(2));
    assert_eq!(sandbox.native(OPERATOR), U256::ZERO);

    // Conversion path: the reserve asset is not spent either.
    treasury.set_per_call_cap(TREASURY_OWNER, wad(3)).unwrap();
    let err = treasury
        .refill(REFILL_CALLER, wad(3), OPERATOR)
        .await
        .unwrap_err();
    assert!(matches!(err, TreasuryError::ConversionFailed { .. }));
    assert_eq!(sandbox.balance(DAI, FEE_HOLDER), wad(5_000));
    assert_eq!(sandbox.balance(WETH, FEE_HOLDER), wad(2));

    // Once sends work again the same refill goes through exactly once.
    sandbox.fail_native_sends(false);
    treasury
        .refill(REFILL_CALLER, wad(1), OPERATOR)
        .await
        .unwrap();
    assert_eq!(sandbox.balance(WETH, FEE_HOLDER), wad(1));
    assert_eq!(sandbox.native(OPERATOR), wad(1));
}

#[tokio::test]
async fn concurrent_top_ups_stop_at_threshold() {
    let (sandbox, treasury) = setup();
    sandbox.fund(WETH, FEE_HOLDER, wad(1));
    sandbox.fund_native(OPERATOR, tenths(2));

    let (first, second) = tokio::join!(
        treasury.top_up(REFILL_CALLER, OPERATOR),
        treasury.top_up(REFILL_CALLER, OPERATOR),
    );
    let sent: Vec<_> = [first.unwrap(), second.unwrap()]
        .into_iter()
        .flatten()
        .collect();

    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].amount, tenths(3));
    assert_eq!(sandbox.native(OPERATOR), refill_policy().threshold_balance);
    assert_eq!(sandbox.balance(WETH, FEE_HOLDER), tenths(7));
}

#[tokio::test]
async fn top_up_rejects_unauthorized_caller_even_when_funded() {
    let (sandbox, treasury) = setup();
    sandbox.fund_native(OPERATOR, wad(1));
    let stranger = Address::repeat_byte(0x99);

    let err = treasury.top_up(stranger, OPERATOR).await.unwrap_err();
    assert_eq!(err, TreasuryError::Unauthorized { caller: stranger });
}

#[tokio::test]
async fn owner_withdraws_part_then_whole_token_balance() {
    let (sandbox, treasury) = setup();
    sandbox.fund(WETH, FEE_HOLDER, wad(3));
    let multisig = Address::repeat_byte(0xa7);

    let moved = treasury
        .withdraw_token(TREASURY_OWNER, WETH, multisig, wad(1))
        .await
        .unwrap();
    assert_eq!(moved, wad(1));
    assert_eq!(sandbox.balance(WETH, multisig), wad(1));

    let moved = treasury
        .withdraw_token(TREASURY_OWNER, WETH, multisig, U256::ZERO)
        .await
        .unwrap();
    assert_eq!(moved, wad(2));
    assert_eq!(sandbox.balance(WETH, multisig), wad(3));
    assert_eq!(sandbox.balance(WETH, FEE_HOLDER), U256::ZERO);
}

#[tokio::test]
async fn owner_withdraws_whole_native_balance() {
    let (sandbox, treasury) = setup();
    sandbox.fund_native(FEE_HOLDER, wad(3));
    let multisig = Address::repeat_byte(0xa7);

    treasury
        .withdraw_native(TREASURY_OWNER, multisig, wad(1))
        .await
        .unwrap();
    let moved = treasury
        .withdraw_native(TREASURY_OWNER, multisig, U256::ZERO)
        .await
        .unwrap();

    assert_eq!(moved, wad(2));
    assert_eq!(sandbox.native(multisig), wad(3));
    assert_eq!(sandbox.native(FEE_HOLDER), U256::ZERO);
}

#[tokio::test]
async fn owner_sets_and_clears_fee_holder_approval() {
    let (sandbox, treasury) = setup();
    let spender = Address::repeat_byte(0x55);

    treasury
        .approve_address(TREASURY_OWNER, DAI, spender, U256::MAX)
        .await
        .unwrap();
    assert_eq!(
        sandbox.allowance(DAI, FEE_HOLDER, spender).await.unwrap(),
        U256::MAX
    );

    treasury
        .approve_address(TREASURY_OWNER, DAI, spender, U256::ZERO)
        .await
        .unwrap();
    assert_eq!(
        sandbox.allowance(DAI, FEE_HOLDER, spender).await.unwrap(),
        U256::ZERO
    );
}

#[tokio::test]
async fn fee_withdrawals_require_owner() {
    let (sandbox, treasury) = setup();
    sandbox.fund(WETH, FEE_HOLDER, wad(3));
    sandbox.fund_native(FEE_HOLDER, wad(3));

    let err = treasury
        .withdraw_token(REFILL_CALLER, WETH, REFILL_CALLER, U256::ZERO)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TreasuryError::NotOwner {
            caller: REFILL_CALLER
        }
    );
    assert!(matches!(
        treasury
            .withdraw_native(REFILL_CALLER, REFILL_CALLER, U256::ZERO)
            .await,
        Err(TreasuryError::NotOwner { .. })
    ));
    assert!(matches!(
        treasury
            .approve_address(REFILL_CALLER, WETH, REFILL_CALLER, U256::MAX)
            .await,
        Err(TreasuryError::NotOwner { .. })
    ));

    assert_eq!(sandbox.balance(WETH, FEE_HOLDER), wad(3));
    assert_eq!(sandbox.native(FEE_HOLDER), wad(3));
    assert_eq!(sandbox.native(REFILL_CALLER), U256::ZERO);
}
