//! Flash-loan recipes with a borrow/repay invariant.
//!
//! The orchestrator checks structure only: the unit opens with a flash loan
//! and some later action pays the borrowed output back to the lender.
//! Whether the intervening actions generate enough to repay is left to the
//! environment, where a shortfall surfaces as a reverted outcome.

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::amount::{scaled_from_decimal, WAD, WAD_DECIMALS};
use crate::domain::{
    ActionKind, ActionSpec, BuildError, Literal, RecipeBuilder, RecipeUnit, Value,
};

/// Parameters of a leveraged vault opening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeverageConfig {
    /// Asset that is flash-borrowed and later drawn as debt.
    pub debt_asset: Address,
    /// Asset deposited as collateral.
    pub collateral_asset: Address,
    /// Collateral join adapter of the vault type.
    pub join: Address,
    /// Vault manager contract.
    pub manager: Address,
    /// Flash loan action contract, which also receives the repayment.
    pub lender: Address,
    /// Exchange wrapper used for the swap.
    pub exchange_wrapper: Address,
    /// Position equity, valued in the debt asset.
    pub principal: U256,
    /// Leverage factor, strictly greater than one.
    pub leverage: Decimal,
    /// Collateral the user adds from their own wallet, if any.
    pub user_collateral: Option<UserCollateral>,
}

/// Collateral pulled from the user into the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserCollateral {
    pub from: Address,
    pub amount: U256,
}

/// Amounts derived from a [`LeverageConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeveragePlan {
    /// Amount flash-borrowed: `principal * (leverage - 1)`.
    pub flash_amount: U256,
    /// Total exposure: `principal * leverage`.
    pub target_exposure: U256,
    /// Debt the vault must carry after success (repayment covers at least the borrow).
    pub min_expected_debt: U256,
}

impl LeveragePlan {
    /// Derive the plan.
    ///
    /// # Errors
    ///
    /// [`BuildError::InvalidLeverage`] unless `leverage > 1`.
    pub fn derive(principal: U256, leverage: Decimal) -> Result<Self, BuildError> {
        if leverage <= Decimal::ONE {
            return Err(BuildError::InvalidLeverage { leverage });
        }
        let extra = scaled_from_decimal(leverage - Decimal::ONE, WAD_DECIMALS)
            .ok_or(BuildError::InvalidLeverage { leverage })?;
        let flash_amount = principal.saturating_mul(extra) / WAD;

        Ok(Self {
            flash_amount,
            target_exposure: principal.saturating_add(flash_amount),
            min_expected_debt: flash_amount,
        })
    }
}

/// A leveraged unit together with the plan it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeveragedRecipe {
    pub unit: RecipeUnit,
    pub plan: LeveragePlan,
}

/// Wraps [`RecipeBuilder`] for recipes that start with a flash loan.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlashLoanOrchestrator {
    builder: RecipeBuilder,
}

impl FlashLoanOrchestrator {
    #[must_use]
    pub const fn new(builder: RecipeBuilder) -> Self {
        Self { builder }
    }

    /// Build `actions` and check the borrow/repay structure.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`] from the builder, then
    /// [`BuildError::FlashLoanNotFirst`] or [`BuildError::MissingRepay`].
    pub fn build(
        &self,
        name: impl Into<String>,
        actions: Vec<ActionSpec>,
    ) -> Result<RecipeUnit, BuildError> {
        let unit = self.builder.build(name, actions)?;
        check_borrow_repay(&unit)?;
        Ok(unit)
    }

    /// Emit the leveraged opening sequence for `proxy`:
    /// borrow, swap to collateral, open vault, (pull user collateral),
    /// supply everything, draw debt to repay the lender.
    ///
    /// # Errors
    ///
    /// [`BuildError::InvalidLeverage`] or any structural [`BuildError`].
    pub fn build_leveraged(
        &self,
        name: impl Into<String>,
        config: &LeverageConfig,
        proxy: Address,
    ) -> Result<LeveragedRecipe, BuildError> {
        let plan = LeveragePlan::derive(config.principal, config.leverage)?;

        let mut actions = vec![
            ActionSpec::flash_loan(
                plan.flash_amount.into(),
                config.debt_asset,
                config.lender,
            )
            .with_output("borrowed"),
            ActionSpec::swap(
                config.debt_asset,
                config.collateral_asset,
                plan.flash_amount.into(),
                config.exchange_wrapper,
                proxy,
                proxy,
            )
            .with_output("bought"),
            ActionSpec::open_vault(config.join, config.manager).with_output("vault"),
        ];
        if let Some(user) = config.user_collateral {
            actions.push(ActionSpec::pull_token(
                config.collateral_asset,
                user.from,
                user.amount.into(),
            ));
        }
        actions.push(ActionSpec::supply(
            Value::reference(2),
            U256::MAX.into(),
            config.join,
            proxy,
            config.manager,
        ));
        actions.push(ActionSpec::generate(
            Value::reference(2),
            Value::reference(0),
            config.lender,
            config.manager,
        ));

        let unit = self.build(name, actions)?;
        debug!(
            recipe = %unit.name(),
            flash_amount = %plan.flash_amount,
            min_debt = %plan.min_expected_debt,
            "Leveraged recipe built"
        );
        Ok(LeveragedRecipe { unit, plan })
    }
}

/// Params `(amount, recipient)` of actions that pay funds out of the proxy.
const fn payout_params(kind: ActionKind) -> Option<(usize, usize)> {
    match kind {
        ActionKind::Generate => Some((1, 2)),
        ActionKind::SendToken => Some((2, 1)),
        _ => None,
    }
}

fn check_borrow_repay(unit: &RecipeUnit) -> Result<(), BuildError> {
    let actions = unit.actions();
    let borrow = &actions[0];
    if borrow.kind() != ActionKind::FlashLoan {
        return Err(BuildError::FlashLoanNotFirst {
            found: borrow.kind(),
        });
    }
    let lender = match &borrow.params()[2] {
        Value::Literal(Literal::Address(lender)) => *lender,
        _ => return Err(BuildError::MissingRepay),
    };

    let repaid = actions[1..].iter().any(|action| {
        payout_params(action.kind()).is_some_and(|(amount, recipient)| {
            action.params()[amount] == Value::Reference(0)
                && action.params()[recipient] == Value::address(lender)
        })
    });
    if repaid {
        Ok(())
    } else {
        Err(BuildError::MissingRepay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn config() -> LeverageConfig {
        LeverageConfig {
            debt_asset: addr(0xda),
            collateral_asset: addr(0xee),
            join: addr(0x10),
            manager: addr(0x11),
            lender: addr(0xf1),
            exchange_wrapper: addr(0x5e),
            principal: U256::from(1_000u64),
            leverage: dec!(1.5),
            user_collateral: Some(UserCollateral {
                from: addr(0x99),
                amount: U256::from(2u64),
            }),
        }
    }

    #[test]
    fn plan_derives_flash_amount_from_leverage() {
        let plan = LeveragePlan::derive(U256::from(1_000u64), dec!(2.5)).unwrap();
        assert_eq!(plan.flash_amount, U256::from(1_500u64));
        assert_eq!(plan.target_exposure, U256::from(2_500u64));
        assert_eq!(plan.min_expected_debt, U256::from(1_500u64));
    }

    #[test]
    fn plan_rejects_leverage_at_or_below_one() {
        assert_eq!(
            LeveragePlan::derive(U256::from(1u64), dec!(1)).unwrap_err(),
            BuildError::InvalidLeverage { leverage: dec!(1) }
        );
        assert!(LeveragePlan::derive(U256::from(1u64), dec!(0.5)).is_err());
    }

    #[test]
    fn leveraged_sequence_chains_outputs() {
        let recipe = FlashLoanOrchestrator::default()
            .build_leveraged("CreateVaultRecipe", &config(), addr(0xaa))
            .unwrap();
        let kinds: Vec<_> = recipe.unit.actions().iter().map(ActionSpec::kind).collect();

        assert_eq!(
            kinds,
            vec![
                ActionKind::FlashLoan,
                ActionKind::Swap,
                ActionKind::OpenVault,
                ActionKind::PullToken,
                ActionKind::Supply,
                ActionKind::Generate,
            ]
        );
        let generate = &recipe.unit.actions()[5];
        assert_eq!(generate.params()[0], Value::Reference(2));
        assert_eq!(generate.params()[1], Value::Reference(0));
        assert_eq!(recipe.plan.flash_amount, U256::from(500u64));
    }

    #[test]
    fn sequence_without_user_collateral_keeps_vault_reference() {
        let mut config = config();
        config.user_collateral = None;

        let recipe = FlashLoanOrchestrator::default()
            .build_leveraged("lev", &config, addr(0xaa))
            .unwrap();
        assert_eq!(recipe.unit.len(), 5);
        assert_eq!(recipe.unit.slot("vault"), Some(2));
    }

    #[test]
    fn rejects_recipe_not_starting_with_borrow() {
        let actions = vec![ActionSpec::open_vault(addr(1), addr(2))];
        let result = FlashLoanOrchestrator::default().build("no-borrow", actions);
        assert_eq!(
            result.unwrap_err(),
            BuildError::FlashLoanNotFirst {
                found: ActionKind::OpenVault
            }
        );
    }

    #[test]
    fn rejects_recipe_without_repay() {
        let actions = vec![
            ActionSpec::flash_loan(U256::from(10u64).into(), addr(0xda), addr(0xf1))
                .with_output("borrowed"),
            ActionSpec::send_token(addr(0xda), addr(0x42), Value::reference(0)),
        ];
        let result = FlashLoanOrchestrator::default().build("no-repay", actions);
        assert_eq!(result.unwrap_err(), BuildError::MissingRepay);
    }

    #[test]
    fn accepts_plain_send_back_to_lender() {
        let actions = vec![
            ActionSpec::flash_loan(U256::from(10u64).into(), addr(0xda), addr(0xf1))
                .with_output("borrowed"),
            ActionSpec::send_token(addr(0xda), addr(0xf1), Value::reference(0)),
        ];
        assert!(FlashLoanOrchestrator::default()
            .build("send-back", actions)
            .is_ok());
    }
}
