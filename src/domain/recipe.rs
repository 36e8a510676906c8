//! Recipe units and the builder that validates them.

use std::collections::HashMap;

use alloy_primitives::Bytes;

use super::action::{ActionSpec, ParamType, Value};
use super::codec;
use super::error::BuildError;

/// Reference mapping uses one byte per param, and `0` marks a literal.
pub const MAX_ACTIONS: usize = u8::MAX as usize;

/// Fixed overhead of entering the proxy and the task executor.
pub const BASE_GAS: u64 = 60_000;

/// Gas ceiling used when the caller does not supply one.
pub const DEFAULT_GAS_CEILING: u64 = 3_000_000;

/// A named, ordered, validated sequence of actions.
///
/// Only [`RecipeBuilder::build`] creates units, so every unit satisfies the
/// structural invariants. Units are immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeUnit {
    name: String,
    actions: Vec<ActionSpec>,
    gas_estimate: u64,
}

impl RecipeUnit {
    /// Recipe name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Actions in execution order.
    #[must_use]
    pub fn actions(&self) -> &[ActionSpec] {
        &self.actions
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Always false: empty units are rejected by the builder.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Summed static gas estimate including [`BASE_GAS`].
    #[must_use]
    pub const fn gas_estimate(&self) -> u64 {
        self.gas_estimate
    }

    /// Position of the action that declares `slot`.
    #[must_use]
    pub fn slot(&self, slot: &str) -> Option<usize> {
        self.actions
            .iter()
            .position(|action| action.output().is_some_and(|s| s.as_str() == slot))
    }

    /// Deterministic calldata for the task executor.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        codec::encode(self)
    }
}

/// Validates action lists into [`RecipeUnit`]s.
#[derive(Debug, Clone, Copy)]
pub struct RecipeBuilder {
    gas_ceiling: u64,
}

impl Default for RecipeBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_GAS_CEILING)
    }
}

impl RecipeBuilder {
    /// Builder that rejects units whose estimate exceeds `gas_ceiling`.
    #[must_use]
    pub const fn new(gas_ceiling: u64) -> Self {
        Self { gas_ceiling }
    }

    /// Configured ceiling.
    #[must_use]
    pub const fn gas_ceiling(&self) -> u64 {
        self.gas_ceiling
    }

    /// Validate `actions` and assemble them into a unit.
    ///
    /// # Errors
    ///
    /// Returns the first [`BuildError`] found, scanning actions in order.
    pub fn build(
        &self,
        name: impl Into<String>,
        actions: Vec<ActionSpec>,
    ) -> Result<RecipeUnit, BuildError> {
        if actions.is_empty() {
            return Err(BuildError::EmptyRecipe);
        }
        if actions.len() > MAX_ACTIONS {
            return Err(BuildError::TooManyActions {
                count: actions.len(),
                max: MAX_ACTIONS,
            });
        }

        let mut slots: HashMap<&str, usize> = HashMap::new();
        for (index, action) in actions.iter().enumerate() {
            check_params(&actions, index, action)?;

            if let Some(slot) = action.output() {
                if let Some(&first) = slots.get(slot.as_str()) {
                    return Err(BuildError::DuplicateOutputSlot {
                        slot: slot.to_string(),
                        first,
                        second: index,
                    });
                }
                slots.insert(slot.as_str(), index);
            }
        }

        let gas_estimate = actions
            .iter()
            .fold(BASE_GAS, |acc, action| acc + action.kind().gas_estimate());
        if gas_estimate > self.gas_ceiling {
            return Err(BuildError::GasCeilingExceeded {
                estimate: gas_estimate,
                ceiling: self.gas_ceiling,
            });
        }

        Ok(RecipeUnit {
            name: name.into(),
            actions,
            gas_estimate,
        })
    }
}

fn check_params(
    actions: &[ActionSpec],
    index: usize,
    action: &ActionSpec,
) -> Result<(), BuildError> {
    let schema = action.kind().params();
    if schema.len() != action.params().len() {
        return Err(BuildError::ArityMismatch {
            index,
            kind: action.kind(),
            expected: schema.len(),
            actual: action.params().len(),
        });
    }

    for (param, (value, &expected)) in action.params().iter().zip(schema).enumerate() {
        let actual = match value {
            Value::Literal(literal) => literal.param_type(),
            Value::Reference(target) => reference_type(actions, index, param, *target)?,
        };
        if actual != expected {
            return Err(BuildError::TypeMismatch {
                index,
                param,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

fn reference_type(
    actions: &[ActionSpec],
    index: usize,
    param: usize,
    target: usize,
) -> Result<ParamType, BuildError> {
    if target >= index {
        return Err(BuildError::CircularOrForwardReference {
            index,
            param,
            target,
        });
    }
    let referenced = &actions[target];
    match (referenced.output(), referenced.kind().output()) {
        (Some(_), Some(output)) => Ok(output),
        _ => Err(BuildError::ReferenceToVoid {
            index,
            param,
            target,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::{ActionKind, Literal};
    use alloy_primitives::{Address, U256};

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn open_supply_generate() -> Vec<ActionSpec> {
        vec![
            ActionSpec::open_vault(addr(1), addr(2)).with_output("vault"),
            ActionSpec::supply(
                Value::reference(0),
                U256::from(10u64).into(),
                addr(1),
                addr(3),
                addr(2),
            ),
            ActionSpec::generate(Value::reference(0), U256::from(540u64).into(), addr(3), addr(2)),
        ]
    }

    #[test]
    fn builds_valid_recipe() {
        let unit = RecipeBuilder::default()
            .build("CreateVaultRecipe", open_supply_generate())
            .unwrap();

        assert_eq!(unit.name(), "CreateVaultRecipe");
        assert_eq!(unit.len(), 3);
        assert_eq!(unit.slot("vault"), Some(0));
        assert_eq!(
            unit.gas_estimate(),
            BASE_GAS
                + ActionKind::OpenVault.gas_estimate()
                + ActionKind::Supply.gas_estimate()
                + ActionKind::Generate.gas_estimate()
        );
    }

    #[test]
    fn rejects_empty_recipe() {
        let result = RecipeBuilder::default().build("empty", vec![]);
        assert_eq!(result.unwrap_err(), BuildError::EmptyRecipe);
    }

    #[test]
    fn rejects_forward_reference() {
        let mut actions = open_supply_generate();
        actions[1] = ActionSpec::supply(
            Value::reference(2),
            U256::from(10u64).into(),
            addr(1),
            addr(3),
            addr(2),
        );

        let result = RecipeBuilder::default().build("forward", actions);
        assert_eq!(
            result.unwrap_err(),
            BuildError::CircularOrForwardReference {
                index: 1,
                param: 0,
                target: 2
            }
        );
    }

    #[test]
    fn rejects_reference_to_action_without_output() {
        let mut actions = open_supply_generate();
        actions[0] = ActionSpec::open_vault(addr(1), addr(2));

        let result = RecipeBuilder::default().build("void", actions);
        assert_eq!(
            result.unwrap_err(),
            BuildError::ReferenceToVoid {
                index: 1,
                param: 0,
                target: 0
            }
        );
    }

    #[test]
    fn rejects_duplicate_output_slot() {
        let actions = vec![
            ActionSpec::open_vault(addr(1), addr(2)).with_output("vault"),
            ActionSpec::open_vault(addr(1), addr(2)).with_output("vault"),
        ];

        let result = RecipeBuilder::default().build("dup", actions);
        assert_eq!(
            result.unwrap_err(),
            BuildError::DuplicateOutputSlot {
                slot: "vault".into(),
                first: 0,
                second: 1
            }
        );
    }

    #[test]
    fn rejects_wrong_literal_type() {
        let actions = vec![ActionSpec::new(
            ActionKind::PullToken,
            [
                Value::Literal(Literal::Amount(U256::from(1u64))),
                addr(1).into(),
                U256::from(1u64).into(),
            ],
        )];

        let result = RecipeBuilder::default().build("types", actions);
        assert_eq!(
            result.unwrap_err(),
            BuildError::TypeMismatch {
                index: 0,
                param: 0,
                expected: ParamType::Address,
                actual: ParamType::Uint
            }
        );
    }

    #[test]
    fn rejects_reference_where_address_expected() {
        let actions = vec![
            ActionSpec::open_vault(addr(1), addr(2)).with_output("vault"),
            ActionSpec::pull_token(addr(1), addr(1), U256::from(1u64).into()),
            ActionSpec::new(
                ActionKind::SendToken,
                [Value::reference(0), addr(1).into(), U256::from(1u64).into()],
            ),
        ];

        let result = RecipeBuilder::default().build("types", actions);
        assert!(matches!(
            result,
            Err(BuildError::TypeMismatch {
                index: 2,
                param: 0,
                ..
            })
        ));
    }

    #[test]
    fn rejects_arity_mismatch() {
        let actions = vec![ActionSpec::new(ActionKind::OpenVault, [addr(1).into()])];

        let result = RecipeBuilder::default().build("arity", actions);
        assert_eq!(
            result.unwrap_err(),
            BuildError::ArityMismatch {
                index: 0,
                kind: ActionKind::OpenVault,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn rejects_estimate_above_ceiling() {
        let result = RecipeBuilder::new(100_000).build("gas", open_supply_generate());
        assert!(matches!(
            result,
            Err(BuildError::GasCeilingExceeded {
                ceiling: 100_000,
                ..
            })
        ));
    }

    #[test]
    fn rejects_too_many_actions() {
        let actions = vec![
            ActionSpec::sum_inputs(U256::from(1u64).into(), U256::from(1u64).into());
            MAX_ACTIONS + 1
        ];

        let result = RecipeBuilder::new(u64::MAX).build("long", actions);
        assert_eq!(
            result.unwrap_err(),
            BuildError::TooManyActions {
                count: MAX_ACTIONS + 1,
                max: MAX_ACTIONS
            }
        );
    }
}
