//! ABI codec for the task executor's `executeRecipe` call.
//!
//! Each action becomes one `callData` entry holding its ABI-encoded params,
//! one `actionIds` entry, and one `paramMapping` row where `0` marks a
//! literal and `k` means "output of action `k - 1`".

use std::collections::HashSet;

use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use alloy_sol_types::{sol, SolCall, SolValue};

use super::action::{ActionKind, ActionSpec, Literal, ParamType, Value};
use super::error::BuildError;
use super::recipe::{RecipeBuilder, RecipeUnit};

sol! {
    struct Recipe {
        string name;
        bytes[] callData;
        bytes32[] subData;
        bytes4[] actionIds;
        uint8[][] paramMapping;
    }

    function executeRecipe(Recipe recipe) external payable;
}

/// Encode a unit as `executeRecipe` calldata.
#[must_use]
pub fn encode(unit: &RecipeUnit) -> Bytes {
    let actions = unit.actions();
    let mut call_data = Vec::with_capacity(actions.len());
    let mut action_ids = Vec::with_capacity(actions.len());
    let mut param_mapping = Vec::with_capacity(actions.len());

    for action in actions {
        let (params, mapping): (Vec<Bytes>, Vec<u8>) =
            action.params().iter().map(encode_param).unzip();
        call_data.push(Bytes::from(params.abi_encode()));
        action_ids.push(action.kind().id());
        param_mapping.push(mapping);
    }

    let call = executeRecipeCall {
        recipe: Recipe {
            name: unit.name().to_string(),
            callData: call_data,
            subData: Vec::new(),
            actionIds: action_ids,
            paramMapping: param_mapping,
        },
    };
    Bytes::from(call.abi_encode())
}

fn encode_param(value: &Value) -> (Bytes, u8) {
    match value {
        Value::Literal(Literal::Address(address)) => (address.abi_encode().into(), 0),
        Value::Literal(Literal::Amount(amount)) => (amount.abi_encode().into(), 0),
        Value::Literal(Literal::Bytes(bytes)) => (bytes.abi_encode().into(), 0),
        // Builder caps recipes at 255 actions, so the index always fits.
        Value::Reference(index) => (
            U256::ZERO.abi_encode().into(),
            u8::try_from(index + 1).unwrap_or(u8::MAX),
        ),
    }
}

/// Parse `executeRecipe` calldata back into a validated unit.
///
/// Output slots are not part of the payload; referenced actions get
/// positional labels (`$1`, `$2`, ...).
///
/// # Errors
///
/// Returns [`BuildError::Malformed`] when the bytes are not a recipe call,
/// and any other [`BuildError`] the builder raises on the decoded actions.
pub fn decode(payload: &[u8], builder: &RecipeBuilder) -> Result<RecipeUnit, BuildError> {
    let call = executeRecipeCall::abi_decode(payload).map_err(malformed)?;
    let recipe = call.recipe;

    let count = recipe.actionIds.len();
    if recipe.callData.len() != count || recipe.paramMapping.len() != count {
        return Err(BuildError::Malformed {
            reason: format!(
                "{} action ids, {} call data entries, {} mapping rows",
                count,
                recipe.callData.len(),
                recipe.paramMapping.len()
            ),
        });
    }

    let referenced: HashSet<usize> = recipe
        .paramMapping
        .iter()
        .flatten()
        .filter(|&&m| m != 0)
        .map(|&m| usize::from(m) - 1)
        .collect();

    let mut actions = Vec::with_capacity(count);
    for (index, ((id, data), mapping)) in recipe
        .actionIds
        .iter()
        .zip(&recipe.callData)
        .zip(&recipe.paramMapping)
        .enumerate()
    {
        let kind = ActionKind::from_id(*id).ok_or_else(|| BuildError::Malformed {
            reason: format!("unknown action id {id} at position {index}"),
        })?;
        let params = decode_params(kind, index, data, mapping)?;

        let mut action = ActionSpec::new(kind, params);
        if referenced.contains(&index) {
            action = action.with_output(format!("${}", index + 1));
        }
        actions.push(action);
    }

    builder.build(recipe.name, actions)
}

fn decode_params(
    kind: ActionKind,
    index: usize,
    data: &Bytes,
    mapping: &[u8],
) -> Result<Vec<Value>, BuildError> {
    let raw = Vec::<Bytes>::abi_decode(data).map_err(malformed)?;
    if raw.len() != mapping.len() {
        return Err(BuildError::Malformed {
            reason: format!(
                "action {index} has {} params but {} mapping entries",
                raw.len(),
                mapping.len()
            ),
        });
    }

    let schema = kind.params();
    raw.iter()
        .zip(mapping)
        .enumerate()
        .map(|(param, (bytes, &slot))| {
            if slot != 0 {
                return Ok(Value::Reference(usize::from(slot) - 1));
            }
            // Surplus params fall through as bytes; the builder reports the arity.
            let ty = schema.get(param).copied().unwrap_or(ParamType::Bytes);
            decode_literal(ty, bytes).map(Value::Literal)
        })
        .collect()
}

fn decode_literal(ty: ParamType, bytes: &[u8]) -> Result<Literal, BuildError> {
    let literal = match ty {
        ParamType::Address => Literal::Address(Address::abi_decode(bytes).map_err(malformed)?),
        ParamType::Uint => Literal::Amount(U256::abi_decode(bytes).map_err(malformed)?),
        ParamType::Bytes => Literal::Bytes(Bytes::abi_decode(bytes).map_err(malformed)?),
    };
    Ok(literal)
}

fn malformed(err: alloy_sol_types::Error) -> BuildError {
    BuildError::Malformed {
        reason: err.to_string(),
    }
}

/// Selector of `executeRecipe`.
#[must_use]
pub fn execute_recipe_selector() -> FixedBytes<4> {
    FixedBytes::from(executeRecipeCall::SELECTOR)
}
