//! Structural errors raised while composing or replaying a recipe.
//!
//! Every variant carries the offending action index (and parameter index
//! where relevant) so a failure can be reproduced without reading logs.
//!
//! ```
//! use alloy_primitives::U256;
//! use vaultsmith::domain::{ActionSpec, BuildError, RecipeBuilder, Value};
//!
//! let actions = vec![ActionSpec::sum_inputs(Value::reference(0), U256::from(1u64).into())];
//! let result = RecipeBuilder::default().build("self-ref", actions);
//!
//! assert!(matches!(
//!     result,
//!     Err(BuildError::CircularOrForwardReference { index: 0, target: 0, .. })
//! ));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use super::action::{ActionKind, ParamType};

/// A recipe that is malformed and must not be submitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A recipe needs at least one action.
    #[error("recipe has no actions")]
    EmptyRecipe,

    /// Reference mapping is one byte per parameter.
    #[error("recipe has {count} actions, at most {max} are supported")]
    TooManyActions { count: usize, max: usize },

    /// Parameter count differs from the action schema.
    #[error("action {index} ({kind}) takes {expected} params, got {actual}")]
    ArityMismatch {
        index: usize,
        kind: ActionKind,
        expected: usize,
        actual: usize,
    },

    /// Literal or referenced output has the wrong type.
    #[error("action {index} param {param}: expected {expected}, got {actual}")]
    TypeMismatch {
        index: usize,
        param: usize,
        expected: ParamType,
        actual: ParamType,
    },

    /// Reference to the same or a later action.
    #[error("action {index} param {param} references action {target}, which does not precede it")]
    CircularOrForwardReference {
        index: usize,
        param: usize,
        target: usize,
    },

    /// Reference to an action that declares no output.
    #[error("action {index} param {param} references action {target}, which declares no output")]
    ReferenceToVoid {
        index: usize,
        param: usize,
        target: usize,
    },

    /// Two actions claim the same output slot.
    #[error("output slot '{slot}' assigned by actions {first} and {second}")]
    DuplicateOutputSlot {
        slot: String,
        first: usize,
        second: usize,
    },

    /// Summed gas estimate is above the ceiling.
    #[error("gas estimate {estimate} exceeds ceiling {ceiling}")]
    GasCeilingExceeded { estimate: u64, ceiling: u64 },

    /// A flash-loan recipe must open with the borrow.
    #[error("first action must be a flash loan, found {found}")]
    FlashLoanNotFirst { found: ActionKind },

    /// No later action pays the borrowed amount back to the lender.
    #[error("no action repays the flash loan taken by action 0")]
    MissingRepay,

    /// Leverage must be strictly greater than one.
    #[error("leverage must be greater than 1, got {leverage}")]
    InvalidLeverage { leverage: Decimal },

    /// Payload bytes could not be parsed back into a recipe.
    #[error("malformed recipe payload: {reason}")]
    Malformed { reason: String },
}

/// Failure to turn a reference into a concrete value during replay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The referenced action ran but produced no output.
    #[error("action {index} param {param} references action {target}, which produced no output")]
    UnresolvedReference {
        index: usize,
        param: usize,
        target: usize,
    },

    /// The referenced action has not run yet.
    #[error("action {index} param {param} references action {target}, which does not precede it")]
    CircularOrForwardReference {
        index: usize,
        param: usize,
        target: usize,
    },

    /// The resolved value does not fit the parameter type.
    #[error("action {index} param {param}: expected {expected}, got {actual}")]
    TypeMismatch {
        index: usize,
        param: usize,
        expected: ParamType,
        actual: ParamType,
    },

    /// No action exists at the requested position.
    #[error("recipe has no action at position {index}")]
    NoSuchAction { index: usize },
}
