//! Resolution of inter-action references during replay.

use super::action::{Literal, Value};
use super::error::ResolveError;
use super::recipe::RecipeUnit;

/// Turns the params of the next action into concrete literals.
///
/// `outputs[i]` holds what action `i` returned, or `None` when it returned
/// nothing. Only the first `position` entries are consulted.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver<'a> {
    unit: &'a RecipeUnit,
}

impl<'a> ReferenceResolver<'a> {
    #[must_use]
    pub const fn new(unit: &'a RecipeUnit) -> Self {
        Self { unit }
    }

    /// Resolve every param of the action at `position`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::CircularOrForwardReference`] if a reference points at
    ///   `position` or later, or past the outputs recorded so far.
    /// - [`ResolveError::UnresolvedReference`] if the referenced action ran
    ///   but produced no output.
    /// - [`ResolveError::TypeMismatch`] if the produced value has the wrong type.
    pub fn resolve(
        &self,
        position: usize,
        outputs: &[Option<Literal>],
    ) -> Result<Vec<Literal>, ResolveError> {
        let action = self
            .unit
            .actions()
            .get(position)
            .ok_or(ResolveError::NoSuchAction { index: position })?;
        let schema = action.kind().params();

        action
            .params()
            .iter()
            .enumerate()
            .map(|(param, value)| match value {
                Value::Literal(literal) => Ok(literal.clone()),
                Value::Reference(target) => {
                    let target = *target;
                    if target >= position || target >= outputs.len() {
                        return Err(ResolveError::CircularOrForwardReference {
                            index: position,
                            param,
                            target,
                        });
                    }
                    let literal = outputs[target].clone().ok_or(
                        ResolveError::UnresolvedReference {
                            index: position,
                            param,
                            target,
                        },
                    )?;
                    let expected = schema[param];
                    if literal.param_type() != expected {
                        return Err(ResolveError::TypeMismatch {
                            index: position,
                            param,
                            expected,
                            actual: literal.param_type(),
                        });
                    }
                    Ok(literal)
                }
            })
            .collect()
    }
}
