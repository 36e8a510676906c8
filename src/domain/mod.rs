//! Protocol-agnostic domain logic: actions, recipes, positions, feeds.

mod action;
pub mod amount;
pub mod codec;
mod error;
mod feed;
mod outcome;
mod position;
mod recipe;
mod reference;
mod refill;

pub use action::{ActionKind, ActionSpec, Literal, OutputSlot, ParamType, Value};
pub use amount::{AssetAmount, Ratio};
pub use error::{BuildError, ResolveError};
pub use feed::{Discrepancy, DiscrepancyKind, FeedRecord, RoundData};
pub use outcome::{ExecutionOutcome, OutcomeStatus};
pub use position::{BoundField, ExpectedBounds, Position, PositionId, PositionSnapshot};
pub use recipe::{RecipeBuilder, RecipeUnit, BASE_GAS, DEFAULT_GAS_CEILING, MAX_ACTIONS};
pub use reference::ReferenceResolver;
pub use refill::RefillPolicy;
