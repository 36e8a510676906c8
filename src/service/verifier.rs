//! Post-execution position checks.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use tracing::{debug, warn};

use crate::domain::{BoundField, ExpectedBounds, Position, PositionId, Ratio};
use crate::error::VerificationError;
use crate::port::PositionReader;

/// Reads a position fresh on every call and checks it against bounds.
pub struct PositionVerifier {
    reader: Arc<dyn PositionReader>,
}

impl PositionVerifier {
    pub fn new(reader: Arc<dyn PositionReader>) -> Self {
        Self { reader }
    }

    /// Read `id` and check the bounds in order: min debt, max debt, min ratio.
    ///
    /// All comparisons are on raw fixed-point amounts; the decimal values in
    /// logs are rounded for display only.
    ///
    /// # Errors
    ///
    /// [`VerificationError::BoundsViolated`] for the first unmet bound, or
    /// [`VerificationError::Read`] when the state could not be read.
    pub async fn verify(
        &self,
        id: PositionId,
        expected: &ExpectedBounds,
    ) -> Result<Position, VerificationError> {
        let snapshot = self.reader.read_position(id).await?;
        let position = Position::from_snapshot(id, snapshot);

        if let Err(e) = check_bounds(&position, expected) {
            warn!(position = %position, error = %e, "Position verification failed");
            return Err(e);
        }

        debug!(position = %position, "Position verified");
        Ok(position)
    }

    /// Newest position owned by `owner`.
    ///
    /// # Errors
    ///
    /// [`VerificationError::NoPosition`] when the owner has none.
    pub async fn latest_position(&self, owner: Address) -> Result<PositionId, VerificationError> {
        self.reader
            .positions_of(owner)
            .await?
            .last()
            .copied()
            .ok_or(VerificationError::NoPosition { owner })
    }
}

fn check_bounds(position: &Position, expected: &ExpectedBounds) -> Result<(), VerificationError> {
    let debt = position.debt().raw();

    if let Some(min) = expected.min_debt {
        if debt < min {
            return Err(violation(BoundField::MinDebt, debt, min));
        }
    }
    if let Some(max) = expected.max_debt {
        if debt > max {
            return Err(violation(BoundField::MaxDebt, debt, max));
        }
    }
    if let Some(min) = expected.min_ratio {
        if position.ratio() < min {
            return Err(violation(
                BoundField::MinRatio,
                ratio_value(position.ratio()),
                ratio_value(min),
            ));
        }
    }
    Ok(())
}

const fn violation(field: BoundField, actual: U256, expected: U256) -> VerificationError {
    VerificationError::BoundsViolated {
        field,
        actual,
        expected,
    }
}

const fn ratio_value(ratio: Ratio) -> U256 {
    match ratio {
        Ratio::Finite(wad) => wad,
        Ratio::Unbounded => U256::MAX,
    }
}
