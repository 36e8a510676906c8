//! Vault position snapshots and expected bounds.

use std::fmt;

use alloy_primitives::U256;

use super::amount::{AssetAmount, Ratio, WAD};

/// Unique position (vault) identifier.
///
/// The inner u64 is private to ensure all construction goes through
/// the defined constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionId(u64);

impl PositionId {
    /// Create a new `PositionId` from a u64 value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vault-{}", self.0)
    }
}

/// Raw state as read from chain, before any derived values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSnapshot {
    pub collateral: AssetAmount,
    pub debt: AssetAmount,
    /// Price of one collateral unit in debt-asset units, wad-scaled.
    pub collateral_price: U256,
}

/// A verified position. Recomputed on every read, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    id: PositionId,
    collateral: AssetAmount,
    debt: AssetAmount,
    ratio: Ratio,
}

impl Position {
    /// Derive the collateralization ratio from a raw snapshot.
    #[must_use]
    pub fn from_snapshot(id: PositionId, snapshot: PositionSnapshot) -> Self {
        let collateral_value = snapshot
            .collateral
            .to_wad()
            .saturating_mul(snapshot.collateral_price)
            / WAD;
        let ratio = Ratio::compute(collateral_value, snapshot.debt.to_wad());

        Self {
            id,
            collateral: snapshot.collateral,
            debt: snapshot.debt,
            ratio,
        }
    }

    #[must_use]
    pub const fn id(&self) -> PositionId {
        self.id
    }

    #[must_use]
    pub const fn collateral(&self) -> AssetAmount {
        self.collateral
    }

    #[must_use]
    pub const fn debt(&self) -> AssetAmount {
        self.debt
    }

    #[must_use]
    pub const fn ratio(&self) -> Ratio {
        self.ratio
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: ratio {} (coll: {}, debt: {})",
            self.id, self.ratio, self.collateral, self.debt
        )
    }
}

/// Field a bound applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundField {
    MinDebt,
    MaxDebt,
    MinRatio,
}

impl fmt::Display for BoundField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinDebt => write!(f, "min_debt"),
            Self::MaxDebt => write!(f, "max_debt"),
            Self::MinRatio => write!(f, "min_ratio"),
        }
    }
}

/// Optional bounds a position must satisfy. Debt bounds are raw amounts
/// in the debt asset's precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpectedBounds {
    pub min_debt: Option<U256>,
    pub max_debt: Option<U256>,
    pub min_ratio: Option<Ratio>,
}

impl ExpectedBounds {
    /// No bounds at all.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Debt must equal `debt` exactly.
    #[must_use]
    pub fn exact_debt(debt: U256) -> Self {
        Self {
            min_debt: Some(debt),
            max_debt: Some(debt),
            min_ratio: None,
        }
    }

    /// Debt must be at least `debt`.
    #[must_use]
    pub fn at_least_debt(debt: U256) -> Self {
        Self {
            min_debt: Some(debt),
            ..Self::default()
        }
    }

    /// Also require the ratio to be at least `ratio`.
    #[must_use]
    pub fn with_min_ratio(mut self, ratio: Ratio) -> Self {
        self.min_ratio = Some(ratio);
        self
    }
}
