//! Fixed-point token amounts and ratios.
//!
//! On-chain amounts are integers scaled by the asset's decimals. Every
//! comparison that decides pass/fail happens on the raw [`U256`] value;
//! [`Decimal`] conversions exist only for display and logs.

use std::fmt;

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;

/// Decimals used for wad-scaled values (prices, ratios).
pub const WAD_DECIMALS: u8 = 18;

/// `10^18` as a [`U256`].
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// `10^n` as a [`U256`].
#[must_use]
pub fn pow10(n: u8) -> U256 {
    U256::from(10u64).pow(U256::from(n))
}

/// Rescale `raw` from `from` decimals to `to` decimals, truncating.
#[must_use]
pub fn rescale(raw: U256, from: u8, to: u8) -> U256 {
    if from == to {
        raw
    } else if from < to {
        raw.saturating_mul(pow10(to - from))
    } else {
        raw / pow10(from - to)
    }
}

/// Convert a non-negative [`Decimal`] into an integer scaled by `decimals`.
///
/// Digits beyond `decimals` are truncated. Returns `None` for negative input.
#[must_use]
pub fn scaled_from_decimal(value: Decimal, decimals: u8) -> Option<U256> {
    if value.is_sign_negative() {
        return None;
    }
    let mantissa = u128::try_from(value.mantissa()).ok()?;
    Some(rescale(U256::from(mantissa), value.scale() as u8, decimals))
}

/// Render a scaled integer as a [`Decimal`] for display.
///
/// Values wider than 96 bits saturate at [`Decimal::MAX`].
#[must_use]
pub fn to_display_decimal(raw: U256, decimals: u8) -> Decimal {
    // Decimal carries at most 28 fractional digits.
    let (raw, decimals) = if decimals > 28 {
        (rescale(raw, decimals, 28), 28)
    } else {
        (raw, decimals)
    };
    let int_val: i128 = raw.try_into().unwrap_or(i128::MAX);
    Decimal::try_from_i128_with_scale(int_val, u32::from(decimals)).unwrap_or(Decimal::MAX)
}

/// An amount of a specific asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetAmount {
    asset: Address,
    raw: U256,
    decimals: u8,
}

impl AssetAmount {
    /// Create an amount from its raw on-chain value.
    #[must_use]
    pub const fn new(asset: Address, raw: U256, decimals: u8) -> Self {
        Self {
            asset,
            raw,
            decimals,
        }
    }

    /// Asset contract address.
    #[must_use]
    pub const fn asset(&self) -> Address {
        self.asset
    }

    /// Raw integer value in the asset's native precision.
    #[must_use]
    pub const fn raw(&self) -> U256 {
        self.raw
    }

    /// Decimals of the asset.
    #[must_use]
    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Value rescaled to 18 decimals.
    #[must_use]
    pub fn to_wad(&self) -> U256 {
        rescale(self.raw, self.decimals, WAD_DECIMALS)
    }

    /// Human-readable value, for logs only.
    #[must_use]
    pub fn to_decimal(&self) -> Decimal {
        to_display_decimal(self.raw, self.decimals)
    }
}

impl fmt::Display for AssetAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_decimal())
    }
}

/// Collateralization ratio as a wad-scaled percentage (`150%` is `150e18`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Ratio {
    /// Finite ratio.
    Finite(U256),
    /// No debt outstanding.
    Unbounded,
}

impl Ratio {
    /// Build a ratio from a percentage such as `dec!(150)`.
    #[must_use]
    pub fn from_percent(percent: Decimal) -> Option<Self> {
        scaled_from_decimal(percent, WAD_DECIMALS).map(Self::Finite)
    }

    /// Compute `collateral_value / debt * 100`, both in wad.
    #[must_use]
    pub fn compute(collateral_value_wad: U256, debt_wad: U256) -> Self {
        if debt_wad.is_zero() {
            return Self::Unbounded;
        }
        let numerator = collateral_value_wad
            .saturating_mul(U256::from(100u64))
            .saturating_mul(WAD);
        Self::Finite(numerator / debt_wad)
    }

    /// Percentage for display, `None` when unbounded.
    #[must_use]
    pub fn to_percent(&self) -> Option<Decimal> {
        match self {
            Self::Finite(wad) => Some(to_display_decimal(*wad, WAD_DECIMALS)),
            Self::Unbounded => None,
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_percent() {
            Some(percent) => write!(f, "{percent:.2}%"),
            None => write!(f, "∞"),
        }
    }
}
