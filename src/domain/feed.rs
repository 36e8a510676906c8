//! Price feed reference records and discrepancies.

use std::fmt;
use std::path::Path;

use alloy_primitives::{Address, I256};
use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Expected feed for a base/quote pair, loaded from a static list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRecord {
    #[serde(default)]
    pub name: String,
    pub base: Address,
    pub quote: Address,
    #[serde(alias = "feedAddress")]
    pub expected_feed_address: Address,
    /// Update time seen by a previous scan. Only reported alongside a
    /// stale finding; it never changes what is flagged.
    #[serde(default)]
    pub last_known_timestamp: Option<u64>,
}

impl FeedRecord {
    /// Parse a JSON list of records.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when the JSON is not a list of records.
    pub fn parse_list(json: &str) -> Result<Vec<Self>> {
        serde_json::from_str(json).map_err(|e| {
            ConfigError::InvalidValue {
                field: "feeds",
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Load a JSON list of records from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadFile`] or [`ConfigError::InvalidValue`].
    pub fn load_list<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_list(&content)
    }

    fn label(&self) -> String {
        if self.name.is_empty() {
            format!("{}/{}", self.base, self.quote)
        } else {
            self.name.clone()
        }
    }
}

impl fmt::Display for FeedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Latest round of an aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundData {
    pub answer: I256,
    /// Unix seconds.
    pub updated_at: u64,
}

/// What is wrong with a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscrepancyKind {
    /// Registry points at a different feed than the record expects.
    AddressDrift,
    /// Feed has not updated within the staleness window.
    Stale,
    /// The two read paths disagree on the price.
    PriceMismatch,
}

impl fmt::Display for DiscrepancyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressDrift => write!(f, "address drift"),
            Self::Stale => write!(f, "stale"),
            Self::PriceMismatch => write!(f, "price mismatch"),
        }
    }
}

/// A problem found on one feed. Reported, never thrown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    pub kind: DiscrepancyKind,
    pub record: FeedRecord,
    pub details: String,
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.record, self.kind, self.details)
    }
}
