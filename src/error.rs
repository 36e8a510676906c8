use std::fmt;

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::domain::{BoundField, BuildError, ResolveError};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Submission-layer failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Network,
    Nonce,
    Signature,
    Rpc,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Nonce => write!(f, "nonce"),
            Self::Signature => write!(f, "signature"),
            Self::Rpc => write!(f, "rpc"),
        }
    }
}

/// Failure talking to the chain. Always safe for the caller to retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn rpc(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Rpc, message)
    }
}

/// Recipe execution errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Explicit rejection by the environment. Not retried.
    #[error("recipe reverted: {reason}")]
    Reverted { reason: String },

    /// Consumption reached the ceiling. Not retried.
    #[error("recipe ran out of gas: used {gas_used} of {ceiling}")]
    OutOfGas { gas_used: u64, ceiling: u64 },

    /// Rejected before submission: the ceiling cannot cover the estimate.
    #[error("gas ceiling {ceiling} is below the recipe estimate {estimate}")]
    CeilingBelowEstimate { estimate: u64, ceiling: u64 },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ExecutionError {
    /// Only submission-layer failures may be retried as-is.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Position verification errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("bound {field} violated: actual {actual}, expected {expected}")]
    BoundsViolated {
        field: BoundField,
        actual: U256,
        expected: U256,
    },

    #[error("no position found for {owner}")]
    NoPosition { owner: Address },

    #[error(transparent)]
    Read(#[from] TransportError),
}

/// Gas refill treasury errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreasuryError {
    /// Terminal: caller is not the authorized refill caller.
    #[error("caller {caller} is not authorized to refill")]
    Unauthorized { caller: Address },

    /// Terminal: requested amount is above the per-call cap.
    #[error("refill of {requested} exceeds per-call cap {cap}")]
    CapExceeded { requested: U256, cap: U256 },

    #[error("recipient {recipient} is not a registered bot")]
    RecipientNotAllowed { recipient: Address },

    #[error("caller {caller} is not the treasury owner")]
    NotOwner { caller: Address },

    #[error("reserve conversion failed: {reason}")]
    ConversionFailed { reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Treasury(#[from] TreasuryError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
