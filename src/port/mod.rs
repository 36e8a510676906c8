//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Services in [`crate::service`] talk to the chain exclusively through
//! these traits. The `rpc` adapter implements them against a JSON-RPC
//! endpoint; the testkit sandbox implements them in memory.
//!
//! # Available Ports
//!
//! - [`Registry`], [`AccountProvisioning`], [`Balances`] - Chain primitives
//! - [`ExecutionGateway`] - Atomic recipe submission
//! - [`PositionReader`] - Vault state reads
//! - [`FeedRegistry`], [`PriceOracle`] - Price feed read paths
//! - [`TreasuryLedger`], [`ReserveExchange`] - Refill treasury collaborators

mod chain;
mod feed;
mod gateway;
mod position;
mod treasury;

pub use chain::{AccountHandle, AccountProvisioning, Balances, Registry};
pub use feed::{FeedRegistry, PriceOracle};
pub use gateway::{ExecutionGateway, RawOutcome, SubmitRequest};
pub use position::PositionReader;
pub use treasury::{ReserveExchange, TreasuryLedger};
