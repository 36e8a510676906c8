//! Vaultsmith - atomic action recipes for collateralized vaults.
//!
//! Several protocol operations (flash borrow, swap, vault open, collateral
//! deposit, debt draw) are composed into one recipe that is submitted as a
//! single atomic call through a proxy account. Two satellite services keep
//! the operation healthy: a gas refill treasury for the bot accounts and a
//! price feed consistency monitor.
//!
//! # Modules
//!
//! - [`domain`] - Actions, recipes, the calldata codec, positions, feeds
//! - [`port`] - Traits for the chain collaborators
//! - [`service`] - Orchestrator, executor, verifier, treasury, monitor
//! - [`config`] - TOML configuration and logging setup
//! - [`error`] - Error types for the crate
//! - [`adapter`] - JSON-RPC port implementations (requires `rpc` feature)
//! - [`cli`] - Command-line entry points
//!
//! # Features
//!
//! - `rpc` - alloy-backed adapter and the `feeds` command (default)
//! - `testkit` - in-memory sandbox for integration tests
//!
//! # Example
//!
//! ```
//! use alloy_primitives::{Address, U256};
//! use vaultsmith::domain::{ActionSpec, RecipeBuilder, Value};
//!
//! let join = Address::repeat_byte(0x10);
//! let manager = Address::repeat_byte(0x11);
//! let proxy = Address::repeat_byte(0xaa);
//!
//! let unit = RecipeBuilder::default()
//!     .build(
//!         "OpenAndSupply",
//!         vec![
//!             ActionSpec::open_vault(join, manager).with_output("vault"),
//!             ActionSpec::supply(Value::reference(0), U256::from(1u64).into(), join, proxy, manager),
//!         ],
//!     )
//!     .unwrap();
//! assert_eq!(unit.encode(), unit.encode());
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;
pub mod service;

#[cfg(feature = "rpc")]
pub mod adapter;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
