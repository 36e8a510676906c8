//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`sandbox`] - [`Sandbox`](sandbox::Sandbox), an in-memory chain that
//!   implements every port and replays recipes all-or-nothing.
//! - [`domain`] - Fixture addresses and builders for domain values.

pub mod domain;
pub mod sandbox;

pub use sandbox::{Sandbox, VaultState};
