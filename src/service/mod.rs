//! Services built on the ports.
//!
//! - [`FlashLoanOrchestrator`] - Leveraged recipes with borrow/repay checks
//! - [`RecipeExecutor`] - Atomic submission and outcome classification
//! - [`PositionVerifier`] - Post-execution bounds checks
//! - [`GasRefillTreasury`] - Keeps bot accounts supplied with gas
//! - [`PriceConsistencyMonitor`] - Feed drift/staleness/mismatch scan

mod executor;
mod flash_loan;
mod monitor;
mod treasury;
mod verifier;

pub use executor::{RecipeExecutor, RECIPE_EXECUTOR_NAME};
pub use flash_loan::{
    FlashLoanOrchestrator, LeverageConfig, LeveragePlan, LeveragedRecipe, UserCollateral,
};
pub use monitor::{MonitorReport, MonitorSettings, PriceConsistencyMonitor};
pub use treasury::{GasRefillTreasury, RefillReceipt, RefillSource};
pub use verifier::PositionVerifier;
