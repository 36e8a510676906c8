//! Command-line interface definitions.

pub mod check;
pub mod encode;
#[cfg(feature = "rpc")]
pub mod feeds;
pub mod output;
pub mod recipe_file;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Vaultsmith - atomic vault recipes, gas refills and feed checks.
#[derive(Parser, Debug)]
#[command(name = "vaultsmith")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a recipe file and print its calldata
    Encode(EncodeArgs),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),

    /// Compare price feeds against a reference list
    #[cfg(feature = "rpc")]
    Feeds(FeedsArgs),
}

/// Subcommands for `vaultsmith check`
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration file
    Config(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `encode` subcommand.
#[derive(Parser, Debug)]
pub struct EncodeArgs {
    /// Recipe description (TOML)
    #[arg(short, long)]
    pub recipe: PathBuf,

    /// Override the gas ceiling used for validation
    #[arg(long)]
    pub gas_ceiling: Option<u64>,
}

/// Arguments for the `feeds` subcommand.
#[cfg(feature = "rpc")]
#[derive(Parser, Debug)]
pub struct FeedsArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Reference feed list (JSON)
    #[arg(long)]
    pub feeds: PathBuf,
}
