use std::path::Path;

use crate::cli::output;
use crate::config::{Config, PRIVATE_KEY_ENV};
use crate::error::Result;

/// Validate a configuration file without touching the network.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    println!("Checking configuration: {}", path.display());
    println!();

    let config = Config::load(path)?;
    output::ok("Configuration file is valid");

    output::section("Summary");
    output::key_value("RPC", &config.network.rpc_url);
    output::key_value("Chain ID", config.network.chain_id);
    match config.network.registry {
        Some(registry) => output::key_value("Registry", registry),
        None => output::key_value("Registry", "not set"),
    }
    output::key_value("Gas ceiling", config.recipe.gas_ceiling);
    output::key_value(
        "Staleness",
        format!("{}h", config.monitor.staleness_hours),
    );
    output::key_value(
        "Tolerance",
        format!("{} bps", config.monitor.price_tolerance_bps),
    );
    println!();

    if config.private_key.is_some() {
        output::ok(&format!("Executor key found (from {PRIVATE_KEY_ENV})"));
    } else {
        output::warn("No executor key configured");
        println!("  Set {PRIVATE_KEY_ENV} to submit recipes");
    }
    if config.monitor.feed_registry.is_none() {
        output::warn("monitor.feed_registry not set, `feeds` will not run");
    }

    println!();
    println!("Configuration is ready to use.");
    Ok(())
}
