//! `vaultsmith feeds`: scan a reference feed list against live state.

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::info;

use crate::adapter::RpcChain;
use crate::cli::{output, FeedsArgs};
use crate::config::Config;
use crate::domain::FeedRecord;
use crate::error::{ConfigError, Result};
use crate::service::PriceConsistencyMonitor;

/// Returns `true` when every feed is consistent and readable.
pub async fn execute(args: &FeedsArgs) -> Result<bool> {
    let config = Config::load(&args.config)?;
    config.init_logging();

    if config.monitor.feed_registry.is_none() {
        return Err(ConfigError::MissingField {
            field: "monitor.feed_registry",
        }
        .into());
    }
    let records = FeedRecord::load_list(&args.feeds)?;
    let chain = Arc::new(RpcChain::from_config(&config)?);
    let monitor =
        PriceConsistencyMonitor::new(chain.clone(), chain, config.monitor.settings());

    info!(feeds = records.len(), "Checking price feeds");
    output::section(&format!("Checking {} feeds", records.len()));

    let mut clean = true;
    let mut findings = Box::pin(monitor.check(records));
    while let Some(item) = findings.next().await {
        clean = false;
        match item {
            Ok(discrepancy) => output::warn(&discrepancy.to_string()),
            Err(e) => output::error(&format!("read failed: {e}")),
        }
    }

    println!();
    if clean {
        output::ok("All feeds consistent");
    }
    Ok(clean)
}
