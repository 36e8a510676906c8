//! Price feed consistency monitor.
//!
//! Each record is checked through two read paths: the registry lookup of the
//! live feed for the pair, and a direct read of the feed the record expects.
//! Findings are yielded as they are found and in input order. Nothing is
//! thrown for a finding; a read failure is yielded as an error item and the
//! scan moves on to the next record.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, I256, U256};
use chrono::Utc;
use futures_util::stream::{self, Stream, StreamExt};
use tracing::{debug, warn};

use crate::domain::{Discrepancy, DiscrepancyKind, FeedRecord, RoundData};
use crate::error::TransportError;
use crate::port::{FeedRegistry, PriceOracle};

const BPS_DENOMINATOR: u64 = 10_000;

/// Monitor tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Age after which a round is stale.
    pub staleness: Duration,
    /// Allowed difference between the two read paths, in basis points.
    pub price_tolerance_bps: u32,
    /// Records read concurrently.
    pub concurrency: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            staleness: Duration::from_secs(24 * 60 * 60),
            price_tolerance_bps: 100,
            concurrency: 8,
        }
    }
}

/// Collected result of a full scan.
#[derive(Debug, Default)]
pub struct MonitorReport {
    pub discrepancies: Vec<Discrepancy>,
    pub errors: Vec<TransportError>,
}

impl MonitorReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty() && self.errors.is_empty()
    }
}

pub struct PriceConsistencyMonitor {
    registry: Arc<dyn FeedRegistry>,
    oracle: Arc<dyn PriceOracle>,
    settings: MonitorSettings,
}

impl PriceConsistencyMonitor {
    pub fn new(
        registry: Arc<dyn FeedRegistry>,
        oracle: Arc<dyn PriceOracle>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            registry,
            oracle,
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Scan `records` against the current wall clock.
    ///
    /// The stream is lazy and each call starts a fresh scan.
    pub fn check(
        &self,
        records: Vec<FeedRecord>,
    ) -> impl Stream<Item = Result<Discrepancy, TransportError>> + '_ {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        self.check_at(records, now)
    }

    /// Scan `records` as of `now` (unix seconds).
    pub fn check_at(
        &self,
        records: Vec<FeedRecord>,
        now: u64,
    ) -> impl Stream<Item = Result<Discrepancy, TransportError>> + '_ {
        stream::iter(records)
            .map(move |record| self.check_record(record, now))
            .buffered(self.settings.concurrency.max(1))
            .flat_map(stream::iter)
    }

    /// Run a full scan and collect findings and read failures.
    pub async fn report(&self, records: Vec<FeedRecord>) -> MonitorReport {
        let mut report = MonitorReport::default();
        let mut findings = Box::pin(self.check(records));
        while let Some(item) = findings.next().await {
            match item {
                Ok(discrepancy) => report.discrepancies.push(discrepancy),
                Err(e) => report.errors.push(e),
            }
        }
        report
    }

    async fn check_record(
        &self,
        record: FeedRecord,
        now: u64,
    ) -> Vec<Result<Discrepancy, TransportError>> {
        let mut items = Vec::new();

        let live = match self.registry.get_feed(record.base, record.quote).await {
            Ok(live) => live,
            Err(e) => {
                warn!(feed = %record, error = %e, "Registry read failed");
                items.push(Err(e));
                return items;
            }
        };
        if live != record.expected_feed_address {
            items.push(Ok(finding(
                DiscrepancyKind::AddressDrift,
                &record,
                format!(
                    "registry returns {live}, expected {}",
                    record.expected_feed_address
                ),
            )));
        }

        let rounds = match self.read_rounds(&record, live).await {
            Ok(rounds) => rounds,
            Err(e) => {
                warn!(feed = %record, error = %e, "Round read failed");
                items.push(Err(e));
                return items;
            }
        };
        let (live_round, direct_round) = rounds;

        let oldest = live_round.updated_at.min(direct_round.updated_at);
        let age = now.saturating_sub(oldest);
        if age > self.settings.staleness.as_secs() {
            let details = match record.last_known_timestamp {
                Some(known) if known == oldest => {
                    format!("last update {age}s ago at {oldest}, unchanged since last scan")
                }
                Some(known) => format!("last update {age}s ago at {oldest}, last known {known}"),
                None => format!("last update {age}s ago at {oldest}"),
            };
            items.push(Ok(finding(DiscrepancyKind::Stale, &record, details)));
        }

        if !within_tolerance(
            live_round.answer,
            direct_round.answer,
            self.settings.price_tolerance_bps,
        ) {
            items.push(Ok(finding(
                DiscrepancyKind::PriceMismatch,
                &record,
                format!(
                    "registry path {} vs direct {}",
                    live_round.answer, direct_round.answer
                ),
            )));
        }

        debug!(feed = %record, findings = items.len(), "Feed checked");
        items
    }

    async fn read_rounds(
        &self,
        record: &FeedRecord,
        live: Address,
    ) -> Result<(RoundData, RoundData), TransportError> {
        let direct = self.oracle.latest_round(record.expected_feed_address).await?;
        let live_round = if live == record.expected_feed_address {
            direct
        } else {
            self.oracle.latest_round(live).await?
        };
        Ok((live_round, direct))
    }
}

fn finding(kind: DiscrepancyKind, record: &FeedRecord, details: String) -> Discrepancy {
    Discrepancy {
        kind,
        record: record.clone(),
        details,
    }
}

/// `|a - b| <= |b| * bps / 10_000`, in integers.
fn within_tolerance(a: I256, b: I256, bps: u32) -> bool {
    let diff = a.saturating_sub(b).unsigned_abs();
    let reference = b.unsigned_abs();
    diff.saturating_mul(U256::from(BPS_DENOMINATOR))
        <= reference.saturating_mul(U256::from(bps))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(value: i64) -> I256 {
        I256::try_from(value).unwrap()
    }

    #[test]
    fn identical_answers_are_within_any_tolerance() {
        assert!(within_tolerance(price(2_000), price(2_000), 0));
    }

    #[test]
    fn tolerance_is_relative_to_direct_answer() {
        // 1% of 10_000 is 100
        assert!(within_tolerance(price(10_100), price(10_000), 100));
        assert!(!within_tolerance(price(10_101), price(10_000), 100));
        assert!(within_tolerance(price(9_900), price(10_000), 100));
    }

    #[test]
    fn default_staleness_is_one_day() {
        assert_eq!(MonitorSettings::default().staleness.as_secs(), 86_400);
    }
}
