//! Result stream crawling.
//!
//! A map search renders its results as a lazily growing list. The crawler
//! polls the list length, visits entries as they appear, scrolls to pull in
//! more, and stops at the end-of-list marker or after too many polls without
//! growth.

mod entry;
mod ledger;
mod visitor;

pub use entry::{EntryFingerprint, EntryKind, EntryScanner};
pub use ledger::DedupLedger;
pub use visitor::{ItemVisitor, VisitOutcome};

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::extract::DetailExtractor;
use crate::scrapers::retry::{retry, RetryPolicy};
use crate::scrapers::session::{DriverError, EntryHandle, MapSession};
use crate::storage::{RecordSink, StorageError};

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("result list never appeared: {0}")]
    ListUnavailable(DriverError),
    #[error("browser session lost: {0}")]
    Session(DriverError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CrawlError {
    /// Route a driver failure: fatal ones end the crawl, the rest are
    /// handed back for the caller to log.
    fn check(error: DriverError) -> Result<DriverError, CrawlError> {
        if error.is_fatal() {
            Err(CrawlError::Session(error))
        } else {
            Ok(error)
        }
    }
}

/// How a crawl ended. Both are normal terminations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrawlOutcome {
    /// The end-of-list marker was seen.
    EndOfList,
    /// The stall budget ran out.
    #[default]
    Exhausted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub outcome: CrawlOutcome,
    pub polls: u32,
    /// Entries whose detail view was opened.
    pub visited: usize,
    pub aggregates_skipped: usize,
    pub duplicates_skipped: usize,
    /// Entries that could not be opened or read.
    pub failed: usize,
    pub records: usize,
}

/// Classification of one length observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// No entries rendered.
    Empty,
    /// New entries at positions `[from, to)`.
    Grew { from: usize, to: usize },
    /// Same or fewer entries than before.
    Unchanged,
}

/// Mutable state of one query's crawl.
#[derive(Debug, Default)]
pub struct CrawlState {
    last_count: usize,
    stalls: u32,
    ledger: DedupLedger,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed list length. `last_count` never decreases.
    pub fn observe(&mut self, count: usize) -> Observation {
        if count == 0 {
            Observation::Empty
        } else if count > self.last_count {
            let from = self.last_count;
            self.last_count = count;
            self.stalls = 0;
            Observation::Grew { from, to: count }
        } else {
            Observation::Unchanged
        }
    }

    /// Count an unproductive poll and return the running total.
    pub fn stall(&mut self) -> u32 {
        self.stalls += 1;
        self.stalls
    }

    pub fn last_count(&self) -> usize {
        self.last_count
    }

    pub fn stalls(&self) -> u32 {
        self.stalls
    }

}

/// Drives one query's result list to completion.
#[derive(Debug)]
pub struct ResultCrawler {
    scanner: EntryScanner,
    visitor: ItemVisitor,
    retry: RetryPolicy,
    poll_interval: Duration,
    stall_budget: u32,
}

impl ResultCrawler {
    pub fn new(config: &Config) -> Self {
        let timing = &config.timing;
        let retry = RetryPolicy::from_timing(timing);
        let extractor = DetailExtractor::new(&config.selectors, &config.site);
        Self {
            scanner: EntryScanner::new(&config.selectors, timing),
            visitor: ItemVisitor::new(
                extractor,
                retry,
                timing.settle_after_click(),
                timing.settle_after_back(),
            ),
            retry,
            poll_interval: timing.poll_interval(),
            stall_budget: timing.stall_budget.max(1),
        }
    }

    /// Crawl the currently displayed result list, appending each record to
    /// `sink` as soon as it is extracted.
    pub async fn crawl<S, K>(
        &self,
        session: &mut S,
        sink: &mut K,
    ) -> Result<CrawlReport, CrawlError>
    where
        S: MapSession + ?Sized,
        K: RecordSink + ?Sized,
    {
        session
            .wait_for_results()
            .await
            .map_err(CrawlError::ListUnavailable)?;

        let mut state = CrawlState::new();
        let mut report = CrawlReport::default();

        loop {
            report.polls += 1;

            let snapshot = match session.snapshot().await {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    let e = CrawlError::check(e)?;
                    debug!("Could not read result count: {}", e);
                    None
                }
            };

            match snapshot.map(|s| (s, state.observe(s.len()))) {
                Some((snapshot, Observation::Grew { from, to })) => {
                    debug!("Result list grew {} -> {}", from, to);
                    for entry in snapshot.handles_from(from) {
                        self.process_entry(session, entry, &mut state, &mut report, sink)
                            .await?;
                    }
                }
                Some((_, Observation::Unchanged)) => {
                    if let Err(e) = session.scroll_to_bottom().await {
                        let e = CrawlError::check(e)?;
                        debug!("Scroll failed: {}", e);
                    }
                    tokio::time::sleep(self.poll_interval).await;

                    match session.has_end_sentinel().await {
                        Ok(true) => {
                            info!(
                                "End of list after {} entries ({} visited)",
                                state.last_count(),
                                report.visited
                            );
                            report.outcome = CrawlOutcome::EndOfList;
                            return Ok(report);
                        }
                        Ok(false) => {}
                        Err(e) => {
                            let e = CrawlError::check(e)?;
                            debug!("End-of-list check failed: {}", e);
                        }
                    }
                    let stalls = state.stall();
                    debug!("No new entries ({}/{})", stalls, self.stall_budget);
                }
                Some((_, Observation::Empty)) | None => {
                    let stalls = state.stall();
                    debug!("Result list empty ({}/{})", stalls, self.stall_budget);
                }
            }

            if state.stalls() >= self.stall_budget {
                info!(
                    "Stopped after {} polls without new entries ({} visited)",
                    state.stalls(),
                    report.visited
                );
                report.outcome = CrawlOutcome::Exhausted;
                return Ok(report);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn process_entry<S, K>(
        &self,
        session: &mut S,
        entry: EntryHandle,
        state: &mut CrawlState,
        report: &mut CrawlReport,
        sink: &mut K,
    ) -> Result<(), CrawlError>
    where
        S: MapSession + ?Sized,
        K: RecordSink + ?Sized,
    {
        let markup = retry(
            self.retry,
            "read entry",
            session,
            |s| s.entry_markup(entry),
            DriverError::is_transient,
        )
        .await;

        let markup = match markup {
            Ok(markup) => markup,
            Err(e) => {
                let e = CrawlError::check(e)?;
                warn!(position = entry.position, "Skipping unreadable entry: {}", e);
                report.failed += 1;
                return Ok(());
            }
        };

        let fingerprint = match self.scanner.classify(&markup) {
            EntryKind::Aggregate => {
                debug!(position = entry.position, "Skipping collection entry");
                report.aggregates_skipped += 1;
                return Ok(());
            }
            EntryKind::Business(fingerprint) => fingerprint,
        };

        if state.ledger.seen(&fingerprint) {
            debug!(position = entry.position, %fingerprint, "Already visited");
            report.duplicates_skipped += 1;
            return Ok(());
        }

        let outcome = self
            .visitor
            .visit(session, entry, fingerprint, &mut state.ledger)
            .await
            .map_err(CrawlError::Session)?;

        match outcome {
            VisitOutcome::Extracted(record) => {
                sink.write_record(&record)?;
                report.visited += 1;
                report.records += 1;
                info!("Saved '{}'", record.label());
            }
            VisitOutcome::Unreadable(_) => {
                report.visited += 1;
                report.failed += 1;
            }
            VisitOutcome::Skipped(_) => report.failed += 1,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_tracks_growth_and_never_decreases() {
        let mut state = CrawlState::new();
        assert_eq!(state.observe(0), Observation::Empty);
        assert_eq!(state.observe(3), Observation::Grew { from: 0, to: 3 });
        assert_eq!(state.observe(3), Observation::Unchanged);
        assert_eq!(state.observe(2), Observation::Unchanged);
        assert_eq!(state.last_count(), 3);
        assert_eq!(state.observe(5), Observation::Grew { from: 3, to: 5 });
    }

    #[test]
    fn growth_resets_stalls() {
        let mut state = CrawlState::new();
        state.observe(1);
        assert_eq!(state.stall(), 1);
        assert_eq!(state.stall(), 2);
        state.observe(2);
        assert_eq!(state.stalls(), 0);
    }
}
