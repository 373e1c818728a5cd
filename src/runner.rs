//! Query batch execution.

use std::path::Path;
use std::time::Duration;

use futures::FutureExt;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::crawler::{CrawlError, CrawlOutcome, CrawlReport, ResultCrawler};
use crate::scrapers::retry::{retry, RetryPolicy};
use crate::scrapers::session::{DriverError, MapSession};
use crate::storage::RecordSink;

/// Totals for one batch of queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub queries_attempted: usize,
    /// Queries whose search could not be submitted.
    pub queries_skipped: usize,
    pub queries_completed: usize,
    /// Completed crawls that reached the end-of-list marker.
    pub reached_end: usize,
    pub entries_visited: usize,
    pub entries_failed: usize,
    pub records_written: usize,
}

impl RunSummary {
    fn absorb(&mut self, report: &CrawlReport) {
        self.queries_completed += 1;
        if report.outcome == CrawlOutcome::EndOfList {
            self.reached_end += 1;
        }
        self.entries_visited += report.visited;
        self.entries_failed += report.failed;
        self.records_written += report.records;
    }
}

/// A session-fatal failure, with what was achieved before it.
#[derive(Debug, Error)]
#[error("run aborted during query '{query}': {source}")]
pub struct RunAborted {
    pub query: String,
    pub summary: RunSummary,
    #[source]
    pub source: CrawlError,
}

/// Read queries from a text file, one per line. Lines are trimmed and blank
/// lines dropped.
pub fn read_queries(path: &Path) -> std::io::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_queries(&contents))
}

fn parse_queries(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Runs each query through search and a full result crawl.
#[derive(Debug)]
pub struct QueryRunner {
    crawler: ResultCrawler,
    start_url: String,
    start_page_settle: Duration,
    retry: RetryPolicy,
}

impl QueryRunner {
    pub fn new(config: &Config) -> Self {
        Self {
            crawler: ResultCrawler::new(config),
            start_url: config.site.start_url.clone(),
            start_page_settle: config.timing.start_page_settle(),
            retry: RetryPolicy::from_timing(&config.timing),
        }
    }

    /// Run `queries` in order. A query whose search cannot be submitted is
    /// skipped; a lost session ends the run.
    pub async fn run<S, K>(
        &self,
        session: &mut S,
        queries: &[String],
        sink: &mut K,
    ) -> Result<RunSummary, RunAborted>
    where
        S: MapSession + ?Sized,
        K: RecordSink + ?Sized,
    {
        let mut summary = RunSummary::default();

        info!("Opening {}", self.start_url);
        if let Err(e) = session.open(&self.start_url).await {
            error!("Could not open start page: {}", e);
            return Err(RunAborted {
                query: queries.first().cloned().unwrap_or_default(),
                summary,
                source: CrawlError::Session(e),
            });
        }
        tokio::time::sleep(self.start_page_settle).await;

        for (index, query) in queries.iter().enumerate() {
            info!("Processing query {}/{}: '{}'", index + 1, queries.len(), query);
            summary.queries_attempted += 1;

            let submitted = retry(
                self.retry,
                "submit search",
                session,
                |s| {
                    let query = query.clone();
                    async move { s.submit_search(&query).await }.boxed()
                },
                DriverError::is_transient,
            )
            .await;

            if let Err(e) = submitted {
                if e.is_fatal() {
                    error!("Browser session lost: {}", e);
                    return Err(RunAborted {
                        query: query.clone(),
                        summary,
                        source: CrawlError::Session(e),
                    });
                }
                warn!("Skipping query '{}': search failed: {}", query, e);
                summary.queries_skipped += 1;
                continue;
            }

            match self.crawler.crawl(session, sink).await {
                Ok(report) => {
                    info!(
                        "Query '{}' done: {} records, {} aggregates skipped, {} failed ({:?})",
                        query,
                        report.records,
                        report.aggregates_skipped,
                        report.failed,
                        report.outcome
                    );
                    summary.absorb(&report);
                }
                Err(source) => {
                    error!("Query '{}' aborted: {}", query, source);
                    return Err(RunAborted {
                        query: query.clone(),
                        summary,
                        source,
                    });
                }
            }
        }

        Ok(summary)
    }
}
