//! Opening one entry's detail view and reading it.

use std::time::Duration;

use tracing::{debug, warn};

use super::entry::EntryFingerprint;
use super::ledger::DedupLedger;
use crate::extract::DetailExtractor;
use crate::models::BusinessRecord;
use crate::scrapers::retry::{retry, RetryPolicy};
use crate::scrapers::session::{DriverError, EntryHandle, MapSession};

/// Result of visiting a single entry.
#[derive(Debug)]
pub enum VisitOutcome {
    /// Detail view read; record ready to persist.
    Extracted(Box<BusinessRecord>),
    /// Entry opened but its detail view could not be read.
    Unreadable(DriverError),
    /// Entry could not be opened.
    Skipped(DriverError),
}

/// Activates entries and hands their detail view to the extractor.
#[derive(Debug)]
pub struct ItemVisitor {
    extractor: DetailExtractor,
    retry: RetryPolicy,
    settle_after_click: Duration,
    settle_after_back: Duration,
}

impl ItemVisitor {
    pub fn new(
        extractor: DetailExtractor,
        retry: RetryPolicy,
        settle_after_click: Duration,
        settle_after_back: Duration,
    ) -> Self {
        Self {
            extractor,
            retry,
            settle_after_click,
            settle_after_back,
        }
    }

    /// Visit `entry`. Only session-fatal failures are returned as errors;
    /// anything else is reported in the outcome.
    pub async fn visit<S>(
        &self,
        session: &mut S,
        entry: EntryHandle,
        fingerprint: EntryFingerprint,
        ledger: &mut DedupLedger,
    ) -> Result<VisitOutcome, DriverError>
    where
        S: MapSession + ?Sized,
    {
        let activated = retry(
            self.retry,
            "activate entry",
            session,
            |s| s.activate(entry),
            DriverError::is_transient,
        )
        .await;

        if let Err(e) = activated {
            if e.is_fatal() {
                return Err(e);
            }
            warn!(position = entry.position, "Skipping entry: {}", e);
            return Ok(VisitOutcome::Skipped(e));
        }

        debug!(position = entry.position, %fingerprint, "Opened entry");
        ledger.record(fingerprint);
        tokio::time::sleep(self.settle_after_click).await;

        let outcome = match session.document().await {
            Ok(document) => {
                let page_url = match session.current_url().await {
                    Ok(url) => url,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        debug!("Could not read current URL: {}", e);
                        None
                    }
                };
                let record = self.extractor.extract(&document, page_url.as_deref());
                debug!(
                    position = entry.position,
                    "Extracted '{}' ({} fields)",
                    record.label(),
                    record.filled()
                );
                VisitOutcome::Extracted(Box::new(record))
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(position = entry.position, "Could not read detail view: {}", e);
                VisitOutcome::Unreadable(e)
            }
        };

        if let Err(e) = session.back().await {
            if e.is_fatal() {
                return Err(e);
            }
            warn!("Navigating back to the list failed: {}", e);
        }
        tokio::time::sleep(self.settle_after_back).await;

        Ok(outcome)
    }
}
