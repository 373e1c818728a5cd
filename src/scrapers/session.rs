//! Browser session capability consumed by the crawler.
//!
//! The crawler never talks to Chrome directly. Everything it needs from the
//! page (search, list length, entry markup, clicks, navigation) goes through
//! [`MapSession`], so a scripted implementation can stand in for tests.

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single session operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The element handle no longer refers to a rendered node.
    #[error("stale element: {0}")]
    Stale(String),
    /// Another element would receive the click.
    #[error("click intercepted: {0}")]
    ClickIntercepted(String),
    /// A bounded wait ran out.
    #[error("timed out waiting for {0}")]
    Timeout(String),
    #[error("element not found: {0}")]
    NotFound(String),
    /// The browser or its DevTools connection is gone.
    #[error("browser session lost: {0}")]
    SessionClosed(String),
    #[error("{0}")]
    Other(String),
}

impl DriverError {
    /// Worth another attempt after a short backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DriverError::Stale(_) | DriverError::ClickIntercepted(_) | DriverError::Timeout(_)
        )
    }

    /// Nothing else can be done with this session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::SessionClosed(_))
    }

    /// Classify a raw driver message.
    ///
    /// DevTools errors arrive as free text, so the kind is recovered from
    /// well-known fragments. Unknown messages are neither transient nor fatal.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        let fatal = [
            "browser closed",
            "target closed",
            "session closed",
            "connection closed",
            "disconnected",
            "no response from the chromium instance",
            "channel closed",
            "websocket",
        ];
        let stale = [
            "could not find node",
            "no node with given id",
            "node is detached",
            "node with given id does not belong",
            "cannot find context",
            "execution context was destroyed",
            "stale",
        ];

        if fatal.iter().any(|p| lower.contains(p)) {
            DriverError::SessionClosed(message)
        } else if stale.iter().any(|p| lower.contains(p)) {
            DriverError::Stale(message)
        } else if lower.contains("intercept") || lower.contains("not clickable") {
            DriverError::ClickIntercepted(message)
        } else if lower.contains("timeout") || lower.contains("timed out") {
            DriverError::Timeout(message)
        } else if lower.contains("not found") || lower.contains("no element") {
            DriverError::NotFound(message)
        } else {
            DriverError::Other(message)
        }
    }
}

/// Positional handle to a rendered result entry.
///
/// Handles carry no element reference; the session resolves the position
/// against the live list every time, which keeps them valid across
/// re-renders that keep the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle {
    pub position: usize,
}

impl EntryHandle {
    pub fn new(position: usize) -> Self {
        Self { position }
    }
}

/// The result list as currently rendered. Only its length is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListSnapshot {
    len: usize,
}

impl ListSnapshot {
    pub fn new(len: usize) -> Self {
        Self { len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Handles for positions `[from, len)`.
    pub fn handles_from(&self, from: usize) -> impl Iterator<Item = EntryHandle> {
        (from..self.len).map(EntryHandle::new)
    }
}

/// Operations the crawler needs from a live map page.
#[async_trait]
pub trait MapSession: Send {
    /// Navigate to the site's start page.
    async fn open(&mut self, url: &str) -> Result<(), DriverError>;

    /// Type `query` into the search box and submit it.
    async fn submit_search(&mut self, query: &str) -> Result<(), DriverError>;

    /// Wait for the result list container to render.
    ///
    /// A search with no hits never renders the container, so it fails here
    /// the same way a broken page does and the run stops.
    async fn wait_for_results(&mut self) -> Result<(), DriverError>;

    /// Current rendered entries.
    async fn snapshot(&mut self) -> Result<ListSnapshot, DriverError>;

    /// Outer markup of one entry.
    async fn entry_markup(&mut self, entry: EntryHandle) -> Result<String, DriverError>;

    /// Scroll the entry into view and click it once it is interactable.
    async fn activate(&mut self, entry: EntryHandle) -> Result<(), DriverError>;

    /// Scroll the list to its end to trigger lazy loading.
    async fn scroll_to_bottom(&mut self) -> Result<(), DriverError>;

    /// Whether the end-of-list marker is rendered.
    async fn has_end_sentinel(&mut self) -> Result<bool, DriverError>;

    /// Full markup of the current document.
    async fn document(&mut self) -> Result<String, DriverError>;

    async fn current_url(&mut self) -> Result<Option<String>, DriverError>;

    /// Return from a detail view to the result list.
    async fn back(&mut self) -> Result<(), DriverError>;

    /// Release the session. Errors are logged, not returned.
    async fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_driver_messages() {
        assert!(matches!(
            DriverError::classify("Could not find node with given id"),
            DriverError::Stale(_)
        ));
        assert!(matches!(
            DriverError::classify("Request timed out."),
            DriverError::Timeout(_)
        ));
        assert!(matches!(
            DriverError::classify("Browser closed unexpectedly"),
            DriverError::SessionClosed(_)
        ));
        assert!(matches!(
            DriverError::classify("Element is not clickable at point (10, 20)"),
            DriverError::ClickIntercepted(_)
        ));
        assert!(matches!(
            DriverError::classify("something odd"),
            DriverError::Other(_)
        ));
    }

    #[test]
    fn transient_and_fatal_are_disjoint() {
        let errors = [
            DriverError::Stale(String::new()),
            DriverError::ClickIntercepted(String::new()),
            DriverError::Timeout(String::new()),
            DriverError::NotFound(String::new()),
            DriverError::SessionClosed(String::new()),
            DriverError::Other(String::new()),
        ];
        for error in &errors {
            assert!(!(error.is_transient() && error.is_fatal()), "{error:?}");
        }
        assert_eq!(errors.iter().filter(|e| e.is_transient()).count(), 3);
    }

    #[test]
    fn snapshot_handles_cover_new_positions() {
        let snapshot = ListSnapshot::new(5);
        let positions: Vec<usize> = snapshot.handles_from(3).map(|h| h.position).collect();
        assert_eq!(positions, vec![3, 4]);
        assert_eq!(snapshot.handles_from(7).count(), 0);
    }
}
