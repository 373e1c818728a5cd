//! Scripted in-memory map session shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use bizcrawl::config::Config;
use bizcrawl::scrapers::{DriverError, EntryHandle, ListSnapshot, MapSession};

pub const START_URL: &str = "https://maps.example/";

/// Test config: default selectors, site pointing at `maps.example`.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.site.start_url = START_URL.to_string();
    config.site.base_url = "https://maps.example".to_string();
    config
}

/// A plain business entry as rendered in the result list.
pub fn business_entry(id: &str, name: &str) -> String {
    format!(
        r#"<li class="search-snippet"><div class="search-snippet-view" data-id="{id}">
             <div class="search-business-snippet-view__title">{name}</div>
           </div></li>"#
    )
}

/// A business entry without any site identifier.
pub fn anonymous_entry(name: &str) -> String {
    format!(r#"<li><div class="search-snippet-view"><b>{name}</b></div></li>"#)
}

/// A collection card grouping several businesses.
pub fn aggregate_entry(title: &str) -> String {
    format!(
        r#"<li><div class="search-snippet-view">
             <div class="search-collection-snippet-view _type_collection">{title}</div>
           </div></li>"#
    )
}

/// Detail view document; `rating` of `None` leaves the rating block out.
pub fn detail_page(id: &str, name: &str, address: &str, rating: Option<&str>) -> String {
    let rating_block = rating
        .map(|r| {
            format!(
                r#"<div class="business-header-rating-view">
                     <div><div>★</div><div><span>Rating</span><span>{r}</span></div></div>
                     <div class="business-header-rating-view__text">12 ratings</div>
                   </div>"#
            )
        })
        .unwrap_or_default();
    format!(
        r#"<html><body>
             <a class="card-title-view__title-link" href="/org/{id}/">{name}</a>
             <h1 class="orgpage-header-view__header">{name}</h1>
             <div class="orgpage-header-view__address"><div>{address}</div></div>
             {rating_block}
             <div class="orgpage-phones-view__phone-number">+7 000 000-00-00</div>
           </body></html>"#
    )
}

/// Builds `n` identified entries with matching detail pages.
pub fn businesses(n: usize) -> (Vec<String>, Vec<String>) {
    (0..n)
        .map(|i| {
            let id = format!("{}", 1000 + i);
            let name = format!("Business {}", i);
            (
                business_entry(&id, &name),
                detail_page(&id, &name, &format!("Street {}", i), Some("4.5")),
            )
        })
        .unzip()
}

/// Replays a scripted result list.
///
/// Snapshot lengths come from `counts` in order, the last value repeating.
/// The script restarts on every submitted search.
pub struct ScriptedSession {
    entries: Vec<String>,
    details: Vec<String>,
    count_script: Vec<usize>,
    counts: VecDeque<usize>,
    current_count: usize,
    sentinel: bool,
    list_appears: bool,
    activation_failures: HashMap<usize, VecDeque<DriverError>>,
    search_failures: HashMap<String, DriverError>,
    document_failures: HashMap<usize, DriverError>,
    snapshot_failures: VecDeque<DriverError>,
    viewing: Option<usize>,

    /// Every URL passed to `open`.
    pub opened: Vec<String>,
    /// Every search submission attempt, in order.
    pub searches: Vec<String>,
    /// Every activation attempt, in order.
    pub activation_attempts: Vec<usize>,
    /// Positions successfully opened, in order.
    pub activated: Vec<usize>,
    /// Lengths reported by each snapshot.
    pub observed: Vec<usize>,
    pub back_calls: usize,
    pub closed: bool,
}

impl ScriptedSession {
    pub fn new(entries: Vec<String>, details: Vec<String>) -> Self {
        let len = entries.len();
        Self {
            entries,
            details,
            count_script: vec![len],
            counts: VecDeque::from([len]),
            current_count: 0,
            sentinel: false,
            list_appears: true,
            activation_failures: HashMap::new(),
            search_failures: HashMap::new(),
            document_failures: HashMap::new(),
            snapshot_failures: VecDeque::new(),
            viewing: None,
            opened: Vec::new(),
            searches: Vec::new(),
            activation_attempts: Vec::new(),
            activated: Vec::new(),
            observed: Vec::new(),
            back_calls: 0,
            closed: false,
        }
    }

    pub fn with_counts(mut self, counts: &[usize]) -> Self {
        self.count_script = counts.to_vec();
        self.counts = counts.iter().copied().collect();
        self
    }

    pub fn with_sentinel(mut self) -> Self {
        self.sentinel = true;
        self
    }

    pub fn without_list(mut self) -> Self {
        self.list_appears = false;
        self
    }

    /// Fail activations of `position` with `errors`, one per attempt.
    pub fn failing_activation(mut self, position: usize, errors: Vec<DriverError>) -> Self {
        self.activation_failures
            .insert(position, errors.into_iter().collect());
        self
    }

    /// Fail every search for `query` with `error`.
    pub fn failing_search(mut self, query: &str, error: DriverError) -> Self {
        self.search_failures.insert(query.to_string(), error);
        self
    }

    /// Fail every detail read of `position` with `error`.
    pub fn failing_document(mut self, position: usize, error: DriverError) -> Self {
        self.document_failures.insert(position, error);
        self
    }

    /// Fail the next snapshots with `errors`, one per call, before the
    /// count script is consulted.
    pub fn failing_snapshot(mut self, errors: Vec<DriverError>) -> Self {
        self.snapshot_failures = errors.into_iter().collect();
        self
    }

    fn next_count(&mut self) -> usize {
        if self.counts.len() > 1 {
            self.counts.pop_front().unwrap_or(0)
        } else {
            self.counts.front().copied().unwrap_or(0)
        }
    }
}

#[async_trait]
impl MapSession for ScriptedSession {
    async fn open(&mut self, url: &str) -> Result<(), DriverError> {
        self.opened.push(url.to_string());
        Ok(())
    }

    async fn submit_search(&mut self, query: &str) -> Result<(), DriverError> {
        self.searches.push(query.to_string());
        if let Some(error) = self.search_failures.get(query) {
            return Err(error.clone());
        }
        self.counts = self.count_script.iter().copied().collect();
        self.current_count = 0;
        self.viewing = None;
        Ok(())
    }

    async fn wait_for_results(&mut self) -> Result<(), DriverError> {
        if self.list_appears {
            Ok(())
        } else {
            Err(DriverError::Timeout("result list".to_string()))
        }
    }

    async fn snapshot(&mut self) -> Result<ListSnapshot, DriverError> {
        if let Some(error) = self.snapshot_failures.pop_front() {
            return Err(error);
        }
        let count = self.next_count().min(self.entries.len());
        self.current_count = count;
        self.observed.push(count);
        Ok(ListSnapshot::new(count))
    }

    async fn entry_markup(&mut self, entry: EntryHandle) -> Result<String, DriverError> {
        if entry.position >= self.current_count {
            return Err(DriverError::Stale(format!("entry {}", entry.position)));
        }
        Ok(self.entries[entry.position].clone())
    }

    async fn activate(&mut self, entry: EntryHandle) -> Result<(), DriverError> {
        self.activation_attempts.push(entry.position);
        if let Some(errors) = self.activation_failures.get_mut(&entry.position) {
            if let Some(error) = errors.pop_front() {
                return Err(error);
            }
        }
        self.activated.push(entry.position);
        self.viewing = Some(entry.position);
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn has_end_sentinel(&mut self) -> Result<bool, DriverError> {
        Ok(self.sentinel)
    }

    async fn document(&mut self) -> Result<String, DriverError> {
        match self.viewing {
            Some(position) => match self.document_failures.get(&position) {
                Some(error) => Err(error.clone()),
                None => Ok(self.details[position].clone()),
            },
            None => Ok("<html><body><ul class=\"search-list-view__list\"></ul></body></html>".to_string()),
        }
    }

    async fn current_url(&mut self) -> Result<Option<String>, DriverError> {
        Ok(Some(match self.viewing {
            Some(position) => format!("{}org/{}/", START_URL, position),
            None => START_URL.to_string(),
        }))
    }

    async fn back(&mut self) -> Result<(), DriverError> {
        self.back_calls += 1;
        self.viewing = None;
        Ok(())
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}
