//! Static inspection of one result entry's markup.
//!
//! Decides whether an entry is an aggregate ("collection") card and, for
//! ordinary entries, derives the fingerprint the dedup ledger is keyed by.

use std::collections::VecDeque;
use std::fmt;

use scraper::{ElementRef, Html};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::{SelectorTable, Timing};

/// Hex characters kept from the markup digest.
const HASH_PREFIX_LEN: usize = 16;

/// Identifying string for an entry.
///
/// `id:` prefixes a site-provided identifier, `h:` a markup digest, so the
/// two kinds never collide with each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryFingerprint(String);

impl EntryFingerprint {
    pub fn from_identity(value: &str) -> Self {
        Self(format!("id:{}", value.trim()))
    }

    pub fn from_markup(markup: &str) -> Self {
        let normalized = markup.split_whitespace().collect::<Vec<_>>().join(" ");
        let digest = hex::encode(Sha256::digest(normalized.as_bytes()));
        Self(format!("h:{}", &digest[..HASH_PREFIX_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What an entry turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// Groups several businesses; never visited.
    Aggregate,
    Business(EntryFingerprint),
}

/// Classifies entry markup using the configured markers.
#[derive(Debug, Clone)]
pub struct EntryScanner {
    aggregate_class: String,
    identity_attributes: Vec<String>,
    max_depth: usize,
}

impl EntryScanner {
    pub fn new(selectors: &SelectorTable, timing: &Timing) -> Self {
        Self {
            aggregate_class: selectors.aggregate_class.clone(),
            identity_attributes: selectors.identity_attributes.clone(),
            max_depth: timing.max_scan_depth,
        }
    }

    pub fn classify(&self, markup: &str) -> EntryKind {
        let fragment = Html::parse_fragment(markup);
        let Some(entry) = fragment
            .root_element()
            .children()
            .find_map(ElementRef::wrap)
        else {
            return EntryKind::Business(EntryFingerprint::from_markup(markup));
        };

        if self.is_aggregate(entry) {
            return EntryKind::Aggregate;
        }
        EntryKind::Business(self.fingerprint(entry))
    }

    /// Depth-bounded walk looking for the aggregate class marker.
    fn is_aggregate(&self, entry: ElementRef<'_>) -> bool {
        if self.aggregate_class.is_empty() {
            return false;
        }

        let mut stack = vec![(entry, 0usize)];
        let mut truncated = false;
        while let Some((element, depth)) = stack.pop() {
            let marked = element
                .value()
                .attr("class")
                .is_some_and(|class| class.contains(&self.aggregate_class));
            if marked {
                return true;
            }
            if depth >= self.max_depth {
                truncated = true;
                continue;
            }
            stack.extend(
                element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .map(|child| (child, depth + 1)),
            );
        }

        if truncated {
            debug!("Aggregate scan stopped at depth {}", self.max_depth);
        }
        false
    }

    /// Site identifier when one is exposed, otherwise a digest of the
    /// entry's first element child.
    fn fingerprint(&self, entry: ElementRef<'_>) -> EntryFingerprint {
        if let Some(id) = self.site_identity(entry) {
            return EntryFingerprint::from_identity(id);
        }

        let card = entry.children().find_map(ElementRef::wrap).unwrap_or(entry);
        EntryFingerprint::from_markup(&card.html())
    }

    /// Breadth-first search for the first configured identity attribute.
    fn site_identity<'a>(&self, entry: ElementRef<'a>) -> Option<&'a str> {
        if self.identity_attributes.is_empty() {
            return None;
        }

        let mut queue = VecDeque::from([(entry, 0usize)]);
        while let Some((element, depth)) = queue.pop_front() {
            for name in &self.identity_attributes {
                if let Some(value) = element.value().attr(name) {
                    if !value.trim().is_empty() {
                        return Some(value);
                    }
                }
            }
            if depth < self.max_depth {
                queue.extend(
                    element
                        .children()
                        .filter_map(ElementRef::wrap)
                        .map(|child| (child, depth + 1)),
                );
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> EntryScanner {
        EntryScanner::new(&SelectorTable::default(), &Timing::default())
    }

    #[test]
    fn detects_nested_collection_marker() {
        let markup = r#"<li><div class="search-snippet-view">
            <div><div class="card _type_collection"><a>Best coffee</a></div></div>
        </div></li>"#;
        assert_eq!(scanner().classify(markup), EntryKind::Aggregate);
    }

    #[test]
    fn ordinary_entry_is_a_business() {
        let markup = r#"<li><div class="search-snippet-view"><b>Coffee House</b></div></li>"#;
        assert!(matches!(scanner().classify(markup), EntryKind::Business(_)));
    }

    #[test]
    fn scan_depth_is_bounded() {
        let mut timing = Timing::default();
        timing.max_scan_depth = 2;
        let scanner = EntryScanner::new(&SelectorTable::default(), &timing);
        let deep = r#"<li><div><div><div><div class="_type_collection"></div></div></div></div></li>"#;
        assert!(matches!(scanner.classify(deep), EntryKind::Business(_)));
        let shallow = r#"<li><div><div class="_type_collection"></div></div></li>"#;
        assert_eq!(scanner.classify(shallow), EntryKind::Aggregate);
    }

    #[test]
    fn prefers_site_identifier() {
        let a = r#"<li><div class="card"><span data-id="1124715036">Cafe</span></div></li>"#;
        let b = r#"<li><div class="card active"><span data-id="1124715036">Cafe </span></div></li>"#;
        let fa = scanner().classify(a);
        assert_eq!(fa, scanner().classify(b));
        assert_eq!(
            fa,
            EntryKind::Business(EntryFingerprint::from_identity("1124715036"))
        );
    }

    #[test]
    fn digest_ignores_whitespace_layout() {
        let a = "<li><div class=\"card\">\n   <b>Cafe</b>\n</div></li>";
        let b = "<li><div class=\"card\"> <b>Cafe</b> </div></li>";
        let c = "<li><div class=\"card\"><b>Bakery</b></div></li>";
        let scanner = scanner();
        assert_eq!(scanner.classify(a), scanner.classify(b));
        assert_ne!(scanner.classify(a), scanner.classify(c));

        let EntryKind::Business(fp) = scanner.classify(c) else {
            panic!("expected business entry");
        };
        assert!(fp.as_str().starts_with("h:"));
        assert_eq!(fp.as_str().len(), 2 + HASH_PREFIX_LEN);
    }
}
