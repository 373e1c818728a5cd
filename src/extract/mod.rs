//! Detail view extraction.
//!
//! Each field has its own selector and is read independently: a missing or
//! broken fragment empties that one field and nothing else.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::config::{SelectorTable, SiteConfig};
use crate::models::BusinessRecord;

/// Separator for multi-valued fields.
const LIST_SEPARATOR: &str = ",";

/// Compiled detail-view selectors. `None` means the field is never filled.
#[derive(Debug)]
struct FieldSelectors {
    source_link: Option<Selector>,
    name: Option<Selector>,
    category: Option<Selector>,
    rating: Option<Selector>,
    rating_count: Option<Selector>,
    phone: Option<Selector>,
    address: Option<Selector>,
    website: Option<Selector>,
    social_links: Option<Selector>,
}

impl FieldSelectors {
    fn compile(table: &SelectorTable) -> Self {
        Self {
            source_link: compile("source_link", &table.source_link),
            name: compile("name", &table.name),
            category: compile("category", &table.category),
            rating: compile("rating", &table.rating),
            rating_count: compile("rating_count", &table.rating_count),
            phone: compile("phone", &table.phone),
            address: compile("address", &table.address),
            website: compile("website", &table.website),
            social_links: compile("social_links", &table.social_links),
        }
    }
}

fn compile(field: &'static str, css: &str) -> Option<Selector> {
    if css.trim().is_empty() {
        debug!(field, "No selector configured");
        return None;
    }
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!(field, "Invalid selector '{}', field will stay empty: {:?}", css, e);
            None
        }
    }
}

/// Turns a rendered detail document into a [`BusinessRecord`].
#[derive(Debug)]
pub struct DetailExtractor {
    fields: FieldSelectors,
    base_url: Option<Url>,
}

impl DetailExtractor {
    pub fn new(selectors: &SelectorTable, site: &SiteConfig) -> Self {
        let base_url = match Url::parse(&site.base_url) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Invalid base URL '{}': {}", site.base_url, e);
                None
            }
        };
        Self {
            fields: FieldSelectors::compile(selectors),
            base_url,
        }
    }

    /// Extract every field from `document`. `page_url` is the session's
    /// current URL, used when the page has no title link.
    pub fn extract(&self, document: &str, page_url: Option<&str>) -> BusinessRecord {
        let html = Html::parse_document(document);
        let f = &self.fields;

        let source_link = first(&html, &f.source_link)
            .and_then(|el| el.value().attr("href"))
            .map(|href| self.resolve(href))
            .or_else(|| page_url.map(str::to_string))
            .and_then(non_empty);

        BusinessRecord {
            name: first(&html, &f.name).and_then(text_of),
            category: all(&html, &f.category)
                .map(|els| join_list(els.into_iter().filter_map(text_of)))
                .and_then(non_empty),
            rating: first(&html, &f.rating).and_then(text_of),
            rating_count: first(&html, &f.rating_count)
                .and_then(text_of)
                .and_then(|text| text.split_whitespace().next().map(str::to_string)),
            website: first(&html, &f.website).and_then(href_of),
            social_network_links: first(&html, &f.social_links)
                .map(|container| join_list(anchor_hrefs(container)))
                .and_then(non_empty),
            phone: first(&html, &f.phone).and_then(text_of),
            address: first(&html, &f.address).and_then(text_of),
            source_link,
        }
    }

    fn resolve(&self, href: &str) -> String {
        match &self.base_url {
            Some(base) => base
                .join(href)
                .map(|url| url.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }
}

fn first<'a>(html: &'a Html, selector: &Option<Selector>) -> Option<ElementRef<'a>> {
    selector.as_ref().and_then(|s| html.select(s).next())
}

fn all<'a>(html: &'a Html, selector: &Option<Selector>) -> Option<Vec<ElementRef<'a>>> {
    selector.as_ref().map(|s| html.select(s).collect())
}

/// Text content with whitespace runs collapsed to single spaces.
fn text_of(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    non_empty(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// `href` of the element, or of the first anchor inside it.
fn href_of(element: ElementRef<'_>) -> Option<String> {
    element
        .value()
        .attr("href")
        .map(str::to_string)
        .or_else(|| anchor_hrefs(element).into_iter().next())
        .and_then(non_empty)
}

fn anchor_hrefs(container: ElementRef<'_>) -> Vec<String> {
    container
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "a")
        .filter_map(|el| el.value().attr("href"))
        .map(|href| href.trim().to_string())
        .collect()
}

/// Trim, drop empties and repeats, join in first-seen order.
fn join_list(values: impl IntoIterator<Item = String>) -> String {
    let mut kept: Vec<String> = Vec::new();
    for value in values {
        for piece in value.split(LIST_SEPARATOR) {
            let piece = piece.trim();
            if !piece.is_empty() && !kept.iter().any(|k| k == piece) {
                kept.push(piece.to_string());
            }
        }
    }
    kept.join(LIST_SEPARATOR)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}
