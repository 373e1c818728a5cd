//! Site description: start page plus the CSS selector table.
//!
//! Defaults target Yandex Maps. Other map/directory sites only need a
//! different `[site]` and `[selectors]` table.

use serde::{Deserialize, Serialize};

/// Where the crawl starts (`[site]` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Page opened before the first query.
    pub start_url: String,
    /// Base for resolving relative detail links.
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            start_url: "https://yandex.ru/maps/".to_string(),
            base_url: "https://yandex.ru".to_string(),
        }
    }
}

/// Structural queries for the list view and the detail view (`[selectors]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorTable {
    // List view
    pub search_input: String,
    pub result_list: String,
    pub result_item: String,
    /// Element inside an entry that receives the click. `None` clicks the
    /// entry itself.
    pub click_target: Option<String>,
    /// Class fragment marking an aggregate ("collection") entry.
    pub aggregate_class: String,
    /// Attributes holding a stable site identifier, tried in order.
    pub identity_attributes: Vec<String>,
    /// Text rendered once the list has no more entries.
    pub end_sentinel: String,

    // Detail view
    pub source_link: String,
    pub name: String,
    pub category: String,
    pub rating: String,
    pub rating_count: String,
    pub phone: String,
    pub address: String,
    pub website: String,
    pub social_links: String,
}

impl Default for SelectorTable {
    fn default() -> Self {
        Self {
            search_input: "input[placeholder='Поиск и выбор мест']".to_string(),
            result_list: "ul.search-list-view__list".to_string(),
            result_item: "ul.search-list-view__list > li".to_string(),
            click_target: Some(":scope > div".to_string()),
            aggregate_class: "_type_collection".to_string(),
            identity_attributes: vec!["data-id".to_string(), "data-object-id".to_string()],
            end_sentinel: "Добавьте организацию или объект".to_string(),
            source_link: ".card-title-view__title-link".to_string(),
            name: ".orgpage-header-view__header".to_string(),
            category: ".business-categories-view__category".to_string(),
            rating: ".business-header-rating-view > div:nth-child(1) > div:nth-child(2) > span:nth-child(2)"
                .to_string(),
            rating_count: ".business-header-rating-view__text".to_string(),
            phone: ".orgpage-phones-view__phone-number".to_string(),
            address: ".orgpage-header-view__address > div:nth-child(1)".to_string(),
            website: ".business-urls-view__link".to_string(),
            social_links: "div._view_normal:nth-child(4) > div:nth-child(1) > div:nth-child(1) > div:nth-child(2) > div:nth-child(1)"
                .to_string(),
        }
    }
}
