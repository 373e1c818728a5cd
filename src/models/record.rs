//! One business as read from its detail view.

use serde::{Deserialize, Serialize};

/// Persisted column order. Field order of [`BusinessRecord`] must match.
pub const COLUMNS: [&str; 9] = [
    "name",
    "category",
    "rating",
    "rating_count",
    "website",
    "social_networks",
    "phone",
    "address",
    "source_link",
];

/// A single business listing.
///
/// Every field is optional; an absent value is written as an empty cell so
/// each row has the full column set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub name: Option<String>,
    /// Comma-joined category list.
    pub category: Option<String>,
    /// Decimal rating kept as text.
    pub rating: Option<String>,
    pub rating_count: Option<String>,
    pub website: Option<String>,
    /// Comma-joined social network links.
    #[serde(rename = "social_networks")]
    pub social_network_links: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Link to the business's own page on the map site.
    pub source_link: Option<String>,
}

impl BusinessRecord {
    /// Number of populated fields.
    pub fn filled(&self) -> usize {
        [
            &self.name,
            &self.category,
            &self.rating,
            &self.rating_count,
            &self.website,
            &self.social_network_links,
            &self.phone,
            &self.address,
            &self.source_link,
        ]
        .iter()
        .filter(|field| field.is_some())
        .count()
    }

    /// Short label for log lines.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_fields_follow_column_order() {
        let record = BusinessRecord {
            name: Some("Cafe".to_string()),
            social_network_links: Some("https://vk.com/cafe".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        let mut expected = COLUMNS.to_vec();
        expected.sort_unstable();
        let mut keys_sorted = keys.clone();
        keys_sorted.sort_unstable();
        assert_eq!(keys_sorted, expected);
        assert_eq!(record.filled(), 2);
        assert_eq!(record.label(), "Cafe");
    }
}
