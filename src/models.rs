//! Data models for search responses and digest entries.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SearchResponse`] / [`SearchItem`]: Raw JSON returned by the Custom Search API
//! - [`SearchResult`]: A filtered, city-tagged entry that goes into the digest
//!
//! Only `link` and `snippet` are read from each item; serde ignores the rest.

use serde::Deserialize;

/// Top-level body of a Custom Search JSON API response.
///
/// Only `items` matters to the digest. The API omits the field entirely when
/// a query has no hits, so it defaults to an empty list.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    /// The result items, in ranking order.
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

/// One raw item from a search response.
///
/// Every field is optional on the wire; missing values deserialize to an
/// empty string so filters never have to deal with `Option`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SearchItem {
    /// Absolute URL of the result.
    #[serde(default)]
    pub link: String,
    /// Short text excerpt describing the result.
    #[serde(default)]
    pub snippet: String,
}

#[cfg(test)]
impl SearchItem {
    pub fn new(link: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            snippet: snippet.into(),
        }
    }
}

/// A search hit that passed filtering, tagged with the city it was found for.
///
/// These are created once per accepted [`SearchItem`] and moved straight into
/// the run's aggregate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// The city whose query produced this result, e.g. `"Savannah, GA"`.
    pub city: String,
    /// The snippet text.
    pub summary: String,
    /// The result URL.
    pub link: String,
}

impl SearchResult {
    /// Build a result for `city` from a raw item, consuming the item.
    pub fn from_item(city: &str, item: SearchItem) -> Self {
        Self {
            city: city.to_string(),
            summary: item.snippet,
            link: item.link,
        }
    }
}
