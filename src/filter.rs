//! Relevance filtering of raw search items.
//!
//! Two policies exist, selected explicitly at startup:
//!
//! - [`FilterPolicy::Relevance`]: drop items whose link contains a blocked
//!   substring or whose snippet mentions none of the watch keywords. No cap.
//! - [`FilterPolicy::Lenient`]: consider only the first `per_city_cap` items
//!   and keep those with both a snippet and a link.
//!
//! Keyword and blocklist sets are plain data so the predicate can be tested
//! without any network access.

use crate::models::{SearchItem, SearchResult};
use tracing::debug;

/// Lowercase keywords, at least one of which must appear in a snippet.
pub const WATCH_KEYWORDS: &[&str] = &[
    "job creation",
    "jobs",
    "hiring",
    "new facility",
    "business opening",
    "grand opening",
    "company expansion",
    "expansion",
    "layoff",
    "layoffs",
    "plant closing",
    "closing",
    "closure",
    "distribution center",
    "manufacturing plant",
    "headquarters",
];

/// URL substrings that disqualify a result regardless of its snippet.
pub const BLOCKED_DOMAINS: &[&str] = &[
    "maps.google.com",
    "google.com/maps",
    "facebook.com",
    "instagram.com",
    "linkedin.com",
    "indeed.com",
    "glassdoor.com",
    "ziprecruiter.com",
    "yelp.com",
    "tripadvisor.com",
    "wikipedia.org",
];

/// Default cap for [`FilterPolicy::Lenient`].
pub const DEFAULT_PER_CITY_CAP: usize = 2;

/// How raw items are turned into digest entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterPolicy {
    /// Blocklist plus keyword relevance, uncapped.
    Relevance {
        /// Lowercase keywords matched against the lowercased snippet.
        watch_keywords: Vec<String>,
        /// Case-sensitive substrings matched against the link.
        blocked_domains: Vec<String>,
    },
    /// Non-empty snippet and link, first `per_city_cap` items only.
    Lenient {
        /// Maximum number of raw items inspected per city.
        per_city_cap: usize,
    },
}

impl FilterPolicy {
    /// The relevance policy with the built-in keyword and blocklist sets.
    pub fn relevance() -> Self {
        Self::Relevance {
            watch_keywords: WATCH_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            blocked_domains: BLOCKED_DOMAINS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The lenient policy with the given cap.
    pub const fn lenient(per_city_cap: usize) -> Self {
        Self::Lenient { per_city_cap }
    }

    /// Short label for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Relevance { .. } => "relevance",
            Self::Lenient { .. } => "lenient",
        }
    }

    /// Apply the policy to one city's raw items, preserving their order.
    pub fn apply(&self, city: &str, items: Vec<SearchItem>) -> Vec<SearchResult> {
        let total = items.len();
        let kept: Vec<SearchResult> = match self {
            Self::Relevance {
                watch_keywords,
                blocked_domains,
            } => items
                .into_iter()
                .filter(|item| is_relevant(item, watch_keywords, blocked_domains))
                .map(|item| SearchResult::from_item(city, item))
                .collect(),
            Self::Lenient { per_city_cap } => items
                .into_iter()
                .take(*per_city_cap)
                .filter(|item| !item.snippet.is_empty() && !item.link.is_empty())
                .map(|item| SearchResult::from_item(city, item))
                .collect(),
        };
        debug!(%city, policy = self.name(), total, kept = kept.len(), "Filtered search items");
        kept
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::relevance()
    }
}

/// Whether `link` contains any of the blocked substrings. Case-sensitive.
pub fn is_blocked<S: AsRef<str>>(link: &str, blocked_domains: &[S]) -> bool {
    blocked_domains.iter().any(|b| link.contains(b.as_ref()))
}

/// Whether the lowercased `snippet` contains at least one watch keyword.
pub fn mentions_keyword<S: AsRef<str>>(snippet: &str, watch_keywords: &[S]) -> bool {
    let lowered = snippet.to_lowercase();
    watch_keywords.iter().any(|k| lowered.contains(k.as_ref()))
}

/// The relevance predicate: link not blocked and snippet mentions a keyword.
pub fn is_relevant<S: AsRef<str>>(
    item: &SearchItem,
    watch_keywords: &[S],
    blocked_domains: &[S],
) -> bool {
    !is_blocked(&item.link, blocked_domains) && mentions_keyword(&item.snippet, watch_keywords)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYWORDS: &[&str] = &["layoffs", "new facility", "headquarters"];
    const BLOCKED: &[&str] = &["maps.google.com", "facebook.com"];

    #[test]
    fn test_savannah_example_passes() {
        let item = SearchItem::new(
            "https://example.com/news/1",
            "Company announces layoffs at Savannah plant",
        );
        assert!(is_relevant(&item, KEYWORDS, BLOCKED));
    }

    #[test]
    fn test_blocked_link_rejected_regardless_of_snippet() {
        let item = SearchItem::new("https://maps.google.com/x", "layoffs new facility headquarters");
        assert!(!is_relevant(&item, KEYWORDS, BLOCKED));

        let policy = FilterPolicy::relevance();
        assert!(policy.apply("Savannah, GA", vec![item]).is_empty());
    }

    #[test]
    fn test_each_keyword_accepts() {
        for keyword in KEYWORDS {
            let item = SearchItem::new("https://example.com/a", format!("Local story about {keyword} today"));
            assert!(is_relevant(&item, KEYWORDS, BLOCKED), "keyword {keyword} should match");
        }
    }

    #[test]
    fn test_each_blocked_substring_rejects() {
        for blocked in BLOCKED {
            let item = SearchItem::new(format!("https://{blocked}/page"), "Major layoffs announced");
            assert!(!is_relevant(&item, KEYWORDS, BLOCKED), "{blocked} should be blocked");
        }
    }

    #[test]
    fn test_keyword_match_is_case_insensitive_on_snippet() {
        let item = SearchItem::new("https://example.com/a", "NEW FACILITY breaks ground");
        assert!(is_relevant(&item, KEYWORDS, BLOCKED));
    }

    #[test]
    fn test_blocklist_is_case_sensitive() {
        assert!(is_blocked("https://maps.google.com/x", BLOCKED));
        assert!(!is_blocked("https://MAPS.GOOGLE.COM/x", BLOCKED));
    }

    #[test]
    fn test_snippet_without_keyword_rejected() {
        let item = SearchItem::new("https://example.com/a", "Weather will be sunny this weekend");
        assert!(!is_relevant(&item, KEYWORDS, BLOCKED));
    }

    #[test]
    fn test_missing_fields_rejected() {
        let item = SearchItem::default();
        assert!(!is_relevant(&item, KEYWORDS, BLOCKED));
    }

    #[test]
    fn test_relevance_policy_tags_city_and_keeps_order() {
        let policy = FilterPolicy::Relevance {
            watch_keywords: KEYWORDS.iter().map(|s| s.to_string()).collect(),
            blocked_domains: BLOCKED.iter().map(|s| s.to_string()).collect(),
        };
        let items = vec![
            SearchItem::new("https://a.example/1", "Layoffs at the mill"),
            SearchItem::new("https://facebook.com/post", "Layoffs rumor"),
            SearchItem::new("https://b.example/2", "Pet adoption event"),
            SearchItem::new("https://c.example/3", "New headquarters downtown"),
            SearchItem::new("https://d.example/4", "Another new facility"),
        ];

        let results = policy.apply("Griffin, GA", items);
        let links: Vec<_> = results.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(links, ["https://a.example/1", "https://c.example/3", "https://d.example/4"]);
        assert!(results.iter().all(|r| r.city == "Griffin, GA"));
    }

    #[test]
    fn test_lenient_policy_caps_and_requires_fields() {
        let policy = FilterPolicy::lenient(2);
        let items = vec![
            SearchItem::new("https://a.example/1", "Anything at all"),
            SearchItem::new("", "No link"),
            SearchItem::new("https://c.example/3", "Third item never inspected"),
        ];

        let results = policy.apply("Valdosta, GA", items);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].link, "https://a.example/1");
        assert_eq!(results[0].city, "Valdosta, GA");
    }

    #[test]
    fn test_lenient_policy_ignores_keywords_and_blocklist() {
        let policy = FilterPolicy::lenient(DEFAULT_PER_CITY_CAP);
        let items = vec![SearchItem::new("https://maps.google.com/x", "Sunny weather")];
        assert_eq!(policy.apply("Savannah, GA", items).len(), 1);
    }

    #[test]
    fn test_default_policy_is_relevance() {
        assert_eq!(FilterPolicy::default().name(), "relevance");
    }

    #[test]
    fn test_builtin_watch_keywords_are_lowercase() {
        for keyword in WATCH_KEYWORDS {
            assert_eq!(*keyword, keyword.to_lowercase());
        }
    }

    fn alternate_case(s: &str) -> String {
        s.chars()
            .enumerate()
            .map(|(i, c)| if i % 2 == 0 { c.to_ascii_uppercase() } else { c })
            .collect()
    }

    #[test]
    fn test_relevance_policy_accepts_every_watch_keyword_in_any_case() {
        let policy = FilterPolicy::relevance();
        for keyword in WATCH_KEYWORDS {
            for snippet in [
                format!("City council notes {} downtown", keyword.to_uppercase()),
                format!("City council notes {} downtown", alternate_case(keyword)),
            ] {
                let items = vec![SearchItem::new("https://example.com/story", snippet.clone())];
                let kept = policy.apply("Savannah, GA", items);
                assert_eq!(kept.len(), 1, "snippet {snippet:?} should be kept");
            }
        }
    }

    #[test]
    fn test_relevance_policy_rejects_every_blocked_domain() {
        let policy = FilterPolicy::relevance();
        for domain in BLOCKED_DOMAINS {
            let link = format!("https://{domain}/savannah-plant");
            let items = vec![SearchItem::new(
                link.clone(),
                "Company announces Layoffs at Savannah plant",
            )];
            assert!(
                policy.apply("Savannah, GA", items).is_empty(),
                "link {link:?} should be blocked"
            );
        }
    }
}
