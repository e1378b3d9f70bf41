//! Search query construction.
//!
//! Each city gets one query combining the city name with the economic-impact
//! keyword phrases. Two layouts are supported:
//!
//! | Style | Example |
//! |-------|---------|
//! | [`QueryStyle::Grouped`] | `"Griffin, GA" ("job creation" OR "layoffs")` |
//! | [`QueryStyle::Plain`] | `Griffin, GA job creation OR layoffs` |
//!
//! The grouped form pins the city as an exact phrase and keeps the OR-list
//! from binding to the city, which is what makes the results relevant.

use clap::ValueEnum;

/// Cities searched when none are given on the command line.
pub const DEFAULT_CITIES: &[&str] = &[
    "Carrollton, GA",
    "Fayetteville, GA",
    "Griffin, GA",
    "Fort Walton Beach, FL",
    "Savannah, GA",
    "Valdosta, GA",
];

/// Keyword phrases OR-ed into every query.
pub const SEARCH_KEYWORDS: &[&str] = &[
    "job creation",
    "new facility",
    "business opening",
    "company expansion",
    "layoffs",
    "plant closing",
    "distribution center",
    "manufacturing plant",
    "headquarters",
];

/// Layout of the query string sent to the search API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum QueryStyle {
    /// Quoted city AND a parenthesised OR-list of quoted keywords.
    #[default]
    Grouped,
    /// City followed by the bare OR-joined keywords.
    Plain,
}

/// Build the query string for one city.
///
/// # Examples
///
/// ```ignore
/// let q = build_query("Savannah, GA", &["layoffs", "new facility"], QueryStyle::Grouped);
/// assert_eq!(q, r#""Savannah, GA" ("layoffs" OR "new facility")"#);
/// ```
pub fn build_query<S: AsRef<str>>(city: &str, keywords: &[S], style: QueryStyle) -> String {
    match style {
        QueryStyle::Grouped => {
            let ors = keywords
                .iter()
                .map(|k| format!("\"{}\"", k.as_ref()))
                .collect::<Vec<_>>()
                .join(" OR ");
            if ors.is_empty() {
                format!("\"{city}\"")
            } else {
                format!("\"{city}\" ({ors})")
            }
        }
        QueryStyle::Plain => {
            let ors = keywords
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(" OR ");
            format!("{city} {ors}").trim_end().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouped_query() {
        let q = build_query("Savannah, GA", &["layoffs", "new facility"], QueryStyle::Grouped);
        assert_eq!(q, r#""Savannah, GA" ("layoffs" OR "new facility")"#);
    }

    #[test]
    fn test_plain_query() {
        let q = build_query("Valdosta, GA", &["layoffs", "headquarters"], QueryStyle::Plain);
        assert_eq!(q, "Valdosta, GA layoffs OR headquarters");
    }

    #[test]
    fn test_query_without_keywords() {
        let none: &[&str] = &[];
        assert_eq!(build_query("Griffin, GA", none, QueryStyle::Grouped), "\"Griffin, GA\"");
        assert_eq!(build_query("Griffin, GA", none, QueryStyle::Plain), "Griffin, GA");
    }

    #[test]
    fn test_default_keywords_all_present() {
        let q = build_query("Carrollton, GA", SEARCH_KEYWORDS, QueryStyle::Grouped);
        for keyword in SEARCH_KEYWORDS {
            assert!(q.contains(&format!("\"{keyword}\"")), "missing {keyword}");
        }
        assert_eq!(q.matches(" OR ").count(), SEARCH_KEYWORDS.len() - 1);
    }

    #[test]
    fn test_default_style_is_grouped() {
        assert_eq!(QueryStyle::default(), QueryStyle::Grouped);
    }
}
