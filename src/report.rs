//! HTML digest generation.
//!
//! The digest is a flat HTML fragment: a heading, the human-readable date and
//! an unordered list with one entry per result. Values are inserted verbatim
//! in input order, so the same results and date always give the same bytes.

use crate::models::SearchResult;
use chrono::NaiveDate;
use std::fmt::Write;

/// Heading at the top of every digest.
pub const REPORT_TITLE: &str = "📊 Daily Market Intelligence Report";

/// Subject line of the digest email.
pub const EMAIL_SUBJECT: &str = "📊 Daily Market Growth Report";

/// Format a date the way the digest header shows it, e.g. `October 17, 2026`.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

/// Build the digest body for `results` as of `date`.
///
/// # Examples
///
/// ```ignore
/// let body = build_email_body(&results, NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
/// assert!(body.starts_with("<h2>"));
/// ```
pub fn build_email_body(results: &[SearchResult], date: NaiveDate) -> String {
    let mut body = String::new();
    write!(body, "<h2>{REPORT_TITLE}</h2>").unwrap();
    write!(body, "<p>{}</p><ul>", display_date(date)).unwrap();
    for result in results {
        write!(
            body,
            "<li><strong>{}</strong>: {}<br><a href='{}'>{}</a></li>",
            result.city, result.summary, result.link, result.link
        )
        .unwrap();
    }
    body.push_str("</ul>");
    body
}

/// File name used when the digest is also written to disk.
pub fn report_filename(date: NaiveDate) -> String {
    format!("{}.html", date.format("%Y-%m-%d"))
}
