//! The per-run pipeline: search every city, filter, aggregate, send.
//!
//! Cities are processed strictly in order. A non-200 answer for one city is
//! logged and counted as zero results; every other error ends the run. The
//! mailer is only touched when at least one result survived filtering.

use crate::config::Config;
use crate::mailer::{MailError, Mailer};
use crate::models::SearchResult;
use crate::query::build_query;
use crate::report::{EMAIL_SUBJECT, build_email_body, report_filename};
use crate::search::{SearchBackend, SearchError};
use crate::utils::truncate_for_log;
use chrono::NaiveDate;
use itertools::Itertools;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// Fatal errors that abort a run.
#[derive(Debug, Error)]
pub enum DigestError {
    /// A search failed in a way that cannot be skipped.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// The digest could not be delivered.
    #[error(transparent)]
    Mail(#[from] MailError),
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The digest was sent with this many entries.
    Sent {
        /// Number of list entries in the digest.
        entries: usize,
    },
    /// The digest was built but sending was skipped.
    DryRun {
        /// Number of list entries in the digest.
        entries: usize,
    },
    /// Nothing passed the filters; no email was attempted.
    NoResults,
}

/// Search all configured cities and return the filtered aggregate.
///
/// Every accepted item is kept under the city that found it, so one link can
/// appear once per city. With `dedupe_links` only the first city's entry stays.
///
/// # Errors
///
/// Returns the first search error that is not a recoverable HTTP status.
#[instrument(level = "info", skip_all, fields(cities = config.cities.len(), policy = config.policy.name()))]
pub async fn collect_results<B>(config: &Config, backend: &B) -> Result<Vec<SearchResult>, SearchError>
where
    B: SearchBackend,
{
    let mut all_results = Vec::new();
    let mut skipped = 0usize;

    for city in &config.cities {
        info!(%city, "Searching news for city");
        let query = build_query(city, &config.keywords, config.query_style);

        let items = match backend.search(&query).await {
            Ok(items) => items,
            Err(e) if e.is_recoverable() => {
                warn!(%city, error = %e, "Search failed for city; skipping");
                skipped += 1;
                continue;
            }
            Err(e) => {
                error!(%city, error = %e, "Search failed; aborting run");
                return Err(e);
            }
        };

        let found = items.len();
        let accepted = config.policy.apply(city, items);
        info!(%city, found, accepted = accepted.len(), "City search complete");
        all_results.extend(accepted);
    }

    let before = all_results.len();
    let results: Vec<SearchResult> = if config.dedupe_links {
        all_results
            .into_iter()
            .unique_by(|r| r.link.clone())
            .collect()
    } else {
        all_results
    };
    info!(
        total = results.len(),
        duplicates_dropped = before - results.len(),
        skipped_cities = skipped,
        "Collected search results"
    );
    Ok(results)
}

/// Run the whole pipeline once.
///
/// # Errors
///
/// Returns a [`DigestError`] when a search fails fatally or the email cannot be sent.
pub async fn run<B, M>(
    config: &Config,
    backend: &B,
    mailer: &M,
    today: NaiveDate,
) -> Result<RunOutcome, DigestError>
where
    B: SearchBackend,
    M: Mailer,
{
    let results = collect_results(config, backend).await?;

    if results.is_empty() {
        info!("No relevant news found today.");
        return Ok(RunOutcome::NoResults);
    }

    let body = build_email_body(&results, today);
    let entries = results.len();

    if let Some(dir) = &config.html_output_dir {
        let path = Path::new(dir).join(report_filename(today));
        match tokio::fs::write(&path, &body).await {
            Ok(()) => info!(path = %path.display(), "Wrote digest HTML"),
            Err(e) => error!(path = %path.display(), error = %e, "Failed writing digest HTML"),
        }
    }

    if config.dry_run {
        info!(
            entries,
            body_preview = %truncate_for_log(&body, 500),
            "Dry run; digest not sent"
        );
        return Ok(RunOutcome::DryRun { entries });
    }

    mailer.send(EMAIL_SUBJECT, &body).await?;
    info!(entries, "Report sent successfully.");
    Ok(RunOutcome::Sent { entries })
}
