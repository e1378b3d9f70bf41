//! # City News Digest
//!
//! A scheduled news monitor that searches for economic-impact stories (job
//! creation, layoffs, facility openings and closings) in a list of cities,
//! filters them for relevance and emails the matches as one HTML digest.
//!
//! ## Usage
//!
//! ```sh
//! SENDER_EMAIL=... APP_PASSWORD=... RECIPIENT_EMAIL=... \
//! GOOGLE_API_KEY=... SEARCH_ENGINE_ID=... city_news_digest
//! ```
//!
//! ## Architecture
//!
//! Each run is a single sequential pipeline:
//! 1. **Search**: One Custom Search query per city
//! 2. **Filter**: Blocked domains and keyword relevance (or the lenient cap)
//! 3. **Format**: Fold the surviving results into an HTML list
//! 4. **Send**: One SMTP session over implicit TLS, only if anything survived
//!
//! Scheduling is left to cron or CI.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod digest;
mod filter;
mod mailer;
mod models;
mod query;
mod report;
mod search;
mod utils;

use cli::Cli;
use config::Config;
use digest::RunOutcome;
use mailer::SmtpMailer;
use utils::ensure_writable_dir;

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("city_news_digest starting up");

    // Parse CLI and freeze the run configuration
    let args = Cli::parse();
    let config = Config::try_from(args).inspect_err(|e| error!(error = %e, "Invalid configuration"))?;
    debug!(?config, "Loaded configuration");
    info!(
        cities = config.cities.len(),
        policy = config.policy.name(),
        dry_run = config.dry_run,
        "Configuration ready"
    );

    // Early check: ensure the HTML output dir is writable
    if let Some(dir) = &config.html_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "HTML output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e.into());
        }
    }

    let backend = search::build_backend(&config.search)?;
    let mailer = SmtpMailer::new(config.mail.clone());
    let today = Local::now().date_naive();

    let outcome = digest::run(&config, &backend, &mailer, today)
        .await
        .inspect_err(|e| error!(error = %e, "Run failed"))?;

    let elapsed = start_time.elapsed();
    match outcome {
        RunOutcome::Sent { entries } | RunOutcome::DryRun { entries } => info!(
            entries,
            ?elapsed,
            secs = elapsed.as_secs(),
            millis = elapsed.subsec_millis(),
            "Execution complete"
        ),
        RunOutcome::NoResults => info!(?elapsed, "Execution complete; nothing to send"),
    }

    Ok(())
}
