//! Command-line interface definitions for City News Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The five operator secrets are normally supplied through environment
//! variables (e.g. CI secrets); every option can also be given as a flag.

use crate::filter::DEFAULT_PER_CITY_CAP;
use crate::query::QueryStyle;
use clap::{Parser, ValueEnum};

/// Which filtering rules to apply to search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PolicyKind {
    /// Blocked-domain list plus snippet keyword match, no cap.
    #[default]
    Relevance,
    /// Non-empty snippet and link, capped per city.
    Lenient,
}

/// Command-line arguments for the City News Digest application.
///
/// # Examples
///
/// ```sh
/// # Secrets from the environment, defaults for everything else
/// city_news_digest
///
/// # Two cities only, write the digest to disk without emailing it
/// city_news_digest --city "Savannah, GA" --city "Griffin, GA" --dry-run --html-output-dir ./out
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Gmail address the digest is sent from (also the SMTP login)
    #[arg(long, env = "SENDER_EMAIL", hide_env_values = true)]
    pub sender_email: String,

    /// App password for the sender account
    #[arg(long, env = "APP_PASSWORD", hide_env_values = true)]
    pub app_password: String,

    /// Address the digest is delivered to
    #[arg(long, env = "RECIPIENT_EMAIL", hide_env_values = true)]
    pub recipient_email: String,

    /// Google Custom Search API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: String,

    /// Programmable Search Engine id (`cx`)
    #[arg(long, env = "SEARCH_ENGINE_ID", hide_env_values = true)]
    pub search_engine_id: String,

    /// City to search; repeat to search several. Defaults to the built-in list
    #[arg(long = "city")]
    pub cities: Vec<String>,

    /// Filtering rules applied to search results
    #[arg(long, value_enum, env = "FILTER_POLICY", default_value_t = PolicyKind::Relevance)]
    pub filter_policy: PolicyKind,

    /// Results kept per city under the lenient policy
    #[arg(long, default_value_t = DEFAULT_PER_CITY_CAP)]
    pub per_city_cap: usize,

    /// Layout of the search query string [default: grouped for relevance, plain for lenient]
    #[arg(long, value_enum)]
    pub query_style: Option<QueryStyle>,

    /// Search endpoint URL
    #[arg(
        long,
        env = "SEARCH_ENDPOINT",
        default_value = "https://www.googleapis.com/customsearch/v1"
    )]
    pub search_endpoint: String,

    /// Per-request timeout for search calls, in seconds
    #[arg(long, env = "SEARCH_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Retries for a search request after a transport error, 429 or 5xx
    #[arg(long, env = "SEARCH_MAX_RETRIES", default_value_t = 2)]
    pub max_retries: usize,

    /// SMTP host (implicit TLS)
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    /// SMTP port (implicit TLS)
    #[arg(long, env = "SMTP_PORT", default_value_t = 465)]
    pub smtp_port: u16,

    /// Also write the digest HTML into this directory
    #[arg(long)]
    pub html_output_dir: Option<String>,

    /// Build the digest but do not send it
    #[arg(long)]
    pub dry_run: bool,

    /// Keep only the first city's entry when several cities return the same link
    #[arg(long)]
    pub dedupe_links: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRETS: [&str; 11] = [
        "city_news_digest",
        "--sender-email",
        "sender@example.com",
        "--app-password",
        "app-pass",
        "--recipient-email",
        "boss@example.com",
        "--google-api-key",
        "key-123",
        "--search-engine-id",
        "cx-456",
    ];

    #[test]
    fn test_cli_parsing_defaults() {
        let cli = Cli::parse_from(SECRETS);

        assert_eq!(cli.sender_email, "sender@example.com");
        assert_eq!(cli.search_engine_id, "cx-456");
        assert!(cli.cities.is_empty());
        assert_eq!(cli.filter_policy, PolicyKind::Relevance);
        assert_eq!(cli.query_style, None);
        assert!(!cli.dedupe_links);
        assert_eq!(cli.per_city_cap, 2);
        assert_eq!(cli.smtp_host, "smtp.gmail.com");
        assert_eq!(cli.smtp_port, 465);
        assert!(!cli.dry_run);
        assert!(cli.html_output_dir.is_none());
    }

    #[test]
    fn test_cli_repeated_cities_and_policy() {
        let mut args = SECRETS.to_vec();
        args.extend([
            "--city",
            "Savannah, GA",
            "--city",
            "Griffin, GA",
            "--filter-policy",
            "lenient",
            "--query-style",
            "plain",
            "--dry-run",
        ]);
        let cli = Cli::parse_from(args);

        assert_eq!(cli.cities, ["Savannah, GA", "Griffin, GA"]);
        assert_eq!(cli.filter_policy, PolicyKind::Lenient);
        assert_eq!(cli.query_style, Some(QueryStyle::Plain));
        assert!(cli.dry_run);
    }

    #[test]
    fn test_cli_rejects_unknown_policy() {
        let mut args = SECRETS.to_vec();
        args.extend(["--filter-policy", "fuzzy"]);
        assert!(Cli::try_parse_from(args).is_err());
    }
}
