//! Run configuration.
//!
//! [`Config`] is built once from the parsed [`Cli`] and then only borrowed.
//! Secrets are kept out of `Debug` output so the whole struct can be logged.

use crate::cli::{Cli, PolicyKind};
use crate::filter::FilterPolicy;
use crate::query::{DEFAULT_CITIES, QueryStyle, SEARCH_KEYWORDS};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while turning CLI input into a [`Config`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required value was present but blank.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// The lenient policy needs room for at least one result.
    #[error("per-city cap must be at least 1")]
    ZeroCap,

    /// The search endpoint is not an absolute URL.
    #[error("invalid search endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// The rejected value.
        endpoint: String,
        /// Parser message.
        reason: String,
    },
}

/// Settings for the search client.
#[derive(Clone)]
pub struct SearchConfig {
    /// Base URL of the Custom Search endpoint.
    pub endpoint: url::Url,
    /// API key passed as `key`.
    pub api_key: String,
    /// Engine id passed as `cx`.
    pub engine_id: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries after a retryable failure.
    pub max_retries: usize,
    /// First backoff delay; doubles per attempt.
    pub base_delay: Duration,
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .field("engine_id", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .finish()
    }
}

/// Settings for the SMTP mailer.
#[derive(Clone)]
pub struct MailConfig {
    /// Sender address, also used as the SMTP login.
    pub sender: String,
    /// SMTP password.
    pub password: String,
    /// Single recipient.
    pub recipient: String,
    /// SMTP host.
    pub host: String,
    /// SMTP port; the connection is TLS from the first byte.
    pub port: u16,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("sender", &"<redacted>")
            .field("password", &"<redacted>")
            .field("recipient", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// Immutable configuration for a single run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cities searched, in order.
    pub cities: Vec<String>,
    /// Keyword phrases used to build each query.
    pub keywords: Vec<String>,
    /// Query layout.
    pub query_style: QueryStyle,
    /// Filtering rules.
    pub policy: FilterPolicy,
    /// Search client settings.
    pub search: SearchConfig,
    /// Mailer settings.
    pub mail: MailConfig,
    /// Optional directory the digest HTML is also written to.
    pub html_output_dir: Option<String>,
    /// Skip the email send.
    pub dry_run: bool,
    /// Collapse results sharing a link across cities.
    pub dedupe_links: bool,
}

fn require(value: String, name: &'static str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty(name));
    }
    Ok(trimmed.to_string())
}

impl TryFrom<Cli> for Config {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let endpoint =
            url::Url::parse(&cli.search_endpoint).map_err(|e| ConfigError::InvalidEndpoint {
                endpoint: cli.search_endpoint.clone(),
                reason: e.to_string(),
            })?;

        // Each policy pairs with the query layout it was tuned against.
        let query_style = cli.query_style.unwrap_or(match cli.filter_policy {
            PolicyKind::Relevance => QueryStyle::Grouped,
            PolicyKind::Lenient => QueryStyle::Plain,
        });

        let policy = match cli.filter_policy {
            PolicyKind::Relevance => FilterPolicy::relevance(),
            PolicyKind::Lenient if cli.per_city_cap == 0 => return Err(ConfigError::ZeroCap),
            PolicyKind::Lenient => FilterPolicy::lenient(cli.per_city_cap),
        };

        let cities = if cli.cities.is_empty() {
            DEFAULT_CITIES.iter().map(|c| c.to_string()).collect()
        } else {
            cli.cities
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        };

        Ok(Self {
            cities,
            keywords: SEARCH_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            query_style,
            policy,
            search: SearchConfig {
                endpoint,
                api_key: require(cli.google_api_key, "GOOGLE_API_KEY")?,
                engine_id: require(cli.search_engine_id, "SEARCH_ENGINE_ID")?,
                timeout: Duration::from_secs(cli.timeout_secs),
                max_retries: cli.max_retries,
                base_delay: Duration::from_secs(1),
            },
            mail: MailConfig {
                sender: require(cli.sender_email, "SENDER_EMAIL")?,
                password: require(cli.app_password, "APP_PASSWORD")?,
                recipient: require(cli.recipient_email, "RECIPIENT_EMAIL")?,
                host: cli.smtp_host,
                port: cli.smtp_port,
            },
            html_output_dir: cli.html_output_dir,
            dry_run: cli.dry_run,
            dedupe_links: cli.dedupe_links,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(extra: &[&str]) -> Cli {
        let mut args = vec![
            "city_news_digest",
            "--sender-email",
            "sender@example.com",
            "--app-password",
            "hunter2",
            "--recipient-email",
            "boss@example.com",
            "--google-api-key",
            "key-123",
            "--search-engine-id",
            "cx-456",
        ];
        args.extend_from_slice(extra);
        Cli::parse_from(args)
    }

    #[test]
    fn test_defaults() {
        let config = Config::try_from(cli(&[])).unwrap();

        assert_eq!(config.cities.len(), DEFAULT_CITIES.len());
        assert_eq!(config.cities[0], "Carrollton, GA");
        assert_eq!(config.policy, FilterPolicy::relevance());
        assert_eq!(config.query_style, QueryStyle::Grouped);
        assert_eq!(config.search.timeout, Duration::from_secs(30));
        assert_eq!(config.search.max_retries, 2);
        assert_eq!(config.mail.host, "smtp.gmail.com");
        assert_eq!(config.mail.port, 465);
        assert!(!config.dry_run);
        assert!(!config.dedupe_links);
    }

    #[test]
    fn test_lenient_policy_with_cap() {
        let config =
            Config::try_from(cli(&["--filter-policy", "lenient", "--per-city-cap", "3"])).unwrap();
        assert_eq!(config.policy, FilterPolicy::lenient(3));
    }

    #[test]
    fn test_lenient_policy_defaults_to_plain_query() {
        let config = Config::try_from(cli(&["--filter-policy", "lenient"])).unwrap();
        assert_eq!(config.query_style, QueryStyle::Plain);
    }

    #[test]
    fn test_explicit_query_style_overrides_policy_default() {
        let config =
            Config::try_from(cli(&["--filter-policy", "lenient", "--query-style", "grouped"])).unwrap();
        assert_eq!(config.policy, FilterPolicy::lenient(2));
        assert_eq!(config.query_style, QueryStyle::Grouped);

        let config = Config::try_from(cli(&["--query-style", "plain"])).unwrap();
        assert_eq!(config.policy, FilterPolicy::relevance());
        assert_eq!(config.query_style, QueryStyle::Plain);
    }

    #[test]
    fn test_dedupe_links_flag() {
        assert!(Config::try_from(cli(&["--dedupe-links"])).unwrap().dedupe_links);
    }

    #[test]
    fn test_zero_cap_rejected() {
        let err =
            Config::try_from(cli(&["--filter-policy", "lenient", "--per-city-cap", "0"])).unwrap_err();
        assert_eq!(err, ConfigError::ZeroCap);
    }

    #[test]
    fn test_blank_secret_rejected() {
        let mut args = cli(&[]);
        args.google_api_key = "  ".to_string();
        let err = Config::try_from(args).unwrap_err();
        assert_eq!(err, ConfigError::Empty("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let err = Config::try_from(cli(&["--search-endpoint", "not a url"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_custom_cities_trimmed() {
        let config = Config::try_from(cli(&["--city", " Savannah, GA ", "--city", ""])).unwrap();
        assert_eq!(config.cities, ["Savannah, GA"]);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::try_from(cli(&[])).unwrap();
        let debug = format!("{config:?}");

        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("key-123"));
        assert!(!debug.contains("cx-456"));
        assert!(!debug.contains("boss@example.com"));
        assert!(debug.contains("<redacted>"));
    }
}
