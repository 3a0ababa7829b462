//! Configuration values, loaded from the environment at startup.
//!
//! Only `from_env` touches the environment; everything downstream
//! receives plain values. Credentials stay wrapped in `SecretString` so
//! they never land in debug output or logs.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::schedule::QuietHours;
use crate::source::FetchWindow;

/// Default seconds between poll cycles.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Watcher configuration.
pub struct Config {
    /// Dedup store location.
    pub db_path: PathBuf,
    /// Delay between poll cycles.
    pub poll_interval: Duration,
    pub quiet_hours: QuietHours,
    pub window: FetchWindow,
    /// Ready OAuth access token for the inbox API.
    pub gmail_token: SecretString,
    /// Base inbox search filter, e.g. `from:messaging@cash.app`.
    pub gmail_query: String,
    /// Slack bot token.
    pub slack_token: SecretString,
    /// Slack channel to post notices to.
    pub slack_channel: String,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Credentials are required; everything else has a default. A
    /// missing credential is the only fatal configuration state —
    /// everything downstream degrades per-cycle instead.
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = std::env::var("PAYWATCH_DB_PATH")
            .unwrap_or_else(|_| "./data/paywatch.db".to_string())
            .into();

        let poll_interval = Duration::from_secs(parse_var(
            "PAYWATCH_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
        )?);

        let quiet_hours = QuietHours {
            enabled: parse_var("PAYWATCH_QUIET_HOURS", true)?,
            start_hour: bounded_hour("PAYWATCH_QUIET_START_HOUR", 0)?,
            end_hour: bounded_hour("PAYWATCH_QUIET_END_HOUR", 9)?,
        };

        let window = FetchWindow {
            newer_than_days: parse_var("PAYWATCH_NEWER_THAN_DAYS", 1)?,
            page_size: parse_var("PAYWATCH_PAGE_SIZE", 10)?,
        };

        Ok(Self {
            db_path,
            poll_interval,
            quiet_hours,
            window,
            gmail_token: required_secret("PAYWATCH_GMAIL_TOKEN")?,
            gmail_query: std::env::var("PAYWATCH_GMAIL_QUERY").unwrap_or_default(),
            slack_token: required_secret("PAYWATCH_SLACK_TOKEN")?,
            slack_channel: std::env::var("PAYWATCH_SLACK_CHANNEL")
                .map_err(|_| ConfigError::MissingEnvVar("PAYWATCH_SLACK_CHANNEL".into()))?,
        })
    }
}

fn required_secret(key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(key)
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Parse an env var, falling back to a default when unset. A value that
/// is present but malformed is an error, not a silent default.
fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("could not parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}

fn bounded_hour(key: &str, default: u32) -> Result<u32, ConfigError> {
    let hour: u32 = parse_var(key, default)?;
    if hour > 23 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("hour {hour} out of range 0–23"),
        });
    }
    Ok(hour)
}
