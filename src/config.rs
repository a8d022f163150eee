use crate::errors::ConfigError;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FETCH_ATTEMPTS: u64 = 3;
const DEFAULT_DB_PATH: &str = "apartments.db";
const DEFAULT_LOG_FILE: &str = "apartment_watch.log";

/// One week.
const MAX_POLL_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
const MAX_FETCH_TIMEOUT_SECS: u64 = 10 * 60;
const MAX_FETCH_ATTEMPTS: u64 = 20;

#[derive(Debug, Clone)]
pub struct BrevoSettings {
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: String,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub search_url: Url,
    pub poll_interval: Duration,
    pub db_path: PathBuf,
    pub notify_to: String,
    pub brevo: Option<BrevoSettings>,
    pub fetch_timeout: Duration,
    pub fetch_max_attempts: u32,
    /// Plain-text copy of the log. `None` when `LOG_FILE=-`.
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the process environment (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let raw_url = get("SEARCH_URL")
            .or_else(|| get("SE_URL"))
            .ok_or(ConfigError::MissingSearchUrl)?;
        let search_url = Url::parse(&raw_url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
            .ok_or(ConfigError::InvalidSearchUrl { url: raw_url })?;

        // TIME_INTERVAL is the older name and counts minutes.
        let poll_secs = match bounded(&get, "POLL_INTERVAL_SECONDS", MAX_POLL_INTERVAL_SECS)? {
            Some(secs) => secs,
            None => bounded(&get, "TIME_INTERVAL", MAX_POLL_INTERVAL_SECS / 60)?
                .map(|minutes| minutes * 60)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        };
        let timeout_secs = bounded(&get, "FETCH_TIMEOUT_SECONDS", MAX_FETCH_TIMEOUT_SECS)?
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);
        let attempts = bounded(&get, "FETCH_MAX_ATTEMPTS", MAX_FETCH_ATTEMPTS)?
            .unwrap_or(DEFAULT_FETCH_ATTEMPTS);

        let brevo = match (get("BREVO_API_KEY"), get("SENDER_EMAIL")) {
            (Some(api_key), Some(sender_email)) => Some(BrevoSettings {
                api_key,
                sender_email,
                sender_name: get("SENDER_NAME").unwrap_or_else(|| "Apartment Watch".to_string()),
            }),
            _ => None,
        };

        let notify_to = match (get("TO_EMAIL"), &brevo) {
            (Some(to), _) => to,
            (None, Some(b)) => b.sender_email.clone(),
            (None, None) => "log".to_string(),
        };

        Ok(Self {
            search_url,
            poll_interval: Duration::from_secs(poll_secs),
            db_path: get("DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            notify_to,
            brevo,
            fetch_timeout: Duration::from_secs(timeout_secs),
            fetch_max_attempts: attempts as u32,
            log_file: match get("LOG_FILE").as_deref() {
                Some("-") => None,
                Some(path) => Some(PathBuf::from(path)),
                None => Some(PathBuf::from(DEFAULT_LOG_FILE)),
            },
        })
    }
}

/// `Ok(None)` when unset, otherwise an integer in `1..=max`.
fn bounded<G>(get: &G, name: &'static str, max: u64) -> Result<Option<u64>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(None),
        Some(value) => match value.parse::<u64>() {
            Ok(n) if (1..=max).contains(&n) => Ok(Some(n)),
            _ => Err(ConfigError::InvalidNumber { name, value, max }),
        },
    }
}
