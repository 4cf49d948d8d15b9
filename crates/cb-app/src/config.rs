use std::str::FromStr;
use std::time::Duration;
use log::debug;
use crate::error::AppError;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub tracker: TrackerConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub api_url: String,
    pub push_url: String,
    pub http_timeout: Duration,
}

/// Timings of the progress tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Delay before the confirmatory read, giving the push channel a head start.
    pub confirm_delay: Duration,
    /// When this expires with no real progress the push channel is presumed stalled.
    pub guard_timeout: Duration,
    /// Percent at or below which a job counts as not progressing.
    pub stall_threshold: u8,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
    /// Pause between the final detail fetch and the completion event.
    pub completion_delay: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            confirm_delay: Duration::from_millis(1500),
            guard_timeout: Duration::from_secs(10),
            stall_threshold: 10,
            poll_interval: Duration::from_millis(2000),
            poll_max_attempts: 90,
            completion_delay: Duration::from_millis(500),
        }
    }
}

impl AppConfig {
    /// Read the process environment, after seeding it from `.env` if present.
    pub fn load() -> Result<Self, AppError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) => debug!("No .env file loaded: {}", e),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let api_url = lookup("CRAYONBOX_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let push_url = lookup("CRAYONBOX_PUSH_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("{api_url}/events"));

        let backend = BackendConfig {
            api_url,
            push_url,
            http_timeout: Duration::from_secs(parse_or(&lookup, "CRAYONBOX_HTTP_TIMEOUT_SECS", 10)?),
        };

        let defaults = TrackerConfig::default();
        let tracker = TrackerConfig {
            confirm_delay: millis_or(&lookup, "CRAYONBOX_CONFIRM_DELAY_MS", defaults.confirm_delay)?,
            guard_timeout: Duration::from_secs(parse_or(
                &lookup,
                "CRAYONBOX_GUARD_TIMEOUT_SECS",
                defaults.guard_timeout.as_secs(),
            )?),
            stall_threshold: parse_or(&lookup, "CRAYONBOX_STALL_THRESHOLD", defaults.stall_threshold)?,
            poll_interval: millis_or(&lookup, "CRAYONBOX_POLL_INTERVAL_MS", defaults.poll_interval)?,
            poll_max_attempts: parse_or(&lookup, "CRAYONBOX_POLL_MAX_ATTEMPTS", defaults.poll_max_attempts)?,
            completion_delay: millis_or(&lookup, "CRAYONBOX_COMPLETION_DELAY_MS", defaults.completion_delay)?,
        };

        if tracker.poll_max_attempts == 0 {
            return Err(AppError::Config("CRAYONBOX_POLL_MAX_ATTEMPTS must be at least 1".into()));
        }
        if tracker.stall_threshold > 100 {
            return Err(AppError::Config("CRAYONBOX_STALL_THRESHOLD must be a percent".into()));
        }

        Ok(Self { backend, tracker })
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} must be a number, got {raw:?}"))),
        None => Ok(default),
    }
}

fn millis_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Result<Duration, AppError> {
    let millis = parse_or(lookup, key, u64::try_from(default.as_millis()).unwrap_or(u64::MAX))?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend.api_url, DEFAULT_API_URL);
        assert_eq!(config.backend.push_url, "http://127.0.0.1:5000/events");
        assert_eq!(config.tracker, TrackerConfig::default());
        assert_eq!(config.tracker.guard_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CRAYONBOX_API_URL", "https://api.example.test/"),
            ("CRAYONBOX_POLL_INTERVAL_MS", "250"),
            ("CRAYONBOX_POLL_MAX_ATTEMPTS", "4"),
        ])).unwrap();

        assert_eq!(config.backend.api_url, "https://api.example.test");
        assert_eq!(config.backend.push_url, "https://api.example.test/events");
        assert_eq!(config.tracker.poll_interval, Duration::from_millis(250));
        assert_eq!(config.tracker.poll_max_attempts, 4);
    }

    #[test]
    fn test_malformed_number_is_config_error() {
        let err = AppConfig::from_lookup(lookup(&[("CRAYONBOX_GUARD_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("CRAYONBOX_GUARD_TIMEOUT_SECS")));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[("CRAYONBOX_POLL_MAX_ATTEMPTS", "0")])).is_err());
    }
}
