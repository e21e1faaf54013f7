//! Provider configuration
//!
//! Credentials, endpoints and wait settings, read from the environment.

use std::collections::HashMap;
use std::time::Duration;

use ionos_core::wait::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
use thiserror::Error;

use crate::bundle::Service;

pub const ENV_USERNAME: &str = "IONOS_USERNAME";
pub const ENV_PASSWORD: &str = "IONOS_PASSWORD";
pub const ENV_TOKEN: &str = "IONOS_TOKEN";
pub const ENV_API_URL: &str = "IONOS_API_URL";
pub const ENV_POLL_INTERVAL: &str = "IONOS_POLL_INTERVAL_SECS";
pub const ENV_TIMEOUT: &str = "IONOS_TIMEOUT_SECS";

/// Longest accepted operation timeout (one week)
pub const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;
/// Longest accepted poll interval (one hour)
pub const MAX_POLL_INTERVAL_SECS: u64 = 60 * 60;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing credentials: set IONOS_TOKEN or both IONOS_USERNAME and IONOS_PASSWORD")]
    MissingCredentials,

    #[error("{0} is set but {1} is not")]
    IncompleteCredentials(&'static str, &'static str),

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// How requests authenticate
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(String),
    Basic { username: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => write!(f, "Token(***)"),
            Credentials::Basic { username, .. } => write!(f, "Basic({}, ***)", username),
        }
    }
}

/// Upper bounds for the wait that follows each mutating call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            update: timeout,
            delete: timeout,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_TIMEOUT)
    }
}

/// Provider configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    /// Per-service endpoint overrides
    pub endpoints: HashMap<Service, String>,
    pub timeouts: Timeouts,
    pub poll_interval: Duration,
}

impl Config {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            endpoints: HashMap::new(),
            timeouts: Timeouts::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let credentials = match (get(ENV_TOKEN), get(ENV_USERNAME), get(ENV_PASSWORD)) {
            (Some(token), _, _) => Credentials::Token(token),
            (None, Some(username), Some(password)) => Credentials::Basic { username, password },
            (None, Some(_), None) => {
                return Err(ConfigError::IncompleteCredentials(ENV_USERNAME, ENV_PASSWORD));
            }
            (None, None, Some(_)) => {
                return Err(ConfigError::IncompleteCredentials(ENV_PASSWORD, ENV_USERNAME));
            }
            (None, None, None) => return Err(ConfigError::MissingCredentials),
        };

        let mut config = Config::new(credentials);

        if let Some(url) = get(ENV_API_URL) {
            config.endpoints.insert(Service::Compute, url);
        }
        for service in Service::ALL {
            if let Some(url) = get(service.endpoint_env().as_str()) {
                config.endpoints.insert(service, url);
            }
        }

        if let Some(raw) = get(ENV_POLL_INTERVAL) {
            config.poll_interval = Duration::from_secs(parse_secs(ENV_POLL_INTERVAL, &raw, MAX_POLL_INTERVAL_SECS)?);
        }
        if let Some(raw) = get(ENV_TIMEOUT) {
            config.timeouts = Timeouts::uniform(Duration::from_secs(parse_secs(ENV_TIMEOUT, &raw, MAX_TIMEOUT_SECS)?));
        }

        Ok(config)
    }

    pub fn with_endpoint(mut self, service: Service, url: impl Into<String>) -> Self {
        self.endpoints.insert(service, url.into());
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Endpoint for a service: override or the public default
    pub fn endpoint(&self, service: Service) -> String {
        self.endpoints
            .get(&service)
            .cloned()
            .unwrap_or_else(|| service.default_endpoint().to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

fn parse_secs(key: &str, raw: &str, max: u64) -> Result<u64, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let secs: u64 = raw.trim().parse().map_err(|_| invalid("expected whole seconds"))?;
    if secs == 0 {
        return Err(invalid("must be greater than zero"));
    }
    if secs > max {
        return Err(invalid(&format!("must be at most {} seconds", max)));
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn token_wins_over_basic_auth() {
        let config = Config::from_lookup(lookup(&[
            (ENV_TOKEN, "tok"),
            (ENV_USERNAME, "user"),
            (ENV_PASSWORD, "pass"),
        ]))
        .unwrap();
        assert_eq!(config.credentials, Credentials::Token("tok".to_string()));
    }

    #[test]
    fn basic_auth_needs_both_parts() {
        let config =
            Config::from_lookup(lookup(&[(ENV_USERNAME, "user"), (ENV_PASSWORD, "pass")])).unwrap();
        assert!(matches!(config.credentials, Credentials::Basic { .. }));

        assert_eq!(
            Config::from_lookup(lookup(&[(ENV_USERNAME, "user")])).unwrap_err(),
            ConfigError::IncompleteCredentials(ENV_USERNAME, ENV_PASSWORD)
        );
        assert_eq!(
            Config::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::MissingCredentials
        );
    }

    #[test]
    fn endpoint_overrides() {
        let config = Config::from_lookup(lookup(&[
            (ENV_TOKEN, "tok"),
            (ENV_API_URL, "https://compute.example/"),
            ("IONOS_API_URL_DNS", "https://dns.example"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint(Service::Compute), "https://compute.example");
        assert_eq!(config.endpoint(Service::Dns), "https://dns.example");
        assert_eq!(
            config.endpoint(Service::Postgres),
            Service::Postgres.default_endpoint()
        );
    }

    #[test]
    fn wait_settings_from_env() {
        let config = Config::from_lookup(lookup(&[
            (ENV_TOKEN, "tok"),
            (ENV_POLL_INTERVAL, "2"),
            (ENV_TIMEOUT, "600"),
        ]))
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.timeouts.delete, Duration::from_secs(600));

        let err = Config::from_lookup(lookup(&[(ENV_TOKEN, "tok"), (ENV_TIMEOUT, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn oversized_wait_settings_are_rejected() {
        let err = Config::from_lookup(lookup(&[
            (ENV_TOKEN, "tok"),
            (ENV_TIMEOUT, "18446744073709551615"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: ENV_TIMEOUT.to_string(),
                value: "18446744073709551615".to_string(),
                reason: "must be at most 604800 seconds".to_string(),
            }
        );

        let err = Config::from_lookup(lookup(&[(ENV_TOKEN, "tok"), (ENV_POLL_INTERVAL, "3601")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let config = Config::from_lookup(lookup(&[
            (ENV_TOKEN, "tok"),
            (ENV_TIMEOUT, MAX_TIMEOUT_SECS.to_string().as_str()),
        ]))
        .unwrap();
        assert_eq!(config.timeouts.create, Duration::from_secs(MAX_TIMEOUT_SECS));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let creds = Credentials::Basic {
            username: "user".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
