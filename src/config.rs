//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

/// Default API host.
pub const DEFAULT_API_URL: &str = "http://176.108.254.255/";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL. Always ends in `/` so relative endpoint paths join under it.
    pub base_url: Url,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Overall per-request timeout (covers both reading and writing).
    pub request_timeout: Duration,
    /// libSQL file holding the access/refresh tokens.
    pub credentials_path: PathBuf,
    /// Maximum number of tasks kept after a reload.
    pub task_limit: usize,
    /// Maximum number of categories kept after a reload.
    pub category_limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self {
            base_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            credentials_path: PathBuf::from(home).join(".levelup/credentials.db"),
            task_limit: 50,
            category_limit: 20,
        }
    }
}

impl ClientConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    ///
    /// Numeric values that fail to parse fall back to their defaults; an
    /// unparseable base URL is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = match lookup("LEVELUP_API_URL") {
            Some(raw) => parse_base_url(&raw)?,
            None => defaults.base_url,
        };

        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };
        let count = |key: &str, default: usize| {
            lookup(key)
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(default)
        };

        Ok(Self {
            base_url,
            connect_timeout: secs("LEVELUP_CONNECT_TIMEOUT_SECS", defaults.connect_timeout),
            request_timeout: secs("LEVELUP_REQUEST_TIMEOUT_SECS", defaults.request_timeout),
            credentials_path: lookup("LEVELUP_CREDENTIALS_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.credentials_path),
            task_limit: count("LEVELUP_TASK_LIMIT", defaults.task_limit),
            category_limit: count("LEVELUP_CATEGORY_LIMIT", defaults.category_limit),
        })
    }
}

/// Parse a base URL and make sure it ends with a slash.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|e| ConfigError::InvalidValue {
        key: "LEVELUP_API_URL".to_string(),
        message: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidValue {
            key: "LEVELUP_API_URL".to_string(),
            message: format!("{raw} cannot be used as a base URL"),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.base_url.as_str(), DEFAULT_API_URL);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.task_limit, 50);
        assert_eq!(config.category_limit, 20);
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[("LEVELUP_API_URL", "http://localhost:8000/v1")]))
                .unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/v1/");
        assert_eq!(
            config.base_url.join("api/auth/login/").unwrap().as_str(),
            "http://localhost:8000/v1/api/auth/login/"
        );
    }

    #[test]
    fn invalid_base_url_is_error() {
        let result = ClientConfig::from_lookup(lookup_from(&[("LEVELUP_API_URL", "not a url")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn bad_numbers_fall_back_to_defaults() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("LEVELUP_REQUEST_TIMEOUT_SECS", "soon"),
            ("LEVELUP_TASK_LIMIT", "10"),
        ]))
        .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.task_limit, 10);
    }
}
