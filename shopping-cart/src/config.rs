//! Configuration management for the shopping cart service.
//!
//! Loads configuration from environment variables with sensible defaults:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `RUST_LOG` | `info` | Log filter |
//! | `CART_CONFLICT_MAX_RETRIES` | `3` | Resubmissions after a concurrency conflict |
//! | `CART_CONFLICT_RETRY_DELAY_MS` | `10` | First backoff delay |
//! | `CART_CONFLICT_RETRY_MAX_DELAY_MS` | `500` | Backoff cap |

use composable_es_runtime::RetryPolicy;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// `tracing-subscriber` filter directive
    pub log_filter: String,
    /// Caller-side retry of commands that lost a version race
    pub conflict_retry: RetryPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            conflict_retry: RetryPolicy::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value if set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric variable does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = RetryPolicy::default();

        let max_retries = parse(&lookup, "CART_CONFLICT_MAX_RETRIES")?.unwrap_or(defaults.max_retries);
        let initial_delay = parse(&lookup, "CART_CONFLICT_RETRY_DELAY_MS")?
            .map_or(defaults.initial_delay, Duration::from_millis);
        let max_delay = parse(&lookup, "CART_CONFLICT_RETRY_MAX_DELAY_MS")?
            .map_or(defaults.max_delay, Duration::from_millis);

        Ok(Self {
            log_filter: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            conflict_retry: RetryPolicy::builder()
                .max_retries(max_retries)
                .initial_delay(initial_delay)
                .max_delay(max_delay)
                .multiplier(defaults.multiplier)
                .build(),
        })
    }

    /// Set the log filter.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Set the conflict retry policy.
    #[must_use]
    pub fn with_conflict_retry(mut self, policy: RetryPolicy) -> Self {
        self.conflict_retry = policy;
        self
    }

    /// The conflict retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.conflict_retry
    }
}

fn parse<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = ServiceConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.retry_policy().max_retries, 3);
        assert_eq!(config.retry_policy().initial_delay, Duration::from_millis(10));
        assert_eq!(config.retry_policy().max_delay, Duration::from_millis(500));
    }

    #[test]
    fn variables_override_defaults() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("RUST_LOG", "shopping_cart=debug"),
            ("CART_CONFLICT_MAX_RETRIES", "0"),
            ("CART_CONFLICT_RETRY_DELAY_MS", " 25 "),
            ("CART_CONFLICT_RETRY_MAX_DELAY_MS", "1000"),
        ]))
        .unwrap();

        assert_eq!(config.log_filter, "shopping_cart=debug");
        assert_eq!(config.retry_policy().max_retries, 0);
        assert_eq!(config.retry_policy().initial_delay, Duration::from_millis(25));
        assert_eq!(config.retry_policy().max_delay, Duration::from_secs(1));
    }

    #[test]
    fn unparsable_number_is_reported() {
        let error =
            ServiceConfig::from_lookup(lookup_from(&[("CART_CONFLICT_MAX_RETRIES", "many")])).unwrap_err();

        assert_eq!(
            error,
            ConfigError::InvalidValue {
                key: "CART_CONFLICT_MAX_RETRIES",
                value: "many".to_string(),
            }
        );
    }

    #[test]
    fn setters_replace_values() {
        let config = ServiceConfig::default()
            .with_log_filter("warn")
            .with_conflict_retry(RetryPolicy::no_retry());

        assert_eq!(config.log_filter, "warn");
        assert_eq!(config.retry_policy().max_retries, 0);
    }
}
