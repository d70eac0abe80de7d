//! Loads [`FunctionConfig`] from environment variables.

use std::env;

use thiserror::Error;
use tracing::debug;

use crate::schema::FunctionConfig;

/// Response time-to-live in seconds.
pub const ENV_TTL_SECS: &str = "FUNCTION_TTL_SECS";
/// Evaluation timeout in seconds (`0` disables it).
pub const ENV_EVAL_TIMEOUT_SECS: &str = "FUNCTION_EVAL_TIMEOUT_SECS";
/// Query evaluated against the policy modules.
pub const ENV_QUERY: &str = "FUNCTION_QUERY";
/// `tracing` filter directive.
pub const ENV_LOG: &str = "FUNCTION_LOG";

/// Errors raised while loading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to a value that could not be parsed.
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Human-readable reason for rejection.
        reason: &'static str,
    },
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Loads a `.env` file from the working directory, ignoring a missing file.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "loaded .env file");
    }
}

impl FunctionConfig {
    /// Builds the configuration from process environment variables.
    /// Call [`load_dotenv`] first to honour a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a numeric variable does not parse.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup. Empty values
    /// are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a numeric variable does not parse.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            ttl_secs: parse_secs(ENV_TTL_SECS, get(ENV_TTL_SECS), defaults.ttl_secs)?,
            eval_timeout_secs: parse_secs(
                ENV_EVAL_TIMEOUT_SECS,
                get(ENV_EVAL_TIMEOUT_SECS),
                defaults.eval_timeout_secs,
            )?,
            query: get(ENV_QUERY).unwrap_or(defaults.query),
            log_filter: get(ENV_LOG).unwrap_or(defaults.log_filter),
        })
    }
}

fn parse_secs(key: &'static str, raw: Option<String>, default: u64) -> ConfigResult<u64> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key,
                value,
                reason: "expected a whole number of seconds",
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn unset_variables_use_defaults() {
        let config = FunctionConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, FunctionConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = FunctionConfig::from_lookup(lookup(&[
            (ENV_TTL_SECS, "120"),
            (ENV_EVAL_TIMEOUT_SECS, "0"),
            (ENV_QUERY, "response = data.custom.response"),
            (ENV_LOG, "policy_core=debug"),
            ("UNRELATED", "x"),
        ]))
        .unwrap();

        assert_eq!(config.ttl_secs, 120);
        assert_eq!(config.eval_timeout(), None);
        assert_eq!(config.query, "response = data.custom.response");
        assert_eq!(config.log_filter, "policy_core=debug");
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = FunctionConfig::from_lookup(lookup(&[(ENV_QUERY, " ")])).unwrap();
        assert_eq!(config.query, FunctionConfig::default().query);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = FunctionConfig::from_lookup(lookup(&[(ENV_TTL_SECS, "a minute")]))
            .expect_err("ttl must be numeric");
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_TTL_SECS, .. }));
    }
}
