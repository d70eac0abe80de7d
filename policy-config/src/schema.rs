//! Strongly typed configuration schema.

use std::time::Duration;

use policy_core::{DEFAULT_EVAL_TIMEOUT, FunctionSettings};
use serde::{Deserialize, Serialize};

/// Log filter used when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Process-wide configuration for the policy function host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfig {
    /// Response time-to-live in seconds.
    pub ttl_secs: u64,
    /// Evaluation timeout in seconds; `0` disables the timeout.
    pub eval_timeout_secs: u64,
    /// Query evaluated against the policy modules.
    pub query: String,
    /// `tracing` filter directive, e.g. `info` or `policy_core=debug`.
    pub log_filter: String,
}

impl FunctionConfig {
    /// Returns the response time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Returns the evaluation timeout, or `None` when disabled.
    #[must_use]
    pub const fn eval_timeout(&self) -> Option<Duration> {
        match self.eval_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Converts the configuration into function settings.
    #[must_use]
    pub fn settings(&self) -> FunctionSettings {
        FunctionSettings::default()
            .with_ttl(self.ttl())
            .with_query(self.query.clone())
            .with_eval_timeout(self.eval_timeout())
    }
}

impl Default for FunctionConfig {
    fn default() -> Self {
        let settings = FunctionSettings::default();
        Self {
            ttl_secs: settings.ttl().as_secs(),
            eval_timeout_secs: DEFAULT_EVAL_TIMEOUT.as_secs(),
            query: settings.query().to_owned(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}
