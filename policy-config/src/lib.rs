//! Configuration management for the policy function.
//!
//! Settings are read once at process start from the environment (optionally
//! seeded from a `.env` file) and never change afterwards.

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub use loader::{
    ConfigError, ConfigResult, ENV_EVAL_TIMEOUT_SECS, ENV_LOG, ENV_QUERY, ENV_TTL_SECS,
    load_dotenv,
};
pub use schema::{DEFAULT_LOG_FILTER, FunctionConfig};
