//! Policy-evaluation pipeline function facade.
//!
//! Bundles the workspace crates behind feature flags so hosts can depend on a
//! single crate and switch off the pieces they do not need.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export the state model for convenience.
pub use policy_state as state;

/// Rule engine trait, Rego backend (enabled by `rego` feature), and scripted engine.
pub use policy_engine as engine;

/// Evaluation-and-merge core and pipeline adapter.
pub use policy_core as pipeline;

/// Environment-driven configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use policy_config as config;

/// Logging setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use policy_telemetry as telemetry;

pub use policy_core::{FunctionError, PolicyFunction};
pub use policy_engine::EvalContext;
pub use policy_state::{FunctionRequest, FunctionResponse};
