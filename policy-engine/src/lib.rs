//! Rule engine adapters used by the policy function.
//!
//! The declarative rule language is an external dependency hidden behind the
//! [`RuleEngine`] trait: [`rego`] wraps the `regorus` interpreter, and
//! [`scripted`] replays canned outcomes so callers can be tested without one.

#![warn(missing_docs, clippy::pedantic)]

pub mod context;
#[cfg(feature = "rego")]
pub mod rego;
pub mod scripted;
pub mod traits;

pub use context::EvalContext;
#[cfg(feature = "rego")]
pub use rego::{PreparedRego, RegoEngine};
pub use scripted::ScriptedEngine;
pub use traits::{
    Bindings, DEFAULT_QUERY, EngineError, EngineResult, EvaluationResult, PolicyModule,
    RESPONSE_BINDING, RuleEngine,
};
