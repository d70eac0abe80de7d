//! Shared rule engine traits and data structures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::context::EvalContext;

/// Query evaluated against the policy modules. Binds the final response.
pub const DEFAULT_QUERY: &str = "response = data.crossplane.response";

/// Name of the variable bound by [`DEFAULT_QUERY`].
pub const RESPONSE_BINDING: &str = "response";

/// Result alias used by rule engines.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error type shared by rule engine implementations.
///
/// Compile-time and evaluation-time failures are distinct so callers can report
/// them differently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Policy source failed to parse or reference-check.
    #[error("{reason}")]
    Compile {
        /// Additional context for the failure.
        reason: String,
    },

    /// Policy execution failed at runtime.
    #[error("{reason}")]
    Evaluation {
        /// Additional context for the failure.
        reason: String,
    },

    /// The caller cancelled the evaluation.
    #[error("evaluation cancelled")]
    Cancelled,

    /// The evaluation deadline passed before the engine produced a result.
    #[error("evaluation deadline exceeded")]
    DeadlineExceeded,
}

impl EngineError {
    /// Convenience constructor for compile failures.
    #[must_use]
    pub fn compile(reason: impl Into<String>) -> Self {
        Self::Compile {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for evaluation failures.
    #[must_use]
    pub fn evaluation(reason: impl Into<String>) -> Self {
        Self::Evaluation {
            reason: reason.into(),
        }
    }

    /// Returns true for compile-time failures.
    #[must_use]
    pub const fn is_compile(&self) -> bool {
        matches!(self, Self::Compile { .. })
    }

    /// Returns true when the evaluation was cut short by its context.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// A named unit of policy source text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyModule {
    name: String,
    source: String,
}

impl PolicyModule {
    /// Creates a module from its name and source.
    #[must_use]
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Returns the module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the module source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// One set of variable bindings satisfying the query.
pub type Bindings = Map<String, Value>;

/// Every solution the engine found for a query, in engine order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvaluationResult {
    solutions: Vec<Bindings>,
}

impl EvaluationResult {
    /// Creates a result from the supplied binding sets.
    #[must_use]
    pub fn new(solutions: Vec<Bindings>) -> Self {
        Self { solutions }
    }

    /// Creates a result with exactly one binding set holding `name = value`.
    #[must_use]
    pub fn single(name: impl Into<String>, value: Value) -> Self {
        let mut bindings = Bindings::new();
        bindings.insert(name.into(), value);
        Self::new(vec![bindings])
    }

    /// Returns the binding sets.
    #[must_use]
    pub fn solutions(&self) -> &[Bindings] {
        &self.solutions
    }

    /// Returns the number of binding sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    /// Returns true when the query had no solution.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    /// Consumes the result, returning the binding sets.
    #[must_use]
    pub fn into_solutions(self) -> Vec<Bindings> {
        self.solutions
    }
}

/// Trait implemented by declarative rule engines.
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// Compiled form of a module set plus query.
    type Prepared: Send + 'static;

    /// Compiles the modules and the query.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Compile`] when a module fails to parse or the
    /// module set is empty.
    fn compile(&self, modules: &[PolicyModule], query: &str) -> EngineResult<Self::Prepared>;

    /// Evaluates a prepared query against `input`, honouring `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Evaluation`] on runtime failures, and
    /// [`EngineError::Cancelled`] or [`EngineError::DeadlineExceeded`] when the
    /// context fires first.
    async fn evaluate(
        &self,
        prepared: Self::Prepared,
        input: Value,
        ctx: &EvalContext,
    ) -> EngineResult<EvaluationResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_result_binds_one_variable() {
        let result = EvaluationResult::single(RESPONSE_BINDING, json!({"results": []}));

        assert_eq!(result.len(), 1);
        assert_eq!(result.solutions()[0][RESPONSE_BINDING], json!({"results": []}));
    }

    #[test]
    fn error_classes_are_distinct() {
        assert!(EngineError::compile("rego_parse_error").is_compile());
        assert!(!EngineError::evaluation("type error").is_compile());
        assert!(EngineError::Cancelled.is_interrupted());
        assert!(EngineError::DeadlineExceeded.is_interrupted());
        assert_eq!(EngineError::Cancelled.to_string(), "evaluation cancelled");
    }
}
