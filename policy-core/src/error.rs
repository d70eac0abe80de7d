//! Errors raised while evaluating policies into a response.

use policy_engine::EngineError;
use thiserror::Error;

/// Result alias for merge and pipeline operations.
pub type MergeResult<T> = Result<T, FunctionError>;

/// Every way a policy evaluation can fail.
///
/// None of these escape [`PolicyFunction::run_function`](crate::PolicyFunction::run_function);
/// each is rendered into a single fatal result on the response.
#[derive(Debug, Error)]
pub enum FunctionError {
    /// The request did not configure the function usefully.
    #[error("{0}")]
    Configuration(&'static str),
    /// The input configuration attached to the request could not be decoded.
    #[error("cannot get function input from request: {reason}")]
    Input {
        /// Decoder error.
        reason: String,
    },
    /// The query input could not be serialized for the engine.
    #[error("cannot encode rego query input: {reason}")]
    Encode {
        /// Serializer error.
        reason: String,
    },
    /// The policy modules failed to compile.
    #[error("cannot prepare rego query: {source}")]
    Compile {
        /// Engine compile error.
        source: EngineError,
    },
    /// The engine failed, was cancelled, or ran out of time while evaluating.
    #[error("cannot evaluate rego query: {source}")]
    Evaluation {
        /// Engine evaluation error.
        source: EngineError,
    },
    /// The query did not have exactly one solution.
    #[error("expected a single result from rego query, got {count}")]
    Cardinality {
        /// Number of solutions the engine produced.
        count: usize,
    },
    /// The bound response did not match the response shape.
    #[error("cannot decode rego result into function response: {reason}: {output}")]
    Decode {
        /// Decoder error.
        reason: String,
        /// The value produced by the policy, as compact JSON.
        output: String,
    },
}

impl FunctionError {
    /// The request supplied no policy modules.
    #[must_use]
    pub const fn no_scripts() -> Self {
        Self::Configuration("no scripts supplied")
    }

    /// Convenience constructor for input decoding failures.
    #[must_use]
    pub fn input(reason: impl Into<String>) -> Self {
        Self::Input {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for query input encoding failures.
    #[must_use]
    pub fn encode(reason: impl Into<String>) -> Self {
        Self::Encode {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for response decoding failures.
    #[must_use]
    pub fn decode(reason: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
            output: output.into(),
        }
    }
}

impl From<EngineError> for FunctionError {
    fn from(source: EngineError) -> Self {
        if source.is_compile() {
            Self::Compile { source }
        } else {
            Self::Evaluation { source }
        }
    }
}
