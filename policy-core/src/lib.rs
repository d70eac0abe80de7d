//! Evaluation-and-merge core of the policy function.
//!
//! [`PolicyFunction::run_function`] seeds a response from the request, runs
//! the request's policy modules through a [`RuleEngine`](policy_engine::RuleEngine),
//! and merges the single response they bind back in. Every failure is reported
//! as a fatal result rather than an error.

#![warn(missing_docs, clippy::pedantic)]

pub mod error;
pub mod input;
pub mod merge;
pub mod pipeline;

pub use error::{FunctionError, MergeResult};
pub use input::{FunctionInput, InputSpec};
pub use merge::merge_evaluation;
pub use pipeline::{DEFAULT_EVAL_TIMEOUT, FunctionSettings, PolicyFunction, finalize, seed};
