//! State model shared by the policy function: resources, results, requests, and responses.

#![warn(missing_docs, clippy::pedantic)]

mod duration;
mod error;
mod request;
mod resource;
mod response;
mod result;
mod wire;

/// Protobuf JSON duration helpers used for response time-to-live values.
pub use duration::{format_duration, parse_duration};
/// Error type and result alias for state decoding.
pub use error::{Error, Result};
/// Requests received from the pipeline.
pub use request::{FunctionRequest, RequestMeta};
/// Managed resources and observed/desired state.
pub use resource::{Ready, Resource, State};
/// Responses returned to the pipeline.
pub use response::{DEFAULT_TTL, FunctionResponse, ResponseMeta};
/// Severity-tagged policy results.
pub use result::{PolicyResult, Severity};
