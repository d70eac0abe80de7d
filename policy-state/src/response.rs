//! Responses returned to the pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::duration;
use crate::resource::State;
use crate::result::PolicyResult;

/// Time-to-live applied to responses when the host does not choose one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Pipeline-owned metadata echoed on every response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseMeta {
    #[serde(default)]
    tag: String,
    #[serde(
        default,
        with = "duration::optional",
        skip_serializing_if = "Option::is_none"
    )]
    ttl: Option<Duration>,
}

impl ResponseMeta {
    /// Creates response metadata with the given tag and time-to-live.
    #[must_use]
    pub fn new(tag: impl Into<String>, ttl: Duration) -> Self {
        Self {
            tag: tag.into(),
            ttl: Some(ttl),
        }
    }

    /// Returns the correlation tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the time-to-live, if set.
    #[must_use]
    pub const fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

/// The function's answer to a single request.
///
/// Decoding rejects unknown fields so policy output that drifts from this
/// shape fails instead of silently losing data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<ResponseMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    desired: Option<State>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    results: Vec<PolicyResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<Map<String, Value>>,
}

impl FunctionResponse {
    /// Creates an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the metadata and returns the updated response.
    #[must_use]
    pub fn with_meta(mut self, meta: ResponseMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Sets the desired state and returns the updated response.
    #[must_use]
    pub fn with_desired(mut self, desired: State) -> Self {
        self.desired = Some(desired);
        self
    }

    /// Appends a result and returns the updated response.
    #[must_use]
    pub fn with_result(mut self, result: PolicyResult) -> Self {
        self.results.push(result);
        self
    }

    /// Returns the metadata, if set.
    #[must_use]
    pub fn meta(&self) -> Option<&ResponseMeta> {
        self.meta.as_ref()
    }

    /// Removes and returns the metadata.
    pub fn take_meta(&mut self) -> Option<ResponseMeta> {
        self.meta.take()
    }

    /// Replaces the metadata.
    pub fn set_meta(&mut self, meta: Option<ResponseMeta>) {
        self.meta = meta;
    }

    /// Returns the desired state, if set.
    #[must_use]
    pub fn desired(&self) -> Option<&State> {
        self.desired.as_ref()
    }

    /// Replaces the desired state.
    pub fn set_desired(&mut self, desired: Option<State>) {
        self.desired = desired;
    }

    /// Returns the results in insertion order.
    #[must_use]
    pub fn results(&self) -> &[PolicyResult] {
        &self.results
    }

    /// Replaces the results.
    pub fn set_results(&mut self, results: Vec<PolicyResult>) {
        self.results = results;
    }

    /// Appends a result.
    pub fn push_result(&mut self, result: PolicyResult) {
        self.results.push(result);
    }

    /// Appends a fatal result with the supplied message.
    pub fn fatal(&mut self, message: impl Into<String>) {
        self.push_result(PolicyResult::fatal(message));
    }

    /// Returns true when any result is fatal.
    #[must_use]
    pub fn has_fatal(&self) -> bool {
        self.results.iter().any(PolicyResult::is_fatal)
    }

    /// Returns the pipeline context, if set.
    #[must_use]
    pub fn context(&self) -> Option<&Map<String, Value>> {
        self.context.as_ref()
    }

    /// Replaces the pipeline context.
    pub fn set_context(&mut self, context: Option<Map<String, Value>>) {
        self.context = context;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_meta_ttl_as_duration_string() {
        let response = FunctionResponse::new().with_meta(ResponseMeta::new("hello", DEFAULT_TTL));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"meta": {"tag": "hello", "ttl": "60s"}})
        );
    }

    #[test]
    fn decodes_results_in_order() {
        let response: FunctionResponse = serde_json::from_value(json!({
            "results": [
                {"severity": "SEVERITY_WARNING", "message": "first"},
                {"severity": "SEVERITY_FATAL", "message": "second"}
            ]
        }))
        .unwrap();

        let messages: Vec<_> = response.results().iter().map(PolicyResult::message).collect();
        assert_eq!(messages, ["first", "second"]);
        assert!(response.has_fatal());
    }

    #[test]
    fn unknown_top_level_fields_are_rejected() {
        let err = serde_json::from_value::<FunctionResponse>(json!({"observed": {}}))
            .expect_err("observed is not writable");
        assert!(err.to_string().contains("observed"));
    }

    #[test]
    fn fatal_appends_after_existing_results() {
        let mut response = FunctionResponse::new().with_result(PolicyResult::normal("ok"));
        response.fatal("stop");

        assert_eq!(response.results().len(), 2);
        assert!(response.results()[1].is_fatal());
    }
}
