//! Requests received from the pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::resource::State;

/// Pipeline metadata attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestMeta {
    #[serde(default)]
    tag: String,
}

impl RequestMeta {
    /// Creates request metadata carrying the correlation tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    /// Returns the correlation tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// A single invocation of the function by the pipeline.
///
/// Absent `observed` or `desired` state is equivalent to an empty [`State`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<RequestMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    observed: Option<State>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    desired: Option<State>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<Map<String, Value>>,
}

impl FunctionRequest {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the correlation tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.meta = Some(RequestMeta::new(tag));
        self
    }

    /// Sets the observed state.
    #[must_use]
    pub fn with_observed(mut self, observed: State) -> Self {
        self.observed = Some(observed);
        self
    }

    /// Sets the desired state accumulated by earlier pipeline steps.
    #[must_use]
    pub fn with_desired(mut self, desired: State) -> Self {
        self.desired = Some(desired);
        self
    }

    /// Sets the function input configuration.
    #[must_use]
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Sets the pipeline context.
    #[must_use]
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    /// Returns the request metadata, if any.
    #[must_use]
    pub fn meta(&self) -> Option<&RequestMeta> {
        self.meta.as_ref()
    }

    /// Returns the correlation tag, or an empty string when absent.
    #[must_use]
    pub fn tag(&self) -> &str {
        self.meta.as_ref().map_or("", RequestMeta::tag)
    }

    /// Returns the observed state, if supplied.
    #[must_use]
    pub fn observed(&self) -> Option<&State> {
        self.observed.as_ref()
    }

    /// Returns the desired state, if supplied.
    #[must_use]
    pub fn desired(&self) -> Option<&State> {
        self.desired.as_ref()
    }

    /// Returns the raw input configuration, if supplied.
    #[must_use]
    pub fn input(&self) -> Option<&Value> {
        self.input.as_ref()
    }

    /// Returns the pipeline context, if supplied.
    #[must_use]
    pub fn context(&self) -> Option<&Map<String, Value>> {
        self.context.as_ref()
    }
}
