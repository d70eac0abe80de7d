//! Input configuration carried on each request.

use std::collections::BTreeMap;

use policy_engine::PolicyModule;
use policy_state::FunctionRequest;
use serde::{Deserialize, Serialize};

use crate::error::{FunctionError, MergeResult};

/// Scripts to evaluate, keyed by module name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    #[serde(default)]
    scripts: BTreeMap<String, String>,
}

/// Object-shaped input supplied by the author of the pipeline step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInput {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    kind: String,
    #[serde(default)]
    spec: InputSpec,
}

impl FunctionInput {
    /// Creates an input with no scripts.
    #[must_use]
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            spec: InputSpec::default(),
        }
    }

    /// Adds a script and returns the updated input.
    #[must_use]
    pub fn with_script(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.spec.scripts.insert(name.into(), source.into());
        self
    }

    /// Decodes the input attached to `request`. A missing input has no scripts.
    ///
    /// # Errors
    ///
    /// Returns [`FunctionError::Input`] when the input is not an object of the
    /// expected shape.
    pub fn from_request(request: &FunctionRequest) -> MergeResult<Self> {
        match request.input() {
            Some(raw) => Self::deserialize(raw).map_err(|err| FunctionError::input(err.to_string())),
            None => Ok(Self::default()),
        }
    }

    /// Returns the API version.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Returns the kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the scripts keyed by name.
    #[must_use]
    pub fn scripts(&self) -> &BTreeMap<String, String> {
        &self.spec.scripts
    }

    /// Returns the scripts as policy modules, ordered by name.
    #[must_use]
    pub fn modules(&self) -> Vec<PolicyModule> {
        self.spec
            .scripts
            .iter()
            .map(|(name, source)| PolicyModule::new(name.clone(), source.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_scripts_in_name_order() {
        let request = FunctionRequest::new().with_input(json!({
            "apiVersion": "rego.fn.example.org/v1beta1",
            "kind": "Input",
            "metadata": {"name": "ignored"},
            "spec": {"scripts": {"z.rego": "package z", "a.rego": "package a"}}
        }));

        let input = FunctionInput::from_request(&request).unwrap();
        let names: Vec<_> = input.modules().iter().map(|m| m.name().to_owned()).collect();

        assert_eq!(input.kind(), "Input");
        assert_eq!(names, ["a.rego", "z.rego"]);
    }

    #[test]
    fn missing_input_or_spec_has_no_scripts() {
        let input = FunctionInput::from_request(&FunctionRequest::new()).unwrap();
        assert!(input.scripts().is_empty());

        let request = FunctionRequest::new().with_input(json!({
            "apiVersion": "dummy.fn.example.org",
            "kind": "Input"
        }));
        assert!(FunctionInput::from_request(&request).unwrap().modules().is_empty());
    }

    #[test]
    fn malformed_input_is_an_input_error() {
        let request = FunctionRequest::new().with_input(json!({"spec": {"scripts": ["not", "a", "map"]}}));

        let err = FunctionInput::from_request(&request).expect_err("scripts must be a map");
        assert!(matches!(err, FunctionError::Input { .. }));
        assert!(err.to_string().starts_with("cannot get function input from request"));
    }

    #[test]
    fn builder_round_trips_through_request() {
        let input = FunctionInput::new("rego.fn.example.org/v1beta1", "Input")
            .with_script("hello.rego", "package crossplane");
        let request = FunctionRequest::new().with_input(serde_json::to_value(&input).unwrap());

        assert_eq!(FunctionInput::from_request(&request).unwrap(), input);
    }
}
