//! Resources and the observed/desired state that groups them.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::wire::{self, WireEnum};

/// Readiness reported by a function for a desired resource.
///
/// Decodes from the enum name or its protobuf number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Ready {
    /// Readiness is left to the pipeline to determine.
    #[serde(rename = "READY_UNSPECIFIED")]
    Unspecified,
    /// The resource is ready.
    #[serde(rename = "READY_TRUE")]
    True,
    /// The resource is not ready.
    #[serde(rename = "READY_FALSE")]
    False,
}

impl WireEnum for Ready {
    const EXPECTING: &'static str = "a READY_* name or number";

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "READY_UNSPECIFIED" => Some(Self::Unspecified),
            "READY_TRUE" => Some(Self::True),
            "READY_FALSE" => Some(Self::False),
            _ => None,
        }
    }

    fn from_number(number: i64) -> Option<Self> {
        match number {
            0 => Some(Self::Unspecified),
            1 => Some(Self::True),
            2 => Some(Self::False),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Ready {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        wire::deserialize(deserializer)
    }
}

/// A single managed object: an opaque document plus connection details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Resource {
    #[serde(default)]
    resource: Map<String, Value>,
    #[serde(default, alias = "connection_details", skip_serializing_if = "BTreeMap::is_empty")]
    connection_details: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ready: Option<Ready>,
}

impl Resource {
    /// Creates a resource from its document.
    #[must_use]
    pub fn new(document: Map<String, Value>) -> Self {
        Self {
            resource: document,
            connection_details: BTreeMap::new(),
            ready: None,
        }
    }

    /// Creates a resource from a JSON value, treating non-objects as empty.
    #[must_use]
    pub fn from_value(document: Value) -> Self {
        match document {
            Value::Object(map) => Self::new(map),
            _ => Self::default(),
        }
    }

    /// Adds a connection detail and returns the updated resource.
    #[must_use]
    pub fn with_connection_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.connection_details.insert(key.into(), value.into());
        self
    }

    /// Sets the readiness and returns the updated resource.
    #[must_use]
    pub fn with_ready(mut self, ready: Ready) -> Self {
        self.ready = Some(ready);
        self
    }

    /// Returns the resource document.
    #[must_use]
    pub fn document(&self) -> &Map<String, Value> {
        &self.resource
    }

    /// Returns a mutable reference to the resource document.
    pub fn document_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.resource
    }

    /// Returns the connection details.
    #[must_use]
    pub fn connection_details(&self) -> &BTreeMap<String, String> {
        &self.connection_details
    }

    /// Returns the readiness, if reported.
    #[must_use]
    pub const fn ready(&self) -> Option<Ready> {
        self.ready
    }

    /// Looks up `metadata.annotations[key]` as a string.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.resource
            .get("metadata")?
            .get("annotations")?
            .get(key)?
            .as_str()
    }
}

/// The composite resource plus the named composed resources of one pipeline step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct State {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    composite: Option<Resource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    resources: BTreeMap<String, Resource>,
}

impl State {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the composite resource and returns the updated state.
    #[must_use]
    pub fn with_composite(mut self, composite: Resource) -> Self {
        self.composite = Some(composite);
        self
    }

    /// Adds a named composed resource and returns the updated state.
    #[must_use]
    pub fn with_resource(mut self, name: impl Into<String>, resource: Resource) -> Self {
        self.resources.insert(name.into(), resource);
        self
    }

    /// Returns the composite resource, if any.
    #[must_use]
    pub fn composite(&self) -> Option<&Resource> {
        self.composite.as_ref()
    }

    /// Returns the named composed resources.
    #[must_use]
    pub fn resources(&self) -> &BTreeMap<String, Resource> {
        &self.resources
    }

    /// Returns a single composed resource by name.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Returns `true` when the state has neither a composite nor composed resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.composite.is_none() && self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_annotations_from_metadata() {
        let resource = Resource::from_value(json!({
            "metadata": {"annotations": {"example.org/illegal": "true"}}
        }));

        assert_eq!(resource.annotation("example.org/illegal"), Some("true"));
        assert_eq!(resource.annotation("example.org/missing"), None);
        assert_eq!(Resource::default().annotation("example.org/illegal"), None);
    }

    #[test]
    fn state_uses_camel_case_wire_names() {
        let state = State::new().with_resource(
            "db",
            Resource::from_value(json!({"kind": "Database"}))
                .with_connection_detail("password", "c2VjcmV0")
                .with_ready(Ready::True),
        );

        let encoded = serde_json::to_value(&state).unwrap();
        assert_eq!(
            encoded,
            json!({
                "resources": {
                    "db": {
                        "resource": {"kind": "Database"},
                        "connectionDetails": {"password": "c2VjcmV0"},
                        "ready": "READY_TRUE"
                    }
                }
            })
        );
    }

    #[test]
    fn accepts_proto_field_names_and_enum_numbers() {
        let resource: Resource = serde_json::from_value(json!({
            "resource": {"kind": "Database"},
            "connection_details": {"password": "c2VjcmV0"},
            "ready": 2
        }))
        .unwrap();

        assert_eq!(resource.connection_details()["password"], "c2VjcmV0");
        assert_eq!(resource.ready(), Some(Ready::False));

        let err = serde_json::from_value::<Resource>(json!({"ready": 7}))
            .expect_err("unknown readiness");
        assert!(err.to_string().contains("READY_"));
    }

    #[test]
    fn unknown_resource_fields_are_rejected() {
        let err = serde_json::from_value::<State>(json!({
            "composite": {"resource": {}, "surprise": 1}
        }))
        .expect_err("unknown field");
        assert!(err.to_string().contains("surprise"));
    }

    #[test]
    fn empty_state_reports_empty() {
        assert!(State::new().is_empty());
        assert!(!State::new().with_composite(Resource::default()).is_empty());
    }
}
