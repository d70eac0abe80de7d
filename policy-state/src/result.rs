//! Severity-tagged results emitted by policy evaluation.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::wire::{self, WireEnum};

/// Classification of a result. A fatal result halts the pipeline.
///
/// Decodes from the enum name or its protobuf number. `SEVERITY_UNSPECIFIED`
/// is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    /// Informational result.
    #[serde(rename = "SEVERITY_NORMAL")]
    Normal,
    /// Result the operator should look at; processing continues.
    #[serde(rename = "SEVERITY_WARNING")]
    Warning,
    /// Pipeline-halting result.
    #[serde(rename = "SEVERITY_FATAL")]
    Fatal,
}

impl WireEnum for Severity {
    const EXPECTING: &'static str = "a SEVERITY_* name or number";

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "SEVERITY_FATAL" => Some(Self::Fatal),
            "SEVERITY_NORMAL" => Some(Self::Normal),
            "SEVERITY_WARNING" => Some(Self::Warning),
            _ => None,
        }
    }

    fn from_number(number: i64) -> Option<Self> {
        match number {
            1 => Some(Self::Fatal),
            2 => Some(Self::Normal),
            3 => Some(Self::Warning),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        wire::deserialize(deserializer)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "SEVERITY_NORMAL",
            Self::Warning => "SEVERITY_WARNING",
            Self::Fatal => "SEVERITY_FATAL",
        })
    }
}

/// A single result message produced by a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyResult {
    severity: Severity,
    #[serde(default)]
    message: String,
}

impl PolicyResult {
    /// Creates a result with the given severity and message.
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    /// Returns a normal result.
    #[must_use]
    pub fn normal(message: impl Into<String>) -> Self {
        Self::new(Severity::Normal, message)
    }

    /// Returns a warning result.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Returns a fatal result.
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, message)
    }

    /// Returns the severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true when the result halts the pipeline.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_helpers_work() {
        assert!(PolicyResult::fatal("stop").is_fatal());
        assert!(!PolicyResult::warning("careful").is_fatal());
        assert_eq!(PolicyResult::normal("hi").severity(), Severity::Normal);
        assert_eq!(Severity::Warning.to_string(), "SEVERITY_WARNING");
    }

    #[test]
    fn decodes_wire_severity() {
        let result: PolicyResult = serde_json::from_value(json!({
            "severity": "SEVERITY_NORMAL",
            "message": "Hello World!"
        }))
        .unwrap();
        assert_eq!(result, PolicyResult::normal("Hello World!"));
    }

    #[test]
    fn decodes_numeric_severity() {
        let results: Vec<PolicyResult> = serde_json::from_value(json!([
            {"severity": 1, "message": "stop"},
            {"severity": 2, "message": "hi"},
            {"severity": 3, "message": "careful"}
        ]))
        .unwrap();

        assert_eq!(
            results,
            [
                PolicyResult::fatal("stop"),
                PolicyResult::normal("hi"),
                PolicyResult::warning("careful")
            ]
        );
    }

    #[test]
    fn unspecified_severity_is_rejected() {
        for severity in [json!(0), json!("SEVERITY_UNSPECIFIED"), json!("loud")] {
            let err = serde_json::from_value::<PolicyResult>(json!({"severity": severity}))
                .expect_err("not a usable severity");
            assert!(err.to_string().contains("SEVERITY_"));
        }
    }

    #[test]
    fn missing_severity_is_rejected() {
        let err = serde_json::from_value::<PolicyResult>(json!({"message": "no severity"}))
            .expect_err("severity is required");
        assert!(err.to_string().contains("severity"));
    }
}
