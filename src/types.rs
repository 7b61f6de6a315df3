// src/types.rs
// Records produced by a test run: facts, checks, results and captured errors

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::location::Location;

/// Stand-in value for a panic payload that was neither `&str` nor `String`
pub const LOST_PANIC_PAYLOAD: &str =
    "<panic payload of a non-string type; the original value was lost>";

/// Outcome of exactly one assertion invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub label: String,
    pub pass: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(default)]
    pub details: Vec<Value>,
}

impl Fact {
    pub fn new(label: impl Into<String>, pass: bool) -> Self {
        Self {
            label: label.into(),
            pass,
            actual: None,
            expected: None,
            details: Vec::new(),
        }
    }

    pub fn with_actual(mut self, actual: Value) -> Self {
        self.actual = Some(actual);
        self
    }

    pub fn with_expected(mut self, expected: Value) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn with_details(mut self, details: Vec<Value>) -> Self {
        self.details = details;
        self
    }

    /// Whether the fact carries anything worth diffing
    pub fn has_values(&self) -> bool {
        self.actual.is_some() || self.expected.is_some()
    }
}

/// A fact paired with the call site of the assertion that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub location: Location,
    pub fact: Fact,
}

/// Carrier for a failure value that is not itself an error
///
/// Raised by the harness for panics, and by specs that want to fail with an
/// arbitrary value (`Err(UnknownError::new(json!({..})).into())`).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unknown error: {value}")]
pub struct UnknownError {
    value: Value,
}

impl UnknownError {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// The original failure value, preserved for display
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Wrap a panic payload; string payloads are kept as-is
    ///
    /// Any other payload type cannot be inspected, so only a note that its
    /// value was lost survives.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let value = if let Some(s) = payload.downcast_ref::<&'static str>() {
            Value::String((*s).to_string())
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Value::String(s.clone())
        } else {
            debug!(type_id = ?(*payload).type_id(), "panic payload is not a string");
            Value::String(LOST_PANIC_PAYLOAD.to_string())
        };
        Self { value }
    }
}

/// The failure captured from a spec, if it did not complete normally
#[derive(Debug, Clone)]
pub enum SpecError {
    /// An error-like value, stored verbatim
    Error(Arc<anyhow::Error>),
    /// A non-error failure value (panic payload or explicit carrier)
    Unknown(UnknownError),
}

impl SpecError {
    /// Classify an error returned by a spec
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        match err.downcast::<UnknownError>() {
            Ok(unknown) => SpecError::Unknown(unknown),
            Err(err) => SpecError::Error(Arc::new(err)),
        }
    }

    pub fn as_unknown(&self) -> Option<&UnknownError> {
        match self {
            SpecError::Unknown(unknown) => Some(unknown),
            SpecError::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&anyhow::Error> {
        match self {
            SpecError::Error(err) => Some(&**err),
            SpecError::Unknown(_) => None,
        }
    }
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecError::Error(err) => write!(f, "{:#}", err),
            SpecError::Unknown(unknown) => write!(f, "{}", unknown),
        }
    }
}

impl From<anyhow::Error> for SpecError {
    fn from(err: anyhow::Error) -> Self {
        SpecError::from_anyhow(err)
    }
}

/// Full outcome of one test run
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub description: String,
    #[serde(serialize_with = "serialize_millis")]
    pub time: Duration,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<SpecError>,
    pub checks: Vec<Check>,
}

impl TestResult {
    pub fn passed_checks(&self) -> usize {
        self.checks.iter().filter(|c| c.fact.pass).count()
    }

    pub fn failed_checks(&self) -> usize {
        self.checks.iter().filter(|c| !c.fact.pass).count()
    }
}

/// Milliseconds with sub-millisecond precision
pub fn millis(time: Duration) -> f64 {
    time.as_nanos() as f64 / 1_000_000.0
}

pub(crate) fn serialize_millis<S>(time: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_f64(millis(*time))
}

pub(crate) fn serialize_error<S>(error: &Option<SpecError>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(err) => s.serialize_str(&err.to_string()),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fact_builder() {
        let fact = Fact::new("ok", false)
            .with_actual(json!(false))
            .with_expected(json!(true))
            .with_details(vec![json!("will fail")]);
        assert_eq!(fact.label, "ok");
        assert!(!fact.pass);
        assert!(fact.has_values());
        assert_eq!(fact.details, vec![json!("will fail")]);
    }

    #[test]
    fn test_fact_without_values() {
        assert!(!Fact::new("fail", false).has_values());
    }

    #[test]
    fn test_fact_serialization_omits_absent_values() {
        let json = serde_json::to_value(Fact::new("ok", true)).unwrap();
        assert_eq!(json, json!({ "label": "ok", "pass": true, "details": [] }));
    }

    #[test]
    fn test_spec_error_keeps_errors_verbatim() {
        let err = SpecError::from_anyhow(anyhow::anyhow!("oh no"));
        assert!(err.as_unknown().is_none());
        assert_eq!(err.as_error().unwrap().to_string(), "oh no");
    }

    #[test]
    fn test_spec_error_unwraps_unknown_carrier() {
        let err: anyhow::Error = UnknownError::new(json!({ "oops": "oh no" })).into();
        let err = SpecError::from_anyhow(err);
        assert_eq!(err.as_unknown().unwrap().value(), &json!({ "oops": "oh no" }));
    }

    #[test]
    fn test_unknown_error_from_panic_payloads() {
        let str_payload: Box<dyn Any + Send> = Box::new("oh no");
        assert_eq!(UnknownError::from_panic(str_payload).value(), &json!("oh no"));

        let string_payload: Box<dyn Any + Send> = Box::new(String::from("formatted 42"));
        assert_eq!(
            UnknownError::from_panic(string_payload).value(),
            &json!("formatted 42")
        );

        let other: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(UnknownError::from_panic(other).value(), &json!(LOST_PANIC_PAYLOAD));
        assert!(LOST_PANIC_PAYLOAD.contains("original value was lost"));
    }

    #[test]
    fn test_result_wire_shape() {
        let result = TestResult {
            description: "wire".to_string(),
            time: Duration::from_micros(1500),
            error: Some(SpecError::from_anyhow(anyhow::anyhow!("boom"))),
            checks: vec![Check {
                location: Location::new("tests/wire.rs:3:5"),
                fact: Fact::new("ok", true).with_actual(json!(true)),
            }],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["description"], "wire");
        assert_eq!(json["time"], json!(1.5));
        assert_eq!(json["error"], "boom");
        assert_eq!(json["checks"][0]["location"], "tests/wire.rs:3:5");
        assert_eq!(json["checks"][0]["fact"]["actual"], true);
    }

    #[test]
    fn test_check_counts() {
        let check = |pass| Check {
            location: Location::unknown(),
            fact: Fact::new("ok", pass),
        };
        let result = TestResult {
            description: "counts".to_string(),
            time: Duration::ZERO,
            error: None,
            checks: vec![check(true), check(false), check(true)],
        };
        assert_eq!(result.passed_checks(), 2);
        assert_eq!(result.failed_checks(), 1);
    }
}
