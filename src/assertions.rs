//! Standard assertion methods
//!
//! `ok` and `equal` make up the default method map. [`Is`] gives them typed
//! call syntax on a [`Tester`]; custom methods go through [`Tester::call`].

use serde::Serialize;
use serde_json::Value;

use crate::tester::{MethodMap, Tester};
use crate::types::Fact;

/// Passes when the first argument is exactly `true`
pub fn ok(args: &[Value]) -> Fact {
    let (actual, details) = split(args, 1);
    let pass = actual[0] == Value::Bool(true);
    Fact::new("ok", pass)
        .with_actual(actual[0].clone())
        .with_expected(Value::Bool(true))
        .with_details(details)
}

/// Passes when the first two arguments are structurally equal
pub fn equal(args: &[Value]) -> Fact {
    let (values, details) = split(args, 2);
    Fact::new("equal", values[0] == values[1])
        .with_actual(values[0].clone())
        .with_expected(values[1].clone())
        .with_details(details)
}

/// Method map holding the standard assertions
pub fn standard() -> MethodMap {
    MethodMap::new().with("ok", ok).with("equal", equal)
}

// Leading positional arguments (missing ones read as null) and the rest as details
fn split(args: &[Value], positional: usize) -> (Vec<Value>, Vec<Value>) {
    let mut values: Vec<Value> = args.iter().take(positional).cloned().collect();
    values.resize(positional, Value::Null);
    let details = args.iter().skip(positional).cloned().collect();
    (values, details)
}

/// Serialize any value for use as an assertion argument
pub fn to_value<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| Value::String(format!("<unserializable: {}>", e)))
}

/// Free-form trailing arguments of an assertion
pub trait IntoDetails {
    fn into_details(self) -> Vec<Value>;
}

impl IntoDetails for () {
    fn into_details(self) -> Vec<Value> {
        Vec::new()
    }
}

impl IntoDetails for &str {
    fn into_details(self) -> Vec<Value> {
        vec![Value::String(self.to_string())]
    }
}

impl IntoDetails for String {
    fn into_details(self) -> Vec<Value> {
        vec![Value::String(self)]
    }
}

impl IntoDetails for Value {
    fn into_details(self) -> Vec<Value> {
        vec![self]
    }
}

impl IntoDetails for Vec<Value> {
    fn into_details(self) -> Vec<Value> {
        self
    }
}

/// Typed calls for the standard assertions
///
/// ```ignore
/// is.equal(add(1, 2), 3, "adds");
/// is.ok(list.is_empty(), ());
/// ```
pub trait Is {
    fn ok<A: Serialize>(&self, actual: A, details: impl IntoDetails);

    fn equal<A: Serialize, E: Serialize>(&self, actual: A, expected: E, details: impl IntoDetails);
}

impl Is for Tester {
    #[track_caller]
    fn ok<A: Serialize>(&self, actual: A, details: impl IntoDetails) {
        let mut args = vec![to_value(actual)];
        args.extend(details.into_details());
        self.call("ok", &args);
    }

    #[track_caller]
    fn equal<A: Serialize, E: Serialize>(&self, actual: A, expected: E, details: impl IntoDetails) {
        let mut args = vec![to_value(actual), to_value(expected)];
        args.extend(details.into_details());
        self.call("equal", &args);
    }
}
