//! Serializable summary of a run, for machine consumption (`--json`)

use serde::Serialize;
use serde_json::Value;

use super::{format_details, format_error};
use crate::reporting::{is_failed, Summary};
use crate::types::{millis, TestResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub passed: usize,
    pub failed: usize,
    /// Total time in milliseconds
    pub time: f64,
    pub results: Vec<ResultReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultReport {
    pub description: String,
    pub pass: bool,
    pub time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checks_passed: usize,
    pub checks_failed: usize,
    pub facts: Vec<FactReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactReport {
    pub label: String,
    pub pass: bool,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Report {
    pub fn from_results(results: &[TestResult], format: &dyn Fn(&Value) -> String) -> Self {
        let summary = Summary::of(results);

        Self {
            passed: summary.passed,
            failed: summary.failed,
            time: millis(summary.time),
            results: results
                .iter()
                .map(|result| ResultReport {
                    description: result.description.clone(),
                    pass: !is_failed(result),
                    time: millis(result.time),
                    error: result.error.as_ref().map(|err| format_error(err, format)),
                    checks_passed: result.passed_checks(),
                    checks_failed: result.failed_checks(),
                    facts: result
                        .checks
                        .iter()
                        .map(|check| FactReport {
                            label: check.fact.label.clone(),
                            pass: check.fact.pass,
                            location: check.location.to_string(),
                            actual: check.fact.actual.as_ref().map(|v| format(v)),
                            expected: check.fact.expected.as_ref().map(|v| format(v)),
                            details: format_details(&check.fact.details, format),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
