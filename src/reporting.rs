// src/reporting.rs
// Pass/fail judgments over test results

use std::time::Duration;

use crate::types::TestResult;

/// Process exit status when every test passed
pub const EXIT_SUCCESS: i32 = 0;

/// Process exit status when any test failed
pub const EXIT_FAILURE: i32 = 1;

/// A result fails when its spec errored or any of its checks failed
pub fn is_failed(result: &TestResult) -> bool {
    result.error.is_some() || result.checks.iter().any(|check| !check.fact.pass)
}

pub fn is_success(results: &[TestResult]) -> bool {
    !results.iter().any(is_failed)
}

/// 0 when all results passed, 1 otherwise
pub fn status_of(results: &[TestResult]) -> i32 {
    if is_success(results) {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}

/// Totals across a set of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub time: Duration,
}

impl Summary {
    pub fn of(results: &[TestResult]) -> Self {
        let failed = results.iter().filter(|r| is_failed(r)).count();
        Self {
            passed: results.len() - failed,
            failed,
            time: results.iter().map(|r| r.time).sum(),
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed
    }
}
