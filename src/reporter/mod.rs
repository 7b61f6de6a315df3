//! Human-readable test reports
//!
//! A [`Reporter`] is assembled once from its collaborators (output sink,
//! value formatter, palette, options) and renders results to text. The
//! diagnostic engine lives in [`diff`], the serializable summary in
//! [`report`].

pub mod colors;
pub mod diff;
pub mod report;

use serde::Deserialize;
use serde_json::Value;
use std::io::{self, Write};

use crate::error::InertionError;
use crate::reporting::{is_failed, Summary};
use crate::types::{millis, Check, SpecError, TestResult};

pub use colors::Palette;
pub use diff::{classify, is_same_type, Rendering, ValueKind};
pub use report::Report;

/// Structural value formatter
pub type Formatter = Box<dyn Fn(&Value) -> String + Send + Sync>;

/// Pretty-printed JSON, the default formatter
pub fn json_formatter() -> Formatter {
    Box::new(|value| serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()))
}

/// How much of a run gets printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(try_from = "u8")]
pub enum Verbosity {
    /// Failed tests only
    #[default]
    Failures,
    /// Every test header, with check counts
    Tests,
    /// Every test and every check, with details
    Checks,
}

impl TryFrom<u8> for Verbosity {
    type Error = InertionError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Verbosity::Failures),
            1 => Ok(Verbosity::Tests),
            2 => Ok(Verbosity::Checks),
            other => Err(InertionError::Config(format!(
                "verbosity must be 0, 1 or 2 (got {})",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub verbosity: Verbosity,
    /// Longest multi-line block printed in full when values are not diffable
    pub truncate_after: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Failures,
            truncate_after: 10,
        }
    }
}

/// Format a captured spec error; unknown errors also dump the original value
pub fn format_error(error: &SpecError, format: &dyn Fn(&Value) -> String) -> String {
    match error {
        SpecError::Error(err) => format!("{:?}", err),
        SpecError::Unknown(unknown) => format!("Unknown error:\n{}", format(unknown.value())),
    }
}

/// A leading string detail is printed as-is, the rest via the formatter
pub fn format_details(details: &[Value], format: &dyn Fn(&Value) -> String) -> Option<String> {
    match details {
        [] => None,
        [Value::String(first), rest @ ..] => Some(if rest.is_empty() {
            first.clone()
        } else {
            format!("{}\n{}", first, format(&Value::Array(rest.to_vec())))
        }),
        _ => Some(format(&Value::Array(details.to_vec()))),
    }
}

pub struct Reporter<W: Write> {
    out: W,
    format: Formatter,
    palette: Palette,
    options: ReportOptions,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: Formatter, palette: Palette, options: ReportOptions) -> Self {
        Self {
            out,
            format,
            palette,
            options,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn print(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{}", line)
    }

    pub fn format(&self, value: &Value) -> String {
        (self.format)(value)
    }

    pub fn format_value(&self, value: Option<&Value>) -> Option<String> {
        value.map(|v| self.format(v))
    }

    pub fn format_error(&self, error: &SpecError) -> String {
        format_error(error, &*self.format)
    }

    pub fn format_details(&self, details: &[Value]) -> Option<String> {
        format_details(details, &*self.format)
    }

    /// Render an actual/expected pair
    pub fn format_diagnostic(
        &self,
        actual: Option<&Value>,
        expected: Option<&Value>,
    ) -> Vec<String> {
        let actual_text = self.format_value(actual).unwrap_or_else(|| "(none)".to_string());
        let expected_text = self.format_value(expected).unwrap_or_default();

        match classify(actual, expected, &actual_text, &expected_text) {
            Rendering::ActualOnly => diff::actual_only(&actual_text),
            Rendering::WordDiff => diff::word_diff(&actual_text, &expected_text, self.palette),
            Rendering::LineDiff => diff::line_diff(&actual_text, &expected_text, self.palette),
            Rendering::SideBySide => diff::side_by_side(&actual_text, &expected_text, self.palette),
            Rendering::Blocks => diff::blocks(
                &actual_text,
                &expected_text,
                self.palette,
                self.options.truncate_after,
            ),
        }
    }

    pub fn print_report(&mut self, results: &[TestResult]) -> io::Result<()> {
        for result in results {
            let failed = is_failed(result);
            if !failed && self.options.verbosity == Verbosity::Failures {
                continue;
            }
            self.print_result(result, failed)?;
        }

        let summary = Summary::of(results);
        self.print(&format!("TESTS: {}", summary.total()))?;
        self.print(&self.palette.pass(&format!("PASSED: {}", summary.passed)))?;
        let failed = format!("FAILED: {}", summary.failed);
        let failed = if summary.failed > 0 {
            self.palette.fail(&failed)
        } else {
            failed
        };
        self.print(&failed)?;
        self.print(&self.palette.dim(&format!("TIME: {:.3}ms", millis(summary.time))))?;
        self.out.flush()
    }

    fn print_result(&mut self, result: &TestResult, failed: bool) -> io::Result<()> {
        let status = if failed {
            self.palette.fail("FAIL")
        } else {
            self.palette.pass("PASS")
        };
        self.print(&format!(
            "{} [{}/{}] {} ({:.3}ms)",
            status,
            result.passed_checks(),
            result.checks.len(),
            result.description,
            millis(result.time)
        ))?;

        if let Some(error) = &result.error {
            let text = self.format_error(error);
            for line in text.lines() {
                self.print(&self.palette.error(&format!("  {}", line)))?;
            }
        }

        for check in &result.checks {
            if !check.fact.pass {
                self.print_failed_check(check)?;
            } else if self.options.verbosity == Verbosity::Checks {
                self.print_passed_check(check)?;
            }
        }

        self.print("")
    }

    fn print_failed_check(&mut self, check: &Check) -> io::Result<()> {
        let fact = &check.fact;
        let (title, rest) = split_title(&fact.details);

        let label = self.palette.label(&format!("[{}]", fact.label));
        match title {
            Some(title) => self.print(&format!("* {} {}", label, title))?,
            None => self.print(&format!("* {}", label))?,
        }
        self.print(&self.palette.location(&format!("  at {}", check.location)))?;

        if fact.has_values() {
            for line in self.format_diagnostic(fact.actual.as_ref(), fact.expected.as_ref()) {
                self.print(&format!("  {}", line))?;
            }
        }

        if !rest.is_empty() {
            self.print("  DETAILS:")?;
            let details = self.format(&Value::Array(rest.to_vec()));
            for line in details.lines() {
                self.print(&format!("  {}", line))?;
            }
        }

        Ok(())
    }

    fn print_passed_check(&mut self, check: &Check) -> io::Result<()> {
        let fact = &check.fact;
        let label = self.palette.label(&format!("[{}]", fact.label));
        match self.format_details(&fact.details) {
            Some(details) => {
                let mut lines = details.lines();
                let first = lines.next().unwrap_or_default();
                self.print(&format!("  {} {} {}", self.palette.pass("ok"), label, first))?;
                for line in lines {
                    self.print(&self.palette.dim(&format!("    {}", line)))?;
                }
                Ok(())
            }
            None => self.print(&format!("  {} {}", self.palette.pass("ok"), label)),
        }
    }
}

/// First detail is a title when it is a single-line string
fn split_title(details: &[Value]) -> (Option<&str>, &[Value]) {
    match details {
        [Value::String(first), rest @ ..] if !first.contains('\n') => (Some(first.as_str()), rest),
        _ => (None, details),
    }
}
