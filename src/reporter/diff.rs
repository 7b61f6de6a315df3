//! Diagnostic rendering for actual/expected mismatches
//!
//! The rendering is picked from two properties: whether both values have the
//! same kind, and whether both serialized forms fit on one line. Values of
//! different kinds are never diffed, only shown side by side.

use serde_json::Value;
use similar::{ChangeTag, TextDiff};
use std::borrow::Cow;

use super::colors::Palette;

/// Runtime kind of a (possibly absent) value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Absent,
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: Option<&Value>) -> Self {
        match value {
            None => ValueKind::Absent,
            Some(Value::Null) => ValueKind::Null,
            Some(Value::Bool(_)) => ValueKind::Bool,
            Some(Value::Number(_)) => ValueKind::Number,
            Some(Value::String(_)) => ValueKind::String,
            Some(Value::Array(_)) => ValueKind::Array,
            Some(Value::Object(_)) => ValueKind::Object,
        }
    }
}

pub fn is_same_type(a: Option<&Value>, b: Option<&Value>) -> bool {
    ValueKind::of(a) == ValueKind::of(b)
}

/// How a diagnostic gets rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendering {
    /// No expected value: show the actual value alone
    ActualOnly,
    /// Same kind, single line
    WordDiff,
    /// Same kind, multi-line
    LineDiff,
    /// Different kinds, single line
    SideBySide,
    /// Different kinds, multi-line
    Blocks,
}

/// Pick a rendering from the values and their serialized forms
pub fn classify(
    actual: Option<&Value>,
    expected: Option<&Value>,
    actual_text: &str,
    expected_text: &str,
) -> Rendering {
    if expected.is_none() {
        return Rendering::ActualOnly;
    }

    let same_type = is_same_type(actual, expected);
    let single_line = !actual_text.contains('\n') && !expected_text.contains('\n');

    match (same_type, single_line) {
        (true, true) => Rendering::WordDiff,
        (true, false) => Rendering::LineDiff,
        (false, true) => Rendering::SideBySide,
        (false, false) => Rendering::Blocks,
    }
}

/// Actual value alone, inline or as an indented block
pub fn actual_only(actual: &str) -> Vec<String> {
    if actual.contains('\n') {
        let mut lines = vec!["ACTUAL:".to_string()];
        lines.extend(actual.lines().map(|line| format!("  {}", line)));
        lines
    } else {
        vec![format!("ACTUAL: {}", actual)]
    }
}

/// Word-level diff of two single-line values
///
/// Single tokens are compared character by character, anything with
/// whitespace word by word.
pub fn word_diff(actual: &str, expected: &str, palette: Palette) -> Vec<String> {
    let single_token = |s: &str| !s.contains(char::is_whitespace);
    let diff = if single_token(actual) && single_token(expected) {
        TextDiff::from_chars(actual, expected)
    } else {
        TextDiff::from_words(actual, expected)
    };

    let mut removed = Highlighter::new(palette, ChangeTag::Delete);
    let mut added = Highlighter::new(palette, ChangeTag::Insert);

    for change in diff.iter_all_changes() {
        let text = change.to_string_lossy();
        match change.tag() {
            ChangeTag::Equal => {
                removed.push(ChangeTag::Equal, &text);
                added.push(ChangeTag::Equal, &text);
            }
            ChangeTag::Delete => removed.push(ChangeTag::Delete, &text),
            ChangeTag::Insert => added.push(ChangeTag::Insert, &text),
        }
    }

    vec![
        palette.removed(&format!("- ACTUAL:   {}", removed.finish())),
        palette.added(&format!("+ EXPECTED: {}", added.finish())),
    ]
}

/// Line-level diff of two multi-line values
///
/// Both sides are newline-terminated first so an unchanged final line is
/// not reported as a change.
pub fn line_diff(actual: &str, expected: &str, palette: Palette) -> Vec<String> {
    let actual = terminated(actual);
    let expected = terminated(expected);
    let diff = TextDiff::from_lines(actual.as_ref(), expected.as_ref());
    let mut lines = vec![legend(palette)];

    for change in diff.iter_all_changes() {
        let text = change.to_string_lossy();
        let text = text.trim_end_matches('\n');
        lines.push(match change.tag() {
            ChangeTag::Delete => palette.removed(&format!("- {}", text)),
            ChangeTag::Insert => palette.added(&format!("+ {}", text)),
            ChangeTag::Equal => format!("  {}", text),
        });
    }

    lines
}

/// Single-line values of different kinds, one above the other
pub fn side_by_side(actual: &str, expected: &str, palette: Palette) -> Vec<String> {
    vec![
        palette.removed(&format!("- ACTUAL:   {}", actual)),
        palette.added(&format!("+ EXPECTED: {}", expected)),
    ]
}

/// Multi-line values of different kinds as prefixed blocks
///
/// Blocks longer than `truncate_after` lines keep only their first and last
/// line.
pub fn blocks(
    actual: &str,
    expected: &str,
    palette: Palette,
    truncate_after: usize,
) -> Vec<String> {
    let mut lines = vec![palette.removed("- ACTUAL:")];
    lines.extend(
        block_lines(actual, truncate_after)
            .into_iter()
            .map(|line| palette.removed(&format!("- {}", line))),
    );
    lines.push(palette.added("+ EXPECTED:"));
    lines.extend(
        block_lines(expected, truncate_after)
            .into_iter()
            .map(|line| palette.added(&format!("+ {}", line))),
    );
    lines
}

fn block_lines(text: &str, truncate_after: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() > truncate_after && lines.len() > 2 {
        vec![lines[0], "…", lines[lines.len() - 1]]
    } else {
        lines
    }
}

fn terminated(text: &str) -> Cow<'_, str> {
    if text.ends_with('\n') {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{}\n", text))
    }
}

fn legend(palette: Palette) -> String {
    format!("{} {}", palette.removed("- ACTUAL"), palette.added("+ EXPECTED"))
}

// Collects runs of equal/changed text, highlighting each changed run once
struct Highlighter {
    palette: Palette,
    tag: ChangeTag,
    out: String,
    run: String,
}

impl Highlighter {
    fn new(palette: Palette, tag: ChangeTag) -> Self {
        Self {
            palette,
            tag,
            out: String::new(),
            run: String::new(),
        }
    }

    fn push(&mut self, tag: ChangeTag, text: &str) {
        if tag == self.tag {
            self.run.push_str(text);
        } else {
            self.flush();
            self.out.push_str(text);
        }
    }

    fn flush(&mut self) {
        if self.run.is_empty() {
            return;
        }
        let highlighted = match self.tag {
            ChangeTag::Delete => self.palette.removed_word(&self.run),
            _ => self.palette.added_word(&self.run),
        };
        self.out.push_str(&highlighted);
        self.run.clear();
    }

    fn finish(mut self) -> String {
        self.flush();
        self.out
    }
}
