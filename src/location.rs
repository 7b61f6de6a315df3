// src/location.rs
// Call-site resolution for assertion invocations
//
// Raw stack text comes from a StackSource and is parsed by resolve_location,
// which is pure string processing so it can be tested against fixed input.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic;

/// Numbered frame line, as printed by Rust backtraces: `  12: crate::module::function`
static RE_FRAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+:\s+(.+?)\s*$").expect("valid regex"));

/// Source position line following a frame: `      at ./src/lib.rs:10:5`
static RE_AT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+at\s+(.+?)\s*$").expect("valid regex"));

/// Parenthesized path at the end of a frame: `call_site (src/lib.rs:10:5)`
static RE_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^()]+)\)$").expect("valid regex"));

/// Source location of an assertion call, or `(unknown)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    pub const UNKNOWN: &'static str = "(unknown)";

    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&panic::Location<'_>> for Location {
    fn from(caller: &panic::Location<'_>) -> Self {
        Self(format!("{}:{}:{}", caller.file(), caller.line(), caller.column()))
    }
}

/// Produces raw stack text for an assertion call
///
/// `caller` is the `#[track_caller]` position of the assertion call; sources
/// are free to ignore it and read a real stack instead. The binder skips
/// `frames_to_skip()` leading frames, which must cover every frame the source
/// and the binder add themselves.
pub trait StackSource: Send + Sync {
    fn capture(&self, caller: &'static panic::Location<'static>) -> Option<String>;

    fn frames_to_skip(&self) -> usize {
        0
    }
}

/// Default source: a single direct-form frame built from the caller position
#[derive(Debug, Clone, Copy, Default)]
pub struct CallerSource;

impl StackSource for CallerSource {
    fn capture(&self, caller: &'static panic::Location<'static>) -> Option<String> {
        Some(format!(
            "   0: {}:{}:{}",
            caller.file(),
            caller.line(),
            caller.column()
        ))
    }
}

/// Resolve a call-site location from raw stack text
///
/// Frame lines are kept, `skip` leading frames are dropped, and the first
/// remaining frame gives the location: its `at <path>` line if one follows,
/// else a parenthesized path at the end of the frame, else the frame text
/// itself. Missing text or frames yield `(unknown)`.
pub fn resolve_location(raw: Option<&str>, skip: usize) -> Location {
    let Some(raw) = raw else {
        return Location::unknown();
    };

    let mut lines = raw.lines().peekable();
    let mut seen = 0;

    while let Some(line) = lines.next() {
        let Some(frame) = RE_FRAME.captures(line) else {
            continue;
        };

        if seen < skip {
            seen += 1;
            continue;
        }

        if let Some(at) = lines.peek().and_then(|next| RE_AT.captures(next)) {
            return Location::new(&at[1]);
        }

        let text = &frame[1];
        if let Some(path) = RE_PAREN.captures(text) {
            return Location::new(&path[1]);
        }
        return Location::new(text);
    }

    Location::unknown()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "\
   0: std::backtrace::Backtrace::force_capture
             at /rustc/library/std/src/backtrace.rs:312:13
   1: inertion::tester::BoundMethod::invoke
             at ./src/tester.rs:88:21
   2: add::can_add_numbers::{{closure}}
             at ./demos/add.rs:14:9
   3: tokio::runtime::park::CachedParkThread::block_on";

    #[test]
    fn test_call_form_uses_at_line() {
        let location = resolve_location(Some(RAW), 2);
        assert_eq!(location.as_str(), "./demos/add.rs:14:9");
    }

    #[test]
    fn test_skip_zero_takes_first_frame() {
        let location = resolve_location(Some(RAW), 0);
        assert_eq!(location.as_str(), "/rustc/library/std/src/backtrace.rs:312:13");
    }

    #[test]
    fn test_direct_form_uses_frame_text() {
        let location = resolve_location(Some(RAW), 3);
        assert_eq!(
            location.as_str(),
            "tokio::runtime::park::CachedParkThread::block_on"
        );
    }

    #[test]
    fn test_parenthesized_path() {
        let raw = "  0: internal\n  1: spec_body (src/spec.rs:4:2)";
        assert_eq!(resolve_location(Some(raw), 1).as_str(), "src/spec.rs:4:2");
    }

    #[test]
    fn test_non_frame_lines_are_ignored() {
        let raw = "stack backtrace:\nnote: some noise\n   0: src/lib.rs:1:1";
        assert_eq!(resolve_location(Some(raw), 0).as_str(), "src/lib.rs:1:1");
    }

    #[test]
    fn test_missing_stack_is_unknown() {
        assert!(resolve_location(None, 0).is_unknown());
        assert!(resolve_location(Some(""), 0).is_unknown());
        assert!(resolve_location(Some("no frames here"), 0).is_unknown());
    }

    #[test]
    fn test_skipping_past_all_frames_is_unknown() {
        assert!(resolve_location(Some(RAW), 10).is_unknown());
    }

    #[test]
    fn test_caller_source_round_trips_through_parser() {
        let caller = panic::Location::caller();
        let raw = CallerSource.capture(caller);
        let location = resolve_location(raw.as_deref(), CallerSource.frames_to_skip());
        assert_eq!(location, Location::from(caller));
        assert!(location.as_str().contains("location.rs"));
    }
}
