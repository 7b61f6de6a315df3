//! ANSI color helpers for report output
//!
//! With colors disabled every style degrades to plain text, except word
//! highlights, which fall back to `[-removed-]` / `{+added+}` markers so a
//! word diff stays readable in logs.

/// ANSI escape codes
pub mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const INVERSE: &str = "\x1b[7m";

    // Colors
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

use ansi::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn ansi() -> Self {
        Self::new(true)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn paint(&self, codes: &[&str], text: &str) -> String {
        if self.enabled {
            format!("{}{}{}", codes.concat(), text, RESET)
        } else {
            text.to_string()
        }
    }

    /// PASS header (green, bold)
    pub fn pass(&self, text: &str) -> String {
        self.paint(&[BOLD, GREEN], text)
    }

    /// FAIL header (red, bold)
    pub fn fail(&self, text: &str) -> String {
        self.paint(&[BOLD, RED], text)
    }

    /// Assertion label (cyan)
    pub fn label(&self, text: &str) -> String {
        self.paint(&[CYAN], text)
    }

    /// Call-site location (gray)
    pub fn location(&self, text: &str) -> String {
        self.paint(&[GRAY], text)
    }

    /// Error output (yellow)
    pub fn error(&self, text: &str) -> String {
        self.paint(&[YELLOW], text)
    }

    /// Secondary text (dim)
    pub fn dim(&self, text: &str) -> String {
        self.paint(&[DIM], text)
    }

    /// Line present only in the actual value
    pub fn removed(&self, text: &str) -> String {
        self.paint(&[RED], text)
    }

    /// Line present only in the expected value
    pub fn added(&self, text: &str) -> String {
        self.paint(&[GREEN], text)
    }

    /// Word present only in the actual value
    pub fn removed_word(&self, text: &str) -> String {
        if self.enabled {
            self.paint(&[INVERSE, RED], text)
        } else {
            format!("[-{}-]", text)
        }
    }

    /// Word present only in the expected value
    pub fn added_word(&self, text: &str) -> String {
        if self.enabled {
            self.paint(&[INVERSE, GREEN], text)
        } else {
            format!("{{+{}+}}", text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_palette_is_passthrough() {
        let palette = Palette::plain();
        assert_eq!(palette.pass("PASS"), "PASS");
        assert_eq!(palette.removed("- x"), "- x");
    }

    #[test]
    fn test_plain_word_markers() {
        let palette = Palette::plain();
        assert_eq!(palette.removed_word("old"), "[-old-]");
        assert_eq!(palette.added_word("new"), "{+new+}");
    }

    #[test]
    fn test_ansi_palette_wraps_and_resets() {
        let palette = Palette::ansi();
        let text = palette.fail("FAIL");
        assert!(text.starts_with(BOLD));
        assert!(text.contains(RED));
        assert!(text.ends_with(RESET));
    }
}
