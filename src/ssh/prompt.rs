// ABOUTME: Prompt detection over accumulated shell output.
// ABOUTME: A compiled pattern that only counts when it sits at the end of the text.

use super::error::Result;
use regex::Regex;
use std::fmt;
use std::ops::Range;

/// Default prompt: any line ending in `#` or `>`.
pub const DEFAULT_PROMPT: &str = r".*[#>]\s*$";

/// Matcher for the marker a remote shell prints when it is ready for input.
#[derive(Clone)]
pub struct Prompt {
    pattern: Regex,
}

impl Prompt {
    /// Compile a prompt from a regular expression.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Build a prompt that matches `text` verbatim.
    pub fn literal(text: &str) -> Self {
        Self {
            pattern: Regex::new(&regex::escape(text)).expect("escaped literal is a valid regex"),
        }
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Locate the prompt in `text`.
    ///
    /// Returns the byte range of the last match that is followed by nothing
    /// but whitespace. Matches in the middle of the output (an echoed command
    /// that happens to contain the prompt, for instance) are ignored.
    pub fn find(&self, text: &str) -> Option<Range<usize>> {
        self.pattern
            .find_iter(text)
            .filter(|m| text[m.end()..].trim().is_empty())
            .last()
            .map(|m| m.range())
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.find(text).is_some()
    }
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT).expect("default prompt is a valid regex")
    }
}

impl fmt::Debug for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Prompt").field(&self.pattern.as_str()).finish()
    }
}

impl PartialEq for Prompt {
    fn eq(&self, other: &Self) -> bool {
        self.pattern.as_str() == other.pattern.as_str()
    }
}
