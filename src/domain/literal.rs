//! Whole-word matching of a known literal value.

use std::ops::Range;

use regex::Regex;

use crate::error::{RedactorError, RedactorResult};

/// Finds a literal value inside fragment text as a whole word.
///
/// `Jane Doe` matches `"Name: Jane Doe,"` but not `"Jane Doeberg"`.
#[derive(Debug, Clone)]
pub struct LiteralMatcher {
    pattern: Regex,
}

impl LiteralMatcher {
    /// Compiles a matcher for `value`, ignoring surrounding whitespace.
    ///
    /// # Errors
    /// Returns [`RedactorError::InvalidInput`] for an empty value.
    pub fn new(value: &str) -> RedactorResult<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(RedactorError::InvalidInput {
                parameter: "value".to_string(),
                reason: "literal value is empty".to_string(),
            });
        }

        // \b only anchors next to word characters; values that start or end
        // with punctuation are matched without that side's boundary.
        let starts_word = value.chars().next().is_some_and(is_word_char);
        let ends_word = value.chars().last().is_some_and(is_word_char);
        let source = format!(
            "{}{}{}",
            if starts_word { r"\b" } else { "" },
            regex::escape(value),
            if ends_word { r"\b" } else { "" },
        );
        let pattern = Regex::new(&source).map_err(|e| RedactorError::PatternError {
            pattern: source.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self { pattern })
    }

    /// Byte ranges of every whole-word occurrence in `text`.
    pub fn find_spans(&self, text: &str) -> Vec<Range<usize>> {
        self.pattern.find_iter(text).map(|m| m.range()).collect()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
