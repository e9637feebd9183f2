//! Personal name matching.
//!
//! Names have no useful shape pattern, so the resolver matches fragments
//! against a literal name value instead. The literal normally comes from
//! aligning the tagged text with the raw text; when that fails,
//! [`NameMatcher::heuristic_value`] guesses it from the start of the
//! document.

use super::PatternMatcher;
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, Default)]
pub struct NameMatcher;

impl NameMatcher {
    fn leading_name() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^([A-Z][a-z]+\s+[A-Z][a-z]+)").expect("Valid leading name regex")
        });
        &PATTERN
    }

    /// First run of two capitalized words at the very start of the text.
    ///
    /// Known limitation: this only holds for form-like documents that open
    /// with the person's name. On anything else it returns the wrong words
    /// (e.g. `"Contact Jane"`), which is why it is the last resort.
    pub fn heuristic_value(raw_text: &str) -> Option<String> {
        Self::leading_name()
            .captures(raw_text.trim_start())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

impl PatternMatcher for NameMatcher {
    fn pattern(&self) -> Option<&Regex> {
        None
    }

    fn placeholder(&self) -> &'static str {
        "name"
    }
}
