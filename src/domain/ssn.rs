//! Social security number matching.

use super::PatternMatcher;
use once_cell::sync::Lazy;
use regex::Regex;

/// SSN matcher.
///
/// Tag-driven lookups use the loose shape (`123-45-6789`, `123456789`
/// anywhere in the text). The fallback scan runs without a tag to confirm
/// the value, so it uses [`SsnMatcher::bounded_regex`], which also requires
/// word boundaries around the number.
#[derive(Debug, Clone, Copy, Default)]
pub struct SsnMatcher;

impl SsnMatcher {
    /// Loose SSN shape used for tag-driven lookups.
    pub fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\d{3}-?\d{2}-?\d{4}").expect("Valid SSN regex"));
        &PATTERN
    }

    pub fn bounded_regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\b\d{3}-?\d{2}-?\d{4}\b").expect("Valid SSN regex"));
        &PATTERN
    }
}

impl PatternMatcher for SsnMatcher {
    fn pattern(&self) -> Option<&Regex> {
        Some(Self::regex())
    }

    fn placeholder(&self) -> &'static str {
        "SSN"
    }
}
