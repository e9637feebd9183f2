//! Email address matching.

use super::PatternMatcher;
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, Default)]
pub struct EmailMatcher;

impl EmailMatcher {
    pub fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").expect("Valid email regex")
        });
        &PATTERN
    }
}

impl PatternMatcher for EmailMatcher {
    fn pattern(&self) -> Option<&Regex> {
        Some(Self::regex())
    }

    fn placeholder(&self) -> &'static str {
        "email address"
    }
}
