//! Monetary amount matching.

use super::PatternMatcher;
use once_cell::sync::Lazy;
use regex::Regex;

/// Dollar amounts such as `$1,250` or `$85,000.00`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoneyMatcher;

impl MoneyMatcher {
    pub fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\$[\d,]+(?:\.\d{2})?").expect("Valid money regex"));
        &PATTERN
    }
}

impl PatternMatcher for MoneyMatcher {
    fn pattern(&self) -> Option<&Regex> {
        Some(Self::regex())
    }

    fn placeholder(&self) -> &'static str {
        "amount"
    }
}
