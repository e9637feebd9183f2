//! Phone number domain logic.
//!
//! This module encapsulates the rules for recognizing phone numbers inside
//! fragment text.

use super::PatternMatcher;
use once_cell::sync::Lazy;
use regex::Regex;

/// North American phone number pattern matcher.
///
/// Requires ten digits with an optional `+1`/`1` prefix and optional
/// separators:
/// - (555) 123-4567
/// - 555-123-4567
/// - 555.123.4567
/// - +1 555 123 4567
///
/// Exchange codes are not validated; a tagger only flags what it believes
/// is a phone number and the resolver must find it even if it is a
/// fictional `555-123-4567`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhoneNumberMatcher;

impl PhoneNumberMatcher {
    /// Creates a new phone number matcher.
    pub fn new() -> Self {
        Self
    }

    /// Returns the regex pattern for phone numbers.
    pub fn regex() -> &'static Regex {
        static PATTERN: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}")
                .expect("Valid phone number regex")
        });
        &PATTERN
    }
}

impl PatternMatcher for PhoneNumberMatcher {
    fn pattern(&self) -> Option<&Regex> {
        Some(Self::regex())
    }

    fn placeholder(&self) -> &'static str {
        "phone number"
    }
}
