//! Domain models and business logic for pattern matching.
//!
//! This module contains the data model every stage passes around and the
//! per-type matchers that recognize sensitive values (phone numbers,
//! emails, names, SSNs, money amounts) inside fragment text.

pub mod email;
pub mod literal;
pub mod model;
pub mod money;
pub mod name;
pub mod phone;
pub mod ssn;

pub use email::EmailMatcher;
pub use literal::LiteralMatcher;
pub use model::{
    BoundingBox, FragmentIndex, FragmentKey, RedactionRecord, RedactionTag, RefinedBox,
    TextFragment,
};
pub use money::MoneyMatcher;
pub use name::NameMatcher;
pub use phone::PhoneNumberMatcher;
pub use ssn::SsnMatcher;

use std::fmt;
use std::ops::Range;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Trait for pattern matching strategies.
///
/// Matching is stateless: every call scans from the start of the input, so
/// one matcher can be shared across all fragments of all documents.
pub trait PatternMatcher: Send + Sync {
    /// Regex recognizing the value's shape, `None` for exact-value kinds.
    fn pattern(&self) -> Option<&Regex>;

    /// Display value used when the literal value cannot be recovered.
    fn placeholder(&self) -> &'static str;

    /// Byte ranges of every match in `text`.
    fn find_spans(&self, text: &str) -> Vec<Range<usize>> {
        match self.pattern() {
            Some(pattern) => pattern.find_iter(text).map(|m| m.range()).collect(),
            None => Vec::new(),
        }
    }

    /// Returns true if `value` as a whole has this kind's shape.
    fn accepts_value(&self, value: &str) -> bool {
        let value = value.trim();
        match self.pattern() {
            Some(pattern) => pattern
                .find(value)
                .is_some_and(|m| m.start() == 0 && m.end() == value.len()),
            None => !value.is_empty(),
        }
    }
}

/// Sensitive value categories the resolver knows how to locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatcherKind {
    Phone,
    Email,
    Name,
    Ssn,
    Money,
}

/// Ordered label keyword rules; the first rule with a matching keyword wins.
const CLASSIFICATION_RULES: &[(MatcherKind, &[&str])] = &[
    (MatcherKind::Phone, &["PHONE"]),
    (MatcherKind::Email, &["EMAIL"]),
    (MatcherKind::Name, &["NAME", "PERSON"]),
    (MatcherKind::Ssn, &["SSN", "SOCIAL"]),
    (MatcherKind::Money, &["MONEY", "SALARY", "AMOUNT"]),
];

impl MatcherKind {
    /// Maps a free-form tag label onto a kind.
    ///
    /// Labels are matched case-insensitively by keyword substring, so
    /// `PHONE`, `phone_number` and `PHONE NUMBER` all resolve to
    /// [`MatcherKind::Phone`].
    pub fn classify(label: &str) -> Option<Self> {
        let upper = label.to_uppercase();
        CLASSIFICATION_RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| upper.contains(k)))
            .map(|(kind, _)| *kind)
    }

    /// Shared matcher instance for this kind.
    pub fn matcher(self) -> &'static dyn PatternMatcher {
        static PHONE: PhoneNumberMatcher = PhoneNumberMatcher;
        static EMAIL: EmailMatcher = EmailMatcher;
        static NAME: NameMatcher = NameMatcher;
        static SSN: SsnMatcher = SsnMatcher;
        static MONEY: MoneyMatcher = MoneyMatcher;

        match self {
            Self::Phone => &PHONE,
            Self::Email => &EMAIL,
            Self::Name => &NAME,
            Self::Ssn => &SSN,
            Self::Money => &MONEY,
        }
    }

    /// Kinds that match fragments against a recovered literal value
    /// instead of a shape pattern.
    pub fn uses_exact_value(self) -> bool {
        self.matcher().pattern().is_none()
    }

    /// Pattern used by the full-document safety-net scan, if this kind
    /// takes part in it.
    pub fn fallback_pattern(self) -> Option<&'static Regex> {
        match self {
            Self::Phone => Some(PhoneNumberMatcher::regex()),
            Self::Email => Some(EmailMatcher::regex()),
            Self::Ssn => Some(SsnMatcher::bounded_regex()),
            Self::Name | Self::Money => None,
        }
    }

    /// Record label for fallback-scan hits, e.g. `PHONE_FALLBACK`.
    pub fn fallback_label(self) -> String {
        format!("{self}_FALLBACK")
    }

    /// Human-readable description used as the display value of fallback
    /// records.
    pub fn description(self) -> &'static str {
        match self {
            Self::Phone => "Phone numbers",
            Self::Email => "Email addresses",
            Self::Name => "Names",
            Self::Ssn => "SSN patterns",
            Self::Money => "Money amounts",
        }
    }
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Phone => "PHONE",
            Self::Email => "EMAIL",
            Self::Name => "NAME",
            Self::Ssn => "SSN",
            Self::Money => "MONEY",
        };
        f.write_str(label)
    }
}

/// Kinds covered by the fallback scan, in scan order.
pub const FALLBACK_KINDS: [MatcherKind; 3] = [MatcherKind::Phone, MatcherKind::Email, MatcherKind::Ssn];
