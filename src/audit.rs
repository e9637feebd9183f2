//! Offline comparison of original and tagged text.
//!
//! A QA aid for checking what the tagger took out of a document. It never
//! feeds the redaction path.

use std::fmt;

use serde::Serialize;

use crate::domain::{MatcherKind, NameMatcher, RedactionTag};
use crate::resolver::align::recover_values;

/// How an audit value was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Recovered from the gap between surrounding literal text
    Aligned,
    /// First match of the tag's type pattern in the original text
    Pattern,
}

/// One tag occurrence and what it replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub tag: String,
    pub value: Option<String>,
    pub source: Option<ValueSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    /// Distinct tags in first-seen order
    pub unique_tags: Vec<String>,
    pub entries: Vec<AuditEntry>,
}

impl AuditReport {
    pub fn identified(&self) -> usize {
        self.entries.iter().filter(|e| e.value.is_some()).count()
    }
}

/// Lists the tags in `tagged` and the original value behind each one.
pub fn compare(original: &str, tagged: &str) -> AuditReport {
    let tags = RedactionTag::scan(tagged);
    let aligned = recover_values(tagged, original);

    let mut unique_tags: Vec<String> = Vec::new();
    for tag in &tags {
        if !unique_tags.contains(&tag.tag) {
            unique_tags.push(tag.tag.clone());
        }
    }

    let entries = tags
        .iter()
        .zip(aligned)
        .map(|(tag, value)| match value {
            Some(value) => AuditEntry {
                tag: tag.tag.clone(),
                value: Some(value),
                source: Some(ValueSource::Aligned),
            },
            None => {
                let value = pattern_lookup(&tag.label, original);
                AuditEntry {
                    tag: tag.tag.clone(),
                    source: value.as_ref().map(|_| ValueSource::Pattern),
                    value,
                }
            }
        })
        .collect();

    AuditReport { unique_tags, entries }
}

fn pattern_lookup(label: &str, original: &str) -> Option<String> {
    let kind = MatcherKind::classify(label)?;
    if kind.uses_exact_value() {
        return NameMatcher::heuristic_value(original);
    }
    kind.matcher()
        .pattern()?
        .find(original)
        .map(|m| m.as_str().to_string())
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Found {} unique redaction tag(s):", self.unique_tags.len())?;
        for (i, tag) in self.unique_tags.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, tag)?;
        }
        writeln!(f)?;
        writeln!(f, "Redacted values:")?;
        for (i, entry) in self.entries.iter().enumerate() {
            match &entry.value {
                Some(value) => writeln!(f, "  {}. {} -> \"{}\"", i + 1, entry.tag, value)?,
                None => writeln!(f, "  {}. {} -> (not identified)", i + 1, entry.tag)?,
            }
        }
        write!(
            f,
            "Identified {} of {} redaction(s)",
            self.identified(),
            self.entries.len()
        )
    }
}
