//! Reconciling tagger output with fragment positions.
//!
//! The tagger says *what* was sensitive (a tag per value, no positions);
//! the extractor says *where* text is (positions, no tags). The resolver
//! pairs them up: for each tag it claims the fragments that held a value of
//! the tag's type, narrows each fragment box to the value itself, and
//! finally runs a fallback scan for values the tagger missed.
//!
//! # Example
//!
//! ```
//! use veil::domain::{BoundingBox, TextFragment};
//! use veil::resolver::Resolver;
//!
//! let fragments = vec![
//!     TextFragment::new(1, "Email: jane@x.com", BoundingBox::new(72.0, 700.0, 102.0, 12.0)),
//! ];
//! let resolution = Resolver::new().resolve(
//!     &fragments,
//!     "Email: <EMAIL>",
//!     "Email: jane@x.com",
//! );
//! assert_eq!(resolution.records.len(), 1);
//! assert_eq!(resolution.records[0].original_value.as_deref(), Some("jane@x.com"));
//! ```

pub mod align;
pub mod fallback;
pub mod refine;
pub mod used;

pub use refine::RefineOptions;
pub use used::{Claim, UsedFragments};

use std::collections::HashSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{
    LiteralMatcher, MatcherKind, NameMatcher, PatternMatcher, RedactionRecord, RedactionTag,
    RefinedBox, TextFragment,
};

/// Why a tag ended up with no boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// The label matches no known type
    UnknownType,
    /// The type is known but no unclaimed fragment contained a value
    NoCandidates,
}

/// A tag an operator has to check by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedTag {
    pub tag: String,
    pub reason: UnresolvedReason,
}

/// Output of one resolution run.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Tag-driven records in tag order, followed by fallback records
    pub records: Vec<RedactionRecord>,
    pub unresolved: Vec<UnresolvedTag>,
}

impl Resolution {
    /// Refined boxes across every record.
    pub fn total_boxes(&self) -> usize {
        self.records.iter().map(|r| r.bounding_boxes.len()).sum()
    }

    /// Records produced by the fallback scan rather than by a tag.
    pub fn fallback_records(&self) -> impl Iterator<Item = &RedactionRecord> {
        self.records.iter().filter(|r| r.is_fallback())
    }
}

/// Maps tags onto refined fragment boxes.
#[derive(Debug, Clone)]
pub struct Resolver {
    refine: RefineOptions,
    fallback_scan: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Resolver with default refinement and the fallback scan enabled.
    pub fn new() -> Self {
        Self {
            refine: RefineOptions::default(),
            fallback_scan: true,
        }
    }

    /// Sets how tightly boxes are narrowed when glyph extents are unknown.
    pub fn with_refine_options(mut self, refine: RefineOptions) -> Self {
        self.refine = refine;
        self
    }

    /// Enables or disables the fallback scan (enabled by default).
    pub fn with_fallback_scan(mut self, enabled: bool) -> Self {
        self.fallback_scan = enabled;
        self
    }

    /// Resolves every tag of `tagged` against `fragments`.
    ///
    /// `raw` is the text the tagger was given; it is only used to recover
    /// literal values. Tags are processed in document order so assignment
    /// is deterministic.
    pub fn resolve(&self, fragments: &[TextFragment], tagged: &str, raw: &str) -> Resolution {
        let tags = RedactionTag::scan(tagged);
        let values = align::recover_values(tagged, raw);
        info!(tags = tags.len(), fragments = fragments.len(), "resolving redaction tags");

        let mut used = UsedFragments::new();
        let mut resolution = Resolution::default();

        for (tag, value) in tags.iter().zip(values) {
            let (record, unresolved) = self.resolve_tag(fragments, tag, value, raw, &mut used);
            if let Some(reason) = unresolved {
                resolution.unresolved.push(UnresolvedTag {
                    tag: tag.tag.clone(),
                    reason,
                });
            }
            resolution.records.push(record);
        }

        if self.fallback_scan {
            resolution
                .records
                .extend(fallback::scan(fragments, &mut used, self.refine));
        }

        info!(
            records = resolution.records.len(),
            boxes = resolution.total_boxes(),
            unresolved = resolution.unresolved.len(),
            "resolution complete"
        );
        resolution
    }

    fn resolve_tag(
        &self,
        fragments: &[TextFragment],
        tag: &RedactionTag,
        value: Option<String>,
        raw: &str,
        used: &mut UsedFragments,
    ) -> (RedactionRecord, Option<UnresolvedReason>) {
        let Some(kind) = MatcherKind::classify(&tag.label) else {
            warn!(tag = %tag.tag, "no matcher for tag type; needs manual review");
            let record = RedactionRecord {
                tag: tag.tag.clone(),
                label: tag.label.clone(),
                original_value: None,
                bounding_boxes: Vec::new(),
            };
            return (record, Some(UnresolvedReason::UnknownType));
        };

        let matcher = kind.matcher();
        // A recovered value that does not have the kind's shape (a 7-digit
        // phone number) is still the exact text the tagger flagged.
        let (literal, off_pattern) = match value {
            Some(v) if matcher.accepts_value(&v) => (Some(v), None),
            other => (None, other),
        };
        let exact_value = if kind.uses_exact_value() {
            literal.clone().or_else(|| NameMatcher::heuristic_value(raw))
        } else {
            off_pattern
        };

        let candidates = self.find_candidates(
            fragments,
            tag,
            kind,
            literal.as_deref(),
            exact_value.as_deref(),
            used,
        );

        let mut boxes: Vec<RefinedBox> = Vec::new();
        for candidate in &candidates {
            used.claim(candidate.fragment.key(), Claim::Tagged(kind));
            boxes.extend(refine::refine_spans(candidate.fragment, &candidate.spans, self.refine));
        }

        let unresolved = if boxes.is_empty() {
            warn!(tag = %tag.tag, "no fragment matched tag; needs manual review");
            Some(UnresolvedReason::NoCandidates)
        } else {
            info!(tag = %tag.tag, boxes = boxes.len(), "resolved tag");
            None
        };

        let display = literal
            .or(exact_value)
            .unwrap_or_else(|| matcher.placeholder().to_string());

        let record = RedactionRecord {
            tag: tag.tag.clone(),
            label: tag.label.clone(),
            original_value: Some(display),
            bounding_boxes: boxes,
        };
        (record, unresolved)
    }

    /// Candidate search, stopping at the first strategy with results:
    /// fragments holding the tag literal, then fragments matching the type
    /// pattern, then fragments holding the exact value as a whole word.
    ///
    /// For pattern kinds an exact value is only present when the recovered
    /// value failed the pattern; it is then searched before the pattern so
    /// the tag does not take some other value of its type instead.
    fn find_candidates<'f>(
        &self,
        fragments: &'f [TextFragment],
        tag: &RedactionTag,
        kind: MatcherKind,
        literal: Option<&str>,
        exact_value: Option<&str>,
        used: &UsedFragments,
    ) -> Vec<Candidate<'f>> {
        let unused = || {
            fragments
                .iter()
                .filter(move |f| !used.is_claimed_for(f.key(), kind))
        };
        let matcher = kind.matcher();

        let mut candidates: Vec<Candidate<'f>> = unused()
            .filter(|f| f.text.contains(&tag.tag))
            .map(|f| Candidate {
                fragment: f,
                spans: f
                    .text
                    .match_indices(&tag.tag)
                    .map(|(start, s)| start..start + s.len())
                    .collect(),
            })
            .collect();

        let has_pattern = matcher.pattern().is_some();
        if candidates.is_empty() && has_pattern {
            if let Some(value) = exact_value {
                candidates = exact_candidates(unused(), tag, value);
            }
        }

        if candidates.is_empty() && has_pattern {
            candidates = pattern_candidates(unused(), matcher, literal);
        }

        if candidates.is_empty() && !has_pattern {
            if let Some(value) = exact_value {
                candidates = exact_candidates(unused(), tag, value);
            }
        }

        dedup_candidates(candidates)
    }
}

/// Fragments holding `value` as a whole word.
fn exact_candidates<'f>(
    unused: impl Iterator<Item = &'f TextFragment>,
    tag: &RedactionTag,
    value: &str,
) -> Vec<Candidate<'f>> {
    match LiteralMatcher::new(value) {
        Ok(literal_matcher) => unused
            .filter_map(|f| {
                let spans = literal_matcher.find_spans(&f.text);
                (!spans.is_empty()).then_some(Candidate { fragment: f, spans })
            })
            .collect(),
        Err(e) => {
            debug!(tag = %tag.tag, error = %e, "unusable exact value");
            Vec::new()
        }
    }
}

/// A fragment picked for a tag, with the byte spans to redact inside it.
struct Candidate<'f> {
    fragment: &'f TextFragment,
    spans: Vec<Range<usize>>,
}

/// Pattern-based candidates.
///
/// When the literal value is known, fragments that contain it win: each tag
/// then claims its own value first instead of every match of its type.
/// Otherwise every unclaimed match of the type is taken.
fn pattern_candidates<'f>(
    unused: impl Iterator<Item = &'f TextFragment> + Clone,
    matcher: &dyn PatternMatcher,
    literal: Option<&str>,
) -> Vec<Candidate<'f>> {
    let with_spans = |f: &'f TextFragment| {
        let spans = matcher.find_spans(&f.text);
        (!spans.is_empty()).then_some(Candidate { fragment: f, spans })
    };

    if let Some(value) = literal {
        let own: Vec<_> = unused
            .clone()
            .filter(|f| f.text.contains(value))
            .filter_map(with_spans)
            .collect();
        if !own.is_empty() {
            return own;
        }
    }

    unused.filter_map(with_spans).collect()
}

/// Drops repeated `(page, x, y, text)` fragments, keeping the first.
fn dedup_candidates(candidates: Vec<Candidate<'_>>) -> Vec<Candidate<'_>> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| {
            let f = c.fragment;
            seen.insert((f.key(), f.text.clone()))
        })
        .collect()
}
