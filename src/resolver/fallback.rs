//! Full-document safety-net scan.
//!
//! The tagger is not exhaustive. After every tag is resolved, the
//! high-precision patterns (phone, email, SSN) run over all fragments a
//! record of the same kind has not already claimed. Hits become extra
//! `<KIND>_FALLBACK` records alongside the tag-driven ones.

use tracing::{debug, warn};

use super::refine::{refine_spans, RefineOptions};
use super::used::{Claim, UsedFragments};
use crate::domain::{MatcherKind, RedactionRecord, TextFragment, FALLBACK_KINDS};

/// Runs the scan for every fallback kind, claiming what it finds.
pub fn scan(
    fragments: &[TextFragment],
    used: &mut UsedFragments,
    options: RefineOptions,
) -> Vec<RedactionRecord> {
    FALLBACK_KINDS
        .iter()
        .filter_map(|&kind| scan_kind(kind, fragments, used, options))
        .collect()
}

fn scan_kind(
    kind: MatcherKind,
    fragments: &[TextFragment],
    used: &mut UsedFragments,
    options: RefineOptions,
) -> Option<RedactionRecord> {
    let pattern = kind.fallback_pattern()?;
    let mut boxes = Vec::new();

    for fragment in fragments {
        let key = fragment.key();
        if used.is_claimed_for(key, kind) {
            continue;
        }
        let spans: Vec<_> = pattern.find_iter(&fragment.text).map(|m| m.range()).collect();
        if spans.is_empty() {
            continue;
        }
        debug!(page = fragment.page, text = %fragment.text, "fallback {} hit", kind);
        used.claim(key, Claim::Fallback(kind));
        boxes.extend(refine_spans(fragment, &spans, options));
    }

    if boxes.is_empty() {
        return None;
    }

    let label = kind.fallback_label();
    warn!(
        kind = %label,
        boxes = boxes.len(),
        "fallback scan found values the tagger missed"
    );
    Some(RedactionRecord {
        tag: format!("<{label}>"),
        label,
        original_value: Some(kind.description().to_string()),
        bounding_boxes: boxes,
    })
}
