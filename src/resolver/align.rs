//! Recovering literal values by aligning tagged text with raw text.
//!
//! The tagger returns the raw text with sensitive spans replaced in place,
//! so the literal text between two tags appears verbatim in the raw text.
//! Walking those literal segments through the raw text leaves exactly the
//! substituted values in the gaps.

use crate::domain::model::tag_pattern;

/// Segments shorter than this (ignoring whitespace) are too common to
/// anchor on: a lone space between `<NAME> <PHONE>` would match inside the
/// name itself.
const MIN_ANCHOR_CHARS: usize = 2;

/// Returns the recovered value for every tag in `tagged`, in tag order.
///
/// `None` means the value could not be recovered with confidence: the
/// tagger rewrote surrounding text, two tags are adjacent, or the gap is
/// empty.
pub fn recover_values(tagged: &str, raw: &str) -> Vec<Option<String>> {
    let tags: Vec<_> = tag_pattern().find_iter(tagged).collect();
    let mut values = vec![None; tags.len()];
    if tags.is_empty() {
        return values;
    }

    let lead = &tagged[..tags[0].start()];
    let mut cursor = match raw.find(lead) {
        Some(pos) => pos + lead.len(),
        None => return values,
    };

    // Set when the previous gap could not be delimited; the next value
    // would then swallow two values and is discarded.
    let mut lost_anchor = false;

    for (i, tag) in tags.iter().enumerate() {
        let segment_end = tags.get(i + 1).map_or(tagged.len(), |next| next.start());
        let segment = &tagged[tag.end()..segment_end];
        let is_last = i + 1 == tags.len();

        if segment.is_empty() && is_last {
            if !lost_anchor {
                values[i] = non_empty(&raw[cursor..]);
            }
            break;
        }

        if anchor_len(segment) < MIN_ANCHOR_CHARS && !is_last {
            lost_anchor = true;
            continue;
        }

        let rest = &raw[cursor..];
        // The final segment closes the document, so anchor it at the end
        // rather than at its first occurrence (a trailing "." would
        // otherwise match inside an email address).
        let suffix_anchor = is_last
            .then(|| rest.trim_end().strip_suffix(segment.trim_end()))
            .flatten()
            .map(str::len);
        let Some(rel) = suffix_anchor.or_else(|| rest.find(segment)) else {
            break;
        };
        if !lost_anchor {
            values[i] = non_empty(&raw[cursor..cursor + rel]);
        }
        cursor += rel + segment.len();
        lost_anchor = false;
    }

    values
}

fn anchor_len(segment: &str) -> usize {
    segment.chars().filter(|c| !c.is_whitespace()).count()
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
