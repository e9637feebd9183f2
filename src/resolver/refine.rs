//! Narrowing fragment boxes down to the sensitive substring.

use std::ops::Range;

use crate::domain::{RefinedBox, TextFragment};

/// Controls how tightly refined boxes hug the matched substring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefineOptions {
    /// Extra approximated characters added on each side of the match,
    /// clamped to the fragment. Only applies to the uniform-width estimate
    /// used for fragments without measured glyph extents.
    pub edge_slack_chars: usize,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            edge_slack_chars: 1,
        }
    }
}

/// Builds the refined box for `span` (a byte range into `fragment.text`).
///
/// Measured glyph extents are used when the fragment carries them, so the
/// box spans exactly the matched glyphs. Otherwise the box is estimated
/// from a uniform character width plus `edge_slack_chars`.
///
/// An empty, out-of-range or non-boundary span yields the whole fragment
/// box: when the value cannot be located we redact too much, never too
/// little.
pub fn refine_span(fragment: &TextFragment, span: Range<usize>, options: RefineOptions) -> RefinedBox {
    let text = fragment.text.as_str();
    let located = span.start < span.end
        && span.end <= text.len()
        && text.is_char_boundary(span.start)
        && text.is_char_boundary(span.end);

    if !located {
        return whole_fragment(fragment);
    }

    let char_count = text.chars().count();
    let offset = text[..span.start].chars().count();
    let len = text[span.clone()].chars().count();

    let bbox = fragment.glyph_span(offset, offset + len).unwrap_or_else(|| {
        let start = offset.saturating_sub(options.edge_slack_chars);
        let end = (offset + len + options.edge_slack_chars).min(char_count);
        fragment.bbox.narrow(start, end - start, char_count)
    });

    RefinedBox {
        page: fragment.page,
        text: fragment.text.clone(),
        matched_text: Some(text[span].to_string()),
        bbox,
        source_x: fragment.bbox.x,
        source_y: fragment.bbox.y,
    }
}

/// Refines every span, falling back to the whole fragment if none is given.
pub fn refine_spans(
    fragment: &TextFragment,
    spans: &[Range<usize>],
    options: RefineOptions,
) -> Vec<RefinedBox> {
    if spans.is_empty() {
        return vec![whole_fragment(fragment)];
    }
    spans
        .iter()
        .map(|span| refine_span(fragment, span.clone(), options))
        .collect()
}

/// Unrefined box covering the entire fragment.
pub fn whole_fragment(fragment: &TextFragment) -> RefinedBox {
    RefinedBox {
        page: fragment.page,
        text: fragment.text.clone(),
        matched_text: None,
        bbox: fragment.bbox,
        source_x: fragment.bbox.x,
        source_y: fragment.bbox.y,
    }
}
