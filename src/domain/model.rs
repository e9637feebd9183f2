//! Data model shared by every pipeline stage.
//!
//! All geometry is in PDF point space: origin at the bottom-left corner of
//! the page, y increasing upward. Field names serialize in camelCase so the
//! persisted artifacts keep the layout the extractor and tagger tooling
//! already produce.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Box with its bottom-left corner at `(x, y)`.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Flips a box from image space (origin top-left, y down) into PDF
    /// point space. OCR producers must run their word boxes through this
    /// before handing them to the resolver.
    pub fn from_image_space(x: f64, y: f64, width: f64, height: f64, page_height: f64) -> Self {
        Self {
            x,
            y: page_height - y - height,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// Returns true if `other` lies entirely inside this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.top() <= self.top()
    }

    /// Narrows the box horizontally to a run of characters, approximating
    /// glyph widths as uniform (`width / char_count`).
    ///
    /// Only used when the extractor did not report per-character extents;
    /// on proportional fonts the estimate drifts along the line. `y` and
    /// `height` are untouched.
    pub fn narrow(&self, char_offset: usize, char_len: usize, char_count: usize) -> Self {
        if char_count == 0 || char_offset >= char_count {
            return *self;
        }
        let char_width = self.width / char_count as f64;
        let len = char_len.min(char_count - char_offset);
        Self {
            x: self.x + char_offset as f64 * char_width,
            y: self.y,
            width: len as f64 * char_width,
            height: self.height,
        }
    }
}

/// One atomic piece of extracted text with its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFragment {
    /// 1-based page index
    pub page: usize,
    pub text: String,
    pub bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_height: Option<f64>,
    /// Horizontal `[left, right]` extent of every character of `text`, in
    /// points. Empty when the source only knows the fragment box.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub char_extents: Vec<[f64; 2]>,
}

impl TextFragment {
    /// Fragment without page height or glyph extents.
    pub fn new(page: usize, text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            page,
            text: text.into(),
            bbox,
            page_height: None,
            char_extents: Vec::new(),
        }
    }

    /// Records the height of the page the fragment sits on.
    pub fn with_page_height(mut self, page_height: f64) -> Self {
        self.page_height = Some(page_height);
        self
    }

    /// Attaches measured glyph extents, one per character of `text`.
    pub fn with_char_extents(mut self, extents: Vec<[f64; 2]>) -> Self {
        self.char_extents = extents;
        self
    }

    /// Box covering characters `start..end` (character offsets, not bytes)
    /// from the measured glyph extents.
    ///
    /// `None` when no extents were recorded, their count disagrees with the
    /// text, or the run has no width.
    pub fn glyph_span(&self, start: usize, end: usize) -> Option<BoundingBox> {
        if self.char_extents.len() != self.text.chars().count() || start >= end {
            return None;
        }
        let run = self.char_extents.get(start..end)?;
        let left = run.iter().map(|e| e[0]).fold(f64::INFINITY, f64::min);
        let right = run.iter().map(|e| e[1]).fold(f64::NEG_INFINITY, f64::max);
        (right > left).then(|| BoundingBox::new(left, self.bbox.y, right - left, self.bbox.height))
    }

    /// Identity of the fragment for claim tracking.
    pub fn key(&self) -> FragmentKey {
        FragmentKey::new(self.page, self.bbox.x, self.bbox.y)
    }
}

/// `(page, x, y)` identity of a fragment.
///
/// Coordinates are compared bit-for-bit: two fragments are the same only if
/// the extractor reported exactly the same origin.
#[derive(Debug, Clone, Copy)]
pub struct FragmentKey {
    pub page: usize,
    pub x: f64,
    pub y: f64,
}

impl FragmentKey {
    pub fn new(page: usize, x: f64, y: f64) -> Self {
        Self { page, x, y }
    }
}

impl PartialEq for FragmentKey {
    fn eq(&self, other: &Self) -> bool {
        self.page == other.page
            && self.x.to_bits() == other.x.to_bits()
            && self.y.to_bits() == other.y.to_bits()
    }
}

impl Eq for FragmentKey {}

impl Hash for FragmentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.page.hash(state);
        self.x.to_bits().hash(state);
        self.y.to_bits().hash(state);
    }
}

/// Every fragment of one document, in extraction order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentIndex {
    pub filename: String,
    pub total_pages: usize,
    pub bounding_boxes: Vec<TextFragment>,
    pub timestamp: DateTime<Utc>,
}

impl FragmentIndex {
    /// Index stamped with the current time.
    pub fn new(filename: impl Into<String>, total_pages: usize, fragments: Vec<TextFragment>) -> Self {
        Self {
            filename: filename.into(),
            total_pages,
            bounding_boxes: fragments,
            timestamp: Utc::now(),
        }
    }

    pub fn fragments(&self) -> &[TextFragment] {
        &self.bounding_boxes
    }

    /// Plain text of the document: one line per fragment, pages separated
    /// by a blank line.
    pub fn raw_text(&self) -> String {
        let mut text = String::new();
        let mut current_page = None;
        for fragment in &self.bounding_boxes {
            if let Some(page) = current_page {
                text.push('\n');
                if page != fragment.page {
                    text.push('\n');
                }
            }
            text.push_str(&fragment.text);
            current_page = Some(fragment.page);
        }
        text
    }
}

/// One `<...>` occurrence in the tagger's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionTag {
    /// Literal bracketed string, e.g. `<EMAIL>`
    pub tag: String,
    /// Inner label, e.g. `EMAIL`
    #[serde(rename = "type")]
    pub label: String,
}

impl RedactionTag {
    /// Scans tagged text for tags, left to right.
    pub fn scan(tagged: &str) -> Vec<Self> {
        tag_pattern()
            .captures_iter(tagged)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let label = caps.get(1)?;
                Some(Self {
                    tag: whole.as_str().to_string(),
                    label: label.as_str().to_string(),
                })
            })
            .collect()
    }
}

/// Pattern recognizing tagger substitutions.
pub fn tag_pattern() -> &'static Regex {
    static PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"<([^<>\n]+)>").expect("Valid tag regex"));
    &PATTERN
}

/// A box narrowed to the sensitive substring of one fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinedBox {
    pub page: usize,
    /// Full text of the source fragment
    pub text: String,
    /// Substring the box was narrowed to, if it could be located
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
    pub bbox: BoundingBox,
    /// Origin of the source fragment, used for claim tracking
    pub source_x: f64,
    pub source_y: f64,
}

impl RefinedBox {
    /// Key of the fragment this box was refined from.
    pub fn source_key(&self) -> FragmentKey {
        FragmentKey::new(self.page, self.source_x, self.source_y)
    }
}

/// Output of the resolver for one tag occurrence (or one fallback type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionRecord {
    pub tag: String,
    #[serde(rename = "type")]
    pub label: String,
    /// Literal redacted value when recoverable, otherwise a placeholder
    pub original_value: Option<String>,
    pub bounding_boxes: Vec<RefinedBox>,
}

impl RedactionRecord {
    pub fn is_fallback(&self) -> bool {
        self.label.ends_with("_FALLBACK")
    }
}
