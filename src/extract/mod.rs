//! Fragment extraction.
//!
//! Produces the [`FragmentIndex`] the resolver works from: one fragment per
//! structured-text line, in reading order, with its box in PDF point space.
//! Each fragment also carries the measured horizontal extent of every
//! character, taken from MuPDF's per-character quads, so values can be
//! boxed exactly even in proportional fonts.

use std::path::Path;

use mupdf::text_page::TextBlockType;
use mupdf::{Document, Quad, TextLine, TextPageOptions};
use tracing::{debug, info};

use crate::domain::{BoundingBox, FragmentIndex, TextFragment};
use crate::error::{RedactorError, RedactorResult};

/// Anything that can turn a PDF into positioned text fragments.
///
/// OCR-backed implementations must flip their word boxes with
/// [`BoundingBox::from_image_space`] before returning them.
pub trait FragmentSource: Send + Sync {
    fn extract(&self, pdf_bytes: &[u8], filename: &str) -> RedactorResult<FragmentIndex>;

    fn extract_file(&self, path: &Path) -> RedactorResult<FragmentIndex> {
        let bytes = std::fs::read(path).map_err(|e| RedactorError::io(path, e))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.extract(&bytes, &filename)
    }
}

/// Extracts line fragments through MuPDF's structured text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MupdfFragmentExtractor;

impl MupdfFragmentExtractor {
    /// Creates an extractor using MuPDF's default structured-text options.
    pub fn new() -> Self {
        Self
    }
}

impl FragmentSource for MupdfFragmentExtractor {
    fn extract(&self, pdf_bytes: &[u8], filename: &str) -> RedactorResult<FragmentIndex> {
        let document = Document::from_bytes(pdf_bytes, "pdf").map_err(|e| RedactorError::PdfProcessing {
            message: format!("Failed to open '{filename}' with MuPDF"),
            page: None,
            source: Some(Box::new(e)),
        })?;
        let page_count = document
            .page_count()
            .map_err(|e| RedactorError::backend("MuPDF", "Failed to get page count", e))?;

        let mut fragments = Vec::new();
        for index in 0..page_count {
            let page_number = index as usize + 1;
            let page_error = |message: &str, e: mupdf::Error| RedactorError::PdfProcessing {
                message: message.to_string(),
                page: Some(page_number),
                source: Some(Box::new(e)),
            };

            let page = document
                .load_page(index)
                .map_err(|e| page_error("Failed to load page", e))?;
            let bounds = page
                .bounds()
                .map_err(|e| page_error("Failed to get page bounds", e))?;
            let page_height = f64::from(bounds.y1 - bounds.y0);
            let text_page = page
                .to_text_page(TextPageOptions::empty())
                .map_err(|e| page_error("Failed to extract structured text", e))?;

            let before = fragments.len();
            for block in text_page.blocks() {
                if block.r#type() != TextBlockType::Text {
                    continue;
                }
                for line in block.lines() {
                    let (text, extents) = line_text(&line, bounds.x0);
                    if text.trim().is_empty() {
                        continue;
                    }
                    let r = line.bounds();
                    // MuPDF reports top-left origin, y down
                    let bbox = BoundingBox::from_image_space(
                        f64::from(r.x0 - bounds.x0),
                        f64::from(r.y0 - bounds.y0),
                        f64::from(r.x1 - r.x0),
                        f64::from(r.y1 - r.y0),
                        page_height,
                    );
                    fragments.push(
                        TextFragment::new(page_number, text, bbox)
                            .with_page_height(page_height)
                            .with_char_extents(extents),
                    );
                }
            }
            debug!(page = page_number, fragments = fragments.len() - before, "page extracted");
        }

        info!(
            file = filename,
            pages = page_count,
            fragments = fragments.len(),
            "extracted text fragments"
        );
        Ok(FragmentIndex::new(filename, page_count.max(0) as usize, fragments))
    }
}

/// Collects a line's text and the `[left, right]` extent of each character
/// relative to the page's left edge.
fn line_text(line: &TextLine<'_>, page_x0: f32) -> (String, Vec<[f64; 2]>) {
    let mut text = String::new();
    let mut extents = Vec::new();
    for ch in line.chars() {
        let Some(c) = ch.char() else {
            continue;
        };
        let (left, right) = horizontal_extent(&ch.quad());
        text.push(c);
        extents.push([f64::from(left - page_x0), f64::from(right - page_x0)]);
    }
    (text, extents)
}

/// Leftmost and rightmost x of a (possibly skewed) character quad.
fn horizontal_extent(quad: &Quad) -> (f32, f32) {
    let xs = [quad.ul.x, quad.ur.x, quad.ll.x, quad.lr.x];
    let left = xs.iter().copied().fold(f32::INFINITY, f32::min);
    let right = xs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    (left, right)
}
