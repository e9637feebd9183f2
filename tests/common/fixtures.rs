//! Test fixtures and PDF builders.
//!
//! Provides builders for creating test PDFs with specific content,
//! following the Builder pattern for clean test setup, plus a stub
//! rasterizer for flattening tests that should not depend on a renderer.

use anyhow::Result;
use image::{Rgb, RgbImage};
use printpdf::*;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use veil::domain::{BoundingBox, RedactionRecord, RefinedBox};
use veil::flatten::{PageRasterizer, PageSize};
use veil::{RedactorError, RedactorResult};

/// Builder for creating test PDFs, one `use_text` call per line so the
/// extractor sees each line as its own fragment.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// # use anyhow::Result;
/// # fn main() -> Result<()> {
/// let pdf = TestPdfBuilder::new()
///     .with_line("Jane Doe")
///     .with_line("Email: jane@x.com")
///     .new_page()
///     .with_line("Phone: 555-123-4567")
///     .build(Path::new("/tmp/test.pdf"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TestPdfBuilder {
    title: String,
    pages: Vec<Vec<String>>,
    page_width: Mm,
    page_height: Mm,
}

impl TestPdfBuilder {
    pub fn new() -> Self {
        Self {
            title: "Test Document".to_string(),
            pages: vec![Vec::new()],
            page_width: Mm(215.9),  // US Letter width
            page_height: Mm(279.4), // US Letter height
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Adds a line of text to the current page.
    pub fn with_line(mut self, line: &str) -> Self {
        if let Some(page) = self.pages.last_mut() {
            page.push(line.to_string());
        }
        self
    }

    /// Starts a new page; following lines go there.
    pub fn new_page(mut self) -> Self {
        self.pages.push(Vec::new());
        self
    }

    /// Builds the PDF and writes it to the specified path.
    pub fn build(self, output_path: &Path) -> Result<PathBuf> {
        let (doc, first_page, first_layer) =
            PdfDocument::new(&self.title, self.page_width, self.page_height, "Layer 1");
        let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;

        for (i, lines) in self.pages.iter().enumerate() {
            let (page, layer) = if i == 0 {
                (first_page, first_layer)
            } else {
                doc.add_page(self.page_width, self.page_height, format!("Layer {}", i + 1))
            };
            let current_layer = doc.get_page(page).get_layer(layer);
            for (n, line) in lines.iter().enumerate() {
                let y = self.page_height.0 - 25.0 - 10.0 * n as f32;
                current_layer.use_text(line.as_str(), 12.0, Mm(20.0), Mm(y), &font);
            }
        }

        doc.save(&mut BufWriter::new(fs::File::create(output_path)?))?;
        Ok(output_path.to_path_buf())
    }
}

impl Default for TestPdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One-page resume with a name, email and phone number.
pub fn create_resume(path: &Path) -> Result<PathBuf> {
    TestPdfBuilder::new()
        .with_title("Resume")
        .with_line("Jane Doe")
        .with_line("Email: jane@x.com")
        .with_line("Phone: 555-123-4567")
        .with_line("Experience: Staff Engineer")
        .build(path)
}

/// A record with one refined box.
pub fn record_with_box(label: &str, page: usize, bbox: BoundingBox) -> RedactionRecord {
    RedactionRecord {
        tag: format!("<{label}>"),
        label: label.to_string(),
        original_value: None,
        bounding_boxes: vec![RefinedBox {
            page,
            text: String::new(),
            matched_text: None,
            bbox,
            source_x: bbox.x,
            source_y: bbox.y,
        }],
    }
}

/// Renders blank white pages, optionally failing on one page.
#[derive(Debug, Clone)]
pub struct StubRasterizer {
    pages: Vec<PageSize>,
    fail_on: Option<usize>,
}

impl StubRasterizer {
    pub fn new(pages: &[(f64, f64)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|&(width, height)| PageSize { width, height })
                .collect(),
            fail_on: None,
        }
    }

    pub fn failing_on(mut self, page: usize) -> Self {
        self.fail_on = Some(page);
        self
    }

    fn size(&self, page: usize) -> RedactorResult<PageSize> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .copied()
            .ok_or_else(|| RedactorError::InvalidInput {
                parameter: "page".to_string(),
                reason: format!("no page {page}"),
            })
    }
}

impl PageRasterizer for StubRasterizer {
    fn page_count(&self) -> RedactorResult<usize> {
        Ok(self.pages.len())
    }

    fn page_size(&self, page: usize) -> RedactorResult<PageSize> {
        self.size(page)
    }

    fn render(&self, page: usize, scale: f64) -> RedactorResult<RgbImage> {
        if self.fail_on == Some(page) {
            return Err(RedactorError::Rasterization {
                page,
                message: "stub renderer failure".to_string(),
                source: None,
            });
        }
        let size = self.size(page)?;
        let width = (size.width * scale).round() as u32;
        let height = (size.height * scale).round() as u32;
        Ok(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let builder = TestPdfBuilder::new()
            .with_line("one")
            .new_page()
            .with_line("two")
            .with_line("three");

        assert_eq!(builder.pages.len(), 2);
        assert_eq!(builder.pages[1].len(), 2);
    }
}
