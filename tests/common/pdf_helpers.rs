//! PDF inspection helpers.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use lopdf::Document;
use std::path::Path;

/// Where one occurrence of a string was drawn on a source page.
///
/// Coordinates are MuPDF page space: points, origin at the top-left corner
/// of the page, y growing downward.
#[derive(Debug, Clone, Copy)]
pub struct GlyphRegion {
    /// 1-based page index
    pub page: u32,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// Extracts text from a PDF with an independent extractor.
pub fn extract_text(pdf_path: &Path) -> Result<String> {
    pdf_extract::extract_text(pdf_path).map_err(|e| anyhow!("Failed to extract text: {}", e))
}

pub fn page_count(bytes: &[u8]) -> Result<usize> {
    Ok(Document::load_mem(bytes)?.get_pages().len())
}

/// `(width, height)` of every page's MediaBox, in points.
pub fn media_boxes(bytes: &[u8]) -> Result<Vec<(f32, f32)>> {
    let doc = Document::load_mem(bytes)?;
    doc.get_pages()
        .values()
        .map(|&id| -> Result<(f32, f32)> {
            let page = doc.get_dictionary(id)?;
            let media_box = page.get(b"MediaBox")?.as_array()?;
            Ok((media_box[2].as_float()?, media_box[3].as_float()?))
        })
        .collect()
}

/// Decodes the single full-page image of `page` (1-based) in a flattened PDF.
pub fn page_image(bytes: &[u8], page: u32) -> Result<RgbImage> {
    let doc = Document::load_mem(bytes)?;
    let pages = doc.get_pages();
    let page_id = pages.get(&page).context("no such page")?;
    let resources = doc.get_dictionary(*page_id)?.get(b"Resources")?.as_dict()?;
    let image_id = resources
        .get(b"XObject")?
        .as_dict()?
        .get(b"Im0")?
        .as_reference()?;
    let stream = doc.get_object(image_id)?.as_stream()?;

    let width = stream.dict.get(b"Width")?.as_i64()? as u32;
    let height = stream.dict.get(b"Height")?.as_i64()? as u32;
    let data = stream.decompressed_content()?;
    RgbImage::from_raw(width, height, data).context("image data does not match its dimensions")
}

/// Glyph quads of every occurrence of `needle` in the PDF at `pdf_path`.
pub fn glyph_regions(pdf_path: &Path, needle: &str) -> Result<Vec<GlyphRegion>> {
    let bytes = std::fs::read(pdf_path)?;
    let doc = mupdf::Document::from_bytes(&bytes, "pdf").map_err(|e| anyhow!("Failed to open PDF: {}", e))?;
    let count = doc.page_count().map_err(|e| anyhow!("Failed to count pages: {}", e))?;

    let mut regions = Vec::new();
    for index in 0..count {
        let page = doc.load_page(index).map_err(|e| anyhow!("Failed to load page: {}", e))?;
        let bounds = page.bounds().map_err(|e| anyhow!("Failed to get bounds: {}", e))?;
        let hits = page
            .search(needle, 64)
            .map_err(|e| anyhow!("Failed to search page: {}", e))?;
        for quad in hits.iter() {
            regions.push(GlyphRegion {
                page: index as u32 + 1,
                x0: quad.ul.x.min(quad.ll.x).min(quad.ur.x).min(quad.lr.x) - bounds.x0,
                y0: quad.ul.y.min(quad.ll.y).min(quad.ur.y).min(quad.lr.y) - bounds.y0,
                x1: quad.ul.x.max(quad.ll.x).max(quad.ur.x).max(quad.lr.x) - bounds.x0,
                y1: quad.ul.y.max(quad.ll.y).max(quad.ur.y).max(quad.lr.y) - bounds.y0,
            });
        }
    }
    Ok(regions)
}
