//! Custom assertions for redaction testing.
//!
//! Provides domain-specific assertions that make tests more readable
//! and provide better error messages.

use image::{Rgb, RgbImage};
use std::path::Path;

use super::pdf_helpers::{glyph_regions, media_boxes, page_image, GlyphRegion};

/// Asserts that no page of the PDF shows text.
///
/// # Panics
/// Panics if any content stream contains a text-showing operator.
pub fn assert_no_text_layer(bytes: &[u8]) {
    let has_text = veil::flatten::has_text_layer(bytes).expect("PDF should be parseable");
    assert!(!has_text, "flattened PDF still has a text layer");
}

/// Asserts that every pixel over the original glyphs of `needle` in
/// `source` is black in the flattened document `output`.
///
/// # Panics
/// Panics if `needle` does not occur in `source`, or if any pixel over its
/// glyphs survived.
pub fn assert_glyphs_painted(source: &Path, output: &[u8], needle: &str) {
    let regions = glyph_regions(source, needle).expect("source PDF should be searchable");
    assert!(!regions.is_empty(), "'{}' does not occur in '{}'", needle, source.display());

    for region in regions {
        let (image, (x0, y0, x1, y1)) = glyph_pixels(output, &region);
        for y in y0..y1 {
            for x in x0..x1 {
                assert_eq!(
                    *image.get_pixel(x, y),
                    Rgb([0, 0, 0]),
                    "pixel ({}, {}) over '{}' on page {} is not painted",
                    x,
                    y,
                    needle,
                    region.page
                );
            }
        }
    }
}

/// Asserts that the glyphs of `needle` were left (at least partly) visible.
pub fn assert_glyphs_visible(source: &Path, output: &[u8], needle: &str) {
    let regions = glyph_regions(source, needle).expect("source PDF should be searchable");
    assert!(!regions.is_empty(), "'{}' does not occur in '{}'", needle, source.display());

    for region in regions {
        let (image, (x0, y0, x1, y1)) = glyph_pixels(output, &region);
        let untouched = (y0..y1).any(|y| (x0..x1).any(|x| *image.get_pixel(x, y) != Rgb([0, 0, 0])));
        assert!(untouched, "'{}' on page {} was painted over", needle, region.page);
    }
}

/// Page image of `region` and the pixel rectangle lying fully inside the
/// glyphs, at the resolution the page was flattened with.
fn glyph_pixels(output: &[u8], region: &GlyphRegion) -> (RgbImage, (u32, u32, u32, u32)) {
    let image = page_image(output, region.page).expect("flattened page should hold an image");
    let sizes = media_boxes(output).expect("flattened PDF should have MediaBoxes");
    let (width, height) = sizes[region.page as usize - 1];
    let sx = image.width() as f32 / width;
    let sy = image.height() as f32 / height;

    let x0 = (region.x0 * sx).ceil().max(0.0) as u32;
    let y0 = (region.y0 * sy).ceil().max(0.0) as u32;
    let x1 = ((region.x1 * sx).floor() as u32).min(image.width());
    let y1 = ((region.y1 * sy).floor() as u32).min(image.height());
    assert!(x0 < x1 && y0 < y1, "glyph region {:?} is empty at this resolution", region);
    (image, (x0, y0, x1, y1))
}

/// Asserts that every pixel in `x0..x1, y0..y1` is black.
pub fn assert_region_black(image: &RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) {
    for y in y0..y1 {
        for x in x0..x1 {
            assert_eq!(
                *image.get_pixel(x, y),
                Rgb([0, 0, 0]),
                "pixel ({}, {}) should be painted",
                x,
                y
            );
        }
    }
}

/// Asserts that a directory exists and holds nothing.
pub fn assert_dir_empty(dir: &Path) {
    let entries: Vec<_> = std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("cannot read '{}': {}", dir.display(), e))
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    assert!(
        entries.is_empty(),
        "'{}' should be empty but contains {:?}",
        dir.display(),
        entries
    );
}
