//! Converting point-space boxes to raster pixels and painting them.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::domain::BoundingBox;

/// Fully opaque fill. Rasters are RGB without alpha, so nothing under a bar
/// can blend through.
pub const REDACTION_FILL: Rgb<u8> = Rgb([0, 0, 0]);

/// A rectangle in raster pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Maps a point-space box onto a raster rendered at `scale` pixels per
/// point, padded by `padding_pt` on every side.
///
/// The y axis flips: `pixelY = rasterHeight - y*scale - height*scale`.
/// Edges are rounded outward and clipped to the raster; `None` means the
/// box lies entirely off the page.
pub fn to_pixel_rect(
    bbox: &BoundingBox,
    raster_width: u32,
    raster_height: u32,
    scale: f64,
    padding_pt: f64,
) -> Option<PixelRect> {
    let pad = padding_pt.max(0.0) * scale;
    let raster_h = f64::from(raster_height);

    let (x0, x1) = ordered(bbox.x * scale, (bbox.x + bbox.width) * scale);
    let (y_top, y_bottom) = ordered(
        raster_h - bbox.y * scale - bbox.height * scale,
        raster_h - bbox.y * scale,
    );

    let left = (x0 - pad).floor().max(0.0);
    let top = (y_top - pad).floor().max(0.0);
    let right = (x1 + pad).ceil().min(f64::from(raster_width));
    let bottom = (y_bottom + pad).ceil().min(raster_h);

    if !(right > left && bottom > top) {
        return None;
    }

    Some(PixelRect {
        x: left as u32,
        y: top as u32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    })
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Paints one opaque bar per box. Returns the number of bars drawn.
pub fn paint_boxes<'a>(
    raster: &mut RgbImage,
    boxes: impl IntoIterator<Item = &'a BoundingBox>,
    scale: f64,
    padding_pt: f64,
) -> usize {
    let (width, height) = raster.dimensions();
    let mut painted = 0;
    for bbox in boxes {
        let Some(rect) = to_pixel_rect(bbox, width, height, scale, padding_pt) else {
            tracing::warn!(?bbox, "redaction box lies outside the page");
            continue;
        };
        draw_filled_rect_mut(
            raster,
            Rect::at(rect.x as i32, rect.y as i32).of_size(rect.width, rect.height),
            REDACTION_FILL,
        );
        painted += 1;
    }
    painted
}
