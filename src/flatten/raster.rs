//! Page rasterization.
//!
//! The flattener only needs three things from a renderer: how many pages
//! there are, how large each page is in points, and an RGB raster of a page
//! at a given scale. [`PageRasterizer`] is that seam; [`MupdfRasterizer`]
//! is the production implementation.

use image::{Rgb, RgbImage};
use mupdf::{Colorspace, Document, Matrix, Page};

use crate::error::{RedactorError, RedactorResult};

/// Page dimensions in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Renders pages of one source document.
///
/// Pages are numbered from 1.
pub trait PageRasterizer {
    fn page_count(&self) -> RedactorResult<usize>;

    fn page_size(&self, page: usize) -> RedactorResult<PageSize>;

    /// Renders `page` with `scale` pixels per point. Any failure must be
    /// reported as [`RedactorError::Rasterization`].
    fn render(&self, page: usize, scale: f64) -> RedactorResult<RgbImage>;
}

/// MuPDF-backed rasterizer.
pub struct MupdfRasterizer {
    document: Document,
}

impl MupdfRasterizer {
    /// Opens a document from memory.
    pub fn from_bytes(bytes: &[u8]) -> RedactorResult<Self> {
        let document =
            Document::from_bytes(bytes, "pdf").map_err(|e| RedactorError::PdfProcessing {
                message: "Failed to open PDF with MuPDF".to_string(),
                page: None,
                source: Some(Box::new(e)),
            })?;
        Ok(Self { document })
    }

    fn load_page(&self, page: usize) -> RedactorResult<Page> {
        let index = page
            .checked_sub(1)
            .and_then(|i| i32::try_from(i).ok())
            .ok_or_else(|| RedactorError::InvalidInput {
                parameter: "page".to_string(),
                reason: format!("page {page} is out of range"),
            })?;
        self.document
            .load_page(index)
            .map_err(|e| RedactorError::PdfProcessing {
                message: format!("Failed to load page {page}"),
                page: Some(page),
                source: Some(Box::new(e)),
            })
    }
}

impl PageRasterizer for MupdfRasterizer {
    fn page_count(&self) -> RedactorResult<usize> {
        let count = self
            .document
            .page_count()
            .map_err(|e| RedactorError::backend("MuPDF", "Failed to get page count", e))?;
        Ok(count.max(0) as usize)
    }

    fn page_size(&self, page: usize) -> RedactorResult<PageSize> {
        let bounds = self
            .load_page(page)?
            .bounds()
            .map_err(|e| RedactorError::backend("MuPDF", format!("Failed to get bounds for page {page}"), e))?;
        Ok(PageSize {
            width: f64::from(bounds.x1 - bounds.x0),
            height: f64::from(bounds.y1 - bounds.y0),
        })
    }

    fn render(&self, page: usize, scale: f64) -> RedactorResult<RgbImage> {
        let raster_error = |message: String, source: Option<mupdf::Error>| RedactorError::Rasterization {
            page,
            message,
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        };

        let loaded = self
            .load_page(page)
            .map_err(|e| raster_error(e.to_string(), None))?;
        let matrix = Matrix::new_scale(scale as f32, scale as f32);
        let pixmap = loaded
            .to_pixmap(&matrix, &Colorspace::device_rgb(), false, true)
            .map_err(|e| raster_error("MuPDF failed to render page".to_string(), Some(e)))?;

        let width = pixmap.width() as u32;
        let height = pixmap.height() as u32;
        let components = pixmap.n() as usize;
        let samples = pixmap.samples();
        if width == 0 || height == 0 || components < 3 {
            return Err(raster_error(
                format!("unexpected pixmap {width}x{height} with {components} components"),
                None,
            ));
        }

        let stride = samples.len() / height as usize;
        if stride < width as usize * components {
            return Err(raster_error("pixmap stride shorter than a row".to_string(), None));
        }

        let mut raster = RgbImage::new(width, height);
        for (y, row) in samples.chunks_exact(stride).take(height as usize).enumerate() {
            for x in 0..width as usize {
                let px = &row[x * components..x * components + 3];
                raster.put_pixel(x as u32, y as u32, Rgb([px[0], px[1], px[2]]));
            }
        }
        Ok(raster)
    }
}
