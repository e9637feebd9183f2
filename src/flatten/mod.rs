//! Page flattening.
//!
//! Every page of the source document is rasterized, redaction bars are
//! painted into the raster, and a new PDF is assembled whose pages are
//! nothing but those rasters. The original text and vector layers do not
//! survive, so covered text cannot be selected or extracted afterwards.
//!
//! Painted rasters are staged as PNG files in a per-run scratch directory
//! so only one page raster is held in memory at a time. The scratch
//! directory is removed whether the flatten succeeds or fails, and a
//! failure on any page aborts the run before anything is written.

pub mod assemble;
pub mod paint;
pub mod raster;

pub use assemble::{has_text_layer, ImagePdfBuilder};
pub use paint::{paint_boxes, to_pixel_rect, PixelRect};
pub use raster::{MupdfRasterizer, PageRasterizer, PageSize};

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info, warn};

use crate::domain::{BoundingBox, RedactionRecord};
use crate::error::{RedactorError, RedactorResult};

/// 300 DPI relative to the 72 DPI point grid.
pub const DEFAULT_RENDER_SCALE: f64 = 300.0 / 72.0;

/// Faster, lower-fidelity scale for previews.
pub const PREVIEW_RENDER_SCALE: f64 = 2.0;

/// Padding added on every side of a box, in points.
pub const DEFAULT_PADDING_PT: f64 = 1.0;

/// Suffix appended to the source file stem for the output document.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_REDACTED";

/// Suffix for documents whose tagging degraded to the fallback scan. Such
/// output still shows names and every other tagger-only value.
pub const DEFAULT_PARTIAL_SUFFIX: &str = "_PARTIAL";

/// Summary of one flatten run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenReport {
    pub pages: usize,
    /// Pages with at least one bar painted
    pub pages_redacted: usize,
    pub boxes_painted: usize,
}

/// Rasterizes and redacts whole documents.
#[derive(Debug, Clone)]
pub struct Flattener {
    scale: f64,
    padding_pt: f64,
    scratch_parent: Option<PathBuf>,
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new()
    }
}

impl Flattener {
    /// Flattener rendering at 300 DPI with one point of padding.
    pub fn new() -> Self {
        Self {
            scale: DEFAULT_RENDER_SCALE,
            padding_pt: DEFAULT_PADDING_PT,
            scratch_parent: None,
        }
    }

    /// Sets the render scale in pixels per point. Must be positive.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the padding added on every side of each bar, in points.
    pub fn with_padding(mut self, padding_pt: f64) -> Self {
        self.padding_pt = padding_pt;
        self
    }

    /// Creates scratch directories under `parent` instead of the system
    /// temp directory.
    pub fn with_scratch_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.scratch_parent = Some(parent.into());
        self
    }

    /// Flattens using any rasterizer.
    pub fn flatten_with(
        &self,
        rasterizer: &dyn PageRasterizer,
        records: &[RedactionRecord],
    ) -> RedactorResult<(Vec<u8>, FlattenReport)> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(RedactorError::InvalidInput {
                parameter: "scale".to_string(),
                reason: format!("render scale must be positive, got {}", self.scale),
            });
        }

        let page_count = rasterizer.page_count()?;
        if page_count == 0 {
            return Err(RedactorError::PdfProcessing {
                message: "document has no pages".to_string(),
                page: None,
                source: None,
            });
        }

        let by_page = group_by_page(records, page_count);
        let scratch = self.scratch_dir()?;
        let mut report = FlattenReport {
            pages: page_count,
            ..Default::default()
        };

        let mut staged = Vec::with_capacity(page_count);
        for page in 1..=page_count {
            let size = rasterizer.page_size(page)?;
            let mut raster = rasterizer
                .render(page, self.scale)
                .map_err(|e| as_rasterization(page, e))?;

            let boxes = by_page.get(&page).map(Vec::as_slice).unwrap_or_default();
            let painted = paint_boxes(&mut raster, boxes, self.scale, self.padding_pt);
            if painted > 0 {
                report.pages_redacted += 1;
                report.boxes_painted += painted;
            }
            debug!(page, painted, "page rasterized");

            let path = scratch.path().join(format!("page-{page:04}.png"));
            raster
                .save_with_format(&path, ImageFormat::Png)
                .map_err(|e| RedactorError::backend("image", format!("Failed to stage page {page}"), e))?;
            staged.push((path, size));
        }

        let mut builder = ImagePdfBuilder::new();
        for (path, size) in &staged {
            let raster = image::open(path)
                .map_err(|e| RedactorError::backend("image", "Failed to read staged page", e))?
                .to_rgb8();
            builder.add_page(&raster, *size)?;
        }
        let bytes = builder.finish()?;

        info!(
            pages = report.pages,
            pages_redacted = report.pages_redacted,
            boxes = report.boxes_painted,
            "document flattened"
        );
        Ok((bytes, report))
    }

    /// Flattens `input` into `output_dir` with MuPDF, returning the output
    /// path.
    pub fn flatten_file(
        &self,
        input: &Path,
        records: &[RedactionRecord],
        output_dir: &Path,
        suffix: &str,
    ) -> RedactorResult<(PathBuf, FlattenReport)> {
        let output = output_path(input, output_dir, suffix)?;
        let pdf_bytes = std::fs::read(input).map_err(|e| RedactorError::io(input, e))?;
        let rasterizer = MupdfRasterizer::from_bytes(&pdf_bytes)?;
        self.write_flattened(&rasterizer, records, &output)
    }

    /// Flattens the document behind `rasterizer` into `output_dir`, naming
    /// the output after `input`.
    ///
    /// The output is written to a temporary file beside its destination and
    /// renamed into place, so a failed run leaves no partial document.
    pub fn flatten_file_with(
        &self,
        rasterizer: &dyn PageRasterizer,
        input: &Path,
        records: &[RedactionRecord],
        output_dir: &Path,
        suffix: &str,
    ) -> RedactorResult<(PathBuf, FlattenReport)> {
        let output = output_path(input, output_dir, suffix)?;
        self.write_flattened(rasterizer, records, &output)
    }

    fn write_flattened(
        &self,
        rasterizer: &dyn PageRasterizer,
        records: &[RedactionRecord],
        output: &Path,
    ) -> RedactorResult<(PathBuf, FlattenReport)> {
        let (bytes, report) = self.flatten_with(rasterizer, records)?;
        let output_dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut staging = NamedTempFile::new_in(output_dir).map_err(|e| RedactorError::io(output_dir, e))?;
        staging
            .write_all(&bytes)
            .map_err(|e| RedactorError::io(staging.path(), e))?;
        staging
            .persist(output)
            .map_err(|e| RedactorError::io(output, e.error))?;

        info!(output = %output.display(), "wrote redacted document");
        Ok((output.to_path_buf(), report))
    }

    fn scratch_dir(&self) -> RedactorResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("veil-raster-");
        match &self.scratch_parent {
            Some(parent) => builder.tempdir_in(parent).map_err(|e| RedactorError::io(parent, e)),
            None => builder
                .tempdir()
                .map_err(|e| RedactorError::io(std::env::temp_dir(), e)),
        }
    }
}

/// Destination for `input`, refusing to overwrite the source itself.
fn output_path(input: &Path, output_dir: &Path, suffix: &str) -> RedactorResult<PathBuf> {
    let output = output_dir.join(redacted_file_name(input, suffix)?);
    if output == input {
        return Err(RedactorError::InvalidInput {
            parameter: "output".to_string(),
            reason: "output would overwrite the source document".to_string(),
        });
    }
    Ok(output)
}

/// `<stem><suffix>.pdf` for a source document.
pub fn redacted_file_name(input: &Path, suffix: &str) -> RedactorResult<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RedactorError::InvalidInput {
            parameter: "input".to_string(),
            reason: format!("cannot derive a file name from '{}'", input.display()),
        })?;
    Ok(PathBuf::from(format!("{stem}{suffix}.pdf")))
}

fn group_by_page(records: &[RedactionRecord], page_count: usize) -> BTreeMap<usize, Vec<BoundingBox>> {
    let mut by_page: BTreeMap<usize, Vec<BoundingBox>> = BTreeMap::new();
    for refined in records.iter().flat_map(|r| &r.bounding_boxes) {
        if refined.page == 0 || refined.page > page_count {
            warn!(page = refined.page, page_count, "box references a page outside the document");
            continue;
        }
        by_page.entry(refined.page).or_default().push(refined.bbox);
    }
    by_page
}

fn as_rasterization(page: usize, err: RedactorError) -> RedactorError {
    match err {
        RedactorError::Rasterization { .. } => err,
        other => RedactorError::Rasterization {
            page,
            message: other.to_string(),
            source: Some(Box::new(other)),
        },
    }
}
