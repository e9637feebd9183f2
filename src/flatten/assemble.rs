//! Building image-only PDFs with lopdf.
//!
//! Each output page carries exactly one full-page image XObject and a
//! content stream that draws it. No text operators are ever written, so the
//! result has no extractable text layer.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::{RedactorError, RedactorResult};
use crate::flatten::raster::PageSize;

/// Content-stream operators that show text.
const TEXT_SHOWING_OPERATORS: [&str; 4] = ["Tj", "TJ", "'", "\""];

/// Accumulates pages for an image-only document.
pub struct ImagePdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for ImagePdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImagePdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Appends a page of `size` points with `raster` stretched over it.
    pub fn add_page(&mut self, raster: &RgbImage, size: PageSize) -> RedactorResult<()> {
        let (width, height) = raster.dimensions();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(raster.as_raw())
            .map_err(|e| RedactorError::backend("flate2", "Failed to compress page image", e))?;
        let compressed = encoder
            .finish()
            .map_err(|e| RedactorError::backend("flate2", "Failed to compress page image", e))?;

        let image_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "FlateDecode",
            },
            compressed,
        ));

        let page_w = size.width as f32;
        let page_h = size.height as f32;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(page_w),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(page_h),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page_w),
                Object::Real(page_h),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
            "Contents" => content_id,
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    /// Finalizes the page tree and serializes the document.
    pub fn finish(mut self) -> RedactorResult<Vec<u8>> {
        if self.kids.is_empty() {
            return Err(RedactorError::InvalidInput {
                parameter: "pages".to_string(),
                reason: "an output document needs at least one page".to_string(),
            });
        }

        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes).map_err(|e| RedactorError::PdfProcessing {
            message: "Failed to serialize flattened PDF".to_string(),
            page: None,
            source: Some(Box::new(e)),
        })?;
        Ok(bytes)
    }
}

/// Returns true if any page of the PDF shows text.
pub fn has_text_layer(bytes: &[u8]) -> RedactorResult<bool> {
    let doc = Document::load_mem(bytes)?;
    for (number, page_id) in doc.get_pages() {
        let data = doc.get_page_content(page_id)?;
        let content = Content::decode(&data).map_err(|e| RedactorError::PdfProcessing {
            message: "Failed to decode content stream".to_string(),
            page: Some(number as usize),
            source: Some(Box::new(e)),
        })?;
        if content
            .operations
            .iter()
            .any(|op| TEXT_SHOWING_OPERATORS.contains(&op.operator.as_str()))
        {
            return Ok(true);
        }
    }
    Ok(false)
}
