//! Tag-driven PDF redaction with bounding-box reconciliation.
//!
//! An external de-identification service replaces PII in a document's text
//! with labels such as `<EMAIL>` but reports no positions. This library
//! maps those labels back onto the page, narrows each box to the sensitive
//! substring, and produces a flattened copy of the PDF in which every page
//! is a single raster with opaque bars burned in. No text layer survives.
//!
//! # Architecture
//!
//! - [`domain`]: data model and per-type pattern matchers
//! - [`extract`]: positioned text fragments from a PDF (MuPDF)
//! - [`tagger`]: the tagging service boundary and its HTTP client
//! - [`resolver`]: reconciles tags with fragments, plus the fallback scan
//! - [`flatten`]: rasterize, paint, and re-assemble pages
//! - [`pipeline`]: stage artifacts, per-document runs and batches
//! - [`audit`]: offline original-versus-tagged comparison
//! - [`config`], [`error`]: settings and the crate error type
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use veil::{Pipeline, VeilConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::from_config(VeilConfig::default())?;
//! let report = pipeline.run_document(
//!     Path::new("resume.pdf"),
//!     Path::new("work"),
//!     Path::new("out"),
//! );
//! if let Some(output) = &report.output {
//!     println!("{} boxes -> {}", report.boxes, output.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Resolving canned tagger output
//!
//! ```
//! use veil::domain::{BoundingBox, TextFragment};
//! use veil::Resolver;
//!
//! let fragments = vec![
//!     TextFragment::new(1, "Tel: 555-123-4567", BoundingBox::new(72.0, 700.0, 102.0, 12.0)),
//! ];
//! let resolution = Resolver::new().resolve(&fragments, "Tel: <PHONE>", "Tel: 555-123-4567");
//! let refined = &resolution.records[0].bounding_boxes[0];
//! assert!(refined.bbox.x > 72.0);
//! assert!(refined.bbox.width < 102.0);
//! ```

pub mod audit;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod flatten;
pub mod pipeline;
pub mod resolver;
pub mod tagger;

pub use config::{TaggerConfig, VeilConfig};
pub use domain::{
    BoundingBox, FragmentIndex, MatcherKind, PatternMatcher, RedactionRecord, RedactionTag, RefinedBox,
    TextFragment,
};
pub use error::{RedactorError, RedactorResult};
pub use extract::{FragmentSource, MupdfFragmentExtractor};
pub use flatten::{FlattenReport, Flattener, MupdfRasterizer, PageRasterizer};
pub use pipeline::{DocumentState, Pipeline, PipelineReport, TaggingStatus, WorkDir};
pub use resolver::{Resolution, Resolver, UnresolvedTag};
pub use tagger::{HttpTagger, PiiTagger, StaticTagger, TaggingOutcome};
