//! Error types for the redaction pipeline.
//!
//! Every stage reports failures through [`RedactorError`]. The variants map
//! onto the failure classes the pipeline distinguishes: missing or corrupted
//! stage artifacts, rasterization failures, tagging service failures and
//! plain I/O or backend errors.
//!
//! Tags that cannot be resolved are deliberately *not* represented here;
//! they never abort a document and are carried as data in
//! [`crate::resolver::Resolution`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for redaction operations.
pub type RedactorResult<T> = Result<T, RedactorError>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Error type for all pipeline operations.
#[derive(Debug, Error)]
pub enum RedactorError {
    /// Error occurred while reading or writing files
    #[error("IO error for path '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A prior-stage artifact required by this stage does not exist
    #[error("missing required input '{artifact}' at '{}'", .path.display())]
    MissingInput { artifact: String, path: PathBuf },

    /// A stage artifact exists but could not be parsed
    #[error("artifact '{}' is corrupted: {reason}", .path.display())]
    ArtifactCorruption { path: PathBuf, reason: String },

    /// A page could not be rendered to a raster
    #[error("rasterization failed on page {page}: {message}")]
    Rasterization {
        page: usize,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Error occurred during PDF processing
    #[error("PDF processing error{}: {message}", .page.map(|p| format!(" on page {p}")).unwrap_or_default())]
    PdfProcessing {
        message: String,
        page: Option<usize>,
        #[source]
        source: Option<BoxedSource>,
    },

    /// The external tagging service errored, timed out or answered garbage
    #[error("{service} service failure: {reason}")]
    ExternalService { service: String, reason: String },

    /// Pattern matching or regex compilation error
    #[error("Pattern error for '{pattern}': {reason}")]
    PatternError { pattern: String, reason: String },

    /// Invalid configuration or parameters
    #[error("Invalid input for '{parameter}': {reason}")]
    InvalidInput { parameter: String, reason: String },

    /// Backend-specific error (MuPDF, lopdf, image encoding)
    #[error("{backend} backend error: {message}")]
    BackendError {
        backend: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl RedactorError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a backend error from any error source.
    pub fn backend<E>(backend: &str, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::BackendError {
            backend: backend.to_string(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true when the error must abort the whole document.
    ///
    /// Only tagging failures are recoverable; the pipeline degrades to an
    /// untagged run and reports it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ExternalService { .. })
    }
}

impl From<io::Error> for RedactorError {
    fn from(err: io::Error) -> Self {
        Self::BackendError {
            backend: "std::io".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<regex::Error> for RedactorError {
    fn from(err: regex::Error) -> Self {
        Self::PatternError {
            pattern: "<unknown>".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RedactorError {
    fn from(err: serde_json::Error) -> Self {
        Self::backend("serde_json", err.to_string(), err)
    }
}

impl From<lopdf::Error> for RedactorError {
    fn from(err: lopdf::Error) -> Self {
        Self::backend("lopdf", err.to_string(), err)
    }
}
