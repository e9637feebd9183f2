//! Error display, source chaining and fatality.
//!
//! Messages reach operators through the CLI unchanged, so they must name
//! the file or page involved.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use veil::error::{RedactorError, RedactorResult};

#[test]
fn test_io_error_display() {
    let err = RedactorError::io(
        "/test/path.pdf",
        io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
    );

    let display = err.to_string();
    assert!(display.contains("/test/path.pdf"));
    assert!(display.contains("IO error"));
    assert!(display.contains("access denied"));
}

#[test]
fn test_missing_input_names_artifact_and_path() {
    let err = RedactorError::MissingInput {
        artifact: "masked text".to_string(),
        path: PathBuf::from("work/doc/extracted_masked.txt"),
    };

    assert_eq!(
        err.to_string(),
        "missing required input 'masked text' at 'work/doc/extracted_masked.txt'"
    );
}

#[test]
fn test_artifact_corruption_display() {
    let err = RedactorError::ArtifactCorruption {
        path: PathBuf::from("work/doc/extracted_bboxes.json"),
        reason: "expected value at line 1 column 3".to_string(),
    };

    let display = err.to_string();
    assert!(display.contains("extracted_bboxes.json"));
    assert!(display.contains("corrupted"));
    assert!(display.contains("line 1 column 3"));
}

#[test]
fn test_rasterization_error_display() {
    let err = RedactorError::Rasterization {
        page: 2,
        message: "out of memory".to_string(),
        source: None,
    };

    assert_eq!(err.to_string(), "rasterization failed on page 2: out of memory");
}

#[test]
fn test_pdf_processing_error_display_with_page() {
    let err = RedactorError::PdfProcessing {
        message: "Failed to load page".to_string(),
        page: Some(5),
        source: None,
    };

    let display = err.to_string();
    assert!(display.contains("page 5"));
    assert!(display.contains("Failed to load page"));
}

#[test]
fn test_pdf_processing_error_display_without_page() {
    let err = RedactorError::PdfProcessing {
        message: "Document corrupted".to_string(),
        page: None,
        source: None,
    };

    let display = err.to_string();
    assert!(!display.contains("page"));
    assert!(display.contains("Document corrupted"));
}

#[test]
fn test_external_service_display() {
    let err = RedactorError::ExternalService {
        service: "tagger".to_string(),
        reason: "HTTP 503 Service Unavailable".to_string(),
    };

    assert_eq!(
        err.to_string(),
        "tagger service failure: HTTP 503 Service Unavailable"
    );
}

#[test]
fn test_invalid_input_error_display() {
    let err = RedactorError::InvalidInput {
        parameter: "scale".to_string(),
        reason: "must be a positive number, got 0".to_string(),
    };

    let display = err.to_string();
    assert!(display.contains("scale"));
    assert!(display.contains("Invalid input"));
}

#[test]
fn test_backend_error_display() {
    let err = RedactorError::backend(
        "image",
        "Failed to stage page 3",
        io::Error::new(io::ErrorKind::Other, "disk full"),
    );

    let display = err.to_string();
    assert!(display.contains("image"));
    assert!(display.contains("Failed to stage page 3"));
}

#[test]
fn test_io_error_source_chain() {
    let err = RedactorError::io("/x.pdf", io::Error::new(io::ErrorKind::NotFound, "gone"));

    let source = err.source().expect("IO error should expose its source");
    assert_eq!(source.to_string(), "gone");
}

#[test]
fn test_rasterization_source_chain() {
    let err = RedactorError::Rasterization {
        page: 1,
        message: "render failed".to_string(),
        source: Some(Box::new(io::Error::new(io::ErrorKind::Other, "device lost"))),
    };

    assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("device lost"));

    let without = RedactorError::Rasterization {
        page: 1,
        message: "render failed".to_string(),
        source: None,
    };
    assert!(without.source().is_none());
}

#[test]
fn test_only_service_failures_are_recoverable() {
    let service = RedactorError::ExternalService {
        service: "tagger".to_string(),
        reason: "timeout".to_string(),
    };
    assert!(!service.is_fatal());

    let fatal = [
        RedactorError::MissingInput {
            artifact: "fragment index".to_string(),
            path: PathBuf::from("a"),
        },
        RedactorError::ArtifactCorruption {
            path: PathBuf::from("a"),
            reason: "bad".to_string(),
        },
        RedactorError::Rasterization {
            page: 1,
            message: "bad".to_string(),
            source: None,
        },
    ];
    assert!(fatal.iter().all(RedactorError::is_fatal));
}

#[test]
fn test_regex_error_conversion() {
    #[allow(clippy::invalid_regex)]
    let regex_err = regex::Regex::new("[unclosed").unwrap_err();
    let err: RedactorError = regex_err.into();

    assert!(matches!(err, RedactorError::PatternError { .. }));
}

#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
    let err: RedactorError = json_err.into();

    assert!(!err.to_string().is_empty());
}

#[test]
fn test_question_mark_propagation() {
    fn load() -> RedactorResult<String> {
        let text = std::fs::read_to_string("/definitely/not/here.txt")?;
        Ok(text)
    }

    let err = load().unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn test_errors_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RedactorError>();
}
