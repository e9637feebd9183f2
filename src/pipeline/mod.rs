//! Per-document pipeline: extract, tag, resolve, flatten, clean up.
//!
//! Each stage is also exposed as a standalone function over a [`WorkDir`]
//! so the CLI can run stages one at a time. [`Pipeline::run_document`]
//! chains them and always cleans the working directory, whether the
//! document succeeds or fails.

pub mod artifacts;

pub use artifacts::WorkDir;

use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, info_span, warn};

use crate::config::VeilConfig;
use crate::domain::FragmentIndex;
use crate::error::{RedactorError, RedactorResult};
use crate::extract::{FragmentSource, MupdfFragmentExtractor};
use crate::flatten::{FlattenReport, Flattener};
use crate::resolver::{Resolution, Resolver, UnresolvedTag};
use crate::tagger::{tag_document, tagger_from_config, PiiTagger, TaggingOutcome};

/// Where a document is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    Pending,
    Extracted,
    Tagged,
    Resolved,
    Flattened,
    Cleaned,
    Failed,
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Extracted => "extracted",
            Self::Tagged => "tagged",
            Self::Resolved => "resolved",
            Self::Flattened => "flattened",
            Self::Cleaned => "cleaned",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How tagging went for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaggingStatus {
    Tagged { tags: usize },
    Degraded { reason: String },
}

/// Outcome of one document run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub state: DocumentState,
    /// Last stage reached before cleanup or failure
    pub reached: DocumentState,
    pub tagging: Option<TaggingStatus>,
    pub records: usize,
    pub fallback_records: usize,
    pub boxes: usize,
    pub unresolved: Vec<UnresolvedTag>,
    pub pages: usize,
    pub pages_redacted: usize,
    pub error: Option<String>,
}

impl PipelineReport {
    fn new(input: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            output: None,
            state: DocumentState::Pending,
            reached: DocumentState::Pending,
            tagging: None,
            records: 0,
            fallback_records: 0,
            boxes: 0,
            unresolved: Vec::new(),
            pages: 0,
            pages_redacted: 0,
            error: None,
        }
    }

    fn advance(&mut self, state: DocumentState) {
        self.state = state;
        self.reached = state;
    }

    /// True if every stage ran without error.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// True if tagging failed and only the fallback scan redacted the
    /// document. Its output carries the partial suffix.
    pub fn is_degraded(&self) -> bool {
        matches!(self.tagging, Some(TaggingStatus::Degraded { .. }))
    }
}

/// Extracts fragments and raw text into `work`.
pub fn extract_stage(
    extractor: &dyn FragmentSource,
    input: &Path,
    work: &WorkDir,
) -> RedactorResult<FragmentIndex> {
    let index = extractor.extract_file(input)?;
    work.save_fragment_index(&index)?;
    work.save_extracted_text(&index.raw_text())?;
    Ok(index)
}

/// Tags the extracted text in `work`.
///
/// A degraded outcome writes the raw text as the masked artifact and marks
/// the work directory as degraded. The masked text holds no tags, so
/// downstream stages run on the fallback scan alone and the flattened
/// output is named as partial.
pub fn tag_stage(tagger: &dyn PiiTagger, work: &WorkDir) -> RedactorResult<TaggingOutcome> {
    let raw = work.load_extracted_text()?;
    let outcome = tag_document(tagger, &raw)?;
    work.save_masked_text(outcome.text_or(&raw))?;
    match &outcome {
        TaggingOutcome::Degraded { reason } => work.mark_degraded(reason)?,
        TaggingOutcome::Tagged(_) => work.clear_degraded()?,
    }
    Ok(outcome)
}

/// Resolves tags against fragments and writes the records artifact.
pub fn resolve_stage(resolver: &Resolver, work: &WorkDir) -> RedactorResult<Resolution> {
    let index = work.load_fragment_index()?;
    let raw = work.load_extracted_text()?;
    let tagged = work.load_masked_text()?;
    let resolution = resolver.resolve(index.fragments(), &tagged, &raw);
    work.save_records(&resolution.records)?;
    Ok(resolution)
}

/// Flattens `input` using the records in `work`, then deletes the records.
///
/// Output is named with `config.partial_suffix` when `work` is marked as
/// degraded, so a document that only went through the fallback scan is
/// never mistaken for a fully redacted one. The records survive a failed
/// flatten so the stage can be retried.
pub fn flatten_stage(
    flattener: &Flattener,
    input: &Path,
    work: &WorkDir,
    output_dir: &Path,
    config: &VeilConfig,
) -> RedactorResult<(PathBuf, FlattenReport)> {
    let records = work.load_records()?;
    let degraded = work.degraded_reason()?;
    if let Some(reason) = &degraded {
        warn!(%reason, "tagging degraded; output is only partially redacted");
    }
    let suffix = config.suffix_for(degraded.is_some());
    let result = flattener.flatten_file(input, &records, output_dir, suffix)?;
    work.remove_records()?;
    Ok(result)
}

/// Runs whole documents with one set of collaborators.
pub struct Pipeline {
    config: VeilConfig,
    extractor: Box<dyn FragmentSource>,
    tagger: Box<dyn PiiTagger>,
    keep_artifacts: bool,
}

impl Pipeline {
    /// Production pipeline: MuPDF extraction and the configured HTTP tagger.
    pub fn from_config(config: VeilConfig) -> RedactorResult<Self> {
        config.validate()?;
        let tagger = tagger_from_config(&config.tagger);
        Ok(Self {
            config,
            extractor: Box::new(MupdfFragmentExtractor::new()),
            tagger,
            keep_artifacts: false,
        })
    }

    /// Replaces the MuPDF extractor, e.g. with an OCR-backed source.
    pub fn with_extractor(mut self, extractor: Box<dyn FragmentSource>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replaces the configured tagger.
    pub fn with_tagger(mut self, tagger: Box<dyn PiiTagger>) -> Self {
        self.tagger = tagger;
        self
    }

    /// Leaves the text and fragment artifacts in place after a run.
    pub fn keep_artifacts(mut self, keep: bool) -> Self {
        self.keep_artifacts = keep;
        self
    }

    fn resolver(&self) -> Resolver {
        Resolver::new().with_fallback_scan(self.config.fallback_scan)
    }

    fn flattener(&self) -> Flattener {
        let flattener = Flattener::new()
            .with_scale(self.config.scale)
            .with_padding(self.config.padding_pt);
        match &self.config.scratch_dir {
            Some(dir) => flattener.with_scratch_parent(dir),
            None => flattener,
        }
    }

    /// Runs every stage for one document.
    ///
    /// Never returns an error: failures are recorded in the report with
    /// state [`DocumentState::Failed`], after cleanup has run.
    pub fn run_document(&self, input: &Path, work_root: &Path, output_dir: &Path) -> PipelineReport {
        let span = info_span!("document", input = %input.display());
        let _guard = span.enter();

        let mut report = PipelineReport::new(input);
        let work = document_work_dir(work_root, input);
        let result = self.run_stages(input, &work, output_dir, &mut report);

        if !self.keep_artifacts {
            if let Err(e) = work.clean() {
                warn!(error = %e, "failed to clean working directory");
            }
        }

        match result {
            Ok(()) => {
                report.state = DocumentState::Cleaned;
                info!(
                    output = ?report.output,
                    boxes = report.boxes,
                    unresolved = report.unresolved.len(),
                    degraded = report.is_degraded(),
                    "document done"
                );
            }
            Err(e) => {
                error!(error = %e, reached = %report.reached, "document failed");
                report.state = DocumentState::Failed;
                report.error = Some(e.to_string());
            }
        }
        report
    }

    fn run_stages(
        &self,
        input: &Path,
        work: &WorkDir,
        output_dir: &Path,
        report: &mut PipelineReport,
    ) -> RedactorResult<()> {
        if !input.is_file() {
            return Err(RedactorError::MissingInput {
                artifact: "source PDF".to_string(),
                path: input.to_path_buf(),
            });
        }
        std::fs::create_dir_all(work.path()).map_err(|e| RedactorError::io(work.path(), e))?;

        extract_stage(self.extractor.as_ref(), input, work)?;
        report.advance(DocumentState::Extracted);

        let outcome = tag_stage(self.tagger.as_ref(), work)?;
        report.tagging = Some(match &outcome {
            TaggingOutcome::Tagged(text) => TaggingStatus::Tagged {
                tags: crate::domain::RedactionTag::scan(text).len(),
            },
            TaggingOutcome::Degraded { reason } => TaggingStatus::Degraded { reason: reason.clone() },
        });
        report.advance(DocumentState::Tagged);

        let resolution = resolve_stage(&self.resolver(), work)?;
        report.records = resolution.records.len();
        report.fallback_records = resolution.fallback_records().count();
        report.boxes = resolution.total_boxes();
        report.unresolved = resolution.unresolved;
        report.advance(DocumentState::Resolved);

        let (output, flattened) = flatten_stage(&self.flattener(), input, work, output_dir, &self.config)?;
        report.output = Some(output);
        report.pages = flattened.pages;
        report.pages_redacted = flattened.pages_redacted;
        report.advance(DocumentState::Flattened);
        Ok(())
    }

    /// Runs several documents, `jobs` at a time. Results keep input order.
    pub fn run_batch(
        &self,
        inputs: &[PathBuf],
        work_root: &Path,
        output_dir: Option<&Path>,
    ) -> RedactorResult<Vec<PipelineReport>> {
        let run = |input: &PathBuf| {
            let dir = output_dir
                .or_else(|| input.parent().filter(|p| !p.as_os_str().is_empty()))
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            self.run_document(input, work_root, &dir)
        };

        if self.config.jobs <= 1 || inputs.len() <= 1 {
            return Ok(inputs.iter().map(run).collect());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs)
            .build()
            .map_err(|e| RedactorError::backend("rayon", "Failed to build worker pool", e))?;
        Ok(pool.install(|| inputs.par_iter().map(run).collect()))
    }
}

/// `<work_root>/<stem>`; distinct documents get distinct directories as
/// long as their stems differ.
pub fn document_work_dir(work_root: &Path, input: &Path) -> WorkDir {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());
    WorkDir::new(work_root.join(stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_dir_per_document() {
        let a = document_work_dir(Path::new("/work"), Path::new("/in/a.pdf"));
        let b = document_work_dir(Path::new("/work"), Path::new("/in/b.pdf"));
        assert_eq!(a.path(), Path::new("/work/a"));
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(DocumentState::Flattened.to_string(), "flattened");
    }
}
