//! Stage artifacts in a working directory.
//!
//! Stages hand data to each other through files with fixed names so every
//! stage can also be run on its own. Reads distinguish a file that does not
//! exist ([`RedactorError::MissingInput`]) from one that cannot be parsed
//! ([`RedactorError::ArtifactCorruption`]); both name the file.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::domain::{FragmentIndex, RedactionRecord};
use crate::error::{RedactorError, RedactorResult};

pub const EXTRACTED_TEXT: &str = "extracted.txt";
pub const MASKED_TEXT: &str = "extracted_masked.txt";
pub const FRAGMENT_INDEX: &str = "extracted_bboxes.json";
pub const REDACTION_RECORDS: &str = "redacted_bboxes.json";
/// Present while the masked text came from a degraded tagging run; holds
/// the reason.
pub const TAGGING_DEGRADED: &str = "tagging_degraded.txt";

const ALL_ARTIFACTS: [&str; 5] = [
    EXTRACTED_TEXT,
    MASKED_TEXT,
    FRAGMENT_INDEX,
    REDACTION_RECORDS,
    TAGGING_DEGRADED,
];

/// A directory holding one document's stage artifacts.
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    /// Refers to `root` without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Opens `root`, creating it if needed.
    pub fn create(root: impl Into<PathBuf>) -> RedactorResult<Self> {
        let work = Self::new(root);
        std::fs::create_dir_all(&work.root).map_err(|e| RedactorError::io(&work.root, e))?;
        Ok(work)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path of the artifact called `name` inside this directory.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn save_extracted_text(&self, text: &str) -> RedactorResult<()> {
        self.write(EXTRACTED_TEXT, text.as_bytes())
    }

    pub fn load_extracted_text(&self) -> RedactorResult<String> {
        self.read_text(EXTRACTED_TEXT, "extracted text")
    }

    pub fn save_masked_text(&self, text: &str) -> RedactorResult<()> {
        self.write(MASKED_TEXT, text.as_bytes())
    }

    /// Tagger output, or the raw text when tagging degraded.
    pub fn load_masked_text(&self) -> RedactorResult<String> {
        self.read_text(MASKED_TEXT, "tagged text")
    }

    /// Marks the masked text as untagged.
    pub fn mark_degraded(&self, reason: &str) -> RedactorResult<()> {
        self.write(TAGGING_DEGRADED, reason.as_bytes())
    }

    /// Removes the degraded marker after a successful tagging run.
    pub fn clear_degraded(&self) -> RedactorResult<()> {
        self.remove(TAGGING_DEGRADED)
    }

    /// Reason tagging degraded, if the masked text is untagged.
    pub fn degraded_reason(&self) -> RedactorResult<Option<String>> {
        match self.read_text(TAGGING_DEGRADED, "degraded marker") {
            Ok(reason) => Ok(Some(reason)),
            Err(RedactorError::MissingInput { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn save_fragment_index(&self, index: &FragmentIndex) -> RedactorResult<()> {
        self.write_json(FRAGMENT_INDEX, index)
    }

    pub fn load_fragment_index(&self) -> RedactorResult<FragmentIndex> {
        self.read_json(FRAGMENT_INDEX, "fragment index")
    }

    pub fn save_records(&self, records: &[RedactionRecord]) -> RedactorResult<()> {
        self.write_json(REDACTION_RECORDS, &records)
    }

    /// Records written by the resolve stage.
    pub fn load_records(&self) -> RedactorResult<Vec<RedactionRecord>> {
        self.read_json(REDACTION_RECORDS, "redaction records")
    }

    /// Deletes the records artifact once the flattener has consumed it.
    pub fn remove_records(&self) -> RedactorResult<()> {
        self.remove(REDACTION_RECORDS)
    }

    /// Deletes every known artifact, then the directory itself if that
    /// leaves it empty.
    pub fn clean(&self) -> RedactorResult<()> {
        for name in ALL_ARTIFACTS {
            self.remove(name)?;
        }
        let is_empty = std::fs::read_dir(&self.root)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            std::fs::remove_dir(&self.root).map_err(|e| RedactorError::io(&self.root, e))?;
        }
        Ok(())
    }

    fn remove(&self, name: &str) -> RedactorResult<()> {
        let path = self.artifact_path(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed artifact");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RedactorError::io(path, e)),
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> RedactorResult<()> {
        let path = self.artifact_path(name);
        std::fs::write(&path, bytes).map_err(|e| RedactorError::io(&path, e))?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote artifact");
        Ok(())
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> RedactorResult<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.write(name, json.as_bytes())
    }

    fn read_text(&self, name: &str, artifact: &str) -> RedactorResult<String> {
        let path = self.artifact_path(name);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RedactorError::MissingInput {
                artifact: artifact.to_string(),
                path,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => Err(RedactorError::ArtifactCorruption {
                path,
                reason: "not valid UTF-8".to_string(),
            }),
            Err(e) => Err(RedactorError::io(path, e)),
        }
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str, artifact: &str) -> RedactorResult<T> {
        let path = self.artifact_path(name);
        let text = self.read_text(name, artifact)?;
        serde_json::from_str(&text).map_err(|e| RedactorError::ArtifactCorruption {
            path,
            reason: e.to_string(),
        })
    }
}
