//! Runtime configuration.
//!
//! Settings come from, in increasing precedence: built-in defaults, an
//! optional TOML file, `VEIL_TAGGER_URL` / `VEIL_API_KEY` environment
//! variables and command-line flags. The binary applies the last two
//! layers through clap; this module owns the first two plus validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RedactorError, RedactorResult};
use crate::flatten::{
    DEFAULT_OUTPUT_SUFFIX, DEFAULT_PADDING_PT, DEFAULT_PARTIAL_SUFFIX, DEFAULT_RENDER_SCALE,
};

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VeilConfig {
    /// Pixels per point when rasterizing
    pub scale: f64,
    /// Padding around every bar, in points
    pub padding_pt: f64,
    /// Appended to the source stem for the output file
    pub output_suffix: String,
    /// Replaces `output_suffix` when tagging degraded and only the
    /// fallback scan ran
    pub partial_suffix: String,
    /// Parent for raster scratch directories; system temp when unset
    pub scratch_dir: Option<PathBuf>,
    /// Documents processed concurrently by `run`
    pub jobs: usize,
    /// Whether the fallback pattern scan runs after tag resolution
    pub fallback_scan: bool,
    pub tagger: TaggerConfig,
}

impl Default for VeilConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_RENDER_SCALE,
            padding_pt: DEFAULT_PADDING_PT,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            partial_suffix: DEFAULT_PARTIAL_SUFFIX.to_string(),
            scratch_dir: None,
            jobs: 1,
            fallback_scan: true,
            tagger: TaggerConfig::default(),
        }
    }
}

/// Settings for the HTTP tagging service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaggerConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Attempts after the first one
    pub max_retries: u32,
    /// Doubles after every failed attempt
    pub initial_backoff_ms: u64,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: 30,
            max_retries: 2,
            initial_backoff_ms: 500,
        }
    }
}

impl TaggerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

impl VeilConfig {
    /// Loads a TOML file over the defaults and validates the result.
    pub fn load(path: &Path) -> RedactorResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| RedactorError::io(path, e))?;
        let config: Self = toml::from_str(&text).map_err(|e| RedactorError::ArtifactCorruption {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Output suffix for a document, depending on whether its tagging
    /// degraded.
    pub fn suffix_for(&self, degraded: bool) -> &str {
        if degraded {
            &self.partial_suffix
        } else {
            &self.output_suffix
        }
    }

    /// Rejects settings that would fail later or overwrite the source.
    pub fn validate(&self) -> RedactorResult<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(invalid("scale", format!("must be a positive number, got {}", self.scale)));
        }
        if !(self.padding_pt.is_finite() && self.padding_pt >= 0.0) {
            return Err(invalid(
                "padding_pt",
                format!("must be zero or positive, got {}", self.padding_pt),
            ));
        }
        if self.output_suffix.is_empty() {
            return Err(invalid(
                "output_suffix",
                "must not be empty; the source would be overwritten".to_string(),
            ));
        }
        if self.partial_suffix.is_empty() || self.partial_suffix == self.output_suffix {
            return Err(invalid(
                "partial_suffix",
                "must be non-empty and differ from output_suffix".to_string(),
            ));
        }
        if self.jobs == 0 {
            return Err(invalid("jobs", "must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn invalid(parameter: &str, reason: String) -> RedactorError {
    RedactorError::InvalidInput {
        parameter: parameter.to_string(),
        reason,
    }
}
