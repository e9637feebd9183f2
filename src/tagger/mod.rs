//! PII tagging service boundary.
//!
//! A tagger takes plain text and returns the same text with every sensitive
//! value replaced by a bracketed label such as `<EMAIL>`. It reports no
//! positions. The production tagger is a remote HTTP service; failures are
//! surfaced as [`TaggingOutcome::Degraded`] so callers can tell "the service
//! was down" apart from "the document had no PII".

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::TaggerConfig;
use crate::domain::RedactionTag;
use crate::error::{RedactorError, RedactorResult};

const SERVICE: &str = "tagger";

/// Upper bound for the retry delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Text in, tagged text out.
pub trait PiiTagger: Send + Sync {
    fn tag(&self, text: &str) -> RedactorResult<String>;
}

/// Result of tagging one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaggingOutcome {
    /// The service answered; the text may contain zero tags
    Tagged(String),
    /// The service failed; resolution runs without tags
    Degraded { reason: String },
}

impl TaggingOutcome {
    /// Tagged text to resolve against. A degraded outcome yields `raw`
    /// unchanged, which carries no tags.
    pub fn text_or<'a>(&'a self, raw: &'a str) -> &'a str {
        match self {
            Self::Tagged(text) => text,
            Self::Degraded { .. } => raw,
        }
    }

    /// True if no tagged text was produced.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Tags `text`, converting service failures into a degraded outcome.
pub fn tag_document(tagger: &dyn PiiTagger, text: &str) -> RedactorResult<TaggingOutcome> {
    match tagger.tag(text) {
        Ok(tagged) => {
            info!(tags = RedactionTag::scan(&tagged).len(), "document tagged");
            Ok(TaggingOutcome::Tagged(tagged))
        }
        Err(err) if !err.is_fatal() => {
            error!(error = %err, "tagging failed; continuing with fallback scan only");
            Ok(TaggingOutcome::Degraded {
                reason: err.to_string(),
            })
        }
        Err(err) => Err(err),
    }
}

/// Returns a fixed answer.
#[derive(Debug, Clone)]
pub struct StaticTagger {
    output: String,
}

impl StaticTagger {
    /// Tagger that answers every request with `output`.
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

impl PiiTagger for StaticTagger {
    fn tag(&self, _text: &str) -> RedactorResult<String> {
        Ok(self.output.clone())
    }
}

/// Stands in for a tagger that could not be constructed; every call fails
/// with the construction error so runs degrade instead of aborting.
#[derive(Debug, Clone)]
pub struct UnavailableTagger {
    reason: String,
}

impl UnavailableTagger {
    /// Tagger that always degrades with `reason`.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl PiiTagger for UnavailableTagger {
    fn tag(&self, _text: &str) -> RedactorResult<String> {
        Err(service_error(self.reason.clone()))
    }
}

/// Builds the HTTP tagger, or an [`UnavailableTagger`] when the settings
/// leave it unusable (for example, no API key).
pub fn tagger_from_config(config: &TaggerConfig) -> Box<dyn PiiTagger> {
    match HttpTagger::new(config) {
        Ok(tagger) => Box::new(tagger),
        Err(err) => {
            let reason = match err {
                RedactorError::ExternalService { reason, .. } => reason,
                other => other.to_string(),
            };
            Box::new(UnavailableTagger::new(reason))
        }
    }
}

#[derive(Serialize)]
struct TagRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct TagResponse {
    output: Option<String>,
}

/// Client for the remote de-identification service.
///
/// Sends `{"text": ...}` with an `X-API-Key` header and accepts either a
/// JSON `{"output": ...}` body or a plain-text body.
#[derive(Debug)]
pub struct HttpTagger {
    client: Client,
    url: String,
    api_key: String,
    max_retries: u32,
    initial_backoff: Duration,
}

impl HttpTagger {
    /// Builds a client from settings. A missing URL or API key is a
    /// service failure, not a configuration error, so the pipeline still
    /// runs degraded.
    pub fn new(config: &TaggerConfig) -> RedactorResult<Self> {
        let url = config
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| service_error("no tagger URL configured"))?;
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| service_error("no API key configured"))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| service_error(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            api_key,
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff(),
        })
    }

    fn attempt(&self, text: &str) -> Result<String, Attempt> {
        let response = self
            .client
            .post(&self.url)
            .header("X-API-Key", &self.api_key)
            .json(&TagRequest { text })
            .send()
            .map_err(|e| Attempt::Retry(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(Attempt::Fail(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(Attempt::Retry(format!("HTTP {status}")));
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json"));
        let body = response
            .text()
            .map_err(|e| Attempt::Retry(format!("failed to read body: {e}")))?;

        let output = if is_json {
            serde_json::from_str::<TagResponse>(&body)
                .map_err(|e| Attempt::Fail(format!("malformed response: {e}")))?
                .output
        } else {
            Some(body)
        };

        match output {
            Some(tagged) if !tagged.trim().is_empty() => Ok(tagged),
            _ => Err(Attempt::Fail("response carried no output".to_string())),
        }
    }
}

enum Attempt {
    Retry(String),
    Fail(String),
}

impl PiiTagger for HttpTagger {
    fn tag(&self, text: &str) -> RedactorResult<String> {
        let mut backoff = self.initial_backoff;
        let mut last_err = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(attempt, max = self.max_retries, ?backoff, "retrying tagger request");
                thread::sleep(backoff);
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
            match self.attempt(text) {
                Ok(tagged) => return Ok(tagged),
                Err(Attempt::Fail(reason)) => return Err(service_error(reason)),
                Err(Attempt::Retry(reason)) => last_err = reason,
            }
        }

        Err(service_error(format!(
            "gave up after {} attempts: {last_err}",
            self.max_retries + 1
        )))
    }
}

fn service_error(reason: impl Into<String>) -> RedactorError {
    RedactorError::ExternalService {
        service: SERVICE.to_string(),
        reason: reason.into(),
    }
}
