//! veil command-line interface.
//!
//! Every pipeline stage can run on its own against a working directory, or
//! `run` chains them for one or more documents.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use veil::audit;
use veil::flatten::PREVIEW_RENDER_SCALE;
use veil::pipeline::{extract_stage, flatten_stage, resolve_stage, tag_stage};
use veil::tagger::tagger_from_config;
use veil::{
    Flattener, MupdfFragmentExtractor, Pipeline, Resolver, TaggingOutcome, VeilConfig, WorkDir,
};

/// Tag-driven PDF redaction
///
/// Maps PII tags from a de-identification service back onto page
/// positions and writes a flattened, image-only copy with the values
/// blacked out.
#[derive(Parser)]
#[command(name = "veil")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Working directory for stage artifacts
    #[arg(short, long, global = true, value_name = "DIR", default_value = "work")]
    work_dir: PathBuf,

    /// Render scale in pixels per point
    #[arg(long, global = true, conflicts_with = "preview")]
    scale: Option<f64>,

    /// Render at preview resolution (2x)
    #[arg(long, global = true)]
    preview: bool,

    /// Padding around each bar, in points
    #[arg(long, global = true, value_name = "PT")]
    padding: Option<f64>,

    /// Suffix appended to the output file stem
    #[arg(long, global = true)]
    suffix: Option<String>,

    /// Skip the fallback pattern scan
    #[arg(long, global = true)]
    no_fallback: bool,

    /// Tagging service endpoint
    #[arg(long, global = true, env = "VEIL_TAGGER_URL", value_name = "URL")]
    tagger_url: Option<String>,

    /// Tagging service API key
    #[arg(long, global = true, env = "VEIL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text and fragment positions from a PDF
    Extract {
        /// Input PDF file path
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },

    /// Send the extracted text to the tagging service
    Tag,

    /// Map tags onto fragment boxes
    Resolve,

    /// Rasterize the PDF with the resolved boxes blacked out
    Flatten {
        /// Input PDF file path
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output directory (defaults to the input's directory)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Run every stage for one or more documents
    Run {
        /// Input PDF file paths
        #[arg(short, long, value_name = "FILE", num_args = 1.., required = true)]
        input: Vec<PathBuf>,

        /// Output directory (defaults to each input's directory)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Documents processed concurrently
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Keep stage artifacts after the run
        #[arg(long)]
        keep_artifacts: bool,
    },

    /// Compare original and tagged text (QA only)
    Compare {
        /// Original text (defaults to the working directory's extracted text)
        #[arg(long, value_name = "FILE")]
        original: Option<PathBuf>,

        /// Tagged text (defaults to the working directory's masked text)
        #[arg(long, value_name = "FILE")]
        tagged: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Stage command handler.
struct StageHandler {
    config: VeilConfig,
    work: WorkDir,
    verbose: bool,
}

impl StageHandler {
    fn new(config: VeilConfig, work_dir: &Path, verbose: bool) -> Self {
        Self {
            config,
            work: WorkDir::new(work_dir),
            verbose,
        }
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

    fn extract(&self, input: &Path) -> Result<()> {
        if !input.exists() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }
        let work = WorkDir::create(self.work.path())?;
        let index = extract_stage(&MupdfFragmentExtractor::new(), input, &work)
            .with_context(|| format!("Extraction failed for {}", input.display()))?;

        println!(
            "✓ Extracted {} fragment(s) from {} page(s) → {}",
            index.fragments().len(),
            index.total_pages,
            work.path().display()
        );
        Ok(())
    }

    fn tag(&self) -> Result<()> {
        let tagger = tagger_from_config(&self.config.tagger);
        let outcome = tag_stage(tagger.as_ref(), &self.work).context("Tagging failed")?;
        match outcome {
            TaggingOutcome::Tagged(text) => {
                let tags = veil::RedactionTag::scan(&text).len();
                println!("✓ Tagged text with {} tag(s)", tags);
            }
            TaggingOutcome::Degraded { reason } => {
                println!("⚠ Tagging DEGRADED, no tags applied: {}", reason);
                println!("  Only the fallback scan will redact this document.");
            }
        }
        Ok(())
    }

    fn resolve(&self) -> Result<()> {
        let resolver = Resolver::new().with_fallback_scan(self.config.fallback_scan);
        let resolution = resolve_stage(&resolver, &self.work).context("Resolution failed")?;

        if self.verbose {
            for record in &resolution.records {
                println!(
                    "  {} ({}): {} box(es)",
                    record.tag,
                    record.original_value.as_deref().unwrap_or("-"),
                    record.bounding_boxes.len()
                );
            }
        }
        println!(
            "✓ Resolved {} record(s) with {} box(es), {} from the fallback scan",
            resolution.records.len(),
            resolution.total_boxes(),
            resolution.fallback_records().count()
        );
        print_unresolved(&resolution.unresolved);
        Ok(())
    }

    fn flatten(&self, input: &Path, output_dir: Option<&Path>) -> Result<()> {
        if !input.exists() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }
        let output_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_dir(input));
        let degraded = self.work.degraded_reason()?;
        let (output, report) = flatten_stage(&self.flattener(), input, &self.work, &output_dir, &self.config)
            .context("Flattening failed")?;

        if self.verbose {
            println!("\nFlatten Summary:");
            println!("  Pages:          {}", report.pages);
            println!("  Pages redacted: {}", report.pages_redacted);
            println!("  Bars painted:   {}", report.boxes_painted);
        }
        println!("✓ Wrote {}", output.display());
        if let Some(reason) = degraded {
            println!("  ⚠ PARTIAL: tagging degraded ({}), only the fallback scan was applied", reason);
        }
        Ok(())
    }

    fn run(&self, inputs: &[PathBuf], output_dir: Option<&Path>, keep_artifacts: bool) -> Result<()> {
        let pipeline = Pipeline::from_config(self.config.clone())?.keep_artifacts(keep_artifacts);
        let reports = pipeline.run_batch(inputs, self.work.path(), output_dir)?;

        let mut failed = 0;
        for report in &reports {
            match (&report.output, &report.error) {
                (Some(output), None) => {
                    println!(
                        "✓ {} → {} ({} box(es) on {} of {} page(s))",
                        report.input.display(),
                        output.display(),
                        report.boxes,
                        report.pages_redacted,
                        report.pages
                    );
                    if report.is_degraded() {
                        println!("  ⚠ Tagging DEGRADED: only the fallback scan was applied; output is PARTIAL");
                    }
                    print_unresolved(&report.unresolved);
                }
                (_, error) => {
                    failed += 1;
                    println!(
                        "✗ {} failed after stage '{}': {}",
                        report.input.display(),
                        report.reached,
                        error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }

        if failed > 0 {
            anyhow::bail!("{} of {} document(s) failed", failed, reports.len());
        }
        Ok(())
    }

    fn compare(&self, original: Option<&Path>, tagged: Option<&Path>, json: bool) -> Result<()> {
        let original = match original {
            Some(path) => read_text(path)?,
            None => self.work.load_extracted_text()?,
        };
        let tagged = match tagged {
            Some(path) => read_text(path)?,
            None => self.work.load_masked_text()?,
        };

        let report = audit::compare(&original, &tagged);
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{}", report);
        }
        Ok(())
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn default_output_dir(input: &Path) -> PathBuf {
    input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn print_unresolved(unresolved: &[veil::UnresolvedTag]) {
    if unresolved.is_empty() {
        return;
    }
    println!("⚠ {} tag(s) need manual review:", unresolved.len());
    for tag in unresolved {
        println!("  {} ({:?})", tag.tag, tag.reason);
    }
}

/// Layers file settings, then environment and flags, over the defaults.
fn build_config(cli: &Cli, jobs: Option<usize>) -> Result<VeilConfig> {
    let mut config = match &cli.config {
        Some(path) => VeilConfig::load(path)?,
        None => VeilConfig::default(),
    };

    if cli.preview {
        config.scale = PREVIEW_RENDER_SCALE;
    }
    if let Some(scale) = cli.scale {
        config.scale = scale;
    }
    if let Some(padding) = cli.padding {
        config.padding_pt = padding;
    }
    if let Some(suffix) = &cli.suffix {
        config.output_suffix = suffix.clone();
    }
    if cli.no_fallback {
        config.fallback_scan = false;
    }
    if let Some(url) = &cli.tagger_url {
        config.tagger.url = Some(url.clone());
    }
    if let Some(key) = &cli.api_key {
        config.tagger.api_key = Some(key.clone());
    }
    if let Some(jobs) = jobs {
        config.jobs = jobs;
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let jobs = match &cli.command {
        Commands::Run { jobs, .. } => *jobs,
        _ => None,
    };
    let config = build_config(&cli, jobs)?;
    let handler = StageHandler::new(config, &cli.work_dir, cli.verbose);

    match &cli.command {
        Commands::Extract { input } => handler.extract(input)?,
        Commands::Tag => handler.tag()?,
        Commands::Resolve => handler.resolve()?,
        Commands::Flatten { input, output_dir } => handler.flatten(input, output_dir.as_deref())?,
        Commands::Run {
            input,
            output_dir,
            keep_artifacts,
            ..
        } => handler.run(input, output_dir.as_deref(), *keep_artifacts)?,
        Commands::Compare {
            original,
            tagged,
            json,
        } => handler.compare(original.as_deref(), tagged.as_deref(), *json)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "veil",
            "--padding",
            "2.5",
            "--preview",
            "--suffix",
            "_CLEAN",
            "resolve",
        ]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.padding_pt, 2.5);
        assert_eq!(config.scale, PREVIEW_RENDER_SCALE);
        assert_eq!(config.output_suffix, "_CLEAN");
    }

    #[test]
    fn test_invalid_flags_rejected() {
        let cli = Cli::parse_from(["veil", "--scale", "0", "tag"]);
        assert!(build_config(&cli, None).is_err());

        let cli = Cli::parse_from(["veil", "run", "--input", "a.pdf", "--jobs", "0"]);
        let jobs = match &cli.command {
            Commands::Run { jobs, .. } => *jobs,
            _ => None,
        };
        assert!(build_config(&cli, jobs).is_err());
    }

    #[test]
    fn test_default_output_dir() {
        assert_eq!(default_output_dir(Path::new("docs/a.pdf")), PathBuf::from("docs"));
        assert_eq!(default_output_dir(Path::new("a.pdf")), PathBuf::from("."));
    }
}
