//! Background Removal Studio CLI
//!
//! Queues image files, runs them through the removal service in one batch and
//! exports the results as separate files or one ZIP archive.

use super::config::CliConfigBuilder;
use crate::{
    client::HttpRemovalClient,
    config::{GRADIENT_PRESETS, SOLID_COLOR_PRESETS},
    export::Exporter,
    processor::{BatchProcessor, BatchSummary},
    services::{
        create_cli_progress_reporter, BatchProgressUpdate, ImageIOService, ProcessingStage,
        ProgressReporter, ProgressUpdate,
    },
    state::StudioEvent,
    store::StudioStore,
    tracing_config::events,
    types::SourceFile,
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Background removal studio: queue images, process them remotely, export results
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-studio")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image files or directories
    #[arg(value_name = "INPUT", required_unless_present = "list_presets")]
    pub input: Vec<String>,

    /// Output directory for exported images or the archive [default: current directory]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Package all results into one ZIP archive instead of separate files
    #[arg(long)]
    pub zip: bool,

    /// Removal service endpoint
    #[arg(long, env = "BGREMOVE_STUDIO_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Request timeout in seconds [default: none]
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Solid background color as hex, or "transparent"
    #[arg(long, value_name = "COLOR", conflicts_with_all = ["gradient", "background_image"])]
    pub background_color: Option<String>,

    /// Gradient background: a preset name (e.g. "Blue to Purple") or a CSS gradient
    #[arg(long, value_name = "GRADIENT", conflicts_with = "background_image")]
    pub gradient: Option<String>,

    /// Image file to use as the background
    #[arg(long, value_name = "PATH")]
    pub background_image: Option<PathBuf>,

    /// Shadow blur radius (0-50)
    #[arg(long)]
    pub shadow_blur: Option<u32>,

    /// Horizontal shadow offset (-50 to 50)
    #[arg(long, allow_hyphen_values = true)]
    pub shadow_offset_x: Option<i32>,

    /// Vertical shadow offset (-50 to 50)
    #[arg(long, allow_hyphen_values = true)]
    pub shadow_offset_y: Option<i32>,

    /// Shadow color as hex
    #[arg(long, value_name = "COLOR")]
    pub shadow_color: Option<String>,

    /// Brightness (0.1-3.0)
    #[arg(long)]
    pub brightness: Option<f32>,

    /// Contrast (0.1-3.0)
    #[arg(long)]
    pub contrast: Option<f32>,

    /// Saturation (0.0-3.0)
    #[arg(long)]
    pub saturation: Option<f32>,

    /// Load editing parameters from a JSON preset [default: user preset if present]
    #[arg(long, value_name = "PATH")]
    pub params: Option<PathBuf>,

    /// Save the effective editing parameters as a JSON preset
    #[arg(long, value_name = "PATH")]
    pub save_params: Option<PathBuf>,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Pattern for directory inputs (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Show detailed batch progress instead of a progress bar
    #[arg(long)]
    pub progress: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// List built-in background presets and exit
    #[arg(long)]
    pub list_presets: bool,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose).context("Failed to initialize tracing")?;

    if cli.list_presets {
        list_presets();
        return Ok(());
    }

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::studio_config(&cli).context("Invalid service configuration")?;
    let params = CliConfigBuilder::editing_params(&cli).context("Invalid editing parameters")?;

    if let Some(path) = &cli.save_params {
        params
            .save(path)
            .with_context(|| format!("Failed to save parameters to {}", path.display()))?;
        info!("Saved editing parameters to {}", path.display());
    }

    let files = collect_input_files(&cli)?;
    if files.is_empty() {
        warn!("No image files found in the provided inputs");
        return Ok(());
    }

    let store = Arc::new(StudioStore::with_params(params));

    if let Some(path) = &cli.background_image {
        let background = SourceFile::from_path(path)
            .with_context(|| format!("Failed to read background image {}", path.display()))?;
        store
            .dispatch(StudioEvent::SetCustomBackground(background))
            .context("Invalid background image")?;
    }

    let sources: Vec<SourceFile> = files
        .iter()
        .filter_map(|path| match ImageIOService::load_source(path) {
            Ok(source) => Some(source),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                None
            },
        })
        .collect();
    let ids = store.intake(sources).context("No valid images to process")?;

    info!("Queued {} image(s) for {}", ids.len(), config.endpoint);

    let client = HttpRemovalClient::new(&config).context("Failed to create removal client")?;
    let reporter = create_reporter(&cli, ids.len());
    let processor =
        BatchProcessor::new(Arc::clone(&store), Arc::new(client)).with_progress_reporter(reporter);

    let summary = processor.run_batch().await.context("Batch processing failed")?;

    let output_dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));
    export_results(&store, &Exporter::new(&config), &output_dir, cli.zip)?;

    print_summary(&summary);

    if summary.processed == 0 && summary.failed > 0 {
        anyhow::bail!("All {} image(s) failed to process", summary.failed);
    }

    Ok(())
}

fn init_tracing(verbose_count: u8) -> Result<()> {
    crate::tracing_config::init_cli_tracing(verbose_count)
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(verbosity = verbose_count, "Tracing initialized");
    Ok(())
}

fn list_presets() {
    println!("Solid colors:");
    for color in SOLID_COLOR_PRESETS {
        println!("  • {}", color);
    }
    println!();
    println!("Gradients:");
    for preset in GRADIENT_PRESETS {
        println!("  • {:<16} {}", preset.name, preset.expression);
    }
    println!();
    println!("💡 Example: bgremove-studio --gradient \"Blue to Purple\" photo.jpg");
}

/// Resolve inputs to image paths in argument order
///
/// Directory contents are sorted within each directory. A path named twice
/// is queued once, at its first position.
fn collect_input_files(cli: &Cli) -> Result<Vec<PathBuf>> {
    let mut all_files = Vec::new();

    for input in &cli.input {
        let path = PathBuf::from(input);

        if path.is_file() {
            all_files.push(path);
        } else if path.is_dir() {
            let mut found = find_image_files(&path, cli.recursive, cli.pattern.as_deref())?;
            found.sort();
            all_files.extend(found);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    let mut seen = HashSet::new();
    all_files.retain(|path| seen.insert(path.clone()));
    Ok(all_files)
}

/// Find image files in a directory by extension and optional glob pattern
fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if recursive {
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let path = entry.path();
                if ImageIOService::has_image_extension(path) && matches_pattern(path, pattern) {
                    files.push(path.to_path_buf());
                }
            }
        }
    } else {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if ImageIOService::has_image_extension(&path) && matches_pattern(&path, pattern) {
                    files.push(path);
                }
            }
        }
    }

    Ok(files)
}

/// Check if file name matches the given glob pattern
fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|filename| {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(filename))
                    .unwrap_or(false)
            }),
        None => true,
    }
}

fn create_reporter(cli: &Cli, count: usize) -> Arc<dyn ProgressReporter> {
    if !cli.progress && count > 1 {
        match BarProgressReporter::new(count) {
            Ok(reporter) => return Arc::new(reporter),
            Err(e) => warn!("Progress bar unavailable: {}", e),
        }
    }
    create_cli_progress_reporter(cli.progress, cli.verbose > 0, count)
}

/// Write processed results to `output_dir`
fn export_results(
    store: &StudioStore,
    exporter: &Exporter,
    output_dir: &Path,
    as_archive: bool,
) -> Result<()> {
    let state = store.snapshot();

    if as_archive {
        let archive = exporter.export_all(&state).context("Failed to build archive")?;
        if archive.is_empty() {
            warn!("Nothing processed, skipping {}", archive.name());
            return Ok(());
        }
        let path = archive
            .save_in(output_dir)
            .with_context(|| format!("Failed to write archive to {}", output_dir.display()))?;
        events::progress(
            &format!("Wrote {} image(s) to {}", archive.len(), path.display()),
            "📦",
        );
        return Ok(());
    }

    for file in exporter.export_each(&state) {
        let path = file
            .save_in(output_dir)
            .with_context(|| format!("Failed to write {}", file.name()))?;
        events::progress(&format!("Saved {}", path.display()), "💾");
    }

    for record in state.records() {
        if let Some(reason) = record.last_error() {
            error!("❌ {}: {}", record.file_name(), reason);
        }
    }

    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    info!(
        "✅ Done in {:.2}s: {} processed, {} failed, {} skipped",
        summary.elapsed.as_secs_f64(),
        summary.processed,
        summary.failed,
        summary.skipped
    );
}

/// Progress reporter driving an indicatif bar, one tick per record
struct BarProgressReporter {
    bar: ProgressBar,
}

impl BarProgressReporter {
    fn new(count: usize) -> Result<Self> {
        let bar = ProgressBar::new(count as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        Ok(Self { bar })
    }
}

impl ProgressReporter for BarProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if update.stage == ProcessingStage::RecordProcessing {
            self.bar.set_message(update.description);
        }
    }

    fn report_completion(&self, summary: BatchSummary) {
        self.bar.finish_with_message(format!(
            "{} processed, {} failed",
            summary.processed, summary.failed
        ));
    }

    fn report_error(&self, _stage: ProcessingStage, error: &str) {
        self.bar.println(format!("❌ {}", error));
    }

    fn report_batch_progress(&self, update: BatchProgressUpdate) {
        self.bar.set_position(update.stats.items_completed as u64);
    }
}
