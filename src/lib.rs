#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Background Removal Studio
//!
//! Headless core of a background removal studio: an ordered image queue with a
//! per-image lifecycle, a sequential batch controller that sends queued images
//! to a remote background removal service, and export of the results as single
//! files or one ZIP archive.
//!
//! ## Features
//!
//! - **Image Queue**: ordered records with `Uploaded → Processing → Processed | Errored` lifecycle
//! - **Pure Reducer**: every change is one [`StudioState::apply`] call, published as a snapshot
//! - **Batch Controller**: strictly sequential, one request in flight, failures never abort a run
//! - **Editing Parameters**: background color/gradient/image, drop shadow and color adjustments
//! - **Export**: `<name>_processed.png` files or a `processed_images.zip` archive
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgremove_studio::{
//!     BatchProcessor, EditingParams, Exporter, HttpRemovalClient, SourceFile, StudioConfig,
//!     StudioStore,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = StudioConfig::from_env();
//! let store = Arc::new(StudioStore::with_params(EditingParams::default()));
//! store.intake(vec![SourceFile::from_path("portrait.jpg")?])?;
//!
//! let client = Arc::new(HttpRemovalClient::new(&config)?);
//! let processor = BatchProcessor::new(Arc::clone(&store), client);
//! let summary = processor.run_batch().await?;
//! println!("{} processed, {} failed", summary.processed, summary.failed);
//!
//! let archive = Exporter::new(&config).export_all(&store.snapshot())?;
//! archive.write_to("processed_images.zip")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface and tracing subscriber setup
//! - `webp-support` (default): WebP content sniffing and dimension probing
//! - `tracing-json`: JSON log output for the CLI
//! - `tracing-files`: Log file output for the CLI

#[cfg(feature = "cli")]
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod processor;
pub mod services;
pub mod state;
pub mod store;
pub mod tracing_config;
pub mod types;

// Public API exports
pub use client::{FieldValue, FormField, HttpRemovalClient, RemovalClient, RemovalRequest};
pub use config::{
    AdjustmentParams, Background, EditingParams, EditingParamsBuilder, GradientPreset,
    ShadowParams, StudioConfig, StudioConfigBuilder, DEFAULT_ENDPOINT, GRADIENT_PRESETS,
    SOLID_COLOR_PRESETS,
};
pub use error::{Result, StudioError};
pub use export::{processed_file_name, ExportArchive, ExportedFile, Exporter};
pub use processor::{BatchProcessor, BatchSummary};
pub use services::{
    ConsoleProgressReporter, EnhancedProgressReporter, ImageIOService, NoOpProgressReporter,
    ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use state::{StatusCounts, StudioEvent, StudioState};
pub use store::StudioStore;
pub use types::{ImageId, ImageRecord, ImageStatus, PreviewRef, SourceFile};

pub use tracing_config::{events, spans, TracingConfig, TracingFormat, TracingOutput};
#[cfg(feature = "cli")]
pub use tracing_config::init_cli_tracing;
