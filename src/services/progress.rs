//! Progress reporting service
//!
//! This module separates progress reporting from the batch controller,
//! allowing different frontends to implement their own progress handling.

use crate::processor::BatchSummary;
use instant::Instant;
use std::sync::Arc;

/// Progress stages of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Snapshotting the queue and parameters
    BatchInitialization,
    /// Waiting for the removal service on one record
    RecordProcessing,
    /// Record received its result
    RecordCompleted,
    /// Record failed and was marked errored
    RecordFailed,
    /// Record was removed or changed status before its turn
    RecordSkipped,
    /// Publishing the final summary
    BatchFinalization,
    /// Run finished
    Completed,
}

impl ProcessingStage {
    /// Get a human-readable description of the stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::BatchInitialization => "Preparing batch",
            ProcessingStage::RecordProcessing => "Removing background",
            ProcessingStage::RecordCompleted => "Image processed",
            ProcessingStage::RecordFailed => "Image failed",
            ProcessingStage::RecordSkipped => "Image skipped",
            ProcessingStage::BatchFinalization => "Finalizing batch",
            ProcessingStage::Completed => "Batch completed",
        }
    }

    /// Get the nominal progress percentage for this stage
    ///
    /// Per-record stages report the batch position instead, see
    /// [`ProgressTracker`].
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            ProcessingStage::BatchInitialization => 0,
            ProcessingStage::RecordProcessing
            | ProcessingStage::RecordCompleted
            | ProcessingStage::RecordFailed
            | ProcessingStage::RecordSkipped => 50,
            ProcessingStage::BatchFinalization => 99,
            ProcessingStage::Completed => 100,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub description: String,
    /// Elapsed time since the run started
    pub elapsed_ms: u64,
    /// Estimated time remaining
    pub eta_ms: Option<u64>,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self {
            progress: stage.progress_percentage(),
            description: stage.description().to_string(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            eta_ms: None,
            stage,
        }
    }

    /// Create a progress update with custom description
    #[must_use]
    pub fn with_description(
        stage: ProcessingStage,
        description: String,
        start_time: Instant,
    ) -> Self {
        Self {
            progress: stage.progress_percentage(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            eta_ms: None,
            stage,
            description,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(100);
        self
    }

    #[must_use]
    pub fn with_eta(mut self, eta_ms: u64) -> Self {
        self.eta_ms = Some(eta_ms);
        self
    }
}

/// Running statistics of a batch
#[derive(Debug, Clone, Default)]
pub struct BatchProcessingStats {
    /// Records that reached a terminal status or were skipped
    pub items_completed: usize,
    pub items_total: usize,
    pub items_failed: usize,
    pub items_skipped: usize,
    /// File name of the record currently in flight
    pub current_item_name: String,
    /// Records per second
    pub processing_rate: f64,
    pub eta_seconds: Option<u64>,
}

/// Batch-level progress update
#[derive(Debug, Clone)]
pub struct BatchProgressUpdate {
    pub total_progress: ProgressUpdate,
    pub stats: BatchProcessingStats,
}

/// Trait for reporting progress during batch runs
pub trait ProgressReporter: Send + Sync {
    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report the end of a batch run
    fn report_completion(&self, summary: BatchSummary);

    /// Report a per-record failure
    ///
    /// # Arguments
    /// * `stage` - Stage where the error occurred
    /// * `error` - Error description
    fn report_error(&self, stage: ProcessingStage, error: &str);

    /// Report batch statistics after each record
    fn report_batch_progress(&self, update: BatchProgressUpdate) {
        drop(update);
    }
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _summary: BatchSummary) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Console progress reporter that writes through the `log` facade
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            log::info!(
                "[{}%] {} ({}ms elapsed)",
                update.progress,
                update.description,
                update.elapsed_ms
            );
        } else {
            log::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, summary: BatchSummary) {
        log::info!(
            "✅ Batch completed in {}ms: {} processed, {} failed, {} skipped",
            summary.elapsed.as_millis(),
            summary.processed,
            summary.failed,
            summary.skipped
        );
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("❌ {}: {}", stage.description(), error);
    }
}

/// Progress reporter with batch statistics and text progress bars
pub struct EnhancedProgressReporter {
    show_batch_stats: bool,
    verbose: bool,
}

impl EnhancedProgressReporter {
    /// # Arguments
    /// * `show_batch_stats` - Whether to log running statistics after each record
    /// * `verbose` - Whether to show timing details
    #[must_use]
    pub fn new(show_batch_stats: bool, verbose: bool) -> Self {
        Self {
            show_batch_stats,
            verbose,
        }
    }

    fn progress_bar(percentage: u8) -> String {
        let filled = (usize::from(percentage.min(100)) * 20) / 100;
        let empty = 20 - filled;
        format!("{}{}", "█".repeat(filled), "░".repeat(empty))
    }

    fn format_duration(ms: u64) -> String {
        let seconds = ms / 1000;
        if seconds < 60 {
            format!("{}s", seconds)
        } else {
            format!("{}m {}s", seconds / 60, seconds % 60)
        }
    }

    fn format_eta(eta_seconds: Option<u64>) -> String {
        match eta_seconds {
            Some(seconds) if seconds < 60 => format!("{}s", seconds),
            Some(seconds) => format!("{}m {}s", seconds / 60, seconds % 60),
            None => "calculating...".to_string(),
        }
    }
}

impl ProgressReporter for EnhancedProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        log::info!(
            "[{}] {}% {}",
            Self::progress_bar(update.progress),
            update.progress,
            update.description
        );
        if self.verbose {
            log::info!("└─ Elapsed: {}", Self::format_duration(update.elapsed_ms));
        }
    }

    fn report_completion(&self, summary: BatchSummary) {
        log::info!(
            "✅ Batch completed in {}: {} processed, {} failed, {} skipped",
            Self::format_duration(summary.elapsed.as_millis() as u64),
            summary.processed,
            summary.failed,
            summary.skipped
        );
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("❌ {}: {}", stage.description(), error);
    }

    fn report_batch_progress(&self, update: BatchProgressUpdate) {
        if !self.show_batch_stats {
            return;
        }

        log::info!(
            "📁 Batch: {}/{} images ({:.1} images/sec), {} failed - ETA: {}",
            update.stats.items_completed,
            update.stats.items_total,
            update.stats.processing_rate,
            update.stats.items_failed,
            Self::format_eta(update.stats.eta_seconds)
        );
        log::info!(
            "[{}] {}% Overall Progress",
            Self::progress_bar(update.total_progress.progress),
            update.total_progress.progress
        );
    }
}

/// Tracks batch position and timing and feeds a [`ProgressReporter`]
pub struct ProgressTracker {
    reporter: Arc<dyn ProgressReporter>,
    start_time: Instant,
    stats: BatchProcessingStats,
}

impl ProgressTracker {
    /// Start tracking a batch of `total` records
    #[must_use]
    pub fn new(reporter: Arc<dyn ProgressReporter>, total: usize) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            stats: BatchProcessingStats {
                items_total: total,
                ..BatchProcessingStats::default()
            },
        }
    }

    #[must_use]
    pub fn no_op(total: usize) -> Self {
        Self::new(Arc::new(NoOpProgressReporter), total)
    }

    /// Percentage of records already handled
    #[must_use]
    pub fn percentage(&self) -> u8 {
        if self.stats.items_total == 0 {
            return 100;
        }
        ((self.stats.items_completed * 100) / self.stats.items_total).min(100) as u8
    }

    #[must_use]
    pub fn stats(&self) -> &BatchProcessingStats {
        &self.stats
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Report a batch-level stage
    pub fn report_stage(&self, stage: ProcessingStage) {
        let update = ProgressUpdate::new(stage, self.start_time);
        self.reporter.report_progress(update);
    }

    /// A record is about to be sent
    pub fn item_started(&mut self, file_name: &str) {
        self.stats.current_item_name = file_name.to_string();
        let update = ProgressUpdate::with_description(
            ProcessingStage::RecordProcessing,
            format!("Removing background: {}", file_name),
            self.start_time,
        )
        .with_progress(self.percentage());
        self.reporter.report_progress(update);
    }

    pub fn item_completed(&mut self, file_name: &str) {
        self.finish_item(ProcessingStage::RecordCompleted, file_name);
    }

    pub fn item_failed(&mut self, file_name: &str, error: &str) {
        self.stats.items_failed += 1;
        self.reporter
            .report_error(ProcessingStage::RecordFailed, &format!("{}: {}", file_name, error));
        self.finish_item(ProcessingStage::RecordFailed, file_name);
    }

    pub fn item_skipped(&mut self, file_name: &str) {
        self.stats.items_skipped += 1;
        self.finish_item(ProcessingStage::RecordSkipped, file_name);
    }

    fn finish_item(&mut self, stage: ProcessingStage, file_name: &str) {
        self.stats.items_completed += 1;

        let elapsed_secs = self.start_time.elapsed().as_secs_f64();
        if elapsed_secs > 0.0 {
            self.stats.processing_rate = self.stats.items_completed as f64 / elapsed_secs;
        }
        let remaining = self.stats.items_total.saturating_sub(self.stats.items_completed);
        self.stats.eta_seconds = (self.stats.processing_rate > 0.0)
            .then(|| (remaining as f64 / self.stats.processing_rate).round() as u64);

        let mut update = ProgressUpdate::with_description(
            stage,
            format!("{}: {}", stage.description(), file_name),
            self.start_time,
        )
        .with_progress(self.percentage());
        if let Some(eta) = self.stats.eta_seconds {
            update = update.with_eta(eta * 1000);
        }

        self.reporter.report_progress(update.clone());
        self.reporter.report_batch_progress(BatchProgressUpdate {
            total_progress: update,
            stats: self.stats.clone(),
        });
    }

    /// Report the end of the run
    pub fn finish(&self, summary: BatchSummary) {
        self.report_stage(ProcessingStage::Completed);
        self.reporter.report_completion(summary);
    }
}

/// Create appropriate progress reporter based on CLI flags
///
/// # Arguments
/// * `enable_progress` - Whether the --progress flag was set
/// * `verbose` - Whether verbose logging is enabled
/// * `batch_size` - Number of queued records
pub fn create_cli_progress_reporter(
    enable_progress: bool,
    verbose: bool,
    batch_size: usize,
) -> Arc<dyn ProgressReporter> {
    match (enable_progress, batch_size) {
        (false, _) => Arc::new(ConsoleProgressReporter::new(verbose)),
        (true, 0 | 1) => Arc::new(EnhancedProgressReporter::new(false, verbose)),
        (true, _) => Arc::new(EnhancedProgressReporter::new(true, verbose)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Test progress reporter that captures reports for verification
    #[derive(Default)]
    struct TestProgressReporter {
        progress_updates: Mutex<Vec<ProgressUpdate>>,
        batch_updates: Mutex<Vec<BatchProgressUpdate>>,
        completions: Mutex<Vec<BatchSummary>>,
        errors: Mutex<Vec<(ProcessingStage, String)>>,
    }

    impl ProgressReporter for TestProgressReporter {
        fn report_progress(&self, update: ProgressUpdate) {
            self.progress_updates.lock().unwrap().push(update);
        }

        fn report_completion(&self, summary: BatchSummary) {
            self.completions.lock().unwrap().push(summary);
        }

        fn report_error(&self, stage: ProcessingStage, error: &str) {
            self.errors.lock().unwrap().push((stage, error.to_string()));
        }

        fn report_batch_progress(&self, update: BatchProgressUpdate) {
            self.batch_updates.lock().unwrap().push(update);
        }
    }

    #[test]
    fn test_stage_descriptions() {
        assert_eq!(
            ProcessingStage::RecordProcessing.description(),
            "Removing background"
        );
        assert_eq!(ProcessingStage::Completed.description(), "Batch completed");
        assert_eq!(ProcessingStage::Completed.progress_percentage(), 100);
        assert_eq!(ProcessingStage::BatchInitialization.progress_percentage(), 0);
    }

    #[test]
    fn test_progress_update_builders() {
        let update = ProgressUpdate::new(ProcessingStage::RecordProcessing, Instant::now())
            .with_progress(150)
            .with_eta(2500);
        assert_eq!(update.progress, 100);
        assert_eq!(update.eta_ms, Some(2500));
        assert_eq!(update.description, "Removing background");

        let custom = ProgressUpdate::with_description(
            ProcessingStage::RecordSkipped,
            "Skipped a.png".to_string(),
            Instant::now(),
        );
        assert_eq!(custom.description, "Skipped a.png");
        assert!(custom.eta_ms.is_none());
    }

    #[test]
    fn test_tracker_counts_and_reports() {
        let reporter = Arc::new(TestProgressReporter::default());
        let mut tracker = ProgressTracker::new(reporter.clone(), 4);
        assert_eq!(tracker.percentage(), 0);

        tracker.report_stage(ProcessingStage::BatchInitialization);
        tracker.item_started("a.png");
        tracker.item_completed("a.png");
        tracker.item_started("b.png");
        tracker.item_failed("b.png", "Server error 500");
        tracker.item_skipped("c.png");
        assert_eq!(tracker.percentage(), 75);

        let stats = tracker.stats();
        assert_eq!(stats.items_completed, 3);
        assert_eq!(stats.items_failed, 1);
        assert_eq!(stats.items_skipped, 1);
        assert_eq!(stats.current_item_name, "b.png");

        tracker.finish(BatchSummary {
            processed: 1,
            failed: 1,
            skipped: 1,
            elapsed: Duration::from_millis(5),
        });

        let errors = reporter.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, ProcessingStage::RecordFailed);
        assert!(errors[0].1.contains("b.png"));

        let batch_updates = reporter.batch_updates.lock().unwrap();
        assert_eq!(batch_updates.len(), 3);
        assert_eq!(batch_updates[2].total_progress.progress, 75);

        let completions = reporter.completions.lock().unwrap();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].processed, 1);

        let updates = reporter.progress_updates.lock().unwrap();
        assert_eq!(updates.first().unwrap().stage, ProcessingStage::BatchInitialization);
        assert_eq!(updates.last().unwrap().stage, ProcessingStage::Completed);
    }

    #[test]
    fn test_empty_batch_is_complete() {
        let tracker = ProgressTracker::no_op(0);
        assert_eq!(tracker.percentage(), 100);
        assert!(tracker.elapsed_ms() < 1000);
    }

    #[test]
    fn test_enhanced_formatting() {
        assert_eq!(EnhancedProgressReporter::progress_bar(0), "░".repeat(20));
        assert_eq!(EnhancedProgressReporter::progress_bar(100), "█".repeat(20));
        assert_eq!(EnhancedProgressReporter::format_duration(59_000), "59s");
        assert_eq!(EnhancedProgressReporter::format_duration(61_000), "1m 1s");
        assert_eq!(EnhancedProgressReporter::format_eta(None), "calculating...");
        assert_eq!(EnhancedProgressReporter::format_eta(Some(125)), "2m 5s");
    }

    #[test]
    fn test_reporters_accept_all_calls() {
        let summary = BatchSummary::default();
        let reporters: [Arc<dyn ProgressReporter>; 4] = [
            create_cli_progress_reporter(false, true, 3),
            create_cli_progress_reporter(true, false, 1),
            create_cli_progress_reporter(true, true, 5),
            Arc::new(NoOpProgressReporter),
        ];
        for reporter in reporters {
            reporter.report_progress(ProgressUpdate::new(
                ProcessingStage::BatchInitialization,
                Instant::now(),
            ));
            reporter.report_error(ProcessingStage::RecordFailed, "boom");
            reporter.report_completion(summary);
        }
    }
}
