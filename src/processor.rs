//! Batch processing controller
//!
//! Drains `Uploaded` records through the removal service one at a time.
//! Parameters and the list of eligible records are snapshotted when a run
//! starts; records removed or changed in the meantime are skipped.

use crate::client::{RemovalClient, RemovalRequest};
use crate::config::EditingParams;
use crate::error::Result;
use crate::services::{NoOpProgressReporter, ProcessingStage, ProgressReporter, ProgressTracker};
use crate::state::StudioEvent;
use crate::store::StudioStore;
use crate::tracing_config::{events, spans};
use crate::types::{ImageId, ImageRecord, ImageStatus};
use instant::Instant;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Outcome counts of a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Records that received a result
    pub processed: usize,
    /// Records that ended up errored
    pub failed: usize,
    /// Records removed or changed before (or while) their turn came
    pub skipped: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Number of records the run looked at
    #[must_use]
    pub fn total(&self) -> usize {
        self.processed + self.failed + self.skipped
    }
}

/// Terminal result of one remote call as seen by the store
enum RecordOutcome {
    Processed,
    Failed,
    /// The record vanished while its call was outstanding
    Gone,
}

/// Sequential batch controller over a shared [`StudioStore`]
pub struct BatchProcessor {
    store: Arc<StudioStore>,
    client: Arc<dyn RemovalClient>,
    reporter: Arc<dyn ProgressReporter>,
}

impl BatchProcessor {
    pub fn new(store: Arc<StudioStore>, client: Arc<dyn RemovalClient>) -> Self {
        Self {
            store,
            client,
            reporter: Arc::new(NoOpProgressReporter),
        }
    }

    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<StudioStore> {
        &self.store
    }

    /// Whether a batch run or re-process is in progress on the shared store
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.store.is_running()
    }

    /// Process every record that is `Uploaded` when the run starts
    ///
    /// Remote failures mark the record as errored and the run continues.
    ///
    /// # Errors
    /// - `Busy` when another run or re-process is active on the same store,
    ///   from this or any other controller
    pub async fn run_batch(&self) -> Result<BatchSummary> {
        let _guard = self.store.begin_run()?;
        let start = Instant::now();

        let snapshot = self.store.snapshot();
        let params = snapshot.params().clone();
        let ids: Vec<ImageId> = snapshot
            .records()
            .iter()
            .filter(|record| record.status() == ImageStatus::Uploaded)
            .map(ImageRecord::id)
            .collect();
        drop(snapshot);

        let span = spans::batch_processing(ids.len());
        async move {
            let mut tracker = ProgressTracker::new(Arc::clone(&self.reporter), ids.len());
            tracker.report_stage(ProcessingStage::BatchInitialization);
            tracing::info!(records = ids.len(), endpoint = %self.client.endpoint(), "Starting batch");

            let mut summary = BatchSummary::default();
            for id in ids {
                let Some(record) = self.begin(id) else {
                    tracing::debug!(record_id = %id, "Skipping record no longer waiting");
                    summary.skipped += 1;
                    tracker.item_skipped(&id.to_string());
                    continue;
                };

                match self.process_record(&record, &params, &mut tracker).await {
                    RecordOutcome::Processed => summary.processed += 1,
                    RecordOutcome::Failed => summary.failed += 1,
                    RecordOutcome::Gone => summary.skipped += 1,
                }

                tokio::task::yield_now().await;
            }

            tracker.report_stage(ProcessingStage::BatchFinalization);
            summary.elapsed = start.elapsed();
            events::performance_metric("batch", summary.elapsed.as_millis() as u64);
            tracing::info!(
                processed = summary.processed,
                failed = summary.failed,
                skipped = summary.skipped,
                "Batch finished"
            );
            tracker.finish(summary);
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Send a single `Processed` or `Errored` record again with the current parameters
    ///
    /// Returns the record's final status, or `None` if the id is unknown or the
    /// record was removed before its result arrived.
    ///
    /// # Errors
    /// - `Busy` when a batch run or another re-process is active
    /// - `InvalidTransition` when the record is `Uploaded` or `Processing`
    pub async fn reprocess(&self, id: ImageId) -> Result<Option<ImageStatus>> {
        let _guard = self.store.begin_run()?;
        let params = self.store.snapshot().params().clone();

        let state = self.store.dispatch(StudioEvent::BeginReprocess(id))?;
        let Some(record) = state
            .record(id)
            .filter(|record| record.status() == ImageStatus::Processing)
            .cloned()
        else {
            log::debug!("Ignoring re-process of unknown image {}", id);
            return Ok(None);
        };
        drop(state);

        let mut tracker = ProgressTracker::new(Arc::clone(&self.reporter), 1);
        let outcome = self.process_record(&record, &params, &mut tracker).await;

        Ok(match outcome {
            RecordOutcome::Processed => Some(ImageStatus::Processed),
            RecordOutcome::Failed => Some(ImageStatus::Errored),
            RecordOutcome::Gone => None,
        })
    }

    /// Move a record to `Processing` and return it if it is now in flight
    fn begin(&self, id: ImageId) -> Option<ImageRecord> {
        match self.store.dispatch(StudioEvent::BeginProcessing(id)) {
            Ok(state) => state
                .record(id)
                .filter(|record| record.status() == ImageStatus::Processing)
                .cloned(),
            Err(e) => {
                tracing::debug!(record_id = %id, error = %e, "Record cannot start processing");
                None
            },
        }
    }

    /// Send one in-flight record and store its terminal status
    async fn process_record(
        &self,
        record: &ImageRecord,
        params: &EditingParams,
        tracker: &mut ProgressTracker,
    ) -> RecordOutcome {
        let id = record.id();
        let file_name = record.file_name().to_string();
        let span = spans::record_processing(&id.to_string(), &file_name);

        async move {
            tracker.item_started(&file_name);

            let request = RemovalRequest::new(record, params);
            let (event, failure) = match self.client.remove_background(request).await {
                Ok(result) => {
                    tracing::debug!(
                        record_id = %id,
                        bytes = result.len(),
                        dimensions = ?result.dimensions(),
                        "Received result"
                    );
                    (StudioEvent::Completed { id, result }, None)
                },
                Err(e) => {
                    if e.is_remote() {
                        tracing::warn!(file = %file_name, error = %e, "Background removal failed");
                    } else {
                        events::error_with_context(&e, &file_name);
                    }
                    let reason = e.to_string();
                    (
                        StudioEvent::Failed {
                            id,
                            reason: reason.clone(),
                        },
                        Some(reason),
                    )
                },
            };

            self.store.dispatch_logged(event);
            let live_status = self
                .store
                .snapshot()
                .record(id)
                .map(ImageRecord::status);

            match (live_status, failure) {
                (Some(ImageStatus::Processed), _) => {
                    events::status_change(&file_name, "processing", "processed");
                    tracker.item_completed(&file_name);
                    RecordOutcome::Processed
                },
                (Some(ImageStatus::Errored), Some(reason)) => {
                    events::status_change(&file_name, "processing", "errored");
                    tracker.item_failed(&file_name, &reason);
                    RecordOutcome::Failed
                },
                _ => {
                    tracing::debug!(record_id = %id, "Record removed while its request was outstanding");
                    tracker.item_skipped(&file_name);
                    RecordOutcome::Gone
                },
            }
        }
        .instrument(span)
        .await
    }
}
