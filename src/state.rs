//! Queue state and the reducer that evolves it
//!
//! [`StudioState`] is an immutable value. Every change goes through
//! [`StudioState::apply`], which returns a new state or an error and leaves the
//! original untouched, so observers only ever see whole transitions.

use crate::config::{AdjustmentParams, Background, EditingParams, ShadowParams};
use crate::error::{Result, StudioError};
use crate::services::ImageIOService;
use crate::types::{ImageId, ImageRecord, ImageStatus, PreviewRef, SourceFile};
use serde::Serialize;

/// Input alphabet of the queue reducer
#[derive(Debug, Clone)]
pub enum StudioEvent {
    /// Offer files to the queue; non-images are dropped
    Intake(Vec<SourceFile>),
    /// Delete a record
    Remove(ImageId),
    /// Change the current selection
    Select(ImageId),
    /// Empty the queue and reset parameters
    Clear,
    SetBackground(Background),
    /// Use an uploaded image as the background
    SetCustomBackground(SourceFile),
    SetShadow(ShadowParams),
    SetAdjustments(AdjustmentParams),
    /// Batch transition `Uploaded -> Processing`
    BeginProcessing(ImageId),
    /// User transition `Processed | Errored -> Processing`
    BeginReprocess(ImageId),
    /// Remote call succeeded
    Completed { id: ImageId, result: PreviewRef },
    /// Remote call failed
    Failed { id: ImageId, reason: String },
}

impl StudioEvent {
    /// Short name used in logs and transition errors
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Intake(_) => "intake",
            Self::Remove(_) => "remove",
            Self::Select(_) => "select",
            Self::Clear => "clear",
            Self::SetBackground(_) => "set background",
            Self::SetCustomBackground(_) => "set custom background",
            Self::SetShadow(_) => "set shadow",
            Self::SetAdjustments(_) => "set adjustments",
            Self::BeginProcessing(_) => "begin processing",
            Self::BeginReprocess(_) => "begin reprocess",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Number of records per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub uploaded: usize,
    pub processing: usize,
    pub processed: usize,
    pub errored: usize,
}

impl StatusCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.uploaded + self.processing + self.processed + self.errored
    }
}

/// Snapshot of the queue, the selection and the editing parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudioState {
    records: Vec<ImageRecord>,
    selected: Option<ImageId>,
    params: EditingParams,
}

impl StudioState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a specific parameter set instead of the defaults
    #[must_use]
    pub fn with_params(params: EditingParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// Apply one event, producing the next state
    ///
    /// # Errors
    /// - `InvalidIntake` when no offered file is an image
    /// - `InvalidTransition` for status changes the lifecycle forbids
    /// - `InvalidConfig` for out-of-range parameters
    pub fn apply(&self, event: &StudioEvent) -> Result<Self> {
        let mut next = self.clone();

        match event {
            StudioEvent::Intake(files) => next.intake(files)?,
            StudioEvent::Remove(id) => next.remove(*id),
            StudioEvent::Select(id) => {
                if next.record(*id).is_some() {
                    next.selected = Some(*id);
                } else {
                    log::debug!("Ignoring selection of unknown image {}", id);
                }
            },
            StudioEvent::Clear => next = Self::default(),
            StudioEvent::SetBackground(background) => {
                if let Background::Image { name, bytes } = background {
                    if ImageIOService::detect_image_mime(name, None, bytes).is_none() {
                        return Err(StudioError::invalid_intake(format!(
                            "{} is not a valid background image",
                            name
                        )));
                    }
                }
                background.validate()?;
                next.params.background = background.clone();
            },
            StudioEvent::SetCustomBackground(file) => {
                if !file.is_image() {
                    return Err(StudioError::invalid_intake(format!(
                        "{} is not a valid background image",
                        file.name()
                    )));
                }
                next.params.background = Background::Image {
                    name: file.name().to_string(),
                    bytes: file.shared_bytes(),
                };
            },
            StudioEvent::SetShadow(shadow) => {
                shadow.validate()?;
                next.params.shadow = shadow.clone();
            },
            StudioEvent::SetAdjustments(adjustments) => {
                adjustments.validate()?;
                next.params.adjustments = *adjustments;
            },
            StudioEvent::BeginProcessing(id) => {
                next.transition(*id, event.name(), |status| status == ImageStatus::Uploaded)?;
            },
            StudioEvent::BeginReprocess(id) => {
                next.transition(*id, event.name(), ImageStatus::can_reprocess)?;
            },
            StudioEvent::Completed { id, result } => {
                if let Some(record) = next.in_flight_mut(*id, event.name()) {
                    record.mark_processed(result.clone());
                }
            },
            StudioEvent::Failed { id, reason } => {
                if let Some(record) = next.in_flight_mut(*id, event.name()) {
                    record.mark_errored(reason.clone());
                }
            },
        }

        Ok(next)
    }

    fn intake(&mut self, files: &[SourceFile]) -> Result<()> {
        let before = self.records.len();

        for file in files {
            if file.is_image() {
                self.records.push(ImageRecord::new(file.clone()));
            } else {
                log::warn!("Skipping {}: not an image file", file.name());
            }
        }

        if self.records.len() == before {
            return Err(StudioError::invalid_intake(
                "Please upload valid image files (e.g., PNG, JPG).",
            ));
        }

        if self.selected.is_none() {
            self.selected = self.records.get(before).map(ImageRecord::id);
        }

        log::debug!("Queued {} image(s)", self.records.len() - before);
        Ok(())
    }

    fn remove(&mut self, id: ImageId) {
        let before = self.records.len();
        self.records.retain(|record| record.id() != id);

        if self.records.len() == before {
            log::debug!("Ignoring removal of unknown image {}", id);
            return;
        }

        if self.selected == Some(id) {
            self.selected = self.records.first().map(ImageRecord::id);
        }
    }

    /// Move a record to `Processing` if `allowed` accepts its current status
    fn transition(
        &mut self,
        id: ImageId,
        event: &'static str,
        allowed: impl Fn(ImageStatus) -> bool,
    ) -> Result<()> {
        let Some(record) = self.records.iter_mut().find(|r| r.id() == id) else {
            log::debug!("Ignoring '{}' for unknown image {}", event, id);
            return Ok(());
        };

        if !allowed(record.status()) {
            return Err(StudioError::InvalidTransition {
                id,
                from: record.status(),
                event,
            });
        }

        record.mark_processing();
        Ok(())
    }

    /// Record awaiting a completion, if it still exists and is still in flight
    fn in_flight_mut(&mut self, id: ImageId, event: &'static str) -> Option<&mut ImageRecord> {
        let record = self.records.iter_mut().find(|r| r.id() == id);
        match record {
            Some(record) if record.status() == ImageStatus::Processing => Some(record),
            Some(record) => {
                log::debug!(
                    "Ignoring stale '{}' for image {} (status: {})",
                    event,
                    id,
                    record.status()
                );
                None
            },
            None => {
                log::debug!("Ignoring '{}' for removed image {}", event, id);
                None
            },
        }
    }

    /// All records in queue order
    #[must_use]
    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn selected_id(&self) -> Option<ImageId> {
        self.selected
    }

    /// The currently selected record
    #[must_use]
    pub fn current(&self) -> Option<&ImageRecord> {
        self.selected.and_then(|id| self.record(id))
    }

    #[must_use]
    pub fn record(&self, id: ImageId) -> Option<&ImageRecord> {
        self.records.iter().find(|record| record.id() == id)
    }

    #[must_use]
    pub fn params(&self) -> &EditingParams {
        &self.params
    }

    /// Whether a batch run would find any work
    #[must_use]
    pub fn has_processable(&self) -> bool {
        self.records
            .iter()
            .any(|record| record.status() == ImageStatus::Uploaded)
    }

    /// Whether bulk export would contain anything
    #[must_use]
    pub fn has_processed(&self) -> bool {
        self.records
            .iter()
            .any(|record| record.status() == ImageStatus::Processed)
    }

    #[must_use]
    pub fn processing_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.status() == ImageStatus::Processing)
            .count()
    }

    #[must_use]
    pub fn status_counts(&self) -> StatusCounts {
        self.records
            .iter()
            .fold(StatusCounts::default(), |mut counts, record| {
                match record.status() {
                    ImageStatus::Uploaded => counts.uploaded += 1,
                    ImageStatus::Processing => counts.processing += 1,
                    ImageStatus::Processed => counts.processed += 1,
                    ImageStatus::Errored => counts.errored += 1,
                }
                counts
            })
    }

    /// Ids of every record in queue order
    #[must_use]
    pub fn ids(&self) -> Vec<ImageId> {
        self.records.iter().map(ImageRecord::id).collect()
    }

    /// Processed records in queue order
    pub fn processed_records(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records
            .iter()
            .filter(|record| record.status() == ImageStatus::Processed)
    }
}
