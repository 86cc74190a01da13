//! Shared owner of the queue state
//!
//! The store serializes every mutation through one lock and publishes the
//! resulting snapshot on a `watch` channel. The lock is only ever held for a
//! single reducer application and never across an `.await`. The store also
//! owns the run flag, so every batch controller sharing it is serialized.

use crate::config::EditingParams;
use crate::error::{Result, StudioError};
use crate::state::{StudioEvent, StudioState};
use crate::types::{ImageId, SourceFile};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

/// Thread-safe queue store with snapshot subscriptions
#[derive(Debug)]
pub struct StudioStore {
    state: Mutex<StudioState>,
    snapshots: watch::Sender<StudioState>,
    running: AtomicBool,
}

/// Clears the run flag when a run ends, including early returns
#[derive(Debug)]
pub(crate) struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for StudioStore {
    fn default() -> Self {
        Self::new(StudioState::default())
    }
}

impl StudioStore {
    #[must_use]
    pub fn new(initial: StudioState) -> Self {
        let (snapshots, _) = watch::channel(initial.clone());
        Self {
            state: Mutex::new(initial),
            snapshots,
            running: AtomicBool::new(false),
        }
    }

    /// Create a store with an empty queue and the given parameters
    #[must_use]
    pub fn with_params(params: EditingParams) -> Self {
        Self::new(StudioState::with_params(params))
    }

    fn lock(&self) -> MutexGuard<'_, StudioState> {
        // The next state is built before it is stored, so a poisoned lock still holds a whole state
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Apply an event and publish the resulting snapshot
    ///
    /// On error the state is unchanged and nothing is published.
    pub fn dispatch(&self, event: StudioEvent) -> Result<StudioState> {
        let mut guard = self.lock();
        let next = guard.apply(&event)?;
        *guard = next.clone();
        self.snapshots.send_replace(next.clone());
        drop(guard);

        tracing::trace!(event = event.name(), records = next.len(), "State updated");
        Ok(next)
    }

    /// Offer files to the queue, returning the ids of the accepted records
    ///
    /// # Errors
    /// - `InvalidIntake` when none of the files is an image
    pub fn intake(&self, files: Vec<SourceFile>) -> Result<Vec<ImageId>> {
        let offered = files.len();
        let mut guard = self.lock();
        let before = guard.len();
        let next = guard.apply(&StudioEvent::Intake(files))?;
        let accepted: Vec<ImageId> = next
            .records()
            .get(before..)
            .unwrap_or_default()
            .iter()
            .map(crate::types::ImageRecord::id)
            .collect();
        *guard = next.clone();
        self.snapshots.send_replace(next);
        drop(guard);

        log::info!("Accepted {} of {} file(s) into the queue", accepted.len(), offered);
        Ok(accepted)
    }

    /// Current state snapshot
    #[must_use]
    pub fn snapshot(&self) -> StudioState {
        self.lock().clone()
    }

    /// Subscribe to state snapshots published after every mutation
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StudioState> {
        self.snapshots.subscribe()
    }

    /// Whether a batch run or re-process holds this store
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Claim the store for a batch run or re-process
    ///
    /// # Errors
    /// - `Busy` when another controller already holds it
    pub(crate) fn begin_run(&self) -> Result<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| RunGuard(&self.running))
            .map_err(|_| StudioError::Busy)
    }

    /// Dispatch an event that must not fail, logging if it does
    pub(crate) fn dispatch_logged(&self, event: StudioEvent) {
        let name = event.name();
        if let Err(e) = self.dispatch(event) {
            log::warn!("Dropped '{}' event: {}", name, e);
        }
    }
}
