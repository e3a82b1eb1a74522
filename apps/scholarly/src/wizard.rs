//! # Wizard Engine
//!
//! Drives one `WizardDraft` on the tokio runtime: edits, navigation,
//! periodic autosave, save-and-exit and submit.
//!
//! The draft sits behind a `tokio::sync::Mutex`. Persistence works on a
//! snapshot cloned under the lock; the lock is released for the duration
//! of the store call, so edits may continue and are simply not part of the
//! request in flight. Save-and-exit and submit share one in-flight flag: a
//! second call while one is outstanding returns `Ignored` without touching
//! the store. Autosave ticks are not guarded by that flag.

use crate::notify::NotificationSink;
use crate::persistence::DraftStore;
use chrono::{NaiveDate, Utc};
use scholarly_core::access::APPLICANT_DASHBOARD_PATH;
use scholarly_core::{
    ApplicationId, Attachment, AttachmentSlot, NotificationKind, PortalError, ProgramCatalog,
    ProgramId, ReviewSummary, SectionId, UserId, WizardDraft, wizard,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

pub const SAVED_MESSAGE: &str = "Your application has been saved. You can continue later.";
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save your application. Please try again.";
pub const SUBMITTED_MESSAGE: &str = "Your application has been submitted successfully!";
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to submit your application. Please try again.";

/// What the caller should do after a save-and-exit or submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "path", rename_all = "snake_case")]
pub enum WizardOutcome {
    /// Leave the wizard for `path`.
    NavigateTo(String),
    /// Stay on the current step; the draft is unchanged.
    Stay,
    /// Another save or submit was already in flight; nothing happened.
    Ignored,
}

/// Result of one autosave tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveResult {
    Saved,
    Failed,
    /// The draft is submitted; there is nothing left to save.
    Finished,
}

#[derive(Debug)]
struct WizardState {
    draft: WizardDraft,
    in_flight: bool,
}

/// Async driver of one application draft.
#[derive(Clone)]
pub struct WizardEngine {
    id: ApplicationId,
    state: Arc<Mutex<WizardState>>,
    store: Arc<dyn DraftStore>,
    notifications: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for WizardEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardEngine")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl WizardEngine {
    // =========================================================================
    // SETUP
    // =========================================================================

    /// Start a fresh draft for `program_id` under a new application id.
    ///
    /// Fails with `ProgramUnavailable` for unknown or closed programs.
    pub fn initialize(
        catalog: &ProgramCatalog,
        program_id: &ProgramId,
        owner: UserId,
        today: NaiveDate,
        store: Arc<dyn DraftStore>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Result<Self, PortalError> {
        let id = ApplicationId(Uuid::new_v4());
        let draft = wizard::initialize(catalog, program_id, id, today)?.with_owner(owner.clone());
        tracing::info!(
            event = "draft_started",
            application_id = %id,
            program_id = %program_id,
            owner = %owner,
            "Application draft started"
        );
        Ok(Self::from_draft(draft, store, notifications))
    }

    /// Reload a stored draft; it continues at its saved step.
    pub async fn resume(
        id: ApplicationId,
        store: Arc<dyn DraftStore>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Result<Self, PortalError> {
        let draft = store.load_draft(id).await?;
        tracing::info!(
            event = "draft_resumed",
            application_id = %id,
            step = draft.current_step_index(),
            "Application draft resumed"
        );
        Ok(Self::from_draft(draft, store, notifications))
    }

    /// Wrap an existing draft.
    pub fn from_draft(
        draft: WizardDraft,
        store: Arc<dyn DraftStore>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            id: draft.application_id(),
            state: Arc::new(Mutex::new(WizardState {
                draft,
                in_flight: false,
            })),
            store,
            notifications,
        }
    }

    pub fn application_id(&self) -> ApplicationId {
        self.id
    }

    /// Applicant recorded on the draft, if any.
    pub async fn owner(&self) -> Option<UserId> {
        self.state.lock().await.draft.owner().cloned()
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// A copy of the current draft.
    pub async fn snapshot(&self) -> WizardDraft {
        self.state.lock().await.draft.clone()
    }

    pub async fn review(&self) -> ReviewSummary {
        ReviewSummary::from_draft(&self.state.lock().await.draft)
    }

    /// Returns `true` while a save-and-exit or submit is outstanding.
    pub async fn is_busy(&self) -> bool {
        self.state.lock().await.in_flight
    }

    pub async fn is_submitted(&self) -> bool {
        self.state.lock().await.draft.is_submitted()
    }

    // =========================================================================
    // EDITS & NAVIGATION
    // =========================================================================

    pub async fn set_field(
        &self,
        section: SectionId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), PortalError> {
        self.state.lock().await.draft.set_field(section, key, value)
    }

    pub async fn set_attachment(
        &self,
        slot: AttachmentSlot,
        attachment: Attachment,
    ) -> Result<(), PortalError> {
        self.state.lock().await.draft.set_attachment(slot, attachment)
    }

    pub async fn set_certified(&self, certified: bool) -> Result<(), PortalError> {
        self.state.lock().await.draft.set_certified(certified)
    }

    /// Advance one step. Returns the resulting index.
    pub async fn go_next(&self) -> usize {
        let mut state = self.state.lock().await;
        state.draft.go_next();
        state.draft.current_step_index()
    }

    /// Go back one step. Returns the resulting index.
    pub async fn go_previous(&self) -> usize {
        let mut state = self.state.lock().await;
        state.draft.go_previous();
        state.draft.current_step_index()
    }

    pub async fn jump_to(&self, index: usize) -> Result<usize, PortalError> {
        let mut state = self.state.lock().await;
        state.draft.jump_to(index)?;
        Ok(state.draft.current_step_index())
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Save a snapshot in the background. Failures are logged, never shown.
    pub async fn autosave_tick(&self) -> AutosaveResult {
        let snapshot = {
            let state = self.state.lock().await;
            if state.draft.is_submitted() {
                return AutosaveResult::Finished;
            }
            saved_snapshot(&state.draft)
        };

        match self.store.save_draft(&snapshot).await {
            Ok(()) => {
                let mut state = self.state.lock().await;
                mark_saved_from(&mut state.draft, &snapshot);
                tracing::debug!(
                    event = "autosave",
                    application_id = %self.id,
                    revision = snapshot.revision(),
                    "Draft autosaved"
                );
                AutosaveResult::Saved
            }
            Err(e) => {
                tracing::warn!(
                    event = "autosave_failed",
                    application_id = %self.id,
                    error = %e,
                    "Autosave failed"
                );
                AutosaveResult::Failed
            }
        }
    }

    /// Persist the draft and leave the wizard on success.
    ///
    /// The store call and its bookkeeping run on their own task, so a caller
    /// that goes away mid-save does not leave the engine busy.
    pub async fn save_and_exit(&self) -> WizardOutcome {
        let snapshot = {
            let mut state = self.state.lock().await;
            if state.in_flight {
                return WizardOutcome::Ignored;
            }
            if state.draft.is_submitted() {
                return WizardOutcome::NavigateTo(APPLICANT_DASHBOARD_PATH.to_string());
            }
            state.in_flight = true;
            saved_snapshot(&state.draft)
        };

        let engine = self.clone();
        let task = tokio::spawn(async move {
            let result = engine.store.save_draft(&snapshot).await;
            engine.finish_save(&snapshot, result).await
        });
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.release_after_join_error(&e).await;
                WizardOutcome::Stay
            }
        }
    }

    async fn finish_save(
        &self,
        snapshot: &WizardDraft,
        result: Result<(), PortalError>,
    ) -> WizardOutcome {
        let mut state = self.state.lock().await;
        state.in_flight = false;
        match result {
            Ok(()) => {
                mark_saved_from(&mut state.draft, snapshot);
                tracing::info!(event = "draft_saved", application_id = %self.id, "Draft saved");
                self.notifications
                    .notify(NotificationKind::Success, SAVED_MESSAGE, None);
                WizardOutcome::NavigateTo(APPLICANT_DASHBOARD_PATH.to_string())
            }
            Err(e) => {
                tracing::warn!(
                    event = "save_failed",
                    application_id = %self.id,
                    error = %e,
                    "Save and exit failed"
                );
                self.notifications
                    .notify(NotificationKind::Error, SAVE_FAILED_MESSAGE, None);
                WizardOutcome::Stay
            }
        }
    }

    /// Submit the application from the review step.
    ///
    /// Returns `SubmitNotAllowed` before the last step and `DraftSubmitted`
    /// after a successful submit; neither reaches the store. A failed store
    /// call leaves the draft in progress and editable. On success the live
    /// draft becomes exactly the copy that was stored; edits made while the
    /// request was outstanding are discarded.
    pub async fn submit(&self) -> Result<WizardOutcome, PortalError> {
        let snapshot = {
            let mut state = self.state.lock().await;
            if state.in_flight {
                return Ok(WizardOutcome::Ignored);
            }
            state.draft.ensure_submittable()?;
            state.in_flight = true;
            let mut snapshot = state.draft.clone();
            snapshot.mark_submitted(Utc::now());
            snapshot
        };

        let engine = self.clone();
        let task = tokio::spawn(async move {
            let result = engine.store.submit_draft(&snapshot).await;
            engine.finish_submit(snapshot, result).await
        });
        match task.await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.release_after_join_error(&e).await;
                Ok(WizardOutcome::Stay)
            }
        }
    }

    async fn finish_submit(
        &self,
        snapshot: WizardDraft,
        result: Result<(), PortalError>,
    ) -> WizardOutcome {
        let mut state = self.state.lock().await;
        state.in_flight = false;
        match result {
            Ok(()) => {
                state.draft = snapshot;
                tracing::info!(
                    event = "application_submitted",
                    application_id = %self.id,
                    program_id = %state.draft.program_id(),
                    "Application submitted"
                );
                self.notifications
                    .notify(NotificationKind::Success, SUBMITTED_MESSAGE, None);
                WizardOutcome::NavigateTo(APPLICANT_DASHBOARD_PATH.to_string())
            }
            Err(e) => {
                tracing::warn!(
                    event = "submit_failed",
                    application_id = %self.id,
                    error = %e,
                    "Submit failed"
                );
                self.notifications
                    .notify(NotificationKind::Error, SUBMIT_FAILED_MESSAGE, None);
                WizardOutcome::Stay
            }
        }
    }

    /// The persistence task panicked or was cancelled before finishing.
    async fn release_after_join_error(&self, error: &tokio::task::JoinError) {
        self.state.lock().await.in_flight = false;
        tracing::error!(
            event = "persistence_task_failed",
            application_id = %self.id,
            error = %error,
            "Persistence task did not complete"
        );
    }

    // =========================================================================
    // AUTOSAVE LOOP
    // =========================================================================

    /// Run `autosave_tick` every `period` until the handle is dropped or
    /// the draft is submitted. The first save happens one period in.
    pub fn spawn_autosave(&self, period: Duration) -> AutosaveHandle {
        let engine = self.clone();
        let period = period.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if engine.autosave_tick().await == AutosaveResult::Finished {
                    break;
                }
            }
        });
        AutosaveHandle { task }
    }
}

/// Copy of `draft` stamped as saved now, ready to hand to the store.
fn saved_snapshot(draft: &WizardDraft) -> WizardDraft {
    let mut snapshot = draft.clone();
    snapshot.mark_saved(Utc::now(), snapshot.revision());
    snapshot
}

/// Record on the live draft that `snapshot` reached the store.
fn mark_saved_from(draft: &mut WizardDraft, snapshot: &WizardDraft) {
    let at = snapshot.last_saved_at().unwrap_or_else(Utc::now);
    draft.mark_saved(at, snapshot.revision());
}

/// Owner of a running autosave loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct AutosaveHandle {
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// TESTS
// =============================================================================
