//! # Draft Persistence
//!
//! The async store the wizard engine saves through, with two backends:
//!
//! - `InMemoryDraftStore`: a map with configurable latency and switchable
//!   failure, for the demo server and tests
//! - `PersistentDraftStore`: the redb-backed store from the core, driven on
//!   the blocking pool
//!
//! A save or submit either lands completely or fails; there is no partial
//! success. Once a draft is stored as submitted, the stored copy is final.

use async_trait::async_trait;
use scholarly_core::{ApplicationId, PortalError, RedbDraftStore, UserId, WizardDraft};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Where drafts go.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Store an in-progress snapshot.
    async fn save_draft(&self, draft: &WizardDraft) -> Result<(), PortalError>;

    /// Store a snapshot already marked submitted.
    async fn submit_draft(&self, draft: &WizardDraft) -> Result<(), PortalError>;

    /// Load a stored draft for resuming.
    async fn load_draft(&self, id: ApplicationId) -> Result<WizardDraft, PortalError>;

    /// Every stored draft belonging to `owner`, in id order.
    async fn drafts_owned_by(&self, owner: &UserId) -> Result<Vec<WizardDraft>, PortalError>;
}

fn ensure_not_final(stored: Option<&WizardDraft>) -> Result<(), PortalError> {
    match stored {
        Some(existing) if existing.is_submitted() => Err(PortalError::DraftSubmitted),
        _ => Ok(()),
    }
}

fn ensure_marked_submitted(draft: &WizardDraft) -> Result<(), PortalError> {
    if draft.is_submitted() {
        Ok(())
    } else {
        Err(PortalError::ValidationFailed(
            "submitted snapshot must carry the submitted status".to_string(),
        ))
    }
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Map-backed store that simulates a remote backend.
#[derive(Debug, Default)]
pub struct InMemoryDraftStore {
    drafts: RwLock<HashMap<ApplicationId, WizardDraft>>,
    save_latency: Duration,
    submit_latency: Duration,
    fail_saves: AtomicBool,
    fail_submits: AtomicBool,
    save_calls: AtomicUsize,
    submit_calls: AtomicUsize,
}

impl InMemoryDraftStore {
    /// A store that answers immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that waits before answering each call.
    pub fn with_latency(save_latency: Duration, submit_latency: Duration) -> Self {
        Self {
            save_latency,
            submit_latency,
            ..Self::default()
        }
    }

    /// Make every following save fail (or succeed again).
    pub fn set_failing_saves(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }

    /// Make every following submit fail (or succeed again).
    pub fn set_failing_submits(&self, failing: bool) {
        self.fail_submits.store(failing, Ordering::SeqCst);
    }

    /// Number of `save_draft` calls received.
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Number of `submit_draft` calls received.
    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    async fn wait(latency: Duration) {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn write(&self, draft: &WizardDraft) -> Result<(), PortalError> {
        let mut drafts = self.drafts.write().unwrap_or_else(|e| e.into_inner());
        ensure_not_final(drafts.get(&draft.application_id()))?;
        drafts.insert(draft.application_id(), draft.clone());
        Ok(())
    }
}

#[async_trait]
impl DraftStore for InMemoryDraftStore {
    async fn save_draft(&self, draft: &WizardDraft) -> Result<(), PortalError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        Self::wait(self.save_latency).await;
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PortalError::PersistenceFailed("save rejected".to_string()));
        }
        self.write(draft)
    }

    async fn submit_draft(&self, draft: &WizardDraft) -> Result<(), PortalError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        Self::wait(self.submit_latency).await;
        if self.fail_submits.load(Ordering::SeqCst) {
            return Err(PortalError::PersistenceFailed("submit rejected".to_string()));
        }
        ensure_marked_submitted(draft)?;
        self.write(draft)
    }

    async fn load_draft(&self, id: ApplicationId) -> Result<WizardDraft, PortalError> {
        let drafts = self.drafts.read().unwrap_or_else(|e| e.into_inner());
        drafts.get(&id).cloned().ok_or(PortalError::DraftNotFound(id))
    }

    async fn drafts_owned_by(&self, owner: &UserId) -> Result<Vec<WizardDraft>, PortalError> {
        let drafts = self.drafts.read().unwrap_or_else(|e| e.into_inner());
        let mut owned: Vec<WizardDraft> = drafts
            .values()
            .filter(|d| d.owner() == Some(owner))
            .cloned()
            .collect();
        owned.sort_by_key(WizardDraft::application_id);
        Ok(owned)
    }
}

// =============================================================================
// PERSISTENT STORE
// =============================================================================

/// redb-backed store. Database calls run on the blocking pool.
#[derive(Debug, Clone)]
pub struct PersistentDraftStore {
    inner: Arc<RedbDraftStore>,
}

impl PersistentDraftStore {
    /// Open or create the draft database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PortalError> {
        let inner = RedbDraftStore::open(path)?;
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, PortalError>
    where
        T: Send + 'static,
        F: FnOnce(&RedbDraftStore) -> Result<T, PortalError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| PortalError::PersistenceFailed(format!("storage task failed: {}", e)))?
    }

    async fn write(&self, draft: &WizardDraft) -> Result<(), PortalError> {
        let draft = draft.clone();
        self.blocking(move |store| store.put_unless_submitted(&draft))
            .await
    }
}

#[async_trait]
impl DraftStore for PersistentDraftStore {
    async fn save_draft(&self, draft: &WizardDraft) -> Result<(), PortalError> {
        self.write(draft).await
    }

    async fn submit_draft(&self, draft: &WizardDraft) -> Result<(), PortalError> {
        ensure_marked_submitted(draft)?;
        self.write(draft).await
    }

    async fn load_draft(&self, id: ApplicationId) -> Result<WizardDraft, PortalError> {
        self.blocking(move |store| store.get(id)?.ok_or(PortalError::DraftNotFound(id)))
            .await
    }

    async fn drafts_owned_by(&self, owner: &UserId) -> Result<Vec<WizardDraft>, PortalError> {
        let owner = owner.clone();
        self.blocking(move |store| store.owned_by(&owner)).await
    }
}

// =============================================================================
// TESTS
// =============================================================================
