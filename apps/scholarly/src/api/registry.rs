//! # Wizard Registry
//!
//! Wizards the server currently holds in memory, keyed by application id.
//!
//! The registry lock is only ever held for map operations; anything that
//! awaits an engine (loading from the store, reading its draft) happens
//! outside it. Slots leave the map when their draft is submitted or when
//! they go unused for longer than the idle timeout. An evicted wizard with
//! unsaved edits gets one last autosave on its way out.

use crate::wizard::{AutosaveHandle, WizardEngine};
use scholarly_core::{ApplicationId, PortalError, UserId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// A wizard opened by one user, with its autosave loop while mounted.
#[derive(Debug)]
pub struct WizardSlot {
    pub owner: UserId,
    pub engine: WizardEngine,
    pub autosave: Option<AutosaveHandle>,
    last_used: Instant,
}

impl WizardSlot {
    pub fn new(owner: UserId, engine: WizardEngine) -> Self {
        Self {
            owner,
            engine,
            autosave: None,
            last_used: Instant::now(),
        }
    }

    fn checkout(&mut self, user: &UserId, id: ApplicationId) -> Result<Checkout, PortalError> {
        if &self.owner != user {
            return Err(PortalError::DraftNotFound(id));
        }
        self.last_used = Instant::now();
        Ok(Checkout {
            engine: self.engine.clone(),
            needs_autosave: self.autosave.is_none(),
        })
    }
}

/// A wizard handed to a request.
#[derive(Debug)]
pub struct Checkout {
    pub engine: WizardEngine,
    /// No autosave loop is mounted for this wizard.
    pub needs_autosave: bool,
}

/// The server's open wizards.
#[derive(Debug)]
pub struct WizardRegistry {
    slots: RwLock<HashMap<ApplicationId, WizardSlot>>,
    idle_timeout: Duration,
}

impl WizardRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// The wizard for `id` if it is loaded. Another user's wizard is
    /// reported as missing.
    pub async fn checkout(
        &self,
        id: ApplicationId,
        user: &UserId,
    ) -> Result<Option<Checkout>, PortalError> {
        let mut slots = self.slots.write().await;
        match slots.get_mut(&id) {
            Some(slot) => slot.checkout(user, id).map(Some),
            None => Ok(None),
        }
    }

    /// Register a freshly loaded wizard. If another request loaded the same
    /// draft first, that wizard wins and `engine` is discarded.
    pub async fn adopt(
        &self,
        owner: UserId,
        engine: WizardEngine,
    ) -> Result<Checkout, PortalError> {
        let id = engine.application_id();
        let mut slots = self.slots.write().await;
        match slots.entry(id) {
            Entry::Occupied(mut entry) => entry.get_mut().checkout(&owner, id),
            Entry::Vacant(entry) => {
                let slot = entry.insert(WizardSlot::new(owner.clone(), engine));
                slot.checkout(&owner, id)
            }
        }
    }

    /// Start the autosave loop of a loaded wizard unless one already runs.
    pub async fn mount_autosave(&self, id: ApplicationId, period: Duration) {
        let mut slots = self.slots.write().await;
        if let Some(slot) = slots.get_mut(&id).filter(|slot| slot.autosave.is_none()) {
            slot.autosave = Some(slot.engine.spawn_autosave(period));
        }
    }

    /// Stop the autosave loop of a wizard the client has left.
    pub async fn close(&self, id: ApplicationId) {
        if let Some(slot) = self.slots.write().await.get_mut(&id) {
            slot.autosave = None;
        }
    }

    /// Unload a wizard. Returns `true` if it was loaded.
    pub async fn remove(&self, id: ApplicationId) -> bool {
        self.slots.write().await.remove(&id).is_some()
    }

    /// Engines of every loaded wizard owned by `user`.
    pub async fn owned_by(&self, user: &UserId) -> Vec<WizardEngine> {
        self.slots
            .read()
            .await
            .values()
            .filter(|slot| &slot.owner == user)
            .map(|slot| slot.engine.clone())
            .collect()
    }

    /// Number of loaded wizards.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Unload every wizard unused for the idle timeout. Evicted wizards
    /// with unsaved edits are autosaved once in the background. Returns the
    /// number evicted.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let evicted: Vec<WizardSlot> = {
            let mut slots = self.slots.write().await;
            let stale: Vec<ApplicationId> = slots
                .iter()
                .filter(|(_, slot)| now.duration_since(slot.last_used) >= self.idle_timeout)
                .map(|(id, _)| *id)
                .collect();
            stale.iter().filter_map(|id| slots.remove(id)).collect()
        };

        for slot in &evicted {
            tracing::debug!(
                event = "wizard_evicted",
                application_id = %slot.engine.application_id(),
                "Idle wizard unloaded"
            );
            let engine = slot.engine.clone();
            tokio::spawn(async move {
                if engine.snapshot().await.is_dirty() {
                    engine.autosave_tick().await;
                }
            });
        }
        evicted.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationCenter;
    use crate::persistence::{DraftStore, InMemoryDraftStore};
    use chrono::NaiveDate;
    use scholarly_core::{ProgramCatalog, ProgramId, SectionId, WizardDraft};
    use std::sync::Arc;

    const IDLE: Duration = Duration::from_secs(1800);

    fn engine(store: &Arc<InMemoryDraftStore>, owner: &str) -> WizardEngine {
        WizardEngine::initialize(
            &ProgramCatalog::demo(),
            &ProgramId::new("1"),
            UserId::new(owner),
            NaiveDate::from_ymd_opt(2026, 10, 16).expect("date"),
            store.clone(),
            Arc::new(NotificationCenter::new(5000)),
        )
        .expect("initialize")
    }

    #[tokio::test]
    async fn checkout_hides_other_owners() {
        let store = Arc::new(InMemoryDraftStore::new());
        let registry = WizardRegistry::new(IDLE);
        let engine = engine(&store, "alice");
        let id = engine.application_id();
        registry.adopt(UserId::new("alice"), engine).await.expect("adopt");

        let hit = registry
            .checkout(id, &UserId::new("alice"))
            .await
            .expect("owner");
        assert!(hit.is_some_and(|c| c.needs_autosave));
        assert_eq!(
            registry.checkout(id, &UserId::new("bob")).await.err(),
            Some(PortalError::DraftNotFound(id))
        );
        assert!(
            registry
                .checkout(ApplicationId::from_u128(1), &UserId::new("alice"))
                .await
                .expect("miss")
                .is_none()
        );
    }

    #[tokio::test]
    async fn first_adopted_wizard_wins() {
        let store = Arc::new(InMemoryDraftStore::new());
        let registry = WizardRegistry::new(IDLE);
        let first = engine(&store, "alice");
        first
            .set_field(SectionId::Personal, "firstName", "Ada")
            .await
            .expect("set");
        let draft = first.snapshot().await;
        registry.adopt(UserId::new("alice"), first).await.expect("adopt");

        let duplicate = WizardEngine::from_draft(
            WizardDraft::new(draft.application_id(), draft.program_id().clone()),
            store.clone(),
            Arc::new(NotificationCenter::new(5000)),
        );
        let checkout = registry
            .adopt(UserId::new("alice"), duplicate)
            .await
            .expect("adopt");
        assert_eq!(
            checkout
                .engine
                .snapshot()
                .await
                .field(SectionId::Personal, "firstName"),
            Some("Ada")
        );
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_wizards_are_flushed_and_unloaded() {
        let store = Arc::new(InMemoryDraftStore::new());
        let registry = WizardRegistry::new(IDLE);
        let idle = engine(&store, "alice");
        let idle_id = idle.application_id();
        idle.set_field(SectionId::Personal, "firstName", "Ada")
            .await
            .expect("set");
        registry.adopt(UserId::new("alice"), idle).await.expect("adopt");

        tokio::time::advance(Duration::from_secs(1000)).await;
        let active = engine(&store, "bob");
        let active_id = active.application_id();
        registry.adopt(UserId::new("bob"), active).await.expect("adopt");

        tokio::time::advance(Duration::from_secs(800)).await;
        assert_eq!(registry.evict_idle().await, 1);
        assert!(
            registry
                .checkout(idle_id, &UserId::new("alice"))
                .await
                .expect("lookup")
                .is_none()
        );
        assert!(
            registry
                .checkout(active_id, &UserId::new("bob"))
                .await
                .expect("lookup")
                .is_some()
        );

        tokio::time::sleep(Duration::from_millis(1)).await;
        let stored = store.load_draft(idle_id).await.expect("flushed");
        assert_eq!(stored.field(SectionId::Personal, "firstName"), Some("Ada"));
    }

    #[tokio::test]
    async fn removed_wizard_stops_autosaving() {
        let store = Arc::new(InMemoryDraftStore::new());
        let registry = WizardRegistry::new(IDLE);
        let engine = engine(&store, "alice");
        let id = engine.application_id();
        registry.adopt(UserId::new("alice"), engine).await.expect("adopt");
        registry.mount_autosave(id, Duration::from_secs(30)).await;

        let hit = registry
            .checkout(id, &UserId::new("alice"))
            .await
            .expect("lookup")
            .expect("loaded");
        assert!(!hit.needs_autosave);

        assert!(registry.remove(id).await);
        assert!(!registry.remove(id).await);
        assert!(registry.is_empty().await);
    }
}
