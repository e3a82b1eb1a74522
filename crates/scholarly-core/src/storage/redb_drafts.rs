//! # redb-backed Draft Storage
//!
//! Stores encoded drafts in a redb embedded database, keyed by the
//! application id's 128-bit value. Every write is one ACID transaction, so a
//! save either lands completely or not at all.

use crate::formats::{draft_from_bytes, draft_to_bytes};
use crate::{ApplicationId, PortalError, UserId, WizardDraft};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for drafts: ApplicationId(u128) -> header + postcard bytes
const DRAFTS: TableDefinition<u128, &[u8]> = TableDefinition::new("drafts");

fn io_err(e: impl std::fmt::Display) -> PortalError {
    PortalError::IoError(e.to_string())
}

/// Disk-backed draft store.
pub struct RedbDraftStore {
    db: Database,
}

impl std::fmt::Debug for RedbDraftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbDraftStore").finish_non_exhaustive()
    }
}

impl RedbDraftStore {
    /// Open or create a draft database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PortalError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(DRAFTS).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Insert or overwrite a draft.
    pub fn put(&self, draft: &WizardDraft) -> Result<(), PortalError> {
        let bytes = draft_to_bytes(draft)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(DRAFTS).map_err(io_err)?;
            table
                .insert(draft.application_id().as_u128(), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    /// Insert or overwrite a draft unless the stored copy is already
    /// submitted.
    ///
    /// The finality check and the insert share one write transaction; redb
    /// serializes writers, so a concurrent submit cannot land in between.
    pub fn put_unless_submitted(&self, draft: &WizardDraft) -> Result<(), PortalError> {
        let bytes = draft_to_bytes(draft)?;
        let key = draft.application_id().as_u128();
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let outcome = {
            let mut table = write_txn.open_table(DRAFTS).map_err(io_err)?;
            let stored_final = match table.get(key).map_err(io_err)? {
                Some(value) => draft_from_bytes(value.value())?.is_submitted(),
                None => false,
            };
            if stored_final {
                Err(PortalError::DraftSubmitted)
            } else {
                table.insert(key, bytes.as_slice()).map_err(io_err)?;
                Ok(())
            }
        };
        match outcome {
            Ok(()) => write_txn.commit().map_err(io_err),
            Err(e) => {
                write_txn.abort().map_err(io_err)?;
                Err(e)
            }
        }
    }

    /// Load a draft, or `None` if no draft has this id.
    pub fn get(&self, id: ApplicationId) -> Result<Option<WizardDraft>, PortalError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(DRAFTS).map_err(io_err)?;
        match table.get(id.as_u128()).map_err(io_err)? {
            Some(value) => draft_from_bytes(value.value()).map(Some),
            None => Ok(None),
        }
    }

    /// Delete a draft. Returns `true` if it existed.
    pub fn remove(&self, id: ApplicationId) -> Result<bool, PortalError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let existed = {
            let mut table = write_txn.open_table(DRAFTS).map_err(io_err)?;
            let removed = table.remove(id.as_u128()).map_err(io_err)?;
            removed.is_some()
        };
        write_txn.commit().map_err(io_err)?;
        Ok(existed)
    }

    /// Ids of every stored draft, in key order.
    pub fn ids(&self) -> Result<Vec<ApplicationId>, PortalError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(DRAFTS).map_err(io_err)?;
        let mut ids = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (key, _) = entry.map_err(io_err)?;
            ids.push(ApplicationId::from_u128(key.value()));
        }
        Ok(ids)
    }

    /// Every stored draft owned by `owner`, in key order.
    pub fn owned_by(&self, owner: &UserId) -> Result<Vec<WizardDraft>, PortalError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(DRAFTS).map_err(io_err)?;
        let mut drafts = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            let draft = draft_from_bytes(value.value())?;
            if draft.owner() == Some(owner) {
                drafts.push(draft);
            }
        }
        Ok(drafts)
    }

    /// Number of stored drafts.
    pub fn count(&self) -> Result<u64, PortalError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(DRAFTS).map_err(io_err)?;
        table.len().map_err(io_err)
    }
}

// =============================================================================
// TESTS
// =============================================================================
