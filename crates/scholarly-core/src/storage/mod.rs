//! # Storage Module
//!
//! Durable draft storage.

mod redb_drafts;

pub use redb_drafts::RedbDraftStore;
