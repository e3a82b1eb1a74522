//! # Scholarly - Portal Library
//!
//! The async half of the Scholarly scholarship portal. Everything here
//! sits on top of `scholarly-core`, which owns the deterministic rules.
//!
//! - `api`: axum router, session guard middleware, JSON types
//! - `cli`: clap commands (`server`, `programs`, `access`, `route`, `draft`)
//! - `config`: TOML config plus `SCHOLARLY_*` environment overrides
//! - `identity`: identity provider trait, demo provider, session context
//! - `notify`: per-user notification centers
//! - `persistence`: async draft stores (in-memory and redb)
//! - `wizard`: `WizardEngine` with autosave, save-and-exit and submit

pub mod api;
pub mod cli;
pub mod config;
pub mod identity;
pub mod notify;
pub mod persistence;
pub mod wizard;
