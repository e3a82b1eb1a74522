//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState, ProgramJson};
use crate::config::PortalConfig;
use scholarly_core::{
    AccessGuard, ApplicationId, PortalError, ProgramCatalog, ProgramFilter, RedbDraftStore,
    ReviewSummary, Role, RouteTable, Session, SessionState, UserId, can_access,
};
use std::path::{Path, PathBuf};

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    config_path: Option<&Path>,
    database: Option<PathBuf>,
    host: &str,
    port: u16,
) -> Result<(), PortalError> {
    let mut config = PortalConfig::load(config_path)?;
    if database.is_some() {
        config.draft_database = database;
    }

    println!("Scholarly Portal Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:      {}", host);
    println!("  Port:      {}", port);
    println!(
        "  Drafts:    {}",
        config
            .draft_database
            .as_ref()
            .map_or_else(|| "in-memory".to_string(), |p| p.display().to_string())
    );
    println!("  Autosave:  every {}s", config.autosave_interval().as_secs());
    println!("  Today:     {}", config.today());
    println!();
    println!("Endpoints:");
    println!("  GET  /programs            - Scholarship directory");
    println!("  POST /auth/login          - Sign in (then /auth/verify-mfa)");
    println!("  POST /applicant/apply/:id - Start an application");
    println!("  GET  /health              - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::from_config(config)?;
    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state).await
}

// =============================================================================
// PROGRAMS COMMAND
// =============================================================================

/// Search the demo directory.
pub fn cmd_programs(
    config_path: Option<&Path>,
    json_mode: bool,
    query: String,
    level: String,
    field: String,
    country: String,
) -> Result<(), PortalError> {
    let config = PortalConfig::load(config_path)?;
    let today = config.today();
    let catalog = ProgramCatalog::demo();
    let filter = ProgramFilter {
        query,
        level,
        field,
        country,
    };
    let programs: Vec<ProgramJson> = catalog
        .search(&filter)
        .into_iter()
        .map(|p| ProgramJson::from_program(p, today))
        .collect();

    if json_mode {
        print_json(&programs)?;
        return Ok(());
    }

    if programs.is_empty() {
        println!("No scholarships match your search.");
        return Ok(());
    }

    println!("Scholarships ({} found):", programs.len());
    for program in &programs {
        let state = if program.open { "open" } else { "closed" };
        println!();
        println!("  [{}] {}", program.id, program.title);
        println!("      {} | {} | {}", program.level, program.field, program.country);
        println!("      Deadline: {} ({})", program.deadline, state);
        println!("      Funding:  {}", program.funding);
    }
    Ok(())
}

// =============================================================================
// ACCESS COMMAND
// =============================================================================

/// Print the access table, or the verdict for one pair.
pub fn cmd_access(
    json_mode: bool,
    required: Option<Role>,
    actual: Option<Role>,
) -> Result<(), PortalError> {
    let pairs: Vec<(Role, Role)> = match (required, actual) {
        (Some(r), Some(a)) => vec![(r, a)],
        (Some(r), None) => Role::ALL.into_iter().map(|a| (r, a)).collect(),
        (None, Some(a)) => Role::ALL.into_iter().map(|r| (r, a)).collect(),
        (None, None) => Role::ALL
            .into_iter()
            .flat_map(|r| Role::ALL.into_iter().map(move |a| (r, a)))
            .collect(),
    };

    if json_mode {
        let rows: Vec<serde_json::Value> = pairs
            .iter()
            .map(|(r, a)| {
                serde_json::json!({
                    "required": r,
                    "actual": a,
                    "permitted": can_access(*r, *a),
                })
            })
            .collect();
        print_json(&rows)?;
        return Ok(());
    }

    println!("REQUIRED     ACTUAL       ACCESS");
    for (r, a) in pairs {
        let verdict = if can_access(r, a) { "permit" } else { "deny" };
        println!("{:<12} {:<12} {}", r.as_str(), a.as_str(), verdict);
    }
    Ok(())
}

// =============================================================================
// ROUTE COMMAND
// =============================================================================

/// Resolve `path` and run the guard for a session with `role`.
pub fn cmd_route(json_mode: bool, path: &str, role: Option<Role>) -> Result<(), PortalError> {
    let table = RouteTable::default();
    let guard = AccessGuard::new();
    let state = match role {
        Some(role) => SessionState::Authenticated(Session::new(
            UserId::new("cli"),
            "cli@localhost",
            "CLI",
            role,
            true,
        )),
        None => SessionState::Unauthenticated,
    };

    let required = table.required_role(path);
    let outcome = table.check(&guard, path, &state);

    if json_mode {
        print_json(&serde_json::json!({
            "path": path,
            "required_role": required,
            "session_role": role,
            "outcome": outcome,
        }))?;
        return Ok(());
    }

    println!("Path:          {}", path);
    println!(
        "Required role: {}",
        required.map_or("none (public)", |r| r.as_str())
    );
    println!(
        "Session:       {}",
        role.map_or("signed out", |r| r.as_str())
    );
    match outcome.redirect_path() {
        Some(target) => println!("Outcome:       redirect to {}", target),
        None => println!("Outcome:       permit"),
    }
    Ok(())
}

// =============================================================================
// DRAFT COMMAND
// =============================================================================

/// Print one stored draft with its review summary, or list all ids.
pub fn cmd_draft(json_mode: bool, database: &Path, id: Option<&str>) -> Result<(), PortalError> {
    if !database.exists() {
        return Err(PortalError::IoError(format!(
            "Draft database '{}' does not exist",
            database.display()
        )));
    }
    let store = RedbDraftStore::open(database)?;

    let Some(id) = id else {
        let ids = store.ids()?;
        if json_mode {
            let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
            return print_json(&serde_json::json!({ "drafts": ids }));
        }
        println!("{} draft(s) in {}", ids.len(), database.display());
        for id in ids {
            println!("  {}", id);
        }
        return Ok(());
    };

    let id: ApplicationId = id.parse()?;
    let draft = store.get(id)?.ok_or(PortalError::DraftNotFound(id))?;
    print_json(&serde_json::json!({
        "draft": draft,
        "review": ReviewSummary::from_draft(&draft),
    }))
}

// =============================================================================
// HELPERS
// =============================================================================

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), PortalError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| PortalError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
