//! # Scholarly CLI Module
//!
//! This module implements the CLI interface for Scholarly.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `programs` - Search the scholarship directory
//! - `access` - Print the role access table, or check one pair
//! - `route` - Resolve a path to its required role and guard outcome
//! - `draft` - Inspect drafts stored in a redb database

mod commands;

use clap::{Parser, Subcommand};
use scholarly_core::{PortalError, Role};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Scholarly - scholarship application portal
///
/// Role-guarded directory, sign-in, and a seven-step application wizard
/// with autosave.
#[derive(Parser, Debug)]
#[command(name = "scholarly")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// redb draft database (overrides the config file)
        #[arg(short = 'D', long)]
        database: Option<PathBuf>,
    },

    /// Search the scholarship directory
    Programs {
        /// Text to find in title or description
        #[arg(short = 's', long, default_value = "")]
        query: String,

        /// Study level filter (e.g. "Graduate")
        #[arg(short, long, default_value = "")]
        level: String,

        /// Field of study filter
        #[arg(short, long, default_value = "")]
        field: String,

        /// Country filter
        #[arg(short = 'C', long, default_value = "")]
        country: String,
    },

    /// Show which roles reach which areas
    Access {
        /// Role the area requires
        #[arg(short, long)]
        required: Option<Role>,

        /// Role the session holds
        #[arg(short, long)]
        actual: Option<Role>,
    },

    /// Resolve a path against the route table
    Route {
        /// Path to resolve, e.g. /admin/users
        path: String,

        /// Session role; omit for a signed-out client
        #[arg(short, long)]
        role: Option<Role>,
    },

    /// Inspect stored drafts
    Draft {
        /// redb draft database
        #[arg(short = 'D', long)]
        database: PathBuf,

        /// Application id; lists all drafts when omitted
        #[arg(short, long)]
        id: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), PortalError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server {
            host,
            port,
            database,
        }) => cmd_server(cli.config.as_deref(), database, &host, port).await,
        Some(Commands::Programs {
            query,
            level,
            field,
            country,
        }) => cmd_programs(cli.config.as_deref(), json_mode, query, level, field, country),
        Some(Commands::Access { required, actual }) => cmd_access(json_mode, required, actual),
        Some(Commands::Route { path, role }) => cmd_route(json_mode, &path, role),
        Some(Commands::Draft { database, id }) => {
            cmd_draft(json_mode, &database, id.as_deref())
        }
        None => {
            // No subcommand - list the directory by default
            cmd_programs(
                cli.config.as_deref(),
                json_mode,
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            )
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
