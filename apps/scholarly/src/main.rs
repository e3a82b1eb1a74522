//! # Scholarly - Scholarship Portal Server
//!
//! The main binary for the Scholarly portal.
//!
//! This application provides:
//! - HTTP JSON API server (axum-based) with role-guarded areas
//! - CLI interface for directory search, access checks and draft inspection
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                apps/scholarly (THE BINARY)               │
//! │                                                          │
//! │  ┌─────────┐   ┌───────────┐   ┌──────────────────────┐  │
//! │  │  CLI    │   │ HTTP API  │   │ WizardEngine         │  │
//! │  │ (clap)  │   │  (axum)   │   │ (autosave, submit)   │  │
//! │  └────┬────┘   └─────┬─────┘   └──────────┬───────────┘  │
//! │       └──────────────┼────────────────────┘              │
//! │                      ▼                                   │
//! │              ┌────────────────┐                          │
//! │              │ scholarly-core │                          │
//! │              │  (THE LOGIC)   │                          │
//! │              └────────────────┘                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! scholarly server --host 0.0.0.0 --port 8080 --database drafts.redb
//!
//! # CLI operations
//! scholarly programs -s engineering
//! scholarly access --required admin
//! scholarly route /admin/users --role reviewer
//! scholarly draft -D drafts.redb
//! ```

use clap::Parser;
use scholarly::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // SCHOLARLY_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("SCHOLARLY_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "scholarly=debug,scholarly_core=debug,tower_http=debug"
    } else {
        "scholarly=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Banner would corrupt JSON output
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Scholarly startup banner.
fn print_banner() {
    println!(
        r#"
  ███████╗ ██████╗██╗  ██╗ ██████╗ ██╗      █████╗ ██████╗ ██╗  ██╗   ██╗
  ██╔════╝██╔════╝██║  ██║██╔═══██╗██║     ██╔══██╗██╔══██╗██║  ╚██╗ ██╔╝
  ███████╗██║     ███████║██║   ██║██║     ███████║██████╔╝██║   ╚████╔╝
  ╚════██║██║     ██╔══██║██║   ██║██║     ██╔══██║██╔══██╗██║    ╚██╔╝
  ███████║╚██████╗██║  ██║╚██████╔╝███████╗██║  ██║██║  ██║███████╗██║
  ╚══════╝ ╚═════╝╚═╝  ╚═╝ ╚═════╝ ╚══════╝╚═╝  ╚═╝╚═╝  ╚═╝╚══════╝╚═╝

  Scholarship Portal v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
