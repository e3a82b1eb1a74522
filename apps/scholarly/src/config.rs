//! # Portal Configuration
//!
//! `PortalConfig` is read from an optional TOML file and then adjusted by
//! environment variables:
//!
//! - `SCHOLARLY_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all
//! - `SCHOLARLY_RATE_LIMIT`: Requests per second (0 disables rate limiting)
//! - `SCHOLARLY_AUTOSAVE_SECS`: Wizard autosave period in seconds
//!
//! Missing keys in the file fall back to the defaults below.

use chrono::{NaiveDate, Utc};
use scholarly_core::{
    PortalError, Role,
    primitives::{
        AUTOSAVE_INTERVAL_SECS, DEFAULT_NOTIFICATION_DURATION_MS, SIMULATED_SAVE_LATENCY_MS,
        SIMULATED_SUBMIT_LATENCY_MS,
    },
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Default rate limit in requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Default time an open wizard may sit untouched before the server
/// unloads it (30 minutes).
pub const DEFAULT_WIZARD_IDLE_SECS: u64 = 30 * 60;

// =============================================================================
// DEMO ACCOUNTS
// =============================================================================

/// A sign-in account seeded into the demo identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoAccount {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    #[serde(default = "default_profile_complete")]
    pub profile_complete: bool,
}

fn default_profile_complete() -> bool {
    true
}

impl DemoAccount {
    fn new(email: &str, name: &str, role: Role) -> Self {
        Self {
            email: email.to_string(),
            password: "password".to_string(),
            name: name.to_string(),
            role,
            profile_complete: true,
        }
    }
}

// =============================================================================
// PORTAL CONFIG
// =============================================================================

/// Runtime settings for the server and the wizard engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Seconds between wizard autosaves.
    pub autosave_interval_secs: u64,
    /// Seconds an open wizard may go unused before it is unloaded.
    pub wizard_idle_secs: u64,
    /// Lifetime of a notification when the caller gives none.
    pub notification_duration_ms: u64,
    /// Latency the in-memory draft store adds to a save.
    pub save_latency_ms: u64,
    /// Latency the in-memory draft store adds to a submit.
    pub submit_latency_ms: u64,
    /// Code accepted by the demo identity provider as second factor.
    pub second_factor_code: String,
    /// redb file for drafts. In-memory storage when unset.
    pub draft_database: Option<PathBuf>,
    /// Fixed date for deadline checks. The system date when unset.
    pub today: Option<NaiveDate>,
    /// Requests per second, 0 to disable.
    pub rate_limit: u32,
    /// Raw `SCHOLARLY_CORS_ORIGINS`-style origin list.
    pub cors_origins: Option<String>,
    pub accounts: Vec<DemoAccount>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            autosave_interval_secs: AUTOSAVE_INTERVAL_SECS,
            wizard_idle_secs: DEFAULT_WIZARD_IDLE_SECS,
            notification_duration_ms: DEFAULT_NOTIFICATION_DURATION_MS,
            save_latency_ms: SIMULATED_SAVE_LATENCY_MS,
            submit_latency_ms: SIMULATED_SUBMIT_LATENCY_MS,
            second_factor_code: "123456".to_string(),
            draft_database: None,
            today: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            cors_origins: None,
            accounts: vec![
                DemoAccount::new("user@example.com", "John Doe", Role::Applicant),
                DemoAccount::new("reviewer@example.com", "Riley Reviewer", Role::Reviewer),
                DemoAccount::new("admin@example.com", "Alex Admin", Role::Admin),
                DemoAccount::new("superadmin@example.com", "Sam Superadmin", Role::Superadmin),
            ],
        }
    }
}

impl PortalConfig {
    /// Load a config file, or the defaults when `path` is `None`, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, PortalError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, PortalError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            PortalError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(PortalError::SerializationError(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| PortalError::IoError(format!("Cannot read config: {}", e)))?;
        Self::from_toml(&text)
    }

    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, PortalError> {
        toml::from_str(text)
            .map_err(|e| PortalError::SerializationError(format!("Invalid config: {}", e)))
    }

    /// Overlay the `SCHOLARLY_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        if let Some(origins) = get_cors_origins_from_env() {
            self.cors_origins = Some(origins);
        }
        if let Some(rate) = get_rate_limit_from_env() {
            self.rate_limit = rate;
        }
        if let Some(secs) = get_autosave_secs_from_env() {
            self.autosave_interval_secs = secs;
        }
    }

    /// Autosave period. A zero setting falls back to the default.
    pub fn autosave_interval(&self) -> Duration {
        let secs = if self.autosave_interval_secs == 0 {
            AUTOSAVE_INTERVAL_SECS
        } else {
            self.autosave_interval_secs
        };
        Duration::from_secs(secs)
    }

    /// Idle time after which an open wizard is unloaded. A zero setting
    /// falls back to the default.
    pub fn wizard_idle_timeout(&self) -> Duration {
        let secs = if self.wizard_idle_secs == 0 {
            DEFAULT_WIZARD_IDLE_SECS
        } else {
            self.wizard_idle_secs
        };
        Duration::from_secs(secs)
    }

    pub fn save_latency(&self) -> Duration {
        Duration::from_millis(self.save_latency_ms)
    }

    pub fn submit_latency(&self) -> Duration {
        Duration::from_millis(self.submit_latency_ms)
    }

    /// The date deadline checks run against.
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Returns `SCHOLARLY_CORS_ORIGINS` if set and non-empty.
pub fn get_cors_origins_from_env() -> Option<String> {
    std::env::var("SCHOLARLY_CORS_ORIGINS")
        .ok()
        .filter(|s| !s.trim().is_empty())
}

/// Returns `SCHOLARLY_RATE_LIMIT` if set to a valid number.
pub fn get_rate_limit_from_env() -> Option<u32> {
    std::env::var("SCHOLARLY_RATE_LIMIT")
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

/// Returns `SCHOLARLY_AUTOSAVE_SECS` if set to a valid number.
pub fn get_autosave_secs_from_env() -> Option<u64> {
    std::env::var("SCHOLARLY_AUTOSAVE_SECS")
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

// =============================================================================
// TESTS
// =============================================================================
