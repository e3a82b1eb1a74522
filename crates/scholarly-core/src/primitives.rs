//! # Portal Primitives
//!
//! Hardcoded runtime constants for the Scholarly core.
//!
//! These are compiled into the binary. The app layer may override the
//! timing values from configuration; the format and limit values are fixed.

// =============================================================================
// TIMING DEFAULTS
// =============================================================================

/// Interval between background draft saves while a wizard is open.
pub const AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// How long a notification stays visible when no duration is given.
pub const DEFAULT_NOTIFICATION_DURATION_MS: u64 = 5000;

/// Simulated latency of an explicit "save & exit".
pub const SIMULATED_SAVE_LATENCY_MS: u64 = 1000;

/// Simulated latency of the final submit.
pub const SIMULATED_SUBMIT_LATENCY_MS: u64 = 2000;

// =============================================================================
// DRAFT FORMAT
// =============================================================================

/// Magic bytes for the draft binary format header.
///
/// - Header = Magic Bytes ("SCHL") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"SCHL";

/// Current draft serialization format version.
///
/// Increment this when making breaking changes to `WizardDraft`.
pub const FORMAT_VERSION: u8 = 2;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a single field value in bytes.
///
/// Enforced at the input boundary only; the wizard stores whatever it is given.
pub const MAX_FIELD_VALUE_LENGTH: usize = 65536;

/// Maximum length of a field key in bytes.
pub const MAX_FIELD_KEY_LENGTH: usize = 128;

/// Maximum length of an attached file name.
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Maximum accepted attachment size (10 MB per file).
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"SCHL");
    }

    #[test]
    fn autosave_runs_every_thirty_seconds() {
        assert_eq!(AUTOSAVE_INTERVAL_SECS, 30);
    }
}
