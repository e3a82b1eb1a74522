//! # Core Type Definitions
//!
//! This module contains the shared types of the Scholarly portal logic:
//! - Identifiers (`UserId`, `ProgramId`, `ApplicationId`)
//! - The closed role set (`Role`)
//! - Attachment modelling (`AttachmentSlot`, `Attachment`, `FileRef`)
//! - Error types (`PortalError`)
//!
//! ## Determinism Guarantees
//!
//! All keyed types implement `Ord` so they can live in `BTreeMap`/`BTreeSet`
//! and serialize in a stable order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Create a new user id.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a scholarship program in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub String);

impl ProgramId {
    /// Create a new program id.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one application draft.
///
/// The core never generates these itself; the caller supplies a fresh id
/// when starting a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub Uuid);

impl ApplicationId {
    /// Get the raw 128-bit value (used as a storage key).
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0.as_u128()
    }

    /// Rebuild an id from its raw 128-bit value.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ApplicationId {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| PortalError::ValidationFailed(format!("Invalid application id: {}", e)))
    }
}

// =============================================================================
// ROLES
// =============================================================================

/// The closed set of portal roles.
///
/// Seniority between roles is defined by the rank table in
/// [`crate::access`], not by the declaration order here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Applicant,
    Reviewer,
    Admin,
    Superadmin,
}

impl Role {
    /// Every role, in rank order.
    pub const ALL: [Role; 4] = [Role::Applicant, Role::Reviewer, Role::Admin, Role::Superadmin];

    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Applicant => "applicant",
            Role::Reviewer => "reviewer",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "applicant" => Ok(Role::Applicant),
            "reviewer" => Ok(Role::Reviewer),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::Superadmin),
            other => Err(PortalError::ValidationFailed(format!(
                "Unknown role: {}",
                other
            ))),
        }
    }
}

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// A named attachment position in the documents step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttachmentSlot {
    Transcripts,
    IdDocument,
    RecommendationLetters,
    AdditionalDocuments,
}

impl AttachmentSlot {
    /// Every slot, in display order.
    pub const ALL: [AttachmentSlot; 4] = [
        AttachmentSlot::Transcripts,
        AttachmentSlot::IdDocument,
        AttachmentSlot::RecommendationLetters,
        AttachmentSlot::AdditionalDocuments,
    ];

    /// Whether the review step flags this slot when empty.
    #[must_use]
    pub const fn is_required(self) -> bool {
        !matches!(self, AttachmentSlot::AdditionalDocuments)
    }

    /// Wire name of the slot.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AttachmentSlot::Transcripts => "transcripts",
            AttachmentSlot::IdDocument => "idDocument",
            AttachmentSlot::RecommendationLetters => "recommendationLetters",
            AttachmentSlot::AdditionalDocuments => "additionalDocuments",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            AttachmentSlot::Transcripts => "Academic Transcripts",
            AttachmentSlot::IdDocument => "ID Document",
            AttachmentSlot::RecommendationLetters => "Recommendation Letters",
            AttachmentSlot::AdditionalDocuments => "Additional Documents",
        }
    }
}

impl fmt::Display for AttachmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttachmentSlot {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttachmentSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| PortalError::ValidationFailed(format!("Unknown attachment slot: {}", s)))
    }
}

/// Reference to a file selected by the applicant.
///
/// The portal tracks metadata only; file bytes never enter the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub size_bytes: u64,
    pub content_type: String,
}

impl FileRef {
    /// Create a new file reference.
    #[must_use]
    pub fn new(name: impl Into<String>, size_bytes: u64, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            content_type: content_type.into(),
        }
    }
}

/// Contents of one attachment slot: present with exactly one file, or absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attachment {
    #[default]
    Absent,
    Present(FileRef),
}

impl Attachment {
    /// Returns `true` if a file is attached.
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Attachment::Present(_))
    }

    /// The attached file, if any.
    #[must_use]
    pub fn file(&self) -> Option<&FileRef> {
        match self {
            Attachment::Present(file) => Some(file),
            Attachment::Absent => None,
        }
    }
}

impl From<Option<FileRef>> for Attachment {
    fn from(file: Option<FileRef>) -> Self {
        file.map_or(Attachment::Absent, Attachment::Present)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Scholarly portal logic.
///
/// Denied access is not an error: the guard reports it as a navigation
/// directive (see [`crate::access::GuardOutcome`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortalError {
    /// Credentials or the second-factor code were rejected.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// The pending login or the session no longer exists.
    #[error("Session expired")]
    SessionExpired,

    /// The program does not exist or its deadline has passed.
    #[error("Program unavailable: {0}")]
    ProgramUnavailable(ProgramId),

    /// A draft save or submit did not complete.
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    /// Input rejected at a boundary. The wizard itself never raises this
    /// for missing required fields.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A direct step jump targeted an index outside the step sequence.
    #[error("Invalid step index: {0}")]
    InvalidStep(usize),

    /// Submit was requested before reaching the review step.
    #[error("Submit is only allowed from the review step")]
    SubmitNotAllowed,

    /// The draft is already submitted and can no longer change.
    #[error("Application already submitted")]
    DraftSubmitted,

    /// No draft exists with this id.
    #[error("Draft not found: {0}")]
    DraftNotFound(ApplicationId),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!("Admin".parse::<Role>().expect("parse"), Role::Admin);
        assert_eq!(" superadmin ".parse::<Role>().expect("parse"), Role::Superadmin);
        assert!("guest".parse::<Role>().is_err());
    }

    #[test]
    fn role_display_matches_wire_name() {
        for role in Role::ALL {
            assert_eq!(role.to_string(), role.as_str());
            assert_eq!(role.as_str().parse::<Role>().expect("parse"), role);
        }
    }

    #[test]
    fn additional_documents_slot_is_optional() {
        let required: Vec<_> = AttachmentSlot::ALL
            .into_iter()
            .filter(|slot| slot.is_required())
            .collect();
        assert_eq!(
            required,
            vec![
                AttachmentSlot::Transcripts,
                AttachmentSlot::IdDocument,
                AttachmentSlot::RecommendationLetters
            ]
        );
    }

    #[test]
    fn attachment_from_option() {
        assert_eq!(Attachment::from(None), Attachment::Absent);
        let file = FileRef::new("t.pdf", 10, "application/pdf");
        let attachment = Attachment::from(Some(file.clone()));
        assert!(attachment.is_present());
        assert_eq!(attachment.file(), Some(&file));
    }

    #[test]
    fn application_id_u128_round_trip() {
        let id = ApplicationId::from_u128(42);
        assert_eq!(ApplicationId::from_u128(id.as_u128()), id);
        assert_eq!(id.to_string().parse::<ApplicationId>().expect("parse"), id);
    }
}
