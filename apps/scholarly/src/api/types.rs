//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use chrono::{DateTime, NaiveDate, Utc};
use scholarly_core::{
    Attachment, AttachmentSlot, DraftStatus, FileRef, PortalError, Program, ProgramFilter,
    STEP_COUNT, STEPS, SectionId, Session, WizardDraft,
    primitives::{
        MAX_ATTACHMENT_BYTES, MAX_FIELD_KEY_LENGTH, MAX_FIELD_VALUE_LENGTH, MAX_FILE_NAME_LENGTH,
    },
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// HEALTH & ERRORS
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of a guard denial: where the client should go next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectResponse {
    pub redirect: String,
    #[serde(default)]
    pub from: Option<String>,
}

// =============================================================================
// PROGRAMS
// =============================================================================

/// Query string of `GET /programs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramSearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub country: String,
}

impl From<ProgramSearchParams> for ProgramFilter {
    fn from(params: ProgramSearchParams) -> Self {
        Self {
            query: params.q,
            level: params.level,
            field: params.field,
            country: params.country,
        }
    }
}

/// One directory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramJson {
    pub id: String,
    pub title: String,
    pub level: String,
    pub field: String,
    pub country: String,
    pub deadline: NaiveDate,
    pub funding: String,
    pub description: String,
    pub eligibility: String,
    /// Whether applications are still accepted.
    pub open: bool,
}

impl ProgramJson {
    pub fn from_program(program: &Program, today: NaiveDate) -> Self {
        Self {
            id: program.id.to_string(),
            title: program.title.clone(),
            level: program.level.clone(),
            field: program.field.clone(),
            country: program.country.clone(),
            deadline: program.deadline,
            funding: program.funding.clone(),
            description: program.description.clone(),
            eligibility: program.eligibility.clone(),
            open: program.is_open_on(today),
        }
    }
}

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Answer to the password step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginResponse {
    Authenticated { token: String, session: Session },
    RequiresSecondFactor { challenge: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub challenge: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// A signed-in session and its bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub session: Session,
}

/// Plain acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// `GET /auth/session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionResponse {
    Authenticated { session: Session },
    Unauthenticated,
}

// =============================================================================
// WIZARD
// =============================================================================

/// Full view of a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftResponse {
    pub application_id: String,
    pub program_id: String,
    pub current_step_index: usize,
    pub current_step: SectionId,
    pub current_step_name: String,
    pub step_count: usize,
    pub status: DraftStatus,
    pub dirty: bool,
    pub certified: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub sections: BTreeMap<String, BTreeMap<String, String>>,
    pub attachments: BTreeMap<String, Attachment>,
}

impl From<&WizardDraft> for DraftResponse {
    fn from(draft: &WizardDraft) -> Self {
        let step = draft.current_step();
        let sections = STEPS
            .iter()
            .filter_map(|s| {
                draft
                    .section(s.id)
                    .map(|fields| (s.id.as_str().to_string(), fields.clone()))
            })
            .collect();
        let attachments = draft
            .attachments()
            .map(|(slot, attachment)| (slot.as_str().to_string(), attachment.clone()))
            .collect();

        Self {
            application_id: draft.application_id().to_string(),
            program_id: draft.program_id().to_string(),
            current_step_index: draft.current_step_index(),
            current_step: step.id,
            current_step_name: step.name.to_string(),
            step_count: STEP_COUNT,
            status: draft.status(),
            dirty: draft.is_dirty(),
            certified: draft.certified(),
            last_saved_at: draft.last_saved_at(),
            sections,
            attachments,
        }
    }
}

/// One draft on the applicant dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSummaryJson {
    pub application_id: String,
    pub program_id: String,
    pub current_step_index: usize,
    pub status: DraftStatus,
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl From<&WizardDraft> for DraftSummaryJson {
    fn from(draft: &WizardDraft) -> Self {
        Self {
            application_id: draft.application_id().to_string(),
            program_id: draft.program_id().to_string(),
            current_step_index: draft.current_step_index(),
            status: draft.status(),
            last_saved_at: draft.last_saved_at(),
        }
    }
}

/// `PUT /applicant/drafts/{id}/fields`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldUpdateRequest {
    pub section: SectionId,
    pub key: String,
    pub value: String,
}

impl FieldUpdateRequest {
    /// Check input limits at the API boundary.
    pub fn validate(&self) -> Result<(), PortalError> {
        if matches!(self.section, SectionId::Documents | SectionId::Review) {
            return Err(PortalError::ValidationFailed(format!(
                "Section '{}' has no form fields",
                self.section
            )));
        }
        if self.key.is_empty() {
            return Err(PortalError::ValidationFailed(
                "Field key must not be empty".to_string(),
            ));
        }
        if self.key.len() > MAX_FIELD_KEY_LENGTH {
            return Err(PortalError::ValidationFailed(format!(
                "Field key length {} exceeds maximum {} bytes",
                self.key.len(),
                MAX_FIELD_KEY_LENGTH
            )));
        }
        if self.value.len() > MAX_FIELD_VALUE_LENGTH {
            return Err(PortalError::ValidationFailed(format!(
                "Field value length {} exceeds maximum {} bytes",
                self.value.len(),
                MAX_FIELD_VALUE_LENGTH
            )));
        }
        Ok(())
    }
}

/// `PUT /applicant/drafts/{id}/attachments`. `file: null` clears the slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentUpdateRequest {
    pub slot: AttachmentSlot,
    #[serde(default)]
    pub file: Option<FileRef>,
}

impl AttachmentUpdateRequest {
    /// Check input limits and build the slot content.
    pub fn to_attachment(&self) -> Result<Attachment, PortalError> {
        if let Some(file) = &self.file {
            if file.name.trim().is_empty() {
                return Err(PortalError::ValidationFailed(
                    "File name must not be empty".to_string(),
                ));
            }
            if file.name.len() > MAX_FILE_NAME_LENGTH {
                return Err(PortalError::ValidationFailed(format!(
                    "File name length {} exceeds maximum {} bytes",
                    file.name.len(),
                    MAX_FILE_NAME_LENGTH
                )));
            }
            if file.size_bytes > MAX_ATTACHMENT_BYTES {
                return Err(PortalError::ValidationFailed(format!(
                    "File size {} bytes exceeds maximum {} bytes",
                    file.size_bytes, MAX_ATTACHMENT_BYTES
                )));
            }
        }
        Ok(Attachment::from(self.file.clone()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertifyRequest {
    pub certified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JumpRequest {
    pub index: usize,
}

/// Current position after a navigation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResponse {
    pub current_step_index: usize,
    pub current_step: SectionId,
}

impl StepResponse {
    pub fn at(index: usize) -> Self {
        let current_step = STEPS.get(index).map_or(SectionId::Personal, |s| s.id);
        Self {
            current_step_index: index,
            current_step,
        }
    }
}

// =============================================================================
// DASHBOARDS
// =============================================================================

/// Body of the role dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub area: String,
    pub user: Session,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drafts: Vec<DraftSummaryJson>,
}

// =============================================================================
// TESTS
// =============================================================================
