//! # scholarly-core
//!
//! The deterministic logic of the Scholarly scholarship portal - THE LOGIC.
//!
//! Two pieces carry the design:
//! - **AccessGuard** (`access`): decides whether a session may view a
//!   protected area, using a fixed role-seniority table.
//! - **Wizard** (`wizard`): the seven-step application form as a state
//!   machine over a `WizardDraft`, with attachment tracking and a review
//!   summary.
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies (pure Rust)
//! - No clock reads: callers pass "today" and timestamps in
//! - Denied access and missing required fields are normal outcomes,
//!   not errors

// =============================================================================
// MODULES
// =============================================================================

pub mod access;
pub mod formats;
pub mod notification;
pub mod primitives;
pub mod program;
pub mod session;
pub mod storage;
pub mod types;
pub mod wizard;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ApplicationId, Attachment, AttachmentSlot, FileRef, PortalError, ProgramId, Role, UserId,
};

// =============================================================================
// RE-EXPORTS: Access & Session
// =============================================================================

pub use access::{AccessGuard, GuardOutcome, RoleRank, RouteTable, can_access};
pub use session::{Session, SessionState};

// =============================================================================
// RE-EXPORTS: Programs & Wizard
// =============================================================================

pub use program::{Program, ProgramCatalog, ProgramFilter};
pub use wizard::{DraftStatus, ReviewSummary, STEP_COUNT, STEPS, SectionId, WizardDraft};

// =============================================================================
// RE-EXPORTS: Notifications, Formats, Storage
// =============================================================================

pub use formats::{DraftHeader, draft_from_bytes, draft_to_bytes};
pub use notification::{Notification, NotificationId, NotificationKind, NotificationQueue};
pub use storage::RedbDraftStore;
