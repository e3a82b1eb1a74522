//! # Application Wizard
//!
//! The seven-step application form as a state machine over a
//! [`WizardDraft`]. Persistence, autosave timing and notifications live in
//! the app layer; this module holds everything that can be decided without
//! a clock or I/O.

mod draft;
mod review;
pub mod steps;

pub use draft::{DraftStatus, WizardDraft};
pub use review::{AttachmentReview, LengthReport, ReviewSummary, SectionReview};
pub use steps::{FieldSpec, LengthHint, STEP_COUNT, STEPS, SectionId, Step};

use crate::{ApplicationId, PortalError, ProgramCatalog, ProgramId};
use chrono::NaiveDate;

/// Start a draft for `program_id`.
///
/// Fails with `ProgramUnavailable` when the program is unknown or its
/// deadline is before `today`; no draft is produced in that case.
pub fn initialize(
    catalog: &ProgramCatalog,
    program_id: &ProgramId,
    application_id: ApplicationId,
    today: NaiveDate,
) -> Result<WizardDraft, PortalError> {
    let program = catalog.open_program(program_id, today)?;
    Ok(WizardDraft::new(application_id, program.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_open_program() {
        let catalog = ProgramCatalog::demo();
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).expect("date");
        let draft = initialize(&catalog, &ProgramId::new("1"), ApplicationId::from_u128(1), today)
            .expect("open program");
        assert_eq!(draft.program_id(), &ProgramId::new("1"));
        assert_eq!(draft.current_step_index(), 0);
    }

    #[test]
    fn initialize_past_deadline_fails() {
        let catalog = ProgramCatalog::demo();
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).expect("date");
        let result = initialize(&catalog, &ProgramId::new("1"), ApplicationId::from_u128(1), today);
        assert_eq!(result, Err(PortalError::ProgramUnavailable(ProgramId::new("1"))));
    }
}
