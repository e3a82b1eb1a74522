//! # Wizard Draft
//!
//! The in-progress application and its navigation state machine.
//!
//! ## Invariants
//!
//! - `0 <= current_step_index < STEP_COUNT`
//! - every attachment slot holds at most one file (replace, never append)
//! - a submitted draft is terminal: edits are rejected with
//!   `PortalError::DraftSubmitted`
//!
//! Navigation is lenient: moving between steps never checks whether the
//! current step's required fields are filled.

use super::steps::{STEP_COUNT, STEPS, SectionId, Step};
use crate::{ApplicationId, Attachment, AttachmentSlot, PortalError, ProgramId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static ABSENT: Attachment = Attachment::Absent;

/// Lifecycle of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    #[default]
    InProgress,
    Submitted,
}

/// One in-progress scholarship application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardDraft {
    application_id: ApplicationId,
    program_id: ProgramId,
    /// Applicant who started the draft. `None` for drafts created outside
    /// a signed-in session (CLI fixtures, tests).
    owner: Option<UserId>,
    current_step_index: usize,
    sections: BTreeMap<SectionId, BTreeMap<String, String>>,
    attachments: BTreeMap<AttachmentSlot, Attachment>,
    certified: bool,
    status: DraftStatus,
    last_saved_at: Option<DateTime<Utc>>,
    /// Bumped on every edit.
    revision: u64,
    /// Revision captured by the most recent successful save.
    saved_revision: u64,
}

impl WizardDraft {
    /// Create a draft at step 0 with empty sections and every slot absent.
    #[must_use]
    pub fn new(application_id: ApplicationId, program_id: ProgramId) -> Self {
        let sections = STEPS
            .iter()
            .filter(|step| !step.id.fields().is_empty())
            .map(|step| (step.id, BTreeMap::new()))
            .collect();
        let attachments = AttachmentSlot::ALL
            .into_iter()
            .map(|slot| (slot, Attachment::Absent))
            .collect();

        Self {
            application_id,
            program_id,
            owner: None,
            current_step_index: 0,
            sections,
            attachments,
            certified: false,
            status: DraftStatus::InProgress,
            last_saved_at: None,
            revision: 0,
            saved_revision: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn application_id(&self) -> ApplicationId {
        self.application_id
    }

    #[must_use]
    pub fn program_id(&self) -> &ProgramId {
        &self.program_id
    }

    #[must_use]
    pub fn owner(&self) -> Option<&UserId> {
        self.owner.as_ref()
    }

    /// Returns `true` if `user` may work on this draft. Unowned drafts are
    /// open to anyone.
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.owner.as_ref().is_none_or(|owner| owner == user)
    }

    #[must_use]
    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    /// The step the applicant is on.
    #[must_use]
    pub fn current_step(&self) -> Step {
        STEPS[self.current_step_index.min(STEP_COUNT - 1)]
    }

    #[must_use]
    pub fn is_last_step(&self) -> bool {
        self.current_step_index == STEP_COUNT - 1
    }

    #[must_use]
    pub fn status(&self) -> DraftStatus {
        self.status
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.status == DraftStatus::Submitted
    }

    #[must_use]
    pub fn certified(&self) -> bool {
        self.certified
    }

    #[must_use]
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns `true` if there are edits no successful save has captured.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    /// Value of one field, if it has been set.
    #[must_use]
    pub fn field(&self, section: SectionId, key: &str) -> Option<&str> {
        self.sections
            .get(&section)
            .and_then(|fields| fields.get(key))
            .map(String::as_str)
    }

    /// All values entered for a section.
    #[must_use]
    pub fn section(&self, section: SectionId) -> Option<&BTreeMap<String, String>> {
        self.sections.get(&section)
    }

    /// Contents of an attachment slot.
    #[must_use]
    pub fn attachment(&self, slot: AttachmentSlot) -> &Attachment {
        self.attachments.get(&slot).unwrap_or(&ABSENT)
    }

    /// Slots in display order with their contents.
    pub fn attachments(&self) -> impl Iterator<Item = (AttachmentSlot, &Attachment)> {
        self.attachments.iter().map(|(slot, a)| (*slot, a))
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    fn ensure_editable(&self) -> Result<(), PortalError> {
        if self.is_submitted() {
            return Err(PortalError::DraftSubmitted);
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.revision = self.revision.saturating_add(1);
    }

    /// Record the applicant who owns the draft.
    #[must_use]
    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Set one field. No validation beyond the terminal check.
    pub fn set_field(
        &mut self,
        section: SectionId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), PortalError> {
        self.ensure_editable()?;
        self.sections
            .entry(section)
            .or_default()
            .insert(key.into(), value.into());
        self.touch();
        Ok(())
    }

    /// Replace the contents of an attachment slot.
    pub fn set_attachment(
        &mut self,
        slot: AttachmentSlot,
        attachment: Attachment,
    ) -> Result<(), PortalError> {
        self.ensure_editable()?;
        self.attachments.insert(slot, attachment);
        self.touch();
        Ok(())
    }

    /// Record the "certify accuracy" checkbox. Not a submit precondition.
    pub fn set_certified(&mut self, certified: bool) -> Result<(), PortalError> {
        self.ensure_editable()?;
        self.certified = certified;
        self.touch();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Advance one step. Returns `false` (and does nothing) on the last step.
    pub fn go_next(&mut self) -> bool {
        if self.current_step_index + 1 < STEP_COUNT {
            self.current_step_index += 1;
            true
        } else {
            false
        }
    }

    /// Go back one step. Returns `false` (and does nothing) on step 0.
    pub fn go_previous(&mut self) -> bool {
        if self.current_step_index > 0 {
            self.current_step_index -= 1;
            true
        } else {
            false
        }
    }

    /// Jump directly to `index`. Out-of-range indices are rejected and
    /// leave the draft untouched.
    pub fn jump_to(&mut self, index: usize) -> Result<(), PortalError> {
        if index >= STEP_COUNT {
            return Err(PortalError::InvalidStep(index));
        }
        self.current_step_index = index;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Persistence bookkeeping
    // -------------------------------------------------------------------------

    /// Record a successful save of the snapshot taken at `revision`.
    ///
    /// Edits made after the snapshot keep the draft dirty.
    pub fn mark_saved(&mut self, at: DateTime<Utc>, revision: u64) {
        self.last_saved_at = Some(at);
        self.saved_revision = self.saved_revision.max(revision);
    }

    /// Check that a submit may start: last step reached, not yet submitted.
    pub fn ensure_submittable(&self) -> Result<(), PortalError> {
        self.ensure_editable()?;
        if !self.is_last_step() {
            return Err(PortalError::SubmitNotAllowed);
        }
        Ok(())
    }

    /// Turn the draft terminal.
    pub fn mark_submitted(&mut self, at: DateTime<Utc>) {
        self.status = DraftStatus::Submitted;
        self.last_saved_at = Some(at);
        self.saved_revision = self.revision;
    }

    /// Check structural invariants of a draft that came from outside
    /// (decoded bytes or JSON).
    pub fn validate(&self) -> Result<(), PortalError> {
        if self.current_step_index >= STEP_COUNT {
            return Err(PortalError::InvalidStep(self.current_step_index));
        }
        if self.saved_revision > self.revision {
            return Err(PortalError::SerializationError(format!(
                "saved revision {} is ahead of revision {}",
                self.saved_revision, self.revision
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileRef;

    fn draft() -> WizardDraft {
        WizardDraft::new(ApplicationId::from_u128(7), ProgramId::new("1"))
    }

    #[test]
    fn new_draft_starts_clean_at_step_zero() {
        let d = draft();
        assert_eq!(d.current_step_index(), 0);
        assert_eq!(d.current_step().id, SectionId::Personal);
        assert!(!d.is_dirty());
        assert!(d.last_saved_at().is_none());
        assert!(d.attachments().all(|(_, a)| !a.is_present()));
        assert_eq!(d.section(SectionId::Personal).map(BTreeMap::len), Some(0));
    }

    #[test]
    fn ownership_check() {
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let unowned = draft();
        assert!(unowned.owner().is_none());
        assert!(unowned.is_owned_by(&bob));

        let owned = draft().with_owner(alice.clone());
        assert_eq!(owned.owner(), Some(&alice));
        assert!(owned.is_owned_by(&alice));
        assert!(!owned.is_owned_by(&bob));
        assert!(!owned.is_dirty());
    }

    #[test]
    fn go_next_is_noop_on_last_step() {
        let mut d = draft();
        d.jump_to(STEP_COUNT - 1).expect("jump");
        assert!(!d.go_next());
        assert_eq!(d.current_step_index(), STEP_COUNT - 1);
    }

    #[test]
    fn go_previous_is_noop_on_first_step() {
        let mut d = draft();
        assert!(!d.go_previous());
        assert_eq!(d.current_step_index(), 0);
    }

    #[test]
    fn jump_keeps_field_data() {
        let mut d = draft();
        d.set_field(SectionId::Personal, "firstName", "Ada").expect("set");
        d.set_field(SectionId::Essays, "impactStatement", "x").expect("set");
        d.jump_to(5).expect("jump");
        d.jump_to(2).expect("jump");
        assert_eq!(d.current_step_index(), 2);
        assert_eq!(d.field(SectionId::Personal, "firstName"), Some("Ada"));
        assert_eq!(d.field(SectionId::Essays, "impactStatement"), Some("x"));
    }

    #[test]
    fn jump_out_of_range_is_rejected() {
        let mut d = draft();
        d.jump_to(3).expect("jump");
        assert_eq!(d.jump_to(STEP_COUNT), Err(PortalError::InvalidStep(STEP_COUNT)));
        assert_eq!(d.current_step_index(), 3);
    }

    #[test]
    fn attachment_replacement_overwrites() {
        let mut d = draft();
        let a = FileRef::new("a.pdf", 1, "application/pdf");
        let b = FileRef::new("b.pdf", 2, "application/pdf");
        d.set_attachment(AttachmentSlot::Transcripts, Attachment::Present(a))
            .expect("set");
        d.set_attachment(AttachmentSlot::Transcripts, Attachment::Present(b.clone()))
            .expect("set");
        assert_eq!(d.attachment(AttachmentSlot::Transcripts).file(), Some(&b));

        d.set_attachment(AttachmentSlot::Transcripts, Attachment::Absent)
            .expect("clear");
        assert!(!d.attachment(AttachmentSlot::Transcripts).is_present());
    }

    #[test]
    fn edits_after_snapshot_stay_dirty() {
        let mut d = draft();
        d.set_field(SectionId::Personal, "firstName", "Ada").expect("set");
        let snapshot_revision = d.revision();
        d.set_field(SectionId::Personal, "lastName", "Lovelace").expect("set");

        d.mark_saved(Utc::now(), snapshot_revision);
        assert!(d.is_dirty());

        d.mark_saved(Utc::now(), d.revision());
        assert!(!d.is_dirty());
    }

    #[test]
    fn submit_requires_last_step() {
        let mut d = draft();
        assert_eq!(d.ensure_submittable(), Err(PortalError::SubmitNotAllowed));
        d.jump_to(STEP_COUNT - 1).expect("jump");
        assert!(d.ensure_submittable().is_ok());
    }

    #[test]
    fn submitted_draft_is_terminal() {
        let mut d = draft();
        d.jump_to(STEP_COUNT - 1).expect("jump");
        d.mark_submitted(Utc::now());
        assert!(d.is_submitted());
        assert_eq!(
            d.set_field(SectionId::Personal, "firstName", "Ada"),
            Err(PortalError::DraftSubmitted)
        );
        assert_eq!(d.set_certified(true), Err(PortalError::DraftSubmitted));
        assert_eq!(d.ensure_submittable(), Err(PortalError::DraftSubmitted));
    }

    #[test]
    fn validate_rejects_out_of_range_index() {
        let mut d = draft();
        d.current_step_index = STEP_COUNT;
        assert_eq!(d.validate(), Err(PortalError::InvalidStep(STEP_COUNT)));
    }
}
