//! # Property-Based Tests
//!
//! Invariants of the access relation and the wizard state machine,
//! checked with proptest.

use proptest::collection::vec;
use proptest::prelude::*;
use scholarly_core::{
    AccessGuard, ApplicationId, Attachment, AttachmentSlot, FileRef, GuardOutcome, ProgramId, Role,
    STEP_COUNT, SectionId, SessionState, WizardDraft, can_access, draft_from_bytes, draft_to_bytes,
};

// =============================================================================
// STRATEGIES
// =============================================================================

fn role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Applicant),
        Just(Role::Reviewer),
        Just(Role::Admin),
        Just(Role::Superadmin),
    ]
}

fn slot() -> impl Strategy<Value = AttachmentSlot> {
    prop_oneof![
        Just(AttachmentSlot::Transcripts),
        Just(AttachmentSlot::IdDocument),
        Just(AttachmentSlot::RecommendationLetters),
        Just(AttachmentSlot::AdditionalDocuments),
    ]
}

fn section() -> impl Strategy<Value = SectionId> {
    prop_oneof![
        Just(SectionId::Personal),
        Just(SectionId::Education),
        Just(SectionId::Financial),
        Just(SectionId::Program),
        Just(SectionId::Essays),
    ]
}

#[derive(Debug, Clone)]
enum Op {
    Next,
    Previous,
    Jump(usize),
    Field(SectionId, String, String),
    Attach(AttachmentSlot, Option<String>),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Next),
        Just(Op::Previous),
        (0usize..STEP_COUNT + 3).prop_map(Op::Jump),
        (section(), "[a-zA-Z]{1,12}", ".{0,40}").prop_map(|(s, k, v)| Op::Field(s, k, v)),
        (slot(), proptest::option::of("[a-z]{1,8}\\.pdf")).prop_map(|(s, f)| Op::Attach(s, f)),
    ]
}

fn apply(draft: &mut WizardDraft, op: &Op) {
    match op {
        Op::Next => {
            draft.go_next();
        }
        Op::Previous => {
            draft.go_previous();
        }
        Op::Jump(index) => {
            let _ = draft.jump_to(*index);
        }
        Op::Field(section, key, value) => {
            draft
                .set_field(*section, key.clone(), value.clone())
                .expect("in-progress draft accepts edits");
        }
        Op::Attach(slot, name) => {
            let attachment = Attachment::from(
                name.as_ref()
                    .map(|n| FileRef::new(n.clone(), 1, "application/pdf")),
            );
            draft
                .set_attachment(*slot, attachment)
                .expect("in-progress draft accepts attachments");
        }
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The fallthrough rule is exactly rank comparison.
    #[test]
    fn can_access_is_rank_comparison(required in role(), actual in role()) {
        prop_assert_eq!(can_access(required, actual), actual.rank() >= required.rank());
    }

    /// A session always reaches its own role's views.
    #[test]
    fn same_role_always_permitted(r in role()) {
        prop_assert!(can_access(r, r));
    }

    /// Unauthenticated sessions go to login whatever the role.
    #[test]
    fn unauthenticated_goes_to_login(required in proptest::option::of(role()), path in "/[a-z/]{0,20}") {
        let outcome = AccessGuard::new().evaluate(required, &SessionState::Unauthenticated, &path);
        prop_assert_eq!(outcome, GuardOutcome::RedirectToLogin { from: path });
    }

    /// The step index stays in range under any operation sequence.
    #[test]
    fn step_index_stays_in_range(ops in vec(op(), 0..60)) {
        let mut draft = WizardDraft::new(ApplicationId::from_u128(1), ProgramId::new("1"));
        for op in &ops {
            apply(&mut draft, op);
            prop_assert!(draft.current_step_index() < STEP_COUNT);
        }
    }

    /// Navigation never touches field data or attachments.
    #[test]
    fn navigation_preserves_data(moves in vec(0usize..STEP_COUNT + 2, 0..30), value in ".{0,30}") {
        let mut draft = WizardDraft::new(ApplicationId::from_u128(1), ProgramId::new("1"));
        draft.set_field(SectionId::Personal, "firstName", value.clone()).expect("set");
        let before = draft.clone();

        for index in moves {
            if index % 3 == 0 { draft.go_next(); }
            else if index % 3 == 1 { draft.go_previous(); }
            else { let _ = draft.jump_to(index); }
        }

        prop_assert_eq!(draft.field(SectionId::Personal, "firstName"), Some(value.as_str()));
        prop_assert_eq!(draft.section(SectionId::Education), before.section(SectionId::Education));
        prop_assert_eq!(draft.revision(), before.revision());
    }

    /// A slot holds only the last file written to it.
    #[test]
    fn slot_holds_last_write(s in slot(), names in vec("[a-z]{1,8}", 1..10)) {
        let mut draft = WizardDraft::new(ApplicationId::from_u128(1), ProgramId::new("1"));
        for name in &names {
            draft
                .set_attachment(s, Attachment::Present(FileRef::new(name.clone(), 1, "text/plain")))
                .expect("attach");
        }
        let last = names.last().cloned();
        prop_assert_eq!(draft.attachment(s).file().map(|f| f.name.clone()), last);
    }

    /// Encoding then decoding yields an equal draft.
    #[test]
    fn binary_roundtrip(ops in vec(op(), 0..40)) {
        let mut draft = WizardDraft::new(ApplicationId::from_u128(9), ProgramId::new("3"));
        for op in &ops {
            apply(&mut draft, op);
        }
        let bytes = draft_to_bytes(&draft).expect("encode");
        prop_assert_eq!(draft_from_bytes(&bytes).expect("decode"), draft);
    }
}
