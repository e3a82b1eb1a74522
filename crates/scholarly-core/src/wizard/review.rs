//! Completeness summary shown on the review step.
//!
//! Everything here is informational: a summary with gaps does not block
//! navigation or submit.

use super::WizardDraft;
use super::steps::{LengthHint, STEPS, SectionId};
use crate::AttachmentSlot;
use serde::{Deserialize, Serialize};

/// Required fields of one section that are still empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionReview {
    pub section: SectionId,
    pub step_index: usize,
    pub missing_required: Vec<String>,
}

/// Character count of a long text field against its recommended range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthReport {
    pub section: SectionId,
    pub key: String,
    pub chars: usize,
    pub hint: LengthHint,
    pub within_hint: bool,
}

/// Presence of one attachment slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentReview {
    pub slot: AttachmentSlot,
    pub required: bool,
    pub file_name: Option<String>,
}

/// Review-step summary of a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub sections: Vec<SectionReview>,
    pub lengths: Vec<LengthReport>,
    pub attachments: Vec<AttachmentReview>,
    pub certified: bool,
}

impl ReviewSummary {
    /// Build the summary for `draft`. Whitespace-only values count as empty.
    #[must_use]
    pub fn from_draft(draft: &WizardDraft) -> Self {
        let mut sections = Vec::new();
        let mut lengths = Vec::new();

        for (step_index, step) in STEPS.iter().enumerate() {
            let specs = step.id.fields();
            if specs.is_empty() {
                continue;
            }

            let missing_required = specs
                .iter()
                .filter(|spec| spec.required)
                .filter(|spec| {
                    draft
                        .field(step.id, spec.key)
                        .is_none_or(|v| v.trim().is_empty())
                })
                .map(|spec| spec.key.to_string())
                .collect();
            sections.push(SectionReview {
                section: step.id,
                step_index,
                missing_required,
            });

            for spec in specs {
                if let Some(hint) = spec.length_hint {
                    let chars = draft
                        .field(step.id, spec.key)
                        .map_or(0, |v| v.chars().count());
                    lengths.push(LengthReport {
                        section: step.id,
                        key: spec.key.to_string(),
                        chars,
                        hint,
                        within_hint: hint.contains(chars),
                    });
                }
            }
        }

        let attachments = draft
            .attachments()
            .map(|(slot, attachment)| AttachmentReview {
                slot,
                required: slot.is_required(),
                file_name: attachment.file().map(|f| f.name.clone()),
            })
            .collect();

        Self {
            sections,
            lengths,
            attachments,
            certified: draft.certified(),
        }
    }

    /// Required attachment slots that are still empty.
    #[must_use]
    pub fn missing_documents(&self) -> Vec<AttachmentSlot> {
        self.attachments
            .iter()
            .filter(|a| a.required && a.file_name.is_none())
            .map(|a| a.slot)
            .collect()
    }

    /// Returns `true` if no required field or document is missing.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sections.iter().all(|s| s.missing_required.is_empty())
            && self.missing_documents().is_empty()
    }
}
