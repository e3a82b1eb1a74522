//! Step sequence and field declarations of the application wizard.

use crate::PortalError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One named step (section) of the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionId {
    Personal,
    Education,
    Financial,
    Program,
    Essays,
    Documents,
    Review,
}

impl SectionId {
    /// Wire name of the section.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SectionId::Personal => "personal",
            SectionId::Education => "education",
            SectionId::Financial => "financial",
            SectionId::Program => "program",
            SectionId::Essays => "essays",
            SectionId::Documents => "documents",
            SectionId::Review => "review",
        }
    }

    /// Position of this section in [`STEPS`].
    #[must_use]
    pub fn index(self) -> usize {
        STEPS.iter().position(|step| step.id == self).unwrap_or(0)
    }

    /// Field declarations of this section. Empty for documents and review.
    #[must_use]
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            SectionId::Personal => PERSONAL_FIELDS,
            SectionId::Education => EDUCATION_FIELDS,
            SectionId::Financial => FINANCIAL_FIELDS,
            SectionId::Program => PROGRAM_FIELDS,
            SectionId::Essays => ESSAY_FIELDS,
            SectionId::Documents | SectionId::Review => &[],
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionId {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        STEPS
            .iter()
            .map(|step| step.id)
            .find(|id| id.as_str() == s)
            .ok_or_else(|| PortalError::ValidationFailed(format!("Unknown section: {}", s)))
    }
}

/// A step as shown in the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub id: SectionId,
    pub name: &'static str,
}

/// The fixed step sequence.
pub const STEPS: [Step; 7] = [
    Step { id: SectionId::Personal, name: "Personal Information" },
    Step { id: SectionId::Education, name: "Education History" },
    Step { id: SectionId::Financial, name: "Financial Information" },
    Step { id: SectionId::Program, name: "Program Questions" },
    Step { id: SectionId::Essays, name: "Essays" },
    Step { id: SectionId::Documents, name: "Documents" },
    Step { id: SectionId::Review, name: "Review & Submit" },
];

/// Number of steps; the last valid index is `STEP_COUNT - 1`.
pub const STEP_COUNT: usize = STEPS.len();

/// Advisory character range shown under long text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthHint {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl LengthHint {
    /// Returns `true` if `chars` falls inside the recommended range.
    #[must_use]
    pub const fn contains(&self, chars: usize) -> bool {
        chars >= self.min_chars && chars <= self.max_chars
    }
}

/// Declaration of one form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    /// Marked as mandatory in the form; reported on review, never enforced.
    pub required: bool,
    pub length_hint: Option<LengthHint>,
}

const fn required(key: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec { key, label, required: true, length_hint: None }
}

const fn optional(key: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec { key, label, required: false, length_hint: None }
}

const fn long_text(key: &'static str, label: &'static str, min: usize, max: usize) -> FieldSpec {
    FieldSpec {
        key,
        label,
        required: true,
        length_hint: Some(LengthHint { min_chars: min, max_chars: max }),
    }
}

const PERSONAL_FIELDS: &[FieldSpec] = &[
    required("firstName", "First Name"),
    required("lastName", "Last Name"),
    required("email", "Email Address"),
    required("phone", "Phone Number"),
    required("dateOfBirth", "Date of Birth"),
    optional("gender", "Gender"),
    required("address", "Address"),
    required("city", "City"),
    required("state", "State/Province"),
    required("zipCode", "Postal/ZIP Code"),
    required("country", "Country"),
    required("citizenship", "Citizenship Status"),
    required("idNumber", "National ID / Passport Number"),
];

const EDUCATION_FIELDS: &[FieldSpec] = &[
    required("highSchool", "High School Name"),
    required("highSchoolGraduationYear", "High School Graduation Year"),
    required("highSchoolGPA", "High School GPA"),
    optional("university", "University/College Name"),
    optional("universityGraduationYear", "University Graduation Year (Expected)"),
    optional("universityGPA", "University GPA"),
    optional("major", "Major/Field of Study"),
    optional("degree", "Degree Type"),
    required("currentLevel", "Current Education Level"),
];

const FINANCIAL_FIELDS: &[FieldSpec] = &[
    required("householdIncome", "Annual Household Income"),
    required("dependents", "Number of Dependents"),
    required("employmentStatus", "Employment Status"),
    required("otherScholarships", "Other Scholarships/Financial Aid"),
    long_text("financialNeed", "Statement of Financial Need", 1500, 2500),
];

const PROGRAM_FIELDS: &[FieldSpec] = &[
    required("researchInterest", "Research Interests"),
    required("careerGoals", "Career Goals"),
    required("communityService", "Community Service Experience"),
    required("leadershipExperience", "Leadership Experience"),
];

const ESSAY_FIELDS: &[FieldSpec] = &[
    long_text("personalStatement", "Personal Statement", 2500, 3750),
    long_text("academicGoals", "Academic and Career Goals", 2000, 3000),
    long_text("impactStatement", "Impact Statement", 1500, 2500),
];
