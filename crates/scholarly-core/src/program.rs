//! # Program Catalog
//!
//! Scholarship programs an applicant can apply to, the directory search
//! over them, and the deadline rule that decides whether a wizard may start.

use crate::{PortalError, ProgramId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One scholarship program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub title: String,
    /// Comma-separated study levels, e.g. `"Undergraduate, Graduate"`.
    pub level: String,
    pub field: String,
    pub country: String,
    /// Last day applications are accepted (inclusive).
    pub deadline: NaiveDate,
    pub funding: String,
    pub description: String,
    pub eligibility: String,
}

impl Program {
    /// Returns `true` if applications are still accepted on `today`.
    #[must_use]
    pub fn is_open_on(&self, today: NaiveDate) -> bool {
        today <= self.deadline
    }
}

/// Directory search criteria. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramFilter {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub country: String,
}

impl ProgramFilter {
    /// Returns `true` if `program` satisfies every criterion.
    ///
    /// The query matches title or description case-insensitively; the
    /// category filters are plain substring matches.
    #[must_use]
    pub fn matches(&self, program: &Program) -> bool {
        let query = self.query.to_lowercase();
        let matches_query = program.title.to_lowercase().contains(&query)
            || program.description.to_lowercase().contains(&query);

        matches_query
            && program.level.contains(&self.level)
            && program.field.contains(&self.field)
            && program.country.contains(&self.country)
    }
}

/// The set of known programs, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct ProgramCatalog {
    programs: BTreeMap<ProgramId, Program>,
}

impl ProgramCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a program.
    pub fn insert(&mut self, program: Program) {
        self.programs.insert(program.id.clone(), program);
    }

    /// Look up a program by id.
    #[must_use]
    pub fn get(&self, id: &ProgramId) -> Option<&Program> {
        self.programs.get(id)
    }

    /// Number of programs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Returns `true` if the catalog has no programs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// All programs matching `filter`, in id order.
    #[must_use]
    pub fn search(&self, filter: &ProgramFilter) -> Vec<&Program> {
        self.programs.values().filter(|p| filter.matches(p)).collect()
    }

    /// The program with `id`, provided it exists and is still open on `today`.
    pub fn open_program(&self, id: &ProgramId, today: NaiveDate) -> Result<&Program, PortalError> {
        self.programs
            .get(id)
            .filter(|p| p.is_open_on(today))
            .ok_or_else(|| PortalError::ProgramUnavailable(id.clone()))
    }

    /// The built-in demonstration catalog.
    #[must_use]
    pub fn demo() -> Self {
        let rows: [(&str, &str, &str, &str, &str, (i32, u32, u32), &str, &str, &str); 6] = [
            (
                "1",
                "National Merit Scholarship",
                "Undergraduate",
                "All Fields",
                "Domestic",
                (2027, 12, 31),
                "$10,000 per year",
                "Merit-based scholarship for outstanding undergraduate students with exceptional academic achievements.",
                "GPA 3.5+, Citizenship required",
            ),
            (
                "2",
                "STEM Excellence Grant",
                "Graduate",
                "Science, Technology, Engineering, Mathematics",
                "Domestic",
                (2027, 11, 15),
                "$25,000 per year",
                "Supporting graduate students pursuing advanced degrees in STEM fields with research potential.",
                "GPA 3.7+, Research proposal required",
            ),
            (
                "3",
                "International Exchange Program",
                "Undergraduate, Graduate",
                "All Fields",
                "International",
                (2028, 1, 15),
                "Full tuition and stipend",
                "Study abroad opportunity for students interested in international education and cultural exchange.",
                "GPA 3.0+, Language proficiency required",
            ),
            (
                "4",
                "Future Teachers Scholarship",
                "Undergraduate",
                "Education",
                "Domestic",
                (2027, 10, 30),
                "$15,000 per year",
                "Supporting future educators committed to teaching in high-need areas after graduation.",
                "GPA 3.2+, Teaching commitment required",
            ),
            (
                "5",
                "Healthcare Heroes Grant",
                "Graduate",
                "Medicine, Nursing, Public Health",
                "Domestic",
                (2027, 11, 30),
                "$30,000 per year",
                "Supporting graduate students in healthcare fields committed to serving in underserved communities.",
                "GPA 3.5+, Community service required",
            ),
            (
                "6",
                "Arts & Humanities Fellowship",
                "Graduate",
                "Arts, Humanities",
                "Domestic, International",
                (2028, 2, 15),
                "$20,000 per year",
                "Supporting scholars and artists pursuing advanced degrees in arts and humanities disciplines.",
                "Portfolio or writing sample required",
            ),
        ];

        let mut catalog = Self::new();
        for (id, title, level, field, country, (y, m, d), funding, description, eligibility) in rows
        {
            // Skipped rather than unwrapped; every literal above is a valid date.
            let Some(deadline) = NaiveDate::from_ymd_opt(y, m, d) else {
                continue;
            };
            catalog.insert(Program {
                id: ProgramId::new(id),
                title: title.to_string(),
                level: level.to_string(),
                field: field.to_string(),
                country: country.to_string(),
                deadline,
                funding: funding.to_string(),
                description: description.to_string(),
                eligibility: eligibility.to_string(),
            });
        }
        catalog
    }
}

// =============================================================================
// TESTS
// =============================================================================
