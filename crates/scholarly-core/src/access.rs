//! # Access Guard
//!
//! Role-based protection of portal views.
//!
//! Seniority is a static rank table:
//!
//! | role       | rank |
//! |------------|------|
//! | applicant  | 0    |
//! | reviewer   | 1    |
//! | admin      | 2    |
//! | superadmin | 3    |
//!
//! A session may view a resource when `rank(actual) >= rank(required)`.
//! Denial is an ordinary outcome reported as a navigation directive; the
//! guard never fails.

use crate::{Role, SessionState};
use serde::{Deserialize, Serialize};

// =============================================================================
// NAVIGATION TARGETS
// =============================================================================

/// Where unauthenticated visitors are sent.
pub const LOGIN_PATH: &str = "/login";

/// Where authenticated but under-privileged visitors are sent.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Landing page of the applicant area.
pub const APPLICANT_DASHBOARD_PATH: &str = "/applicant/dashboard";

// =============================================================================
// ROLE RANK
// =============================================================================

/// Position of a role in the seniority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoleRank(pub u8);

/// The seniority table.
pub const ROLE_RANKS: [(Role, RoleRank); 4] = [
    (Role::Applicant, RoleRank(0)),
    (Role::Reviewer, RoleRank(1)),
    (Role::Admin, RoleRank(2)),
    (Role::Superadmin, RoleRank(3)),
];

impl Role {
    /// Look up this role's rank in [`ROLE_RANKS`].
    #[must_use]
    pub fn rank(self) -> RoleRank {
        ROLE_RANKS
            .iter()
            .find(|(role, _)| *role == self)
            .map(|(_, rank)| *rank)
            .unwrap_or(RoleRank(0))
    }
}

/// Whether a session holding `actual` may view a resource requiring `required`.
#[must_use]
pub fn can_access(required: Role, actual: Role) -> bool {
    actual == required || actual.rank() >= required.rank()
}

// =============================================================================
// GUARD
// =============================================================================

/// Result of one navigation attempt against a protected view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GuardOutcome {
    /// Session restoration has not finished; render a placeholder.
    Pending,
    /// Render the view.
    Permit,
    /// Not signed in. `from` is the originally requested path.
    RedirectToLogin { from: String },
    /// Signed in with too junior a role.
    RedirectToUnauthorized,
}

impl GuardOutcome {
    /// The path the client should navigate to, if any.
    #[must_use]
    pub fn redirect_path(&self) -> Option<&'static str> {
        match self {
            GuardOutcome::RedirectToLogin { .. } => Some(LOGIN_PATH),
            GuardOutcome::RedirectToUnauthorized => Some(UNAUTHORIZED_PATH),
            GuardOutcome::Pending | GuardOutcome::Permit => None,
        }
    }
}

/// Stateless route guard.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGuard;

impl AccessGuard {
    /// Create a new guard.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decide one navigation attempt.
    ///
    /// Loading wins over everything; an unauthenticated session is sent to
    /// login regardless of the required role; `required == None` admits any
    /// authenticated session.
    #[must_use]
    pub fn evaluate(&self, required: Option<Role>, state: &SessionState, from: &str) -> GuardOutcome {
        match state {
            SessionState::Loading => GuardOutcome::Pending,
            SessionState::Unauthenticated => GuardOutcome::RedirectToLogin {
                from: from.to_string(),
            },
            SessionState::Authenticated(session) => match required {
                Some(role) if !can_access(role, session.role) => {
                    GuardOutcome::RedirectToUnauthorized
                }
                _ => GuardOutcome::Permit,
            },
        }
    }
}

// =============================================================================
// ROUTE TABLE
// =============================================================================

/// Maps path prefixes to the role their views require.
#[derive(Debug, Clone)]
pub struct RouteTable {
    groups: Vec<(String, Role)>,
}

impl Default for RouteTable {
    /// The portal's four protected areas.
    fn default() -> Self {
        Self {
            groups: vec![
                ("/applicant".to_string(), Role::Applicant),
                ("/reviewer".to_string(), Role::Reviewer),
                ("/admin".to_string(), Role::Admin),
                ("/superadmin".to_string(), Role::Superadmin),
            ],
        }
    }
}

impl RouteTable {
    /// Role required by `path`, or `None` for public paths.
    ///
    /// Prefixes match whole segments: `/admin` covers `/admin` and
    /// `/admin/users` but not `/administrators`.
    #[must_use]
    pub fn required_role(&self, path: &str) -> Option<Role> {
        self.groups
            .iter()
            .find(|(prefix, _)| {
                path.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
            .map(|(_, role)| *role)
    }

    /// Resolve `path` and run the guard against it.
    #[must_use]
    pub fn check(&self, guard: &AccessGuard, path: &str, state: &SessionState) -> GuardOutcome {
        match self.required_role(path) {
            Some(role) => guard.evaluate(Some(role), state, path),
            None => GuardOutcome::Permit,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
