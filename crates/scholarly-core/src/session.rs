//! # Session Module
//!
//! The authenticated identity of one client and the three-phase state the
//! access guard reads.
//!
//! A `Session` is created by the identity provider after a successful login
//! (including the second factor) and destroyed on logout. The core only
//! reads it; creation and storage belong to the app layer.

use crate::{Role, UserId};
use serde::{Deserialize, Serialize};

/// An authenticated user session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// `false` for freshly registered applicants until their profile is filled.
    pub profile_complete: bool,
    pub authenticated: bool,
}

impl Session {
    /// Create an authenticated session.
    #[must_use]
    pub fn new(
        user_id: UserId,
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
        profile_complete: bool,
    ) -> Self {
        Self {
            user_id,
            email: email.into(),
            name: name.into(),
            role,
            profile_complete,
            authenticated: true,
        }
    }
}

/// What the client currently knows about its session.
///
/// `Loading` lasts until session restoration resolves; callers must not
/// redirect while in it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Loading,
    Unauthenticated,
    Authenticated(Session),
}

impl SessionState {
    /// Returns `true` while restoration is still in progress.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    /// The session, if authenticated.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Loading | SessionState::Unauthenticated => None,
        }
    }
}

impl From<Option<Session>> for SessionState {
    /// Resolve a restoration result. A session whose `authenticated` flag is
    /// cleared counts as no session.
    fn from(session: Option<Session>) -> Self {
        match session {
            Some(session) if session.authenticated => SessionState::Authenticated(session),
            _ => SessionState::Unauthenticated,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
