//! # Route Protection
//!
//! Session lookup and role checks for the protected route groups.
//!
//! ## Usage
//!
//! Send the session token from `/auth/verify-mfa` or `/auth/register` in the
//! Authorization header:
//! ```text
//! Authorization: Bearer <session-token>
//! ```
//!
//! Paths under `/applicant`, `/reviewer`, `/admin` and `/superadmin` require
//! the matching role or a more senior one. Denials are JSON redirects:
//! 401 `{"redirect": "/login"}` without a session, 403
//! `{"redirect": "/unauthorized"}` with a too junior role.

use super::{AppState, types::RedirectResponse};
use crate::identity::SessionContext;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use scholarly_core::{GuardOutcome, SessionState};

/// Extract the bearer token from the Authorization header.
///
/// Both "Bearer <token>" and a raw "<token>" are accepted.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve the request's session through the identity provider.
pub async fn resolve_session(state: &AppState, headers: &HeaderMap) -> SessionState {
    let context = SessionContext::new();
    let token = bearer_token(headers);
    context
        .restore(state.identity.as_ref(), token.as_deref())
        .await;
    context.state()
}

/// Access guard middleware.
///
/// Public paths pass straight through. For protected paths the resolved
/// `Session` is attached to the request extensions on success.
pub async fn session_guard(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let Some(required) = state.routes.required_role(&path) else {
        return next.run(request).await;
    };

    let session_state = resolve_session(&state, request.headers()).await;
    let outcome = state.guard.evaluate(Some(required), &session_state, &path);
    let target = outcome.redirect_path().unwrap_or_default();

    match (outcome, session_state) {
        (GuardOutcome::Permit, SessionState::Authenticated(session)) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        (GuardOutcome::RedirectToLogin { from }, _) => {
            tracing::info!(
                event = "access_denied",
                reason = "unauthenticated",
                path = %from,
                "Redirecting to login"
            );
            redirect(StatusCode::UNAUTHORIZED, target, Some(from))
        }
        (GuardOutcome::RedirectToUnauthorized, session_state) => {
            tracing::warn!(
                event = "access_denied",
                reason = "insufficient_role",
                path = %path,
                required = %required,
                actual = ?session_state.session().map(|s| s.role),
                "Role too junior for this area"
            );
            redirect(StatusCode::FORBIDDEN, target, None)
        }
        // Restoration still running, or a permit without a session.
        _ => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(RedirectResponse {
                redirect: path,
                from: None,
            }),
        )
            .into_response(),
    }
}

fn redirect(status: StatusCode, target: &str, from: Option<String>) -> Response {
    (
        status,
        Json(RedirectResponse {
            redirect: target.to_string(),
            from,
        }),
    )
        .into_response()
}

// =============================================================================
// TESTS
// =============================================================================
