//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState, auth,
    types::{
        AckResponse, AttachmentUpdateRequest, CertifyRequest, DashboardResponse, DraftResponse,
        DraftSummaryJson, ErrorResponse, FieldUpdateRequest, ForgotPasswordRequest, HealthResponse,
        JumpRequest, LoginRequest, LoginResponse, ProgramJson, ProgramSearchParams,
        RegisterRequest, ResetPasswordRequest, SessionResponse, StepResponse, TokenResponse,
        VerifyRequest,
    },
};
use crate::identity::LoginOutcome;
use crate::notify::NotificationSink;
use crate::wizard::{WizardEngine, WizardOutcome};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use scholarly_core::{
    ApplicationId, Notification, NotificationId, PortalError, ProgramFilter, ProgramId,
    ReviewSummary, Session, SessionState,
};
use std::collections::BTreeMap;

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// A `PortalError` on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub PortalError);

impl From<PortalError> for ApiError {
    fn from(e: PortalError) -> Self {
        Self(e)
    }
}

/// Status code for each error kind.
pub fn status_for(error: &PortalError) -> StatusCode {
    match error {
        PortalError::AuthenticationFailed | PortalError::SessionExpired => StatusCode::UNAUTHORIZED,
        PortalError::ProgramUnavailable(_) | PortalError::DraftNotFound(_) => StatusCode::NOT_FOUND,
        PortalError::ValidationFailed(_)
        | PortalError::InvalidStep(_)
        | PortalError::SerializationError(_) => StatusCode::BAD_REQUEST,
        PortalError::SubmitNotAllowed | PortalError::DraftSubmitted => StatusCode::CONFLICT,
        PortalError::PersistenceFailed(_) | PortalError::IoError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(event = "request_failed", error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn parse_application_id(raw: &str) -> Result<ApplicationId, PortalError> {
    raw.parse()
}

// =============================================================================
// HEALTH & DIRECTORY
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Search the scholarship directory.
pub async fn programs_handler(
    State(state): State<AppState>,
    Query(params): Query<ProgramSearchParams>,
) -> impl IntoResponse {
    let today = state.config.today();
    let filter = ProgramFilter::from(params);
    let programs: Vec<ProgramJson> = state
        .catalog
        .search(&filter)
        .into_iter()
        .map(|p| ProgramJson::from_program(p, today))
        .collect();
    Json(programs)
}

// =============================================================================
// AUTH HANDLERS
// =============================================================================

/// Password step of sign-in.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let outcome = state
        .identity
        .login(&request.email, &request.password)
        .await?;
    let response = match outcome {
        LoginOutcome::Authenticated { token, session } => {
            LoginResponse::Authenticated { token, session }
        }
        LoginOutcome::RequiresSecondFactor { challenge } => {
            LoginResponse::RequiresSecondFactor { challenge }
        }
    };
    Ok(Json(response))
}

/// Second-factor step of sign-in.
pub async fn verify_mfa_handler(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let (token, session) = state
        .identity
        .verify_second_factor(&request.challenge, &request.code)
        .await?;
    tracing::info!(event = "signed_in", user_id = %session.user_id, role = %session.role, "Signed in");
    Ok(Json(TokenResponse { token, session }))
}

pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    let (token, session) = state
        .identity
        .register(&request.email, &request.password, &request.name)
        .await?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token, session })))
}

pub async fn forgot_password_handler(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<AckResponse>> {
    state.identity.forgot_password(&request.email).await?;
    Ok(Json(AckResponse::ok()))
}

pub async fn reset_password_handler(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> ApiResult<Json<AckResponse>> {
    state
        .identity
        .reset_password(&request.token, &request.password)
        .await?;
    Ok(Json(AckResponse::ok()))
}

/// End the caller's session. Always succeeds.
pub async fn logout_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = auth::bearer_token(&headers) {
        state.identity.logout(&token).await;
    }
    Json(AckResponse::ok())
}

/// The caller's session, if any.
pub async fn session_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let response = match auth::resolve_session(&state, &headers).await {
        SessionState::Authenticated(session) => SessionResponse::Authenticated { session },
        SessionState::Loading | SessionState::Unauthenticated => SessionResponse::Unauthenticated,
    };
    Json(response)
}

// =============================================================================
// WIZARD REGISTRY
// =============================================================================

/// Find the caller's wizard for `id`, resuming it from the store if this
/// server does not hold it, and make sure its autosave loop runs.
///
/// Drafts recorded under another owner are reported as missing.
async fn open_wizard(
    state: &AppState,
    session: &Session,
    id: ApplicationId,
) -> Result<WizardEngine, PortalError> {
    state.wizards.evict_idle().await;

    let checkout = match state.wizards.checkout(id, &session.user_id).await? {
        Some(checkout) => checkout,
        None => {
            let sink = state.notifications.center_for(&session.user_id);
            let engine = WizardEngine::resume(id, state.drafts.clone(), sink).await?;
            let owned = engine
                .owner()
                .await
                .is_none_or(|owner| owner == session.user_id);
            if !owned {
                return Err(PortalError::DraftNotFound(id));
            }
            state.wizards.adopt(session.user_id.clone(), engine).await?
        }
    };

    if checkout.needs_autosave && !checkout.engine.is_submitted().await {
        state
            .wizards
            .mount_autosave(id, state.config.autosave_interval())
            .await;
    }
    Ok(checkout.engine)
}

async fn draft_response(engine: &WizardEngine) -> Json<DraftResponse> {
    Json(DraftResponse::from(&engine.snapshot().await))
}

// =============================================================================
// APPLICANT HANDLERS
// =============================================================================

/// Start an application for a program.
pub async fn apply_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(program_id): Path<String>,
) -> ApiResult<(StatusCode, Json<DraftResponse>)> {
    state.wizards.evict_idle().await;
    let sink = state.notifications.center_for(&session.user_id);
    let engine = WizardEngine::initialize(
        &state.catalog,
        &ProgramId::new(program_id),
        session.user_id.clone(),
        state.config.today(),
        state.drafts.clone(),
        sink,
    )?;

    let id = engine.application_id();
    state.wizards.adopt(session.user_id.clone(), engine.clone()).await?;
    state
        .wizards
        .mount_autosave(id, state.config.autosave_interval())
        .await;

    Ok((StatusCode::CREATED, draft_response(&engine).await))
}

pub async fn get_draft_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<DraftResponse>> {
    let engine = open_wizard(&state, &session, parse_application_id(&id)?).await?;
    Ok(draft_response(&engine).await)
}

pub async fn update_field_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(request): Json<FieldUpdateRequest>,
) -> ApiResult<Json<DraftResponse>> {
    request.validate()?;
    let engine = open_wizard(&state, &session, parse_application_id(&id)?).await?;
    engine
        .set_field(request.section, request.key, request.value)
        .await?;
    Ok(draft_response(&engine).await)
}

pub async fn update_attachment_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(request): Json<AttachmentUpdateRequest>,
) -> ApiResult<Json<DraftResponse>> {
    let attachment = request.to_attachment()?;
    let engine = open_wizard(&state, &session, parse_application_id(&id)?).await?;
    engine.set_attachment(request.slot, attachment).await?;
    Ok(draft_response(&engine).await)
}

pub async fn certify_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(request): Json<CertifyRequest>,
) -> ApiResult<Json<DraftResponse>> {
    let engine = open_wizard(&state, &session, parse_application_id(&id)?).await?;
    engine.set_certified(request.certified).await?;
    Ok(draft_response(&engine).await)
}

pub async fn next_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<StepResponse>> {
    let engine = open_wizard(&state, &session, parse_application_id(&id)?).await?;
    Ok(Json(StepResponse::at(engine.go_next().await)))
}

pub async fn previous_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<StepResponse>> {
    let engine = open_wizard(&state, &session, parse_application_id(&id)?).await?;
    Ok(Json(StepResponse::at(engine.go_previous().await)))
}

pub async fn jump_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(request): Json<JumpRequest>,
) -> ApiResult<Json<StepResponse>> {
    let engine = open_wizard(&state, &session, parse_application_id(&id)?).await?;
    let index = engine.jump_to(request.index).await?;
    Ok(Json(StepResponse::at(index)))
}

/// Save and exit.
pub async fn save_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<WizardOutcome>> {
    let id = parse_application_id(&id)?;
    let engine = open_wizard(&state, &session, id).await?;
    let outcome = engine.save_and_exit().await;
    if matches!(outcome, WizardOutcome::NavigateTo(_)) {
        state.wizards.close(id).await;
    }
    Ok(Json(outcome))
}

pub async fn submit_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<WizardOutcome>> {
    let id = parse_application_id(&id)?;
    let engine = open_wizard(&state, &session, id).await?;
    let outcome = engine.submit().await?;
    if matches!(outcome, WizardOutcome::NavigateTo(_)) {
        state.wizards.remove(id).await;
    }
    Ok(Json(outcome))
}

pub async fn review_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<ReviewSummary>> {
    let engine = open_wizard(&state, &session, parse_application_id(&id)?).await?;
    Ok(Json(engine.review().await))
}

pub async fn notifications_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Json<Vec<Notification>> {
    Json(state.notifications.center_for(&session.user_id).active())
}

pub async fn dismiss_notification_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<u64>,
) -> StatusCode {
    let center = state.notifications.center_for(&session.user_id);
    if center.dismiss(NotificationId(id)) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// =============================================================================
// DASHBOARDS
// =============================================================================

/// The caller's drafts: everything stored under their id, with the live
/// copy of any wizard this server holds taking precedence.
pub async fn applicant_dashboard_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Json<DashboardResponse> {
    let mut drafts: BTreeMap<ApplicationId, DraftSummaryJson> = BTreeMap::new();
    match state.drafts.drafts_owned_by(&session.user_id).await {
        Ok(stored) => {
            for draft in &stored {
                drafts.insert(draft.application_id(), DraftSummaryJson::from(draft));
            }
        }
        Err(e) => tracing::warn!(
            event = "dashboard_store_failed",
            user_id = %session.user_id,
            error = %e,
            "Stored drafts unavailable; listing open wizards only"
        ),
    }
    for engine in state.wizards.owned_by(&session.user_id).await {
        let draft = engine.snapshot().await;
        drafts.insert(draft.application_id(), DraftSummaryJson::from(&draft));
    }

    Json(DashboardResponse {
        area: "applicant".to_string(),
        user: session,
        drafts: drafts.into_values().collect(),
    })
}

fn staff_dashboard(area: &str, session: Session) -> Json<DashboardResponse> {
    Json(DashboardResponse {
        area: area.to_string(),
        user: session,
        drafts: Vec::new(),
    })
}

pub async fn reviewer_dashboard_handler(Extension(session): Extension<Session>) -> impl IntoResponse {
    staff_dashboard("reviewer", session)
}

pub async fn admin_dashboard_handler(Extension(session): Extension<Session>) -> impl IntoResponse {
    staff_dashboard("admin", session)
}

pub async fn superadmin_dashboard_handler(
    Extension(session): Extension<Session>,
) -> impl IntoResponse {
    staff_dashboard("superadmin", session)
}

// =============================================================================
// TESTS
// =============================================================================
