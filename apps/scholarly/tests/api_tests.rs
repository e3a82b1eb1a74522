//! Integration tests for the Scholarly HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderValue, header::AUTHORIZATION};
use axum_test::TestServer;
use chrono::NaiveDate;
use scholarly::api::{
    AppState, DashboardResponse, DraftResponse, ErrorResponse, HealthResponse, LoginResponse,
    ProgramJson, RedirectResponse, SessionResponse, StepResponse, TokenResponse, create_router,
};
use scholarly::config::PortalConfig;
use scholarly::identity::DemoIdentityProvider;
use scholarly::persistence::InMemoryDraftStore;
use scholarly::wizard::{SAVED_MESSAGE, SUBMITTED_MESSAGE, WizardOutcome};
use scholarly_core::{DraftStatus, Notification, ProgramCatalog, ReviewSummary, Role};
use serde_json::json;
use std::sync::Arc;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn test_config(today: NaiveDate) -> PortalConfig {
    PortalConfig {
        save_latency_ms: 0,
        submit_latency_ms: 0,
        rate_limit: 0,
        today: Some(today),
        ..PortalConfig::default()
    }
}

fn create_test_server_with(today: NaiveDate, drafts: Arc<InMemoryDraftStore>) -> TestServer {
    let config = test_config(today);
    let identity = Arc::new(DemoIdentityProvider::new(
        &config.accounts,
        config.second_factor_code.clone(),
    ));
    let state = AppState::new(config, ProgramCatalog::demo(), identity, drafts);
    TestServer::new(create_router(state)).unwrap()
}

fn create_test_server_on(today: NaiveDate) -> TestServer {
    create_test_server_with(today, Arc::new(InMemoryDraftStore::new()))
}

fn create_test_server() -> TestServer {
    create_test_server_on(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
}

fn bearer(token: &str) -> HeaderValue {
    format!("Bearer {}", token).parse::<HeaderValue>().unwrap()
}

/// Run both sign-in steps and return the session token.
async fn sign_in(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/auth/login")
        .json(&json!({ "email": email, "password": "password" }))
        .await;
    response.assert_status_ok();
    let challenge = match response.json::<LoginResponse>() {
        LoginResponse::RequiresSecondFactor { challenge } => challenge,
        LoginResponse::Authenticated { .. } => panic!("second factor was skipped"),
    };

    let response = server
        .post("/auth/verify-mfa")
        .json(&json!({ "challenge": challenge, "code": "123456" }))
        .await;
    response.assert_status_ok();
    response.json::<TokenResponse>().token
}

async fn start_application(server: &TestServer, token: &str, program: &str) -> DraftResponse {
    let response = server
        .post(&format!("/applicant/apply/{}", program))
        .add_header(AUTHORIZATION, bearer(token))
        .await;
    assert_eq!(response.status_code().as_u16(), 201);
    response.json()
}

// =============================================================================
// PUBLIC ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_programs_lists_whole_directory() {
    let server = create_test_server();

    let response = server.get("/programs").await;

    response.assert_status_ok();
    let programs: Vec<ProgramJson> = response.json();
    assert_eq!(programs.len(), 6);
    assert!(programs.iter().all(|p| p.open));
}

#[tokio::test]
async fn test_programs_filters_combine() {
    let server = create_test_server();

    let response = server
        .get("/programs")
        .add_query_param("level", "Graduate")
        .add_query_param("country", "International")
        .await;

    response.assert_status_ok();
    let programs: Vec<ProgramJson> = response.json();
    let ids: Vec<&str> = programs.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "6"]);
}

#[tokio::test]
async fn test_programs_marks_passed_deadline_closed() {
    let server = create_test_server_on(NaiveDate::from_ymd_opt(2027, 11, 16).unwrap());

    let programs: Vec<ProgramJson> = server.get("/programs").await.json();
    let stem = programs.iter().find(|p| p.id == "2").unwrap();
    assert!(!stem.open);
}

// =============================================================================
// AUTH TESTS
// =============================================================================

#[tokio::test]
async fn test_login_requires_second_factor() {
    let server = create_test_server();
    let token = sign_in(&server, "user@example.com").await;

    let response = server
        .get("/auth/session")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    response.assert_status_ok();
    match response.json::<SessionResponse>() {
        SessionResponse::Authenticated { session } => {
            assert_eq!(session.email, "user@example.com");
            assert_eq!(session.role, Role::Applicant);
        }
        SessionResponse::Unauthenticated => panic!("session was not restored"),
    }
}

#[tokio::test]
async fn test_login_wrong_password_is_unauthorized() {
    let server = create_test_server();

    let response = server
        .post("/auth/login")
        .json(&json!({ "email": "user@example.com", "password": "nope" }))
        .await;

    assert_eq!(response.status_code().as_u16(), 401);
    let error: ErrorResponse = response.json();
    assert!(!error.error.is_empty());
}

#[tokio::test]
async fn test_verify_unknown_challenge_is_unauthorized() {
    let server = create_test_server();

    let response = server
        .post("/auth/verify-mfa")
        .json(&json!({ "challenge": "never-issued", "code": "123456" }))
        .await;

    assert_eq!(response.status_code().as_u16(), 401);
}

#[tokio::test]
async fn test_register_signs_in_incomplete_applicant() {
    let server = create_test_server();

    let response = server
        .post("/auth/register")
        .json(&json!({
            "email": "new@example.com",
            "password": "secret-pass",
            "name": "New Student",
        }))
        .await;

    assert_eq!(response.status_code().as_u16(), 201);
    let body: TokenResponse = response.json();
    assert_eq!(body.session.role, Role::Applicant);
    assert!(!body.session.profile_complete);

    let duplicate = server
        .post("/auth/register")
        .json(&json!({
            "email": "new@example.com",
            "password": "secret-pass",
            "name": "New Student",
        }))
        .await;
    assert_eq!(duplicate.status_code().as_u16(), 400);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let server = create_test_server();
    let token = sign_in(&server, "user@example.com").await;

    server
        .post("/auth/logout")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status_ok();

    let response = server
        .get("/applicant/dashboard")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code().as_u16(), 401);
}

// =============================================================================
// ROUTE PROTECTION TESTS
// =============================================================================

#[tokio::test]
async fn test_protected_route_without_session_redirects_to_login() {
    let server = create_test_server();

    let response = server.get("/applicant/dashboard").await;

    assert_eq!(response.status_code().as_u16(), 401);
    let body: RedirectResponse = response.json();
    assert_eq!(body.redirect, "/login");
    assert_eq!(body.from.as_deref(), Some("/applicant/dashboard"));
}

#[tokio::test]
async fn test_applicant_on_admin_area_redirects_to_unauthorized() {
    let server = create_test_server();
    let token = sign_in(&server, "user@example.com").await;

    let response = server
        .get("/admin/dashboard")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    assert_eq!(response.status_code().as_u16(), 403);
    let body: RedirectResponse = response.json();
    assert_eq!(body.redirect, "/unauthorized");
}

#[tokio::test]
async fn test_superadmin_reaches_every_dashboard() {
    let server = create_test_server();
    let token = sign_in(&server, "superadmin@example.com").await;

    for area in ["applicant", "reviewer", "admin", "superadmin"] {
        let response = server
            .get(&format!("/{}/dashboard", area))
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status_ok();
        let body: DashboardResponse = response.json();
        assert_eq!(body.area, area);
        assert_eq!(body.user.role, Role::Superadmin);
    }
}

#[tokio::test]
async fn test_reviewer_cannot_reach_superadmin_area() {
    let server = create_test_server();
    let token = sign_in(&server, "reviewer@example.com").await;

    server
        .get("/reviewer/dashboard")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status_ok();

    let response = server
        .get("/superadmin/dashboard")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code().as_u16(), 403);
}

// =============================================================================
// WIZARD TESTS
// =============================================================================

#[tokio::test]
async fn test_apply_opens_first_step() {
    let server = create_test_server();
    let token = sign_in(&server, "user@example.com").await;

    let draft = start_application(&server, &token, "1").await;

    assert_eq!(draft.program_id, "1");
    assert_eq!(draft.current_step_index, 0);
    assert_eq!(draft.step_count, 7);
    assert_eq!(draft.status, DraftStatus::InProgress);
    assert_eq!(draft.sections.len(), 5);
    assert_eq!(draft.attachments.len(), 4);
}

#[tokio::test]
async fn test_apply_unknown_program_is_not_found() {
    let server = create_test_server();
    let token = sign_in(&server, "user@example.com").await;

    let response = server
        .post("/applicant/apply/99")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    assert_eq!(response.status_code().as_u16(), 404);
}

#[tokio::test]
async fn test_apply_after_deadline_is_not_found() {
    let server = create_test_server_on(NaiveDate::from_ymd_opt(2027, 11, 16).unwrap());
    let token = sign_in(&server, "user@example.com").await;

    let response = server
        .post("/applicant/apply/2")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    assert_eq!(response.status_code().as_u16(), 404);
}

#[tokio::test]
async fn test_fields_survive_navigation() {
    let server = create_test_server();
    let token = sign_in(&server, "user@example.com").await;
    let draft = start_application(&server, &token, "1").await;
    let base = format!("/applicant/drafts/{}", draft.application_id);

    server
        .put(&format!("{}/fields", base))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "section": "personal", "key": "firstName", "value": "Ada" }))
        .await
        .assert_status_ok();

    for expected in 1..=3 {
        let step: StepResponse = server
            .post(&format!("{}/next", base))
            .add_header(AUTHORIZATION, bearer(&token))
            .await
            .json();
        assert_eq!(step.current_step_index, expected);
    }

    let step: StepResponse = server
        .post(&format!("{}/previous", base))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(step.current_step_index, 2);

    let current: DraftResponse = server
        .get(&base)
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(current.current_step_index, 2);
    assert_eq!(
        current.sections["personal"].get("firstName").map(String::as_str),
        Some("Ada")
    );
    assert!(current.dirty);
}

#[tokio::test]
async fn test_field_update_rejects_documents_section() {
    let server = create_test_server();
    let token = sign_in(&server, "user@example.com").await;
    let draft = start_application(&server, &token, "1").await;

    let response = server
        .put(&format!("/applicant/drafts/{}/fields", draft.application_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "section": "documents", "key": "transcripts", "value": "x" }))
        .await;

    assert_eq!(response.status_code().as_u16(), 400);
}

#[tokio::test]
async fn test_jump_out_of_range_is_bad_request() {
    let server = create_test_server();
    let token = sign_in(&server, "user@example.com").await;
    let draft = start_application(&server, &token, "1").await;

    let response = server
        .post(&format!("/applicant/drafts/{}/jump", draft.application_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "index": 7 }))
        .await;

    assert_eq!(response.status_code().as_u16(), 400);
}

#[tokio::test]
async fn test_submit_before_review_is_conflict() {
    let server = create_test_server();
    let token = sign_in(&server, "user@example.com").await;
    let draft = start_application(&server, &token, "1").await;

    let response = server
        .post(&format!("/applicant/drafts/{}/submit", draft.application_id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    assert_eq!(response.status_code().as_u16(), 409);
}

#[tokio::test]
async fn test_attachment_then_review_then_submit() {
    let server = create_test_server();
    let token = sign_in(&server, "user@example.com").await;
    let draft = start_application(&server, &token, "3").await;
    let base = format!("/applicant/drafts/{}", draft.application_id);

    let updated: DraftResponse = server
        .put(&format!("{}/attachments", base))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({
            "slot": "transcripts",
            "file": { "name": "transcript.pdf", "size_bytes": 2048, "content_type": "application/pdf" },
        }))
        .await
        .json();
    assert!(updated.attachments["transcripts"].is_present());

    server
        .put(&format!("{}/certification", base))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "certified": true }))
        .await
        .assert_status_ok();

    let step: StepResponse = server
        .post(&format!("{}/jump", base))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "index": 6 }))
        .await
        .json();
    assert_eq!(step.current_step_index, 6);

    let review: ReviewSummary = server
        .get(&format!("{}/review", base))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert!(!review.is_complete());

    let outcome: WizardOutcome = server
        .post(&format!("{}/submit", base))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(
        outcome,
        WizardOutcome::NavigateTo("/applicant/dashboard".to_string())
    );

    let submitted: DraftResponse = server
        .get(&base)
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(submitted.status, DraftStatus::Submitted);

    let again = server
        .put(&format!("{}/fields", base))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "section": "essays", "key": "goals", "value": "late" }))
        .await;
    assert_eq!(again.status_code().as_u16(), 409);

    let notifications: Vec<Notification> = server
        .get("/applicant/notifications")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert!(notifications.iter().any(|n| n.message == SUBMITTED_MESSAGE));
}

#[tokio::test]
async fn test_save_and_exit_notifies_and_lists_on_dashboard() {
    let server = create_test_server();
    let token = sign_in(&server, "user@example.com").await;
    let draft = start_application(&server, &token, "1").await;
    let base = format!("/applicant/drafts/{}", draft.application_id);

    let outcome: WizardOutcome = server
        .post(&format!("{}/save", base))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(
        outcome,
        WizardOutcome::NavigateTo("/applicant/dashboard".to_string())
    );

    let notifications: Vec<Notification> = server
        .get("/applicant/notifications")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    let saved = notifications
        .iter()
        .find(|n| n.message == SAVED_MESSAGE)
        .unwrap();

    server
        .delete(&format!("/applicant/notifications/{}", saved.id.0))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);

    let dashboard: DashboardResponse = server
        .get("/applicant/dashboard")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(dashboard.drafts.len(), 1);
    assert_eq!(dashboard.drafts[0].application_id, draft.application_id);
    assert!(dashboard.drafts[0].last_saved_at.is_some());
}

#[tokio::test]
async fn test_other_applicant_cannot_open_draft() {
    let server = create_test_server();
    let owner = sign_in(&server, "user@example.com").await;
    let draft = start_application(&server, &owner, "1").await;

    let other = server
        .post("/auth/register")
        .json(&json!({ "email": "other@example.com", "password": "secret-pass", "name": "Other" }))
        .await
        .json::<TokenResponse>()
        .token;

    let response = server
        .get(&format!("/applicant/drafts/{}", draft.application_id))
        .add_header(AUTHORIZATION, bearer(&other))
        .await;
    assert_eq!(response.status_code().as_u16(), 404);
}

#[tokio::test]
async fn test_drafts_and_ownership_survive_restart() {
    let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
    let store = Arc::new(InMemoryDraftStore::new());

    let application_id = {
        let server = create_test_server_with(today, store.clone());
        let token = sign_in(&server, "user@example.com").await;
        let draft = start_application(&server, &token, "2").await;
        let base = format!("/applicant/drafts/{}", draft.application_id);
        server
            .put(&format!("{}/fields", base))
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "section": "personal", "key": "firstName", "value": "Ada" }))
            .await
            .assert_status_ok();
        server
            .post(&format!("{}/save", base))
            .add_header(AUTHORIZATION, bearer(&token))
            .await
            .assert_status_ok();
        draft.application_id
    };

    let server = create_test_server_with(today, store);
    let token = sign_in(&server, "user@example.com").await;
    let dashboard: DashboardResponse = server
        .get("/applicant/dashboard")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(dashboard.drafts.len(), 1);
    assert_eq!(dashboard.drafts[0].application_id, application_id);
    assert_eq!(dashboard.drafts[0].program_id, "2");

    let other = server
        .post("/auth/register")
        .json(&json!({ "email": "other@example.com", "password": "secret-pass", "name": "Other" }))
        .await
        .json::<TokenResponse>()
        .token;
    let base = format!("/applicant/drafts/{}", application_id);
    let response = server
        .get(&base)
        .add_header(AUTHORIZATION, bearer(&other))
        .await;
    assert_eq!(response.status_code().as_u16(), 404);

    let resumed: DraftResponse = server
        .get(&base)
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(
        resumed.sections["personal"].get("firstName").map(String::as_str),
        Some("Ada")
    );
}

#[tokio::test]
async fn test_submitted_draft_stays_on_dashboard() {
    let server = create_test_server();
    let token = sign_in(&server, "user@example.com").await;
    let draft = start_application(&server, &token, "1").await;
    let base = format!("/applicant/drafts/{}", draft.application_id);

    server
        .post(&format!("{}/jump", base))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "index": 6 }))
        .await
        .assert_status_ok();
    server
        .post(&format!("{}/submit", base))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status_ok();

    let dashboard: DashboardResponse = server
        .get("/applicant/dashboard")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(dashboard.drafts.len(), 1);
    assert_eq!(dashboard.drafts[0].status, DraftStatus::Submitted);

    let current: DraftResponse = server
        .get(&base)
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(current.status, DraftStatus::Submitted);
}

#[tokio::test]
async fn test_malformed_draft_id_is_bad_request() {
    let server = create_test_server();
    let token = sign_in(&server, "user@example.com").await;

    let response = server
        .get("/applicant/drafts/not-a-uuid")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code().as_u16(), 400);
}
