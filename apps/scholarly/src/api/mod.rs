//! # Scholarly HTTP API Module
//!
//! This module implements the HTTP JSON API using axum.
//!
//! ## Endpoints
//!
//! Public:
//! - `GET /health` - Health check
//! - `GET /programs?q=&level=&field=&country=` - Scholarship directory search
//! - `POST /auth/login`, `POST /auth/verify-mfa` - Two-step sign-in
//! - `POST /auth/register` - Create an applicant account
//! - `POST /auth/forgot-password`, `POST /auth/reset-password` - Password recovery
//! - `POST /auth/logout`, `GET /auth/session` - Session lifecycle
//!
//! Applicant area (`/applicant/*`):
//! - `POST /applicant/apply/{program_id}` - Start an application
//! - `GET /applicant/drafts/{id}` and its `fields`, `attachments`,
//!   `certification`, `next`, `previous`, `jump`, `save`, `submit`, `review`
//! - `GET /applicant/notifications`, `DELETE /applicant/notifications/{id}`
//! - `GET /applicant/dashboard`
//!
//! Staff areas: `GET /reviewer/dashboard`, `GET /admin/dashboard`,
//! `GET /superadmin/dashboard`.
//!
//! ## Security Configuration
//!
//! - `SCHOLARLY_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `SCHOLARLY_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)

mod auth;
mod handlers;
mod middleware;
mod registry;
mod types;

// Re-exports for external use
pub use auth::{bearer_token, resolve_session};
pub use handlers::{ApiError, status_for};
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use registry::{Checkout, WizardRegistry, WizardSlot};
pub use types::{
    AckResponse, AttachmentUpdateRequest, CertifyRequest, DashboardResponse, DraftResponse,
    DraftSummaryJson, ErrorResponse, FieldUpdateRequest, ForgotPasswordRequest, HealthResponse,
    JumpRequest, LoginRequest, LoginResponse, ProgramJson, ProgramSearchParams, RedirectResponse,
    RegisterRequest, ResetPasswordRequest, SessionResponse, StepResponse, TokenResponse,
    VerifyRequest,
};

use crate::config::PortalConfig;
use crate::identity::{DemoIdentityProvider, IdentityProvider};
use crate::notify::NotificationHub;
use crate::persistence::{DraftStore, InMemoryDraftStore, PersistentDraftStore};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use scholarly_core::{AccessGuard, PortalError, ProgramCatalog, RouteTable};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PortalConfig>,
    pub catalog: Arc<ProgramCatalog>,
    pub identity: Arc<dyn IdentityProvider>,
    pub drafts: Arc<dyn DraftStore>,
    pub notifications: Arc<NotificationHub>,
    pub wizards: Arc<WizardRegistry>,
    pub routes: Arc<RouteTable>,
    pub guard: AccessGuard,
}

impl AppState {
    /// Assemble state from explicit collaborators.
    pub fn new(
        config: PortalConfig,
        catalog: ProgramCatalog,
        identity: Arc<dyn IdentityProvider>,
        drafts: Arc<dyn DraftStore>,
    ) -> Self {
        let notifications = Arc::new(NotificationHub::new(config.notification_duration_ms));
        let wizards = Arc::new(WizardRegistry::new(config.wizard_idle_timeout()));
        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            identity,
            drafts,
            notifications,
            wizards,
            routes: Arc::new(RouteTable::default()),
            guard: AccessGuard::new(),
        }
    }

    /// Demo identity provider, demo catalog, and the draft store the
    /// config selects (redb when `draft_database` is set).
    pub fn from_config(config: PortalConfig) -> Result<Self, PortalError> {
        let identity: Arc<dyn IdentityProvider> = Arc::new(DemoIdentityProvider::new(
            &config.accounts,
            config.second_factor_code.clone(),
        ));
        let drafts: Arc<dyn DraftStore> = match &config.draft_database {
            Some(path) => {
                tracing::info!("Draft storage: redb at {}", path.display());
                Arc::new(PersistentDraftStore::open(path)?)
            }
            None => {
                tracing::info!("Draft storage: in-memory");
                Arc::new(InMemoryDraftStore::with_latency(
                    config.save_latency(),
                    config.submit_latency(),
                ))
            }
        };
        Ok(Self::new(config, ProgramCatalog::demo(), identity, drafts))
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build the CORS layer from the configured origin list.
///
/// - `"*"`: allows all origins
/// - unset: localhost only
/// - otherwise: the comma-separated origins that parse
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (SCHOLARLY_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(ALLOWED_METHODS)
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:5173",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Rate Limiting - global request budget (if enabled)
/// 4. Session guard - role checks on the protected route groups
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(state.config.cors_origins.as_deref());

    let rate_limit = state.config.rate_limit;
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/programs", get(handlers::programs_handler))
        // Auth
        .route("/auth/login", post(handlers::login_handler))
        .route("/auth/verify-mfa", post(handlers::verify_mfa_handler))
        .route("/auth/register", post(handlers::register_handler))
        .route("/auth/forgot-password", post(handlers::forgot_password_handler))
        .route("/auth/reset-password", post(handlers::reset_password_handler))
        .route("/auth/logout", post(handlers::logout_handler))
        .route("/auth/session", get(handlers::session_handler))
        // Applicant area
        .route("/applicant/dashboard", get(handlers::applicant_dashboard_handler))
        .route("/applicant/apply/{program_id}", post(handlers::apply_handler))
        .route("/applicant/drafts/{id}", get(handlers::get_draft_handler))
        .route("/applicant/drafts/{id}/fields", put(handlers::update_field_handler))
        .route(
            "/applicant/drafts/{id}/attachments",
            put(handlers::update_attachment_handler),
        )
        .route(
            "/applicant/drafts/{id}/certification",
            put(handlers::certify_handler),
        )
        .route("/applicant/drafts/{id}/next", post(handlers::next_handler))
        .route("/applicant/drafts/{id}/previous", post(handlers::previous_handler))
        .route("/applicant/drafts/{id}/jump", post(handlers::jump_handler))
        .route("/applicant/drafts/{id}/save", post(handlers::save_handler))
        .route("/applicant/drafts/{id}/submit", post(handlers::submit_handler))
        .route("/applicant/drafts/{id}/review", get(handlers::review_handler))
        .route("/applicant/notifications", get(handlers::notifications_handler))
        .route(
            "/applicant/notifications/{id}",
            delete(handlers::dismiss_notification_handler),
        )
        // Staff areas
        .route("/reviewer/dashboard", get(handlers::reviewer_dashboard_handler))
        .route("/admin/dashboard", get(handlers::admin_dashboard_handler))
        .route(
            "/superadmin/dashboard",
            get(handlers::superadmin_dashboard_handler),
        );

    // Session guard (innermost - runs last on request)
    router = router.layer(axum_middleware::from_fn_with_state(
        state.clone(),
        auth::session_guard,
    ));

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), PortalError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| PortalError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Scholarly HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| PortalError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

// =============================================================================
// TESTS
// =============================================================================
