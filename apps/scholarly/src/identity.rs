//! # Identity
//!
//! Sign-in, the second factor, registration, and session lookup.
//!
//! `IdentityProvider` is the seam; `DemoIdentityProvider` is the in-process
//! implementation seeded from the config's demo accounts. Every password
//! sign-in is followed by a second-factor challenge. `SessionContext`
//! carries one client's `SessionState` through restoration so the
//! `Loading` phase can be observed.

use crate::config::DemoAccount;
use async_trait::async_trait;
use scholarly_core::{PortalError, Role, Session, SessionState, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

/// How long a second-factor challenge stays valid after the password step.
pub const CHALLENGE_TTL: Duration = Duration::from_secs(5 * 60);

/// Opaque bearer token of a signed-in session.
pub type SessionToken = String;

/// Result of the password step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Signed in without a second factor.
    Authenticated { token: SessionToken, session: Session },
    /// Password accepted; a code must be verified against `challenge`.
    RequiresSecondFactor { challenge: String },
}

/// Source of sessions.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up the session behind a token. `None` for unknown tokens.
    async fn restore_session(&self, token: &str) -> Option<Session>;

    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, PortalError>;

    /// Complete a login. Unknown challenges fail with `SessionExpired`.
    async fn verify_second_factor(
        &self,
        challenge: &str,
        code: &str,
    ) -> Result<(SessionToken, Session), PortalError>;

    async fn logout(&self, token: &str);

    /// Create an applicant account and sign it in.
    async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<(SessionToken, Session), PortalError>;

    async fn forgot_password(&self, email: &str) -> Result<(), PortalError>;

    async fn reset_password(&self, token: &str, password: &str) -> Result<(), PortalError>;
}

// =============================================================================
// CONSTANT-TIME COMPARISON
// =============================================================================

/// Compare secrets without leaking where they differ.
///
/// Both sides are padded to the same length so `ct_eq` always runs over
/// the same number of bytes.
fn secrets_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), PortalError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(PortalError::ValidationFailed(format!(
            "Invalid email address: {}",
            email
        ))),
    }
}

fn validate_non_empty(value: &str, what: &str) -> Result<(), PortalError> {
    if value.trim().is_empty() {
        return Err(PortalError::ValidationFailed(format!("{} is required", what)));
    }
    Ok(())
}

// =============================================================================
// DEMO IDENTITY PROVIDER
// =============================================================================

#[derive(Debug, Clone)]
struct Account {
    user_id: UserId,
    password: String,
    name: String,
    role: Role,
    profile_complete: bool,
}

#[derive(Debug, Clone)]
struct Challenge {
    email: String,
    issued: Instant,
}

impl Challenge {
    fn is_live(&self, now: Instant) -> bool {
        now.duration_since(self.issued) < CHALLENGE_TTL
    }
}

/// In-process identity provider with seeded accounts.
///
/// Each account holds at most one pending challenge; a new password step
/// replaces it. Challenges older than [`CHALLENGE_TTL`] are dropped.
#[derive(Debug)]
pub struct DemoIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
    sessions: RwLock<HashMap<SessionToken, Session>>,
    challenges: RwLock<HashMap<String, Challenge>>,
    second_factor_code: String,
    next_user_id: AtomicU64,
}

impl DemoIdentityProvider {
    pub fn new(accounts: &[DemoAccount], second_factor_code: impl Into<String>) -> Self {
        let mut seeded = HashMap::new();
        let mut next_user_id = 1u64;
        for account in accounts {
            seeded.insert(
                normalize_email(&account.email),
                Account {
                    user_id: UserId::new(next_user_id.to_string()),
                    password: account.password.clone(),
                    name: account.name.clone(),
                    role: account.role,
                    profile_complete: account.profile_complete,
                },
            );
            next_user_id += 1;
        }

        Self {
            accounts: RwLock::new(seeded),
            sessions: RwLock::new(HashMap::new()),
            challenges: RwLock::new(HashMap::new()),
            second_factor_code: second_factor_code.into(),
            next_user_id: AtomicU64::new(next_user_id),
        }
    }

    fn open_session(&self, email: &str, account: &Account) -> (SessionToken, Session) {
        let session = Session::new(
            account.user_id.clone(),
            email,
            account.name.clone(),
            account.role,
            account.profile_complete,
        );
        let token = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.clone(), session.clone());
        (token, session)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of second-factor challenges still held.
    pub fn pending_challenges(&self) -> usize {
        self.challenges.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl IdentityProvider for DemoIdentityProvider {
    async fn restore_session(&self, token: &str) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(token)
            .cloned()
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, PortalError> {
        let email = normalize_email(email);
        let accepted = {
            let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
            accounts
                .get(&email)
                .is_some_and(|account| secrets_match(password, &account.password))
        };
        if !accepted {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_credentials",
                "Login rejected"
            );
            return Err(PortalError::AuthenticationFailed);
        }

        let challenge = Uuid::new_v4().to_string();
        let now = Instant::now();
        let mut challenges = self.challenges.write().unwrap_or_else(|e| e.into_inner());
        challenges.retain(|_, pending| pending.is_live(now) && pending.email != email);
        challenges.insert(
            challenge.clone(),
            Challenge {
                email,
                issued: now,
            },
        );
        Ok(LoginOutcome::RequiresSecondFactor { challenge })
    }

    async fn verify_second_factor(
        &self,
        challenge: &str,
        code: &str,
    ) -> Result<(SessionToken, Session), PortalError> {
        let pending = self
            .challenges
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(challenge)
            .cloned()
            .ok_or(PortalError::SessionExpired)?;
        if !pending.is_live(Instant::now()) {
            self.challenges
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .remove(challenge);
            return Err(PortalError::SessionExpired);
        }

        if !secrets_match(code.trim(), &self.second_factor_code) {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_second_factor",
                "Second factor rejected"
            );
            return Err(PortalError::AuthenticationFailed);
        }

        // A challenge is good for one successful verification.
        let consumed = self
            .challenges
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(challenge);
        let Some(Challenge { email, .. }) = consumed else {
            return Err(PortalError::SessionExpired);
        };

        let account = self
            .accounts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&email)
            .cloned()
            .ok_or(PortalError::SessionExpired)?;
        Ok(self.open_session(&email, &account))
    }

    async fn logout(&self, token: &str) {
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(token);
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<(SessionToken, Session), PortalError> {
        validate_email(email)?;
        validate_non_empty(password, "Password")?;
        validate_non_empty(name, "Name")?;

        let email = normalize_email(email);
        let account = {
            let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
            if accounts.contains_key(&email) {
                return Err(PortalError::ValidationFailed(format!(
                    "An account already exists for {}",
                    email
                )));
            }
            let id = self.next_user_id.fetch_add(1, Ordering::SeqCst);
            let account = Account {
                user_id: UserId::new(id.to_string()),
                password: password.to_string(),
                name: name.trim().to_string(),
                role: Role::Applicant,
                profile_complete: false,
            };
            accounts.insert(email.clone(), account.clone());
            account
        };

        tracing::info!(event = "account_registered", user_id = %account.user_id, "Registered applicant");
        Ok(self.open_session(&email, &account))
    }

    async fn forgot_password(&self, email: &str) -> Result<(), PortalError> {
        validate_email(email)
    }

    async fn reset_password(&self, token: &str, password: &str) -> Result<(), PortalError> {
        validate_non_empty(token, "Reset token")?;
        validate_non_empty(password, "Password")
    }
}

// =============================================================================
// SESSION CONTEXT
// =============================================================================

/// One client's view of its session, observable while it changes.
#[derive(Debug)]
pub struct SessionContext {
    state: watch::Sender<SessionState>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    /// A context in the `Loading` state.
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self { state }
    }

    /// The current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolve the session behind `token`. Stays `Loading` until the
    /// provider answers.
    pub async fn restore(&self, provider: &dyn IdentityProvider, token: Option<&str>) {
        self.state.send_replace(SessionState::Loading);
        let restored = match token {
            Some(token) => provider.restore_session(token).await,
            None => None,
        };
        self.state.send_replace(SessionState::from(restored));
    }

    pub fn sign_in(&self, session: Session) {
        self.state.send_replace(SessionState::Authenticated(session));
    }

    pub fn sign_out(&self) {
        self.state.send_replace(SessionState::Unauthenticated);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortalConfig;

    fn provider() -> DemoIdentityProvider {
        let config = PortalConfig::default();
        DemoIdentityProvider::new(&config.accounts, config.second_factor_code)
    }

    async fn sign_in(provider: &DemoIdentityProvider, email: &str) -> (SessionToken, Session) {
        let LoginOutcome::RequiresSecondFactor { challenge } =
            provider.login(email, "password").await.expect("login")
        else {
            unreachable!("demo logins always require a second factor");
        };
        provider
            .verify_second_factor(&challenge, "123456")
            .await
            .expect("verify")
    }

    #[test]
    fn secrets_match_requires_equal_length() {
        assert!(secrets_match("123456", "123456"));
        assert!(!secrets_match("12345", "123456"));
        assert!(!secrets_match("1234567", "123456"));
        assert!(!secrets_match("", "123456"));
    }

    #[tokio::test]
    async fn login_always_asks_for_second_factor() {
        let provider = provider();
        let outcome = provider.login("user@example.com", "password").await.expect("login");
        assert!(matches!(outcome, LoginOutcome::RequiresSecondFactor { .. }));
        assert_eq!(provider.session_count(), 0);
    }

    #[tokio::test]
    async fn wrong_password_fails() {
        let provider = provider();
        assert_eq!(
            provider.login("user@example.com", "nope").await,
            Err(PortalError::AuthenticationFailed)
        );
        assert_eq!(
            provider.login("nobody@example.com", "password").await,
            Err(PortalError::AuthenticationFailed)
        );
    }

    #[tokio::test]
    async fn unknown_challenge_is_session_expired() {
        let provider = provider();
        assert_eq!(
            provider.verify_second_factor("missing", "123456").await,
            Err(PortalError::SessionExpired)
        );
    }

    #[tokio::test]
    async fn wrong_code_keeps_challenge() {
        let provider = provider();
        let LoginOutcome::RequiresSecondFactor { challenge } =
            provider.login("admin@example.com", "password").await.expect("login")
        else {
            unreachable!("demo logins always require a second factor");
        };

        assert_eq!(
            provider.verify_second_factor(&challenge, "000000").await,
            Err(PortalError::AuthenticationFailed)
        );
        let (_, session) = provider
            .verify_second_factor(&challenge, "123456")
            .await
            .expect("retry");
        assert_eq!(session.role, Role::Admin);

        assert_eq!(
            provider.verify_second_factor(&challenge, "123456").await,
            Err(PortalError::SessionExpired)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stale_challenge_expires() {
        let provider = provider();
        let LoginOutcome::RequiresSecondFactor { challenge } =
            provider.login("user@example.com", "password").await.expect("login")
        else {
            unreachable!("demo logins always require a second factor");
        };

        tokio::time::advance(CHALLENGE_TTL + Duration::from_secs(1)).await;
        assert_eq!(
            provider.verify_second_factor(&challenge, "123456").await,
            Err(PortalError::SessionExpired)
        );
        assert_eq!(provider.pending_challenges(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_challenges_do_not_accumulate() {
        let provider = provider();
        for _ in 0..10 {
            provider.login("user@example.com", "password").await.expect("login");
        }
        assert_eq!(provider.pending_challenges(), 1);

        provider.login("admin@example.com", "password").await.expect("login");
        assert_eq!(provider.pending_challenges(), 2);

        tokio::time::advance(CHALLENGE_TTL).await;
        provider.login("reviewer@example.com", "password").await.expect("login");
        assert_eq!(provider.pending_challenges(), 1);
    }

    #[tokio::test]
    async fn newer_login_replaces_pending_challenge() {
        let provider = provider();
        let LoginOutcome::RequiresSecondFactor { challenge: first } =
            provider.login("user@example.com", "password").await.expect("login")
        else {
            unreachable!("demo logins always require a second factor");
        };
        sign_in(&provider, "user@example.com").await;
        assert_eq!(
            provider.verify_second_factor(&first, "123456").await,
            Err(PortalError::SessionExpired)
        );
    }

    #[tokio::test]
    async fn session_restores_until_logout() {
        let provider = provider();
        let (token, session) = sign_in(&provider, "User@Example.com").await;
        assert_eq!(session.email, "user@example.com");
        assert_eq!(provider.restore_session(&token).await, Some(session));

        provider.logout(&token).await;
        assert_eq!(provider.restore_session(&token).await, None);
    }

    #[tokio::test]
    async fn register_creates_incomplete_applicant() {
        let provider = provider();
        let (token, session) = provider
            .register("new@example.com", "pw", "New Person")
            .await
            .expect("register");

        assert_eq!(session.role, Role::Applicant);
        assert!(!session.profile_complete);
        assert!(provider.restore_session(&token).await.is_some());

        let duplicate = provider.register("NEW@example.com", "pw", "Again").await;
        assert!(matches!(duplicate, Err(PortalError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn password_recovery_accepts_well_formed_input() {
        let provider = provider();
        assert!(provider.forgot_password("anyone@example.com").await.is_ok());
        assert!(provider.forgot_password("not-an-email").await.is_err());
        assert!(provider.reset_password("token", "new").await.is_ok());
        assert!(provider.reset_password("", "new").await.is_err());
    }

    #[tokio::test]
    async fn context_is_loading_until_restored() {
        let provider = provider();
        let (token, _) = sign_in(&provider, "reviewer@example.com").await;

        let context = SessionContext::new();
        assert!(context.state().is_loading());

        context.restore(&provider, Some(&token)).await;
        assert_eq!(
            context.state().session().map(|s| s.role),
            Some(Role::Reviewer)
        );

        context.restore(&provider, None).await;
        assert_eq!(context.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn context_notifies_subscribers() {
        let context = SessionContext::new();
        let mut rx = context.subscribe();
        context.sign_out();
        rx.changed().await.expect("changed");
        assert_eq!(*rx.borrow(), SessionState::Unauthenticated);
    }
}
