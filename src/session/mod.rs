//! Session store: authentication state, hydration, login/logout/reload.
//!
//! DESIGN
//! ======
//! The persisted token is the source of truth across restarts; the in-memory
//! session is a cache of its validity. `SessionStore` is an explicit,
//! injectable container (no ambient globals): it owns a
//! [`watch`] channel carrying the current [`SessionState`], so any number of
//! consumers (the router, a status bar) observe every transition.
//!
//! Mutating operations take `&mut self`. Only one of `bootstrap`, `login`,
//! `logout`, `reload` can be in flight per store, and each one finishes
//! (success or failure) before the next can start.
//!
//! Phases:
//!
//! ```text
//! BOOTSTRAPPING --no token / fetch failed--> UNAUTHENTICATED
//! BOOTSTRAPPING --profile fetched-----------> AUTHENTICATED
//! UNAUTHENTICATED|AUTHENTICATED --login()---> AUTHENTICATING
//! AUTHENTICATING --token + profile----------> AUTHENTICATED
//! AUTHENTICATING --any failure--------------> UNAUTHENTICATED
//! AUTHENTICATED --logout() / reload() 401---> UNAUTHENTICATED
//! ```
//!
//! ERROR HANDLING
//! ==============
//! Only an authorization failure (401/403) on a profile fetch discards a
//! persisted token on its own. Network and server errors during `bootstrap`
//! leave the token on disk so a later run can retry; during `reload` they
//! are surfaced to the caller and the session is left as it was.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::api::types::{Profile, Role};
use crate::api::ApiError;
use crate::storage::{EMAIL_KEY, StorageError, TOKEN_KEY, TokenStore, remove_token_and_email};

// =============================================================================
// BACKEND SEAM
// =============================================================================

/// One way of turning a token into a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileLookup {
    /// `GET /users/me`
    Me,
    /// `GET /users/email/{email}`, the legacy lookup keyed by login email.
    ByEmail(String),
}

impl ProfileLookup {
    /// Ordered lookup strategies: `Me` first, then the email-keyed lookup
    /// when an email is known.
    #[must_use]
    pub fn strategies(email: Option<&str>) -> Vec<Self> {
        let mut lookups = vec![Self::Me];
        if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
            lookups.push(Self::ByEmail(email.to_owned()));
        }
        lookups
    }
}

impl fmt::Display for ProfileLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Me => f.write_str("me"),
            Self::ByEmail(_) => f.write_str("email"),
        }
    }
}

/// Remote operations the session store depends on.
#[async_trait::async_trait]
pub trait SessionBackend: Send + Sync {
    /// Exchange credentials for a bearer token.
    async fn exchange_credentials(&self, email: &str, password: &str) -> Result<String, ApiError>;

    /// Fetch a profile with an explicit token using a single strategy.
    async fn fetch_profile(&self, token: &str, lookup: &ProfileLookup) -> Result<Profile, ApiError>;
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Bootstrapping,
    Unauthenticated,
    Authenticating,
    Authenticated,
}

/// Snapshot of the session, as published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub user: Option<Profile>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl SessionState {
    fn bootstrapping() -> Self {
        Self { phase: SessionPhase::Bootstrapping, user: None, is_authenticated: false, is_loading: true }
    }

    fn unauthenticated() -> Self {
        Self { phase: SessionPhase::Unauthenticated, user: None, is_authenticated: false, is_loading: false }
    }

    fn authenticated(user: Profile) -> Self {
        Self { phase: SessionPhase::Authenticated, user: Some(user), is_authenticated: true, is_loading: false }
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }
}

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The remote service failed; the original error is kept intact.
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),

    /// No persisted token to act on.
    #[error("not authenticated")]
    NotAuthenticated,
}

impl SessionError {
    #[must_use]
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_authorization())
    }
}

// =============================================================================
// STORE
// =============================================================================

pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    store: Arc<dyn TokenStore>,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    /// Create a store in the `Bootstrapping` phase. Call [`Self::bootstrap`]
    /// once at startup to hydrate it.
    #[must_use]
    pub fn new(backend: Arc<dyn SessionBackend>, store: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(SessionState::bootstrapping());
        Self { backend, store, state }
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Observe every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn user(&self) -> Option<Profile> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    /// Hydrate the session from the persisted token.
    ///
    /// Never fails outward and always ends with `is_loading == false`.
    pub async fn bootstrap(&mut self) -> SessionState {
        self.begin(SessionPhase::Bootstrapping);

        let token = match self.store.get_item(TOKEN_KEY).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::info!("no persisted token; starting unauthenticated");
                self.publish(SessionState::unauthenticated());
                return self.state();
            }
            Err(e) => {
                tracing::warn!(error = %e, "token read failed; starting unauthenticated");
                self.publish(SessionState::unauthenticated());
                return self.state();
            }
        };

        let email = self.stored_email().await;
        match self.resolve_profile(&token, email.as_deref()).await {
            Ok(profile) => self.publish(SessionState::authenticated(profile)),
            Err(e) if e.is_authorization() => {
                tracing::warn!(error = %e, "persisted token rejected; purging");
                self.purge().await;
                self.publish(SessionState::unauthenticated());
            }
            Err(e) => {
                tracing::warn!(error = %e, "profile fetch failed during hydration; token kept for retry");
                self.publish(SessionState::unauthenticated());
            }
        }
        self.state()
    }

    /// Exchange credentials, confirm the profile with the new token, and
    /// only then persist the token and email.
    ///
    /// # Errors
    ///
    /// Returns the remote error (credential rejection or profile failure) or
    /// a storage error. On any failure the session is `Unauthenticated` and
    /// no token is left persisted.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Profile, SessionError> {
        self.begin(SessionPhase::Authenticating);

        match self.authenticate(email, password).await {
            Ok(profile) => {
                tracing::info!(user_id = profile.id, role = %profile.role, "login succeeded");
                self.publish(SessionState::authenticated(profile.clone()));
                Ok(profile)
            }
            Err(e) => {
                tracing::warn!(error = %e, "login failed");
                self.purge().await;
                self.publish(SessionState::unauthenticated());
                Err(e)
            }
        }
    }

    /// Clear persisted credentials and the in-memory profile. Idempotent.
    pub async fn logout(&mut self) {
        self.purge().await;
        self.publish(SessionState::unauthenticated());
        tracing::info!("logged out");
    }

    /// Re-fetch the profile for the persisted token, e.g. after a profile edit.
    ///
    /// An authorization failure forces a logout. Any other failure leaves the
    /// token and the cached profile untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] when no token is persisted,
    /// otherwise the underlying remote or storage error.
    pub async fn reload(&mut self) -> Result<Profile, SessionError> {
        let Some(token) = self.store.get_item(TOKEN_KEY).await? else {
            self.logout().await;
            return Err(SessionError::NotAuthenticated);
        };

        let email = self.stored_email().await;
        match self.resolve_profile(&token, email.as_deref()).await {
            Ok(profile) => {
                self.publish(SessionState::authenticated(profile.clone()));
                Ok(profile)
            }
            Err(e) if e.is_authorization() => {
                tracing::warn!(error = %e, "token rejected on reload; forcing logout");
                self.logout().await;
                Err(e)
            }
            Err(e) => {
                tracing::warn!(error = %e, "profile reload failed; session kept");
                Err(e)
            }
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Profile, SessionError> {
        let token = self
            .backend
            .exchange_credentials(email, password)
            .await?;
        let profile = self.resolve_profile(&token, Some(email)).await?;
        self.store.set_item(TOKEN_KEY, &token).await?;
        self.store.set_item(EMAIL_KEY, email).await?;
        Ok(profile)
    }

    /// Try each lookup strategy in order; first success wins. When all fail,
    /// an authorization failure outranks later transient ones.
    async fn resolve_profile(&self, token: &str, email: Option<&str>) -> Result<Profile, SessionError> {
        let mut failure: Option<ApiError> = None;

        for lookup in ProfileLookup::strategies(email) {
            match self.backend.fetch_profile(token, &lookup).await {
                Ok(profile) => {
                    tracing::info!(strategy = %lookup, user_id = profile.id, "profile resolved");
                    return Ok(profile);
                }
                Err(e) => {
                    tracing::debug!(strategy = %lookup, error = %e, "profile lookup failed");
                    failure = Some(match failure {
                        Some(prev) if prev.is_authorization() => prev,
                        _ => e,
                    });
                }
            }
        }

        Err(failure.map_or(SessionError::NotAuthenticated, SessionError::Api))
    }

    async fn stored_email(&self) -> Option<String> {
        match self.store.get_item(EMAIL_KEY).await {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!(error = %e, "email read failed; skipping email lookup");
                None
            }
        }
    }

    async fn purge(&self) {
        if let Err(e) = remove_token_and_email(self.store.as_ref()).await {
            tracing::warn!(error = %e, "failed to purge persisted credentials");
        }
    }

    /// Enter a loading phase, keeping any cached user visible.
    fn begin(&self, phase: SessionPhase) {
        self.transition(|state| {
            state.phase = phase;
            state.is_loading = true;
        });
    }

    fn publish(&self, next: SessionState) {
        self.transition(|state| *state = next);
    }

    /// Apply one update and notify subscribers. Logged only when the phase
    /// actually changes.
    fn transition(&self, update: impl FnOnce(&mut SessionState)) {
        self.state.send_modify(|state| {
            let from = state.phase;
            update(state);
            if state.phase != from {
                tracing::debug!(from = ?from, to = ?state.phase, "session transition");
            }
        });
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
