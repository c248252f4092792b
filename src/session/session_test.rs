use super::*;
use crate::storage::MemoryTokenStore;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tokio::time::{Duration, timeout};

// =============================================================================
// Mocks
// =============================================================================

#[derive(Default)]
struct MockBackend {
    logins: Mutex<VecDeque<Result<String, ApiError>>>,
    profiles: Mutex<VecDeque<Result<Profile, ApiError>>>,
    profile_calls: Mutex<Vec<(String, ProfileLookup)>>,
    login_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl MockBackend {
    fn new() -> Self {
        Self::default()
    }

    fn with_login(self, result: Result<String, ApiError>) -> Self {
        self.logins.lock().expect("mock mutex should lock").push_back(result);
        self
    }

    fn with_profile(self, result: Result<Profile, ApiError>) -> Self {
        self.profiles.lock().expect("mock mutex should lock").push_back(result);
        self
    }

    fn gated(self, gate: oneshot::Receiver<()>) -> Self {
        *self.login_gate.lock().expect("mock mutex should lock") = Some(gate);
        self
    }

    fn profile_calls(&self) -> Vec<(String, ProfileLookup)> {
        self.profile_calls.lock().expect("mock mutex should lock").clone()
    }
}

#[async_trait::async_trait]
impl SessionBackend for MockBackend {
    async fn exchange_credentials(&self, _email: &str, _password: &str) -> Result<String, ApiError> {
        let gate = self.login_gate.lock().expect("mock mutex should lock").take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.logins
            .lock()
            .expect("mock mutex should lock")
            .pop_front()
            .expect("unexpected credential exchange")
    }

    async fn fetch_profile(&self, token: &str, lookup: &ProfileLookup) -> Result<Profile, ApiError> {
        self.profile_calls
            .lock()
            .expect("mock mutex should lock")
            .push((token.to_owned(), lookup.clone()));
        self.profiles
            .lock()
            .expect("mock mutex should lock")
            .pop_front()
            .expect("unexpected profile fetch")
    }
}

/// Store that reads fine but refuses writes.
#[derive(Default)]
struct ReadOnlyStore {
    inner: MemoryTokenStore,
}

#[async_trait::async_trait]
impl TokenStore for ReadOnlyStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key).await
    }

    async fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::other("read-only")))
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove_item(key).await
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn profile(id: i64, name: &str, role: Role) -> Profile {
    Profile {
        id,
        name: name.to_owned(),
        nickname: name.to_lowercase(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone: None,
        address: None,
        role,
        points: 0,
        created_at: None,
    }
}

fn unauthorized(status: u16) -> ApiError {
    ApiError::from_status(status, String::new())
}

fn token_store(items: &[(&str, &str)]) -> Arc<MemoryTokenStore> {
    Arc::new(MemoryTokenStore::with_items(items.iter().copied()))
}

fn session(backend: &Arc<MockBackend>, store: &Arc<MemoryTokenStore>) -> SessionStore {
    SessionStore::new(backend.clone(), store.clone())
}

async fn persisted(store: &MemoryTokenStore, key: &str) -> Option<String> {
    store.get_item(key).await.expect("memory store never fails")
}

// =============================================================================
// Initial state
// =============================================================================

#[test]
fn new_store_is_bootstrapping_and_loading() {
    let backend = Arc::new(MockBackend::new());
    let store = token_store(&[]);
    let state = session(&backend, &store).state();
    assert_eq!(state.phase, SessionPhase::Bootstrapping);
    assert!(state.is_loading);
    assert!(!state.is_authenticated);
    assert!(state.user.is_none());
}

// =============================================================================
// Bootstrap
// =============================================================================

#[tokio::test]
async fn bootstrap_with_valid_token_authenticates() {
    let user = profile(1, "Ana", Role::User);
    let backend = Arc::new(MockBackend::new().with_profile(Ok(user.clone())));
    let store = token_store(&[(TOKEN_KEY, "T")]);
    let mut session = session(&backend, &store);

    let state = session.bootstrap().await;

    assert!(state.is_authenticated);
    assert!(!state.is_loading);
    assert_eq!(state.phase, SessionPhase::Authenticated);
    assert_eq!(state.user, Some(user));
    assert_eq!(backend.profile_calls(), vec![("T".to_owned(), ProfileLookup::Me)]);
}

#[tokio::test]
async fn bootstrap_without_token_skips_profile_fetch() {
    let backend = Arc::new(MockBackend::new());
    let store = token_store(&[]);
    let mut session = session(&backend, &store);

    let state = session.bootstrap().await;

    assert!(!state.is_authenticated);
    assert!(!state.is_loading);
    assert!(state.user.is_none());
    assert!(backend.profile_calls().is_empty());
}

#[tokio::test]
async fn bootstrap_with_rejected_token_purges_it() {
    let backend = Arc::new(MockBackend::new().with_profile(Err(unauthorized(401))));
    let store = token_store(&[(TOKEN_KEY, "stale")]);
    let mut session = session(&backend, &store);

    let state = session.bootstrap().await;

    assert!(!state.is_authenticated);
    assert!(!state.is_loading);
    assert!(state.user.is_none());
    assert_eq!(persisted(&store, TOKEN_KEY).await, None);
}

#[tokio::test]
async fn bootstrap_transient_failure_keeps_token() {
    let backend = Arc::new(MockBackend::new().with_profile(Err(ApiError::Network("offline".into()))));
    let store = token_store(&[(TOKEN_KEY, "T")]);
    let mut session = session(&backend, &store);

    let state = session.bootstrap().await;

    assert_eq!(state.phase, SessionPhase::Unauthenticated);
    assert!(!state.is_loading);
    assert!(state.user.is_none());
    assert_eq!(persisted(&store, TOKEN_KEY).await.as_deref(), Some("T"));
}

#[tokio::test]
async fn bootstrap_falls_back_to_email_lookup() {
    let user = profile(2, "Bia", Role::User);
    let backend = Arc::new(
        MockBackend::new()
            .with_profile(Err(ApiError::from_status(404, String::new())))
            .with_profile(Ok(user.clone())),
    );
    let store = token_store(&[(TOKEN_KEY, "T"), (EMAIL_KEY, "bia@example.com")]);
    let mut session = session(&backend, &store);

    let state = session.bootstrap().await;

    assert_eq!(state.user, Some(user));
    assert_eq!(
        backend.profile_calls(),
        vec![
            ("T".to_owned(), ProfileLookup::Me),
            ("T".to_owned(), ProfileLookup::ByEmail("bia@example.com".into())),
        ]
    );
}

#[tokio::test]
async fn bootstrap_prefers_authorization_failure_across_strategies() {
    let backend = Arc::new(
        MockBackend::new()
            .with_profile(Err(unauthorized(403)))
            .with_profile(Err(ApiError::from_status(500, String::new()))),
    );
    let store = token_store(&[(TOKEN_KEY, "T"), (EMAIL_KEY, "x@example.com")]);
    let mut session = session(&backend, &store);

    session.bootstrap().await;

    assert_eq!(persisted(&store, TOKEN_KEY).await, None);
    assert_eq!(persisted(&store, EMAIL_KEY).await, None);
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn login_success_persists_token_and_sets_user() {
    let user = profile(1, "Ana", Role::User);
    let backend = Arc::new(
        MockBackend::new()
            .with_login(Ok("T".into()))
            .with_profile(Ok(user.clone())),
    );
    let store = token_store(&[]);
    let mut session = session(&backend, &store);
    session.bootstrap().await;

    let result = session.login("a@b.com", "pw").await.unwrap();

    assert_eq!(result, user);
    assert!(session.is_authenticated());
    assert!(!session.state().is_loading);
    assert_eq!(persisted(&store, TOKEN_KEY).await.as_deref(), Some("T"));
    assert_eq!(persisted(&store, EMAIL_KEY).await.as_deref(), Some("a@b.com"));
    // The freshly issued token is used, not whatever was stored before.
    assert_eq!(backend.profile_calls()[0], ("T".to_owned(), ProfileLookup::Me));
}

#[tokio::test]
async fn second_login_fully_replaces_token_and_user() {
    let first = profile(1, "Ana", Role::User);
    let second = profile(9, "Root", Role::Admin);
    let backend = Arc::new(
        MockBackend::new()
            .with_login(Ok("T1".into()))
            .with_profile(Ok(first))
            .with_login(Ok("T2".into()))
            .with_profile(Ok(second.clone())),
    );
    let store = token_store(&[]);
    let mut session = session(&backend, &store);

    session.login("ana@example.com", "pw").await.unwrap();
    session.login("root@example.com", "pw2").await.unwrap();

    assert_eq!(session.user(), Some(second));
    assert_eq!(persisted(&store, TOKEN_KEY).await.as_deref(), Some("T2"));
    assert_eq!(persisted(&store, EMAIL_KEY).await.as_deref(), Some("root@example.com"));
}

#[tokio::test]
async fn login_rejected_credentials_propagates_original_error() {
    let backend = Arc::new(MockBackend::new().with_login(Err(unauthorized(401))));
    let store = token_store(&[]);
    let mut session = session(&backend, &store);
    session.bootstrap().await;

    let err = session.login("a@b.com", "wrong").await.unwrap_err();

    assert!(matches!(err, SessionError::Api(ApiError::Unauthorized { status: 401, .. })));
    assert!(!session.is_authenticated());
    assert!(!session.state().is_loading);
    assert_eq!(persisted(&store, TOKEN_KEY).await, None);
    assert!(backend.profile_calls().is_empty());
}

#[tokio::test]
async fn login_profile_failure_leaves_no_token() {
    let backend = Arc::new(
        MockBackend::new()
            .with_login(Ok("T".into()))
            .with_profile(Err(ApiError::from_status(500, String::new())))
            .with_profile(Err(ApiError::from_status(500, String::new()))),
    );
    let store = token_store(&[]);
    let mut session = session(&backend, &store);

    let err = session.login("a@b.com", "pw").await.unwrap_err();

    assert!(matches!(err, SessionError::Api(ApiError::Server { status: 500, .. })));
    assert_eq!(session.state().phase, SessionPhase::Unauthenticated);
    assert!(session.user().is_none());
    assert_eq!(persisted(&store, TOKEN_KEY).await, None);
    assert_eq!(persisted(&store, EMAIL_KEY).await, None);
}

#[tokio::test]
async fn login_without_access_token_fails() {
    let backend = Arc::new(MockBackend::new().with_login(Err(ApiError::MissingAccessToken)));
    let store = token_store(&[]);
    let mut session = session(&backend, &store);

    let err = session.login("a@b.com", "pw").await.unwrap_err();

    assert!(matches!(err, SessionError::Api(ApiError::MissingAccessToken)));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn login_failure_after_authenticated_session_clears_everything() {
    let backend = Arc::new(
        MockBackend::new()
            .with_profile(Ok(profile(1, "Ana", Role::User)))
            .with_login(Err(unauthorized(401))),
    );
    let store = token_store(&[(TOKEN_KEY, "T"), (EMAIL_KEY, "ana@example.com")]);
    let mut session = session(&backend, &store);
    session.bootstrap().await;
    assert!(session.is_authenticated());

    session.login("ana@example.com", "typo").await.unwrap_err();

    assert_eq!(session.state(), SessionState::unauthenticated());
    assert_eq!(persisted(&store, TOKEN_KEY).await, None);
}

#[tokio::test]
async fn login_storage_failure_reverts_to_unauthenticated() {
    let backend = Arc::new(
        MockBackend::new()
            .with_login(Ok("T".into()))
            .with_profile(Ok(profile(1, "Ana", Role::User))),
    );
    let store = Arc::new(ReadOnlyStore::default());
    let mut session = SessionStore::new(backend.clone(), store.clone());

    let err = session.login("a@b.com", "pw").await.unwrap_err();

    assert!(matches!(err, SessionError::Storage(_)));
    assert!(!session.is_authenticated());
    assert!(session.user().is_none());
    assert_eq!(store.get_item(TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn login_publishes_loading_state_while_in_flight() {
    let cached = profile(1, "Ana", Role::User);
    let next = profile(2, "Bia", Role::User);
    let (release, gate) = oneshot::channel();
    let backend = Arc::new(
        MockBackend::new()
            .with_profile(Ok(cached.clone()))
            .with_login(Ok("T2".into()))
            .with_profile(Ok(next.clone()))
            .gated(gate),
    );
    let store = token_store(&[(TOKEN_KEY, "T1")]);
    let mut session = session(&backend, &store);
    session.bootstrap().await;
    let mut rx = session.subscribe();

    let task = tokio::spawn(async move {
        let result = session.login("bia@example.com", "pw").await;
        (session, result)
    });

    let in_flight = timeout(
        Duration::from_millis(500),
        rx.wait_for(|s| s.phase == SessionPhase::Authenticating),
    )
    .await
    .expect("authenticating state timed out")
    .expect("session dropped")
    .clone();
    assert!(in_flight.is_loading);
    assert_eq!(in_flight.user, Some(cached));

    release.send(()).expect("login task should be waiting");
    let (session, result) = task.await.expect("login task panicked");
    assert_eq!(result.unwrap(), next);
    assert!(!session.state().is_loading);
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn logout_twice_is_harmless() {
    let backend = Arc::new(MockBackend::new().with_profile(Ok(profile(1, "Ana", Role::User))));
    let store = token_store(&[(TOKEN_KEY, "T"), (EMAIL_KEY, "ana@example.com")]);
    let mut session = session(&backend, &store);
    session.bootstrap().await;

    session.logout().await;
    assert_eq!(persisted(&store, TOKEN_KEY).await, None);
    assert_eq!(persisted(&store, EMAIL_KEY).await, None);
    assert!(!session.is_authenticated());

    session.logout().await;
    assert_eq!(persisted(&store, TOKEN_KEY).await, None);
    assert_eq!(session.state(), SessionState::unauthenticated());
}

#[tokio::test]
async fn logout_when_never_authenticated() {
    let backend = Arc::new(MockBackend::new());
    let store = token_store(&[]);
    let mut session = session(&backend, &store);

    session.logout().await;

    assert_eq!(session.state(), SessionState::unauthenticated());
    assert_eq!(persisted(&store, TOKEN_KEY).await, None);
}

// =============================================================================
// Reload
// =============================================================================

#[tokio::test]
async fn reload_forbidden_forces_logout() {
    let backend = Arc::new(
        MockBackend::new()
            .with_profile(Ok(profile(1, "Ana", Role::User)))
            .with_profile(Err(unauthorized(403))),
    );
    let store = token_store(&[(TOKEN_KEY, "T")]);
    let mut session = session(&backend, &store);
    session.bootstrap().await;

    let err = session.reload().await.unwrap_err();

    assert!(err.is_authorization());
    assert_eq!(session.state(), SessionState::unauthenticated());
    assert_eq!(persisted(&store, TOKEN_KEY).await, None);
}

#[tokio::test]
async fn reload_transient_failure_keeps_session() {
    let user = profile(1, "Ana", Role::User);
    let backend = Arc::new(
        MockBackend::new()
            .with_profile(Ok(user.clone()))
            .with_profile(Err(ApiError::Network("timeout".into()))),
    );
    let store = token_store(&[(TOKEN_KEY, "T")]);
    let mut session = session(&backend, &store);
    session.bootstrap().await;

    let err = session.reload().await.unwrap_err();

    assert!(matches!(err, SessionError::Api(ApiError::Network(_))));
    assert!(session.is_authenticated());
    assert_eq!(session.user(), Some(user));
    assert_eq!(persisted(&store, TOKEN_KEY).await.as_deref(), Some("T"));
}

#[tokio::test]
async fn reload_replaces_profile_wholesale() {
    let before = profile(1, "Ana", Role::User);
    let mut after = before.clone();
    after.nickname = "aninha".into();
    after.points = 150;
    let backend = Arc::new(
        MockBackend::new()
            .with_profile(Ok(before))
            .with_profile(Ok(after.clone())),
    );
    let store = token_store(&[(TOKEN_KEY, "T")]);
    let mut session = session(&backend, &store);
    session.bootstrap().await;

    let reloaded = session.reload().await.unwrap();

    assert_eq!(reloaded, after);
    assert_eq!(session.user(), Some(after));
}

#[tokio::test]
async fn reload_recovers_after_transient_bootstrap_failure() {
    let user = profile(1, "Ana", Role::User);
    let backend = Arc::new(
        MockBackend::new()
            .with_profile(Err(ApiError::Network("offline".into())))
            .with_profile(Ok(user.clone())),
    );
    let store = token_store(&[(TOKEN_KEY, "T")]);
    let mut session = session(&backend, &store);
    session.bootstrap().await;
    assert!(!session.is_authenticated());

    session.reload().await.unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.user(), Some(user));
}

#[tokio::test]
async fn reload_without_token_is_not_authenticated() {
    let backend = Arc::new(MockBackend::new());
    let store = token_store(&[]);
    let mut session = session(&backend, &store);

    let err = session.reload().await.unwrap_err();

    assert!(matches!(err, SessionError::NotAuthenticated));
    assert_eq!(session.state(), SessionState::unauthenticated());
    assert!(backend.profile_calls().is_empty());
}

// =============================================================================
// Lookup strategies
// =============================================================================

#[test]
fn strategies_without_email_is_me_only() {
    assert_eq!(ProfileLookup::strategies(None), vec![ProfileLookup::Me]);
    assert_eq!(ProfileLookup::strategies(Some(" ")), vec![ProfileLookup::Me]);
}

#[test]
fn strategies_with_email_appends_fallback() {
    assert_eq!(
        ProfileLookup::strategies(Some("a@b.com")),
        vec![ProfileLookup::Me, ProfileLookup::ByEmail("a@b.com".into())]
    );
}

#[tokio::test]
async fn subscribers_see_final_state() {
    let backend = Arc::new(MockBackend::new().with_profile(Ok(profile(1, "Ana", Role::Admin))));
    let store = token_store(&[(TOKEN_KEY, "T")]);
    let mut session = session(&backend, &store);
    let rx = session.subscribe();

    session.bootstrap().await;

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow().role(), Some(Role::Admin));
}

// =============================================================================
// Transition logging
// =============================================================================

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("log buffer should lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn transitions(&self) -> Vec<String> {
        let raw = self.0.lock().expect("log buffer should lock").clone();
        String::from_utf8_lossy(&raw)
            .lines()
            .filter(|line| line.contains("session transition"))
            .map(str::to_owned)
            .collect()
    }
}

fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || sink.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

#[tokio::test]
async fn bootstrap_without_token_logs_one_transition() {
    let (logs, _guard) = capture_logs();
    let backend = Arc::new(MockBackend::new());
    let store = token_store(&[]);
    let mut session = session(&backend, &store);

    session.bootstrap().await;

    let transitions = logs.transitions();
    assert_eq!(transitions.len(), 1, "{transitions:?}");
    assert!(transitions[0].contains("to=Unauthenticated"));
}

#[tokio::test]
async fn login_logs_each_phase_change_once() {
    let backend = Arc::new(
        MockBackend::new()
            .with_login(Ok("T".into()))
            .with_profile(Ok(profile(1, "Ana", Role::User))),
    );
    let store = token_store(&[]);
    let mut session = session(&backend, &store);
    session.bootstrap().await;
    let (logs, _guard) = capture_logs();

    session.login("a@b.com", "pw").await.unwrap();
    session.logout().await;
    session.logout().await;

    let transitions = logs.transitions();
    assert_eq!(transitions.len(), 3, "{transitions:?}");
    assert!(transitions[0].contains("from=Unauthenticated to=Authenticating"));
    assert!(transitions[1].contains("from=Authenticating to=Authenticated"));
    assert!(transitions[2].contains("from=Authenticated to=Unauthenticated"));
}
