//! Auth manager: the entry point the UI layer talks to.
//!
//! The manager owns the session cache and keeps it in line with the server:
//! - `login` writes `Authenticated` on success and leaves the cache alone on failure
//! - `logout` clears the cache first, then tells the server (best effort)
//! - `current_user` answers from cache, or shares one in-flight whoami lookup
//!   among every caller that arrives while it is pending
//! - any 401/403 on a protected request marks the session `Unauthenticated`
//!
//! Every transition that changes who the session belongs to starts a new
//! epoch. A lookup remembers the epoch it started in and does not write the
//! cache if the session changed underneath it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::FutureExt;
use parking_lot::Mutex;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, ApiRequest, ApiResponse, USER_PATH};
use crate::cache::SessionCache;
use crate::config::Config;
use crate::models::{AuthSnapshot, AuthenticatedUser, SessionState};
use crate::publisher::StatePublisher;
use crate::storage::KeyValueStore;

use super::{AuthError, InFlight, Joined};

/// De-duplication key for whoami lookups
const USER_LOOKUP: &str = USER_PATH;

/// Snapshot error text when the server-side logout call fails
const LOGOUT_FAILED_MESSAGE: &str = "Logout failed";

/// Diagnostic view of the manager and its durable keys
#[derive(Debug, Clone)]
pub struct AuthDebugInfo {
    pub state: SessionState,
    pub snapshot: AuthSnapshot,
    pub persisted: Vec<(String, Option<String>)>,
    pub lookup_pending: bool,
    pub epoch: u64,
}

/// Clone is cheap - all clones share one cache and one set of pending lookups.
#[derive(Clone)]
pub struct AuthManager {
    inner: Arc<Inner>,
}

struct Inner {
    client: ApiClient,
    cache: SessionCache,
    lookups: InFlight<&'static str, Option<AuthenticatedUser>>,
    epoch: Mutex<u64>,
    outstanding: AtomicUsize,
    last_error: Mutex<Option<String>>,
    publisher: StatePublisher,
}

/// Marks an auth operation as outstanding for as long as it is alive.
struct LoadingGuard {
    inner: Arc<Inner>,
}

impl LoadingGuard {
    fn begin(inner: &Arc<Inner>) -> Self {
        inner.outstanding.fetch_add(1, Ordering::SeqCst);
        inner.publish();
        Self {
            inner: Arc::clone(inner),
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.inner.outstanding.fetch_sub(1, Ordering::SeqCst);
        self.inner.publish();
    }
}

impl AuthManager {
    pub fn new(client: ApiClient, cache: SessionCache) -> Self {
        let inner = Arc::new(Inner {
            client,
            cache,
            lookups: InFlight::new(),
            epoch: Mutex::new(0),
            outstanding: AtomicUsize::new(0),
            last_error: Mutex::new(None),
            publisher: StatePublisher::default(),
        });
        inner.publish();
        Self { inner }
    }

    /// HTTP client for `config.api_base_url`, session mirrored into `store`
    pub fn from_config(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let client = ApiClient::new(config)?;
        let cache = SessionCache::from_config(store, config);
        Ok(Self::new(client, cache))
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.inner.publisher.subscribe()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.publisher.current()
    }

    pub fn cache(&self) -> &SessionCache {
        &self.inner.cache
    }

    /// Answer from cache only; never touches the network.
    /// Call `current_user` first when a confirmed answer is needed.
    pub fn is_authenticated(&self) -> bool {
        self.inner.cache.is_authenticated()
    }

    /// The current user, or `None` if there is no session.
    ///
    /// A failed lookup is a definitive "no session", not an error.
    pub async fn current_user(&self) -> Option<AuthenticatedUser> {
        let joined = self.inner.lookups.join_or_start(
            USER_LOOKUP,
            || self.inner.cached_answer(),
            |ticket| {
                let inner = Arc::clone(&self.inner);
                let epoch = inner.current_epoch();
                let loading = LoadingGuard::begin(&inner);
                async move {
                    let _loading = loading;
                    inner.resolve_lookup(ticket, epoch).await
                }
                .boxed()
            },
        );

        let lookup = match joined {
            Joined::Settled(user) => {
                match user {
                    Some(ref user) => debug!(username = %user.username, "Current user served from cache"),
                    None => debug!("No session according to cache"),
                }
                return user;
            }
            Joined::Pending { lookup, started: true } => {
                // Drive the lookup to completion even if every caller goes away
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(lookup.clone());
                }
                lookup
            }
            Joined::Pending { lookup, started: false } => {
                debug!("Joining in-flight user lookup");
                lookup
            }
        };

        lookup.await
    }

    /// Exchange credentials for a session.
    ///
    /// A failed attempt leaves the cache untouched: it says nothing about
    /// whether an earlier session still exists.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthenticatedUser, AuthError> {
        let _loading = LoadingGuard::begin(&self.inner);

        match self.inner.client.login(username, password).await {
            Ok(user) => {
                self.inner
                    .start_epoch(SessionState::Authenticated(user.clone()));
                self.inner.set_error(None);
                info!(username = %user.username, "Login successful");
                Ok(user)
            }
            Err(e) => {
                let err = AuthError::from_login_failure(e);
                warn!(username = username, error = %err, "Login failed");
                self.inner.set_error(Some(err.user_message()));
                Err(err)
            }
        }
    }

    /// `login` for callers that only need to know whether it worked; the
    /// reason is available in the published snapshot.
    pub async fn sign_in(&self, username: &str, password: &str) -> bool {
        self.login(username, password).await.is_ok()
    }

    /// End the session locally, then tell the server.
    ///
    /// The local logout stands even if the server call fails.
    pub async fn logout(&self) {
        let _loading = LoadingGuard::begin(&self.inner);

        self.inner.start_epoch(SessionState::Unknown);
        self.inner.set_error(None);

        match self.inner.client.logout().await {
            Ok(()) => info!("Logout complete"),
            Err(e) => {
                warn!(error = %e, "Server-side logout failed; local session already cleared");
                self.inner.set_error(Some(LOGOUT_FAILED_MESSAGE.to_string()));
            }
        }
    }

    /// Drop everything known about the session and return to `Unknown`
    /// without contacting the server.
    pub fn invalidate(&self) {
        debug!("Session cache invalidated");
        self.inner.start_epoch(SessionState::Unknown);
        self.inner.set_error(None);
    }

    /// Send a request outside the login/logout/whoami flow.
    ///
    /// A 401 or 403 means the server no longer honours the session: the
    /// cache is marked `Unauthenticated` and `SessionExpired` is returned.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        match self.inner.client.execute(request).await {
            Ok(response) => Ok(response),
            Err(e) if e.is_auth_rejection() => {
                self.inner.expire_session(&e);
                Err(AuthError::SessionExpired)
            }
            Err(e) => Err(AuthError::Request(e)),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AuthError> {
        Ok(self.send(ApiRequest::get(url)).await?.json()?)
    }

    pub async fn post_json<T, B>(&self, url: &str, body: &B) -> Result<T, AuthError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::POST, url, body).await
    }

    pub async fn put_json<T, B>(&self, url: &str, body: &B) -> Result<T, AuthError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::PUT, url, body).await
    }

    pub async fn patch_json<T, B>(&self, url: &str, body: &B) -> Result<T, AuthError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::PATCH, url, body).await
    }

    pub async fn delete(&self, url: &str) -> Result<ApiResponse, AuthError> {
        self.send(ApiRequest::new(Method::DELETE, url)).await
    }

    async fn send_json<T, B>(&self, method: Method, url: &str, body: &B) -> Result<T, AuthError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = ApiRequest::new(method, url).json(body)?;
        Ok(self.send(request).await?.json()?)
    }

    pub fn debug_info(&self) -> AuthDebugInfo {
        AuthDebugInfo {
            state: self.inner.cache.read(),
            snapshot: self.snapshot(),
            persisted: self.inner.cache.raw_entries(),
            lookup_pending: self.inner.lookups.is_pending(&USER_LOOKUP),
            epoch: self.inner.current_epoch(),
        }
    }
}

impl Inner {
    fn current_epoch(&self) -> u64 {
        *self.epoch.lock()
    }

    /// Move to a new epoch with `next` as the session state. Lookups started
    /// before this point can no longer write the cache.
    fn start_epoch(&self, next: SessionState) {
        {
            let mut epoch = self.epoch.lock();
            *epoch += 1;
            self.cache.write(next);
        }
        self.lookups.clear();
    }

    /// Write `next` only if no transition happened since `epoch`
    fn write_if_current(&self, epoch: u64, next: SessionState) -> bool {
        let current = self.epoch.lock();
        if *current != epoch {
            return false;
        }
        self.cache.write(next);
        true
    }

    /// The cache's answer, or `None` while the session is `Unknown`
    fn cached_answer(&self) -> Option<Option<AuthenticatedUser>> {
        let state = self.cache.read();
        state.is_resolved().then(|| state.user().cloned())
    }

    async fn resolve_lookup(&self, ticket: u64, epoch: u64) -> Option<AuthenticatedUser> {
        let outcome = self.client.current_user().await;

        match outcome {
            Err(ApiError::Unauthorized) => debug!("Server reports no session"),
            Err(ref e) => warn!(error = %e, "User lookup failed, treating session as unauthenticated"),
            Ok(_) => {}
        }
        let next = SessionState::from(outcome.ok());
        let user = next.user().cloned();

        let written = self
            .lookups
            .complete_with(&USER_LOOKUP, ticket, || self.write_if_current(epoch, next));
        if !written {
            debug!("Discarding user lookup that started before the session changed");
            return self.cache.read().user().cloned();
        }

        self.set_error(None);
        user
    }

    fn expire_session(&self, cause: &ApiError) {
        warn!(error = %cause, "Protected request rejected, marking session as ended");
        self.start_epoch(SessionState::Unauthenticated);
        self.set_error(Some(AuthError::SessionExpired.user_message()));
    }

    fn set_error(&self, error: Option<String>) {
        *self.last_error.lock() = error;
        self.publish();
    }

    fn publish(&self) {
        self.publisher.update(|| AuthSnapshot {
            user: self.cache.read().user().cloned(),
            loading: self.outstanding.load(Ordering::SeqCst) > 0,
            error: self.last_error.lock().clone(),
        });
    }
}
