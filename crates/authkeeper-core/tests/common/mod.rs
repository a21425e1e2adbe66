//! In-process stand-in for the session API.
//!
//! Mirrors the server contract: `GET auth/csrf/`, `POST auth/login/`,
//! `POST auth/logout/`, `GET auth/user/`, plus a protected `items/`
//! resource. Mutating requests without a CSRF header get 403.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use authkeeper_core::api::CSRF_HEADER;
use authkeeper_core::{
    ApiClient, ApiError, ApiRequest, ApiResponse, AuthManager, AuthenticatedUser, MemoryStore,
    SessionCache, Transport,
};
use parking_lot::Mutex;
use reqwest::{Method, StatusCode};
use serde_json::json;
use tokio::sync::Notify;

pub const USER_KEY: &str = "test_auth_user";
pub const FLAG_KEY: &str = "test_auth_state";

#[derive(Default)]
pub struct FakeServer {
    accounts: HashMap<String, (String, AuthenticatedUser)>,
    session: Mutex<Option<AuthenticatedUser>>,
    calls: Mutex<HashMap<(Method, String), usize>>,
    issued_tokens: Mutex<usize>,
    whoami_gate: Mutex<Option<Arc<Notify>>>,
    csrf_broken: Mutex<bool>,
    offline: Mutex<bool>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        let mut accounts = HashMap::new();
        accounts.insert(
            "alice".to_string(),
            (
                "correct".to_string(),
                AuthenticatedUser::new("alice").with_email("alice@example.com"),
            ),
        );
        accounts.insert(
            "bob".to_string(),
            ("hunter2".to_string(), AuthenticatedUser::new("bob")),
        );
        Arc::new(Self {
            accounts,
            ..Self::default()
        })
    }

    /// Pretend a session already exists server-side (e.g. from an earlier page load)
    pub fn start_session(&self, username: &str) {
        let user = self.accounts[username].1.clone();
        *self.session.lock() = Some(user);
    }

    /// Session ends server-side without the client being told
    pub fn expire_session(&self) {
        *self.session.lock() = None;
    }

    pub fn has_session(&self) -> bool {
        self.session.lock().is_some()
    }

    pub fn calls(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .get(&(method, path.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn whoami_calls(&self) -> usize {
        self.calls(Method::GET, "auth/user/")
    }

    pub fn csrf_calls(&self) -> usize {
        self.calls(Method::GET, "auth/csrf/")
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Hold whoami responses until `open_whoami` is called
    pub fn hold_whoami(&self) {
        *self.whoami_gate.lock() = Some(Arc::new(Notify::new()));
    }

    pub fn open_whoami(&self) {
        if let Some(gate) = self.whoami_gate.lock().take() {
            gate.notify_one();
        }
    }

    pub fn break_csrf(&self) {
        *self.csrf_broken.lock() = true;
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }

    /// Yield until `n` whoami requests have arrived
    pub async fn wait_for_whoami_calls(&self, n: usize) {
        while self.whoami_calls() < n {
            tokio::task::yield_now().await;
        }
    }

    fn respond(status: StatusCode, body: serde_json::Value) -> ApiResponse {
        ApiResponse::new(status, body.to_string())
    }

    fn has_csrf(request: &ApiRequest) -> bool {
        request
            .headers
            .get(CSRF_HEADER)
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }

    fn forbidden() -> ApiResponse {
        Self::respond(
            StatusCode::FORBIDDEN,
            json!({"detail": "CSRF Failed: CSRF token missing."}),
        )
    }

    fn unauthorized() -> ApiResponse {
        Self::respond(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Authentication credentials were not provided."}),
        )
    }
}

#[async_trait]
impl Transport for FakeServer {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let path = request.url.trim_start_matches('/').to_string();
        *self
            .calls
            .lock()
            .entry((request.method.clone(), path.clone()))
            .or_insert(0) += 1;

        if *self.offline.lock() {
            return Err(ApiError::Network("connection refused".to_string()));
        }

        let response = match (request.method.clone(), path.as_str()) {
            (Method::GET, "auth/csrf/") => {
                if *self.csrf_broken.lock() {
                    Self::respond(StatusCode::INTERNAL_SERVER_ERROR, json!({}))
                } else {
                    let mut issued = self.issued_tokens.lock();
                    *issued += 1;
                    Self::respond(StatusCode::OK, json!({"csrf_token": format!("token-{}", *issued)}))
                }
            }
            (Method::POST, "auth/login/") => {
                if !Self::has_csrf(&request) {
                    return Ok(Self::forbidden());
                }
                let body = request.body.clone().unwrap_or_default();
                let username = body["username"].as_str().unwrap_or_default();
                let password = body["password"].as_str().unwrap_or_default();
                match self.accounts.get(username) {
                    Some((expected, user)) if expected == password => {
                        *self.session.lock() = Some(user.clone());
                        Self::respond(
                            StatusCode::OK,
                            json!({
                                "detail": "Successfully logged in",
                                "username": user.username,
                                "email": user.email,
                            }),
                        )
                    }
                    _ => Self::respond(StatusCode::UNAUTHORIZED, json!({"detail": "Invalid credentials"})),
                }
            }
            (Method::POST, "auth/logout/") => {
                if !Self::has_csrf(&request) {
                    return Ok(Self::forbidden());
                }
                if self.session.lock().take().is_none() {
                    return Ok(Self::respond(
                        StatusCode::FORBIDDEN,
                        json!({"detail": "Authentication credentials were not provided."}),
                    ));
                }
                Self::respond(StatusCode::OK, json!({"detail": "Successfully logged out"}))
            }
            (Method::GET, "auth/user/") => {
                let gate = self.whoami_gate.lock().clone();
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                match self.session.lock().clone() {
                    Some(user) => Self::respond(StatusCode::OK, json!(user)),
                    None => Self::unauthorized(),
                }
            }
            (method, "items/") => {
                if self.session.lock().is_none() {
                    return Ok(Self::unauthorized());
                }
                if method == Method::GET || method == Method::HEAD || method == Method::OPTIONS {
                    Self::respond(StatusCode::OK, json!([{"id": 1, "name": "first"}]))
                } else if !Self::has_csrf(&request) {
                    Self::forbidden()
                } else {
                    Self::respond(StatusCode::OK, request.body.clone().unwrap_or(json!({})))
                }
            }
            _ => Self::respond(StatusCode::NOT_FOUND, json!({"detail": "Not found."})),
        };
        Ok(response)
    }
}

/// Manager talking to `server`, persisting into `store`
pub fn manager_over(server: &Arc<FakeServer>, store: &Arc<MemoryStore>) -> AuthManager {
    let client = ApiClient::with_transport(server.clone());
    let cache = SessionCache::new(store.clone(), USER_KEY.to_string(), FLAG_KEY.to_string());
    AuthManager::new(client, cache)
}

pub fn setup() -> (Arc<FakeServer>, Arc<MemoryStore>, AuthManager) {
    let server = FakeServer::new();
    let store = Arc::new(MemoryStore::new());
    let manager = manager_over(&server, &store);
    (server, store, manager)
}
