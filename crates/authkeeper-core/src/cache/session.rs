use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{AuthFlag, AuthenticatedUser, SessionState};
use crate::storage::KeyValueStore;

use super::Confirmation;

/// Last-known session state, in memory and in a durable mirror.
///
/// The durable side holds the serialized user (only while authenticated),
/// the flag, and the time of the last confirmation under `<flag_key>_checked_at`.
/// `Unknown` is never written; it is what an absent flag means.
pub struct SessionCache {
    memory: RwLock<SessionState>,
    store: Arc<dyn KeyValueStore>,
    user_key: String,
    flag_key: String,
    confirmed_key: String,
}

impl SessionCache {
    pub fn new(store: Arc<dyn KeyValueStore>, user_key: String, flag_key: String) -> Self {
        let confirmed_key = format!("{}_checked_at", flag_key);
        Self {
            memory: RwLock::new(SessionState::Unknown),
            store,
            user_key,
            flag_key,
            confirmed_key,
        }
    }

    pub fn from_config(store: Arc<dyn KeyValueStore>, config: &Config) -> Self {
        Self::new(store, config.user_key(), config.flag_key())
    }

    /// Current state without any network access.
    ///
    /// Falls back to the durable flag when memory has nothing; a persisted
    /// negative answer is adopted, anything else stays `Unknown` until the
    /// server confirms it.
    pub fn read(&self) -> SessionState {
        {
            let memory = self.memory.read();
            if memory.is_resolved() {
                return memory.clone();
            }
        }

        if self.persisted_flag() != Some(AuthFlag::Unauthenticated) {
            return SessionState::Unknown;
        }

        let mut memory = self.memory.write();
        if !memory.is_resolved() {
            debug!("Adopting persisted unauthenticated flag");
            *memory = SessionState::Unauthenticated;
        }
        memory.clone()
    }

    /// Replace the state in memory and in the durable store.
    ///
    /// Persistence failures are logged; the in-memory state is updated regardless.
    pub fn write(&self, state: SessionState) {
        let mut memory = self.memory.write();
        if let Err(e) = self.persist(&state) {
            warn!(error = %e, "Failed to persist session state");
        }
        *memory = state;
    }

    /// Forget everything, returning to `Unknown`
    pub fn invalidate(&self) {
        let mut memory = self.memory.write();
        if let Err(e) = self.clear_persisted() {
            warn!(error = %e, "Failed to clear persisted session state");
        }
        *memory = SessionState::Unknown;
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn persisted_flag(&self) -> Option<AuthFlag> {
        match self.store.get(&self.flag_key) {
            Ok(Some(raw)) => match raw.parse() {
                Ok(flag) => Some(flag),
                Err(e) => {
                    warn!(key = %self.flag_key, error = %e, "Ignoring unreadable auth flag");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %self.flag_key, error = %e, "Failed to read auth flag");
                None
            }
        }
    }

    /// User record saved by the last successful login or lookup, for display only
    pub fn persisted_user(&self) -> Result<Option<AuthenticatedUser>> {
        match self.store.get(&self.user_key)? {
            Some(raw) => {
                let user = serde_json::from_str(&raw).context("Failed to parse persisted user")?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub fn last_confirmed(&self) -> Result<Option<Confirmation>> {
        self.store
            .get(&self.confirmed_key)?
            .map(|raw| Confirmation::parse(&raw))
            .transpose()
    }

    /// Raw durable values as `(key, value)` pairs: user, flag, confirmation
    pub fn raw_entries(&self) -> Vec<(String, Option<String>)> {
        [&self.user_key, &self.flag_key, &self.confirmed_key]
            .into_iter()
            .map(|key| (key.clone(), self.store.get(key).ok().flatten()))
            .collect()
    }

    fn persist(&self, state: &SessionState) -> Result<()> {
        let Some(flag) = state.flag() else {
            return self.clear_persisted();
        };

        match state.user() {
            Some(user) => self.store.set(&self.user_key, &serde_json::to_string(user)?)?,
            None => self.store.remove(&self.user_key)?,
        }
        self.store.set(&self.flag_key, flag.as_str())?;
        self.store
            .set(&self.confirmed_key, &Confirmation::now().to_stored())?;
        Ok(())
    }

    fn clear_persisted(&self) -> Result<()> {
        self.store.remove(&self.user_key)?;
        self.store.remove(&self.flag_key)?;
        self.store.remove(&self.confirmed_key)?;
        Ok(())
    }
}
