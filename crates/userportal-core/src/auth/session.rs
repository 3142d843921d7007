use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::models::TokenPair;

use super::storage::RenewalStore;

/// Capacity of the session event channel
const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session could not be renewed and was torn down; the user must log in again
    Invalidated,
}

/// Credentials for the current login.
///
/// The access token is held in memory only. The refresh token goes through
/// the `RenewalStore` so the session survives a restart.
pub struct Session {
    access_token: RwLock<Option<String>>,
    store: Arc<dyn RenewalStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new(store: Arc<dyn RenewalStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            access_token: RwLock::new(None),
            store,
            events,
        }
    }

    /// Current in-memory access token
    pub fn access_token(&self) -> Option<String> {
        self.access_token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_access_token(&self, token: Option<String>) {
        *self
            .access_token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token;
    }

    /// Refresh token from durable storage. Unreadable storage counts as no session.
    pub fn refresh_token(&self) -> Option<String> {
        match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read refresh token");
                None
            }
        }
    }

    /// Persist the refresh token, then keep the access token in memory
    pub fn store_tokens(&self, tokens: &TokenPair) -> Result<(), ApiError> {
        self.store
            .save(&tokens.refresh_token)
            .map_err(|e| ApiError::Storage(format!("{:#}", e)))?;
        self.set_access_token(Some(tokens.access_token.clone()));
        debug!("Session tokens stored");
        Ok(())
    }

    /// Drop both tokens
    pub fn clear(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear refresh token");
        }
        self.set_access_token(None);
    }

    /// Drop both tokens and tell subscribers the user has to log in again
    pub fn invalidate(&self) {
        self.clear();
        // No subscribers is fine
        let _ = self.events.send(SessionEvent::Invalidated);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token().is_some()
    }
}
