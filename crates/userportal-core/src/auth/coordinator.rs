//! Login state for the whole application.
//!
//! The coordinator owns the `Session`, hands it to the `ApiClient` it builds,
//! and publishes an `AuthState` that views and the route guard read.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::forms::{FormErrors, LoginForm, SignUpForm};
use crate::models::{Credentials, User};

use super::session::{Session, SessionEvent};
use super::storage::RenewalStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Start-up session restore has not finished
    Loading,
    Authenticated(User),
    Anonymous,
}

impl AuthState {
    pub fn is_loading(&self) -> bool {
        matches!(self, AuthState::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Failure of a form submission: either it never left the form, or the API refused it
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("{0}")]
    Invalid(FormErrors),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct AuthCoordinator {
    api: ApiClient,
    session: Arc<Session>,
    state: watch::Sender<AuthState>,
}

impl AuthCoordinator {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        store: Arc<dyn RenewalStore>,
    ) -> Result<Self, ApiError> {
        let session = Arc::new(Session::new(store));
        let api = ApiClient::new(base_url, timeout, Arc::clone(&session))?;
        let (state, _) = watch::channel(AuthState::Loading);

        Ok(Self {
            api,
            session,
            state,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// Only meaningful once `is_loading()` is false
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    fn set_state(&self, state: AuthState) {
        self.state.send_replace(state);
    }

    /// Restore the session saved by a previous run, if any.
    /// Always leaves the coordinator out of `Loading`.
    pub async fn initialize(&self) {
        if !self.session.has_refresh_token() {
            debug!("No saved session");
            self.set_state(AuthState::Anonymous);
            return;
        }

        info!("Restoring saved session");
        match self.api.renew_session().await {
            Ok(()) => {
                self.fetch_profile().await;
            }
            Err(e) => {
                warn!(error = %e, "Saved session is no longer valid");
                self.session.clear();
                self.set_state(AuthState::Anonymous);
            }
        }

        if self.is_loading() {
            self.set_state(AuthState::Anonymous);
        }
    }

    /// Log in and load the profile.
    /// Returns `None` if the login succeeded but the profile could not be loaded.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<User>, ApiError> {
        let tokens = self.api.login(&Credentials::new(email, password)).await?;
        self.session.store_tokens(&tokens)?;
        info!(email, "Login successful");
        Ok(self.fetch_profile().await)
    }

    /// Validate the login form, then log in
    pub async fn submit_login(&self, form: &LoginForm) -> Result<Option<User>, SubmitError> {
        let credentials = form.validate().map_err(SubmitError::Invalid)?;
        Ok(self.login(&credentials.email, &credentials.password).await?)
    }

    /// Validate the sign-up form, then create the account. Does not log in.
    pub async fn register(&self, form: &SignUpForm) -> Result<(), SubmitError> {
        let credentials = form.validate().map_err(SubmitError::Invalid)?;
        self.api.register(&credentials).await?;
        info!(email = %credentials.email, "Account created");
        Ok(())
    }

    /// Load the current user. Any failure logs the user out.
    pub async fn fetch_profile(&self) -> Option<User> {
        match self.api.fetch_profile().await {
            Ok(user) => {
                self.set_state(AuthState::Authenticated(user.clone()));
                Some(user)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch profile");
                self.logout().await;
                None
            }
        }
    }

    /// End the session. The remote call is best-effort; local state is always cleared.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "Logout request failed (token may already be expired)");
        }
        self.session.clear();
        self.set_state(AuthState::Anonymous);
    }

    /// React to a session torn down by the API client
    pub fn handle_session_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Invalidated => {
                if self.is_authenticated() {
                    info!("Session invalidated, user must log in again");
                    self.set_state(AuthState::Anonymous);
                }
            }
        }
    }
}
