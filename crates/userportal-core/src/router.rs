//! Route guard.
//!
//! Maps a path and the current `AuthState` to the view to show or to a
//! redirect. `Navigator` keeps the current path and follows redirects, and
//! sends the user to the login view when the session is invalidated.

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

use crate::auth::{AuthState, SessionEvent};

pub const LOGIN_PATH: &str = "/login";
pub const SIGNUP_PATH: &str = "/signup";
pub const HOME_PATH: &str = "/";

/// Redirect chains longer than this mean the table is inconsistent
const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    SignUp,
    Home,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Public(View),
    Protected(View),
    Unmatched,
}

impl Route {
    fn parse(path: &str) -> Self {
        match path {
            "/login" => Route::Public(View::Login),
            "/signup" => Route::Public(View::SignUp),
            "/" | "/home" => Route::Protected(View::Home),
            _ => Route::Unmatched,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Auth state still loading; show a neutral waiting screen
    Waiting,
    Render(View),
    /// Replace the current path with this one
    Redirect(&'static str),
}

pub fn resolve(path: &str, state: &AuthState) -> RouteOutcome {
    if state.is_loading() {
        return RouteOutcome::Waiting;
    }
    let authenticated = state.is_authenticated();

    match Route::parse(path) {
        Route::Public(_) if authenticated => RouteOutcome::Redirect(HOME_PATH),
        Route::Public(view) => RouteOutcome::Render(view),
        Route::Protected(view) if authenticated => RouteOutcome::Render(view),
        Route::Protected(_) => RouteOutcome::Redirect(LOGIN_PATH),
        Route::Unmatched if authenticated => RouteOutcome::Redirect(HOME_PATH),
        Route::Unmatched => RouteOutcome::Redirect(LOGIN_PATH),
    }
}

pub struct Navigator {
    path: String,
    events: broadcast::Receiver<SessionEvent>,
}

impl Navigator {
    pub fn new(initial_path: &str, events: broadcast::Receiver<SessionEvent>) -> Self {
        Self {
            path: initial_path.to_string(),
            events,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn navigate(&mut self, path: &str) {
        if self.path != path {
            debug!(from = %self.path, to = path, "Navigate");
            self.path = path.to_string();
        }
    }

    /// Resolve the current path, applying redirects in place
    pub fn current(&mut self, state: &AuthState) -> RouteOutcome {
        for _ in 0..MAX_REDIRECTS {
            match resolve(&self.path, state) {
                RouteOutcome::Redirect(to) => self.navigate(to),
                outcome => return outcome,
            }
        }
        warn!(path = %self.path, "Redirect loop, falling back to login");
        self.path = LOGIN_PATH.to_string();
        resolve(&self.path, state)
    }

    /// Drain pending session events without blocking, moving to the login
    /// view on invalidation. Returns the drained events so the caller can
    /// forward them.
    pub fn poll_session_events(&mut self) -> Vec<SessionEvent> {
        let mut drained = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => drained.push(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    // Only one kind of event exists, so missed ones are invalidations too
                    warn!(skipped, "Session events lagged");
                    drained.push(SessionEvent::Invalidated);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        if drained.contains(&SessionEvent::Invalidated) {
            self.navigate(LOGIN_PATH);
        }
        drained
    }
}
