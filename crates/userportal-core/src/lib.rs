//! Core library for userportal.
//!
//! Provides the pieces a frontend needs to talk to the user registration API:
//!
//! - `api`: the `ApiClient`, which attaches bearer tokens and renews the
//!   session transparently when the API answers 401
//! - `auth`: the in-memory/durable `Session` and the `AuthCoordinator`
//! - `router`: route guard deciding which view to show for a path
//! - `forms`: local validation for the login and sign-up forms
//! - `config`: configuration loading

pub mod api;
pub mod auth;
pub mod config;
pub mod forms;
pub mod models;
pub mod router;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthCoordinator, AuthState, Session, SessionEvent};
pub use config::Config;
