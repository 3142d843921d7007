//! REST API client module for the user registration service.
//!
//! This module provides the `ApiClient`, which attaches the in-memory access
//! token to outgoing requests and renews the session when the API answers
//! 401, retrying the original request once.

pub mod client;
pub mod endpoint;
pub mod error;

pub use client::ApiClient;
pub use endpoint::Endpoint;
pub use error::ApiError;
