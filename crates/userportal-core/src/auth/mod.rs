//! Authentication module for managing user sessions.
//!
//! This module provides:
//! - `Session`: access token in memory, refresh token in a `RenewalStore`
//! - `RenewalStore` backends: file, OS keychain, in-memory
//! - `AuthCoordinator`: login/logout/profile and the derived `AuthState`

pub mod coordinator;
pub mod session;
pub mod storage;

pub use coordinator::{AuthCoordinator, AuthState, SubmitError};
pub use session::{Session, SessionEvent};
pub use storage::{FileRenewalStore, KeyringRenewalStore, MemoryRenewalStore, RenewalStore};
