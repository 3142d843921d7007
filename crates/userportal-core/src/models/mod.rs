//! Data models exchanged with the user registration API.
//!
//! - `User`: the profile returned by `/user/profile`
//! - `TokenPair`: access/refresh tokens returned by login and refresh
//! - `Credentials`: request body for login and registration

pub mod token;
pub mod user;

pub use token::{Credentials, TokenPair};
pub use user::User;
