//! Terminal user interface module.
//!
//! This module contains:
//! - `input`: Keyboard input handling per view
//! - `render`: Drawing the waiting screen, login/sign-up forms and home view
//! - `styles`: Color palette and text styles

pub mod input;
pub mod render;
pub mod styles;
