//! Local validation for the login and sign-up forms.
//!
//! Validation failures never reach the network. Messages are shown next to
//! the offending field.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::Credentials;

/// Minimum password length accepted at sign-up
pub const MIN_PASSWORD_LENGTH: usize = 6;

pub const EMAIL_REQUIRED: &str = "Email is required";
pub const EMAIL_INVALID: &str = "Invalid email address";
pub const PASSWORD_REQUIRED: &str = "Password is required";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("email pattern is valid")
    })
}

/// Field-level errors; `None` means the field passed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub email: Option<&'static str>,
    pub password: Option<&'static str>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = [self.email, self.password].into_iter().flatten().collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for FormErrors {}

fn check_email(email: &str) -> Option<&'static str> {
    if email.is_empty() {
        Some(EMAIL_REQUIRED)
    } else if !email_regex().is_match(email) {
        Some(EMAIL_INVALID)
    } else {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> Result<Credentials, FormErrors> {
        let errors = FormErrors {
            email: check_email(&self.email),
            password: self.password.is_empty().then_some(PASSWORD_REQUIRED),
        };
        if errors.is_empty() {
            Ok(Credentials::new(&self.email, &self.password))
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
}

impl SignUpForm {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> Result<Credentials, FormErrors> {
        let password = if self.password.is_empty() {
            Some(PASSWORD_REQUIRED)
        } else if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            Some(PASSWORD_TOO_SHORT)
        } else {
            None
        };
        let errors = FormErrors {
            email: check_email(&self.email),
            password,
        };
        if errors.is_empty() {
            Ok(Credentials::new(&self.email, &self.password))
        } else {
            Err(errors)
        }
    }
}
