use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 401, with the server's message when it sent one
    #[error("Unauthorized - token may be expired")]
    Unauthorized(Option<String>),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Session storage error: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shape used by the API for 4xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<serde_json::Value>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the `message` field out of a JSON error body.
    /// Validation failures send an array of messages; those are joined.
    fn server_message(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        match parsed.message? {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(", "))
                }
            }
            _ => None,
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(Self::server_message(body)),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            code @ 400..=499 => ApiError::Rejected {
                status: code,
                message: Self::server_message(body)
                    .unwrap_or_else(|| format!("Status {}: {}", status, truncated)),
            },
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Message from the server suitable for showing to the user, if it sent one
    pub fn user_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } => Some(message.as_str()),
            ApiError::Unauthorized(message) => message.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_maps_codes() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream down"),
            ApiError::ServerError(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(_)
        ));
    }

    #[test]
    fn test_rejected_carries_server_message() {
        let err = ApiError::from_status(StatusCode::CONFLICT, r#"{"message":"Email already exists"}"#);
        assert_eq!(err.user_message(), Some("Email already exists"));
        assert_eq!(err.to_string(), "Email already exists");
    }

    #[test]
    fn test_unauthorized_keeps_server_message() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"message":"Invalid credentials"}"#);
        assert!(err.is_unauthorized());
        assert_eq!(err.user_message(), Some("Invalid credentials"));

        let bare = ApiError::from_status(StatusCode::UNAUTHORIZED, "");
        assert_eq!(bare.user_message(), None);
    }

    #[test]
    fn test_rejected_joins_message_array() {
        let body = r#"{"message":["email must be an email","password too short"],"error":"Bad Request"}"#;
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.user_message(), Some("email must be an email, password too short"));
    }

    #[test]
    fn test_rejected_without_json_body() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, "plain text");
        match err {
            ApiError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("plain text"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated"));
        assert!(truncated.contains(&format!("{} total bytes", long.len())));
    }
}
