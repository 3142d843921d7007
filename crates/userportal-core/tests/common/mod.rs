//! Shared helpers for integration tests against a mocked user registration API.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use userportal_core::api::ApiClient;
use userportal_core::auth::{AuthCoordinator, MemoryRenewalStore, RenewalStore, Session};
use userportal_core::models::TokenPair;
use wiremock::MockServer;

pub fn tokens_json(access: &str, refresh: &str) -> serde_json::Value {
    serde_json::json!({ "accessToken": access, "refreshToken": refresh })
}

pub fn profile_json(email: &str) -> serde_json::Value {
    serde_json::json!({ "email": email, "createdAt": "2024-03-05T10:15:00.000Z" })
}

pub fn message_json(message: &str) -> serde_json::Value {
    serde_json::json!({ "message": message, "statusCode": 400 })
}

pub fn coordinator(server: &MockServer, store: &MemoryRenewalStore) -> AuthCoordinator {
    AuthCoordinator::new(&server.uri(), Duration::from_secs(5), Arc::new(store.clone()))
        .expect("Failed to build coordinator")
}

/// Client whose session already holds `access` in memory and `refresh` in the store
pub fn signed_in_client(server: &MockServer, store: &MemoryRenewalStore, access: &str, refresh: &str) -> ApiClient {
    let session = Arc::new(Session::new(Arc::new(store.clone())));
    session
        .store_tokens(&TokenPair {
            access_token: access.into(),
            refresh_token: refresh.into(),
        })
        .expect("Failed to store tokens");
    ApiClient::new(&server.uri(), Duration::from_secs(5), session).expect("Failed to build client")
}

pub fn stored_refresh(store: &MemoryRenewalStore) -> Option<String> {
    store.load().expect("memory store never fails")
}

/// Authorization header values of every request the server saw for `path`
pub async fn auth_headers_for(server: &MockServer, path: &str) -> Vec<Option<String>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == path)
        .map(|r| {
            r.headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .collect()
}
