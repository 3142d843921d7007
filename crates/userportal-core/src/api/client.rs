//! API client for the user registration service.
//!
//! Every call goes through `execute`, which plays the part of a request and
//! response interceptor:
//!
//! - outbound: attach `Bearer <access token>` unless the endpoint is public
//! - inbound: on the first 401 for a request, renew the session with the
//!   stored refresh token and send the request again, once
//!
//! Renewal is single-flight. Requests that hit 401 while another request is
//! already renewing wait for it and reuse the fresh access token.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::auth::Session;
use crate::models::{Credentials, TokenPair, User};

use super::{ApiError, Endpoint};

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Body-less request marker
const NO_BODY: Option<&()> = None;

/// API client for the user registration service.
/// Clone is cheap and clones share the session and the renewal lock.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<Session>,
    renewal: Arc<Mutex<()>>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, session: Arc<Session>) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            renewal: Arc::new(Mutex::new(())),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    // ===== Endpoints =====

    /// Exchange email and password for a token pair. Does not touch the session.
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        let response = self.execute(Endpoint::Login, Some(credentials)).await?;
        Self::parse_json(response).await
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        self.execute(Endpoint::Register, Some(credentials)).await?;
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.execute(Endpoint::Logout, NO_BODY).await?;
        Ok(())
    }

    pub async fn fetch_profile(&self) -> Result<User, ApiError> {
        let response = self.execute(Endpoint::Profile, NO_BODY).await?;
        Self::parse_json(response).await
    }

    /// Trade the stored refresh token for a new token pair and store it.
    ///
    /// Used on start-up to restore a session. A 401 from the refresh endpoint
    /// ends the session; any other failure leaves cleanup to the caller.
    pub async fn renew_session(&self) -> Result<(), ApiError> {
        if !self.session.has_refresh_token() {
            return Err(ApiError::Unauthorized(None));
        }
        let response = self
            .execute(Endpoint::Refresh, Some(&serde_json::json!({})))
            .await?;
        let tokens: TokenPair = Self::parse_json(response).await?;
        self.session.store_tokens(&tokens)
    }

    // ===== Interception =====

    /// Token the outbound request is sent with
    fn outbound_token(&self, endpoint: Endpoint) -> Option<String> {
        match endpoint {
            e if e.is_public() => None,
            Endpoint::Refresh => self.session.refresh_token(),
            _ => self.session.access_token(),
        }
    }

    async fn execute<B: Serialize>(
        &self,
        endpoint: Endpoint,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let sent_with = self.outbound_token(endpoint);
        let response = self.send(endpoint, body, sent_with.as_deref()).await?;

        let rejected = match Self::check_response(response).await {
            Err(e) if e.is_unauthorized() => e,
            other => return other,
        };

        // First 401 for this request. The retry's own result is final.
        let access_token = self
            .renew_after_unauthorized(endpoint, sent_with.as_deref(), rejected)
            .await?;
        debug!(?endpoint, "Retrying request with renewed access token");
        let response = self.send(endpoint, body, Some(&access_token)).await?;
        Self::check_response(response).await
    }

    /// Obtain a usable access token after `endpoint` was answered with 401.
    /// Ends the session when renewal is impossible or rejected. Without a
    /// refresh attempt the caller gets the original 401 back.
    async fn renew_after_unauthorized(
        &self,
        endpoint: Endpoint,
        failed_with: Option<&str>,
        rejected: ApiError,
    ) -> Result<String, ApiError> {
        let _guard = self.renewal.lock().await;

        // Only a request that carried an access token can have been beaten
        // by another renewal. Public endpoints go out without one.
        if endpoint != Endpoint::Refresh {
            if let (Some(failed), Some(current)) = (failed_with, self.session.access_token()) {
                if failed != current {
                    debug!(?endpoint, "Session renewed while waiting, reusing access token");
                    return Ok(current);
                }
            }
        }

        let refresh_token = match self.session.refresh_token() {
            Some(token) if endpoint != Endpoint::Refresh => token,
            _ => {
                warn!(?endpoint, "Refresh token missing or rejected, ending session");
                self.session.invalidate();
                return Err(rejected);
            }
        };

        info!("Access token expired, refreshing session");
        match self.request_refresh(&refresh_token).await {
            Ok(tokens) => {
                self.session.store_tokens(&tokens)?;
                Ok(tokens.access_token)
            }
            Err(e) => {
                error!(error = %e, "Session refresh failed, ending session");
                self.session.invalidate();
                Err(e)
            }
        }
    }

    /// Call the refresh endpoint directly, outside the interceptor
    async fn request_refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let response = self
            .client
            .post(self.url(Endpoint::Refresh))
            .header(header::ACCEPT, "application/json")
            .bearer_auth(refresh_token)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse_json(response).await
    }

    async fn send<B: Serialize>(
        &self,
        endpoint: Endpoint,
        body: Option<&B>,
        bearer: Option<&str>,
    ) -> Result<Response, ApiError> {
        let mut request = self
            .client
            .request(endpoint.method(), self.url(endpoint))
            .header(header::ACCEPT, "application/json");

        let bearer = bearer.filter(|_| !endpoint.is_public());
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(?endpoint, authenticated = bearer.is_some(), "Sending request");
        Ok(request.send().await?)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryRenewalStore;

    fn client(base_url: &str) -> ApiClient {
        let session = Arc::new(Session::new(Arc::new(MemoryRenewalStore::new())));
        ApiClient::new(base_url, Duration::from_secs(5), session).expect("client")
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let api = client("http://localhost:3000/");
        assert_eq!(api.url(Endpoint::Profile), "http://localhost:3000/user/profile");
    }

    #[test]
    fn test_outbound_token_selection() {
        let api = client("http://localhost:3000");
        api.session()
            .store_tokens(&TokenPair {
                access_token: "acc".into(),
                refresh_token: "ref".into(),
            })
            .unwrap();

        assert_eq!(api.outbound_token(Endpoint::Login), None);
        assert_eq!(api.outbound_token(Endpoint::Register), None);
        assert_eq!(api.outbound_token(Endpoint::Refresh).as_deref(), Some("ref"));
        assert_eq!(api.outbound_token(Endpoint::Profile).as_deref(), Some("acc"));
        assert_eq!(api.outbound_token(Endpoint::Logout).as_deref(), Some("acc"));
    }
}
