//! Bearer injection and 401 renewal behaviour of the API client.

mod common;

use common::{auth_headers_for, profile_json, signed_in_client, stored_refresh, tokens_json};
use userportal_core::api::ApiError;
use userportal_core::auth::{MemoryRenewalStore, RenewalStore, SessionEvent};
use userportal_core::models::Credentials;
use userportal_core::router::{Navigator, LOGIN_PATH};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_profile_carries_in_memory_access_token() {
    let server = MockServer::start().await;
    let store = MemoryRenewalStore::new();
    let api = signed_in_client(&server, &store, "acc-1", "ref-1");

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .and(header("authorization", "Bearer acc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("a@b.com")))
        .expect(1)
        .mount(&server)
        .await;

    let user = api.fetch_profile().await.expect("profile");
    assert_eq!(user.email, "a@b.com");
}

#[tokio::test]
async fn test_login_and_register_never_send_bearer() {
    let server = MockServer::start().await;
    let store = MemoryRenewalStore::new();
    let api = signed_in_client(&server, &store, "acc-1", "ref-1");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens_json("acc-2", "ref-2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/register"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let creds = Credentials::new("a@b.com", "secret1");
    api.login(&creds).await.expect("login");
    api.register(&creds).await.expect("register");

    assert_eq!(auth_headers_for(&server, "/auth/login").await, vec![None]);
    assert_eq!(auth_headers_for(&server, "/user/register").await, vec![None]);
    // login alone does not touch the session
    assert_eq!(api.session().access_token().as_deref(), Some("acc-1"));
}

#[tokio::test]
async fn test_expired_access_token_is_renewed_and_request_retried_once() {
    let server = MockServer::start().await;
    let store = MemoryRenewalStore::new();
    let api = signed_in_client(&server, &store, "old", "ref-1");

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(header("authorization", "Bearer ref-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens_json("new", "ref-2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("a@b.com")))
        .expect(1)
        .mount(&server)
        .await;

    let user = api.fetch_profile().await.expect("retried profile");

    assert_eq!(user.email, "a@b.com");
    assert_eq!(api.session().access_token().as_deref(), Some("new"));
    assert_eq!(stored_refresh(&store).as_deref(), Some("ref-2"));
}

#[tokio::test]
async fn test_rejected_refresh_ends_session() {
    let server = MockServer::start().await;
    let store = MemoryRenewalStore::new();
    let api = signed_in_client(&server, &store, "old", "ref-1");
    let mut events = api.session().subscribe();

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = api.fetch_profile().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(stored_refresh(&store), None);
    assert_eq!(api.session().access_token(), None);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Invalidated);
}

#[tokio::test]
async fn test_refresh_failure_is_propagated() {
    let server = MockServer::start().await;
    let store = MemoryRenewalStore::new();
    let api = signed_in_client(&server, &store, "old", "ref-1");

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let err = api.fetch_profile().await.unwrap_err();

    // The caller sees the refresh failure, not the original 401
    assert!(matches!(err, ApiError::ServerError(ref body) if body == "maintenance"));
    assert_eq!(stored_refresh(&store), None);
    assert_eq!(api.session().access_token(), None);
}

#[tokio::test]
async fn test_missing_refresh_token_ends_session_without_refresh_call() {
    let server = MockServer::start().await;
    let store = MemoryRenewalStore::new();
    let api = signed_in_client(&server, &store, "old", "ref-1");
    store.clear().unwrap();
    let mut nav = Navigator::new("/home", api.session().subscribe());

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens_json("x", "y")))
        .expect(0)
        .mount(&server)
        .await;

    let err = api.fetch_profile().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(api.session().access_token(), None);
    assert_eq!(nav.poll_session_events(), vec![SessionEvent::Invalidated]);
    assert_eq!(nav.path(), LOGIN_PATH);
}

#[tokio::test]
async fn test_retried_request_is_not_renewed_again() {
    let server = MockServer::start().await;
    let store = MemoryRenewalStore::new();
    let api = signed_in_client(&server, &store, "old", "ref-1");

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens_json("new", "ref-2")))
        .expect(1)
        .mount(&server)
        .await;

    let err = api.fetch_profile().await.unwrap_err();

    assert!(err.is_unauthorized());
    // Second 401 passes through untouched; renewed tokens stay
    assert_eq!(api.session().access_token().as_deref(), Some("new"));
    assert_eq!(stored_refresh(&store).as_deref(), Some("ref-2"));
}

#[tokio::test]
async fn test_other_errors_pass_through_without_refresh() {
    let server = MockServer::start().await;
    let store = MemoryRenewalStore::new();
    let api = signed_in_client(&server, &store, "acc", "ref-1");

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens_json("x", "y")))
        .expect(0)
        .mount(&server)
        .await;

    let err = api.fetch_profile().await.unwrap_err();

    assert!(matches!(err, ApiError::ServerError(_)));
    assert_eq!(api.session().access_token().as_deref(), Some("acc"));
    assert_eq!(stored_refresh(&store).as_deref(), Some("ref-1"));
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    let store = MemoryRenewalStore::new();
    let api = signed_in_client(&server, &store, "old", "ref-1");

    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(header("authorization", "Bearer ref-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens_json("new", "ref-2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json("a@b.com")))
        .mount(&server)
        .await;

    let results = futures::future::join_all((0..3).map(|_| api.fetch_profile())).await;

    for result in results {
        assert_eq!(result.expect("profile").email, "a@b.com");
    }
    assert_eq!(stored_refresh(&store).as_deref(), Some("ref-2"));
}

#[tokio::test]
async fn test_public_401_renews_instead_of_reusing_access_token() {
    let server = MockServer::start().await;
    let store = MemoryRenewalStore::new();
    let api = signed_in_client(&server, &store, "acc", "ref");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens_json("acc-login", "ref-login")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(header("authorization", "Bearer ref"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tokens_json("acc-new", "ref-new")))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = api
        .login(&Credentials::new("a@b.com", "secret1"))
        .await
        .expect("login retried after renewal");

    assert_eq!(tokens.access_token, "acc-login");
    let paths: Vec<String> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(paths, vec!["/auth/login", "/auth/refresh", "/auth/login"]);
    // The retry is still sent without a bearer
    assert_eq!(auth_headers_for(&server, "/auth/login").await, vec![None, None]);
    assert_eq!(api.session().access_token().as_deref(), Some("acc-new"));
    assert_eq!(stored_refresh(&store).as_deref(), Some("ref-new"));
}
