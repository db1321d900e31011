//! Integration tests for the authentication endpoints of `ApiClient`

use mockito::{Matcher, Server};
use projdesk_core::api::client::{LOGIN_REQUEST_ERROR, REGISTER_REQUEST_ERROR};
use projdesk_core::{ApiClient, TokenPair};
use serde_json::json;

#[tokio::test]
async fn login_success_returns_token_pair() {
    //* Given
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/token/")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"username": "ana", "password": "pw"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access": "acc-1", "refresh": "ref-1"}"#)
        .expect(1)
        .create_async()
        .await;

    //* When
    let client = ApiClient::new(server.url()).unwrap();
    let pair = client.login("ana", "pw").await;

    //* Then
    mock.assert_async().await;
    assert_eq!(pair, Ok(TokenPair::new("acc-1", "ref-1")));
}

#[tokio::test]
async fn login_field_errors_returned_verbatim() {
    //* Given
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/token/")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"username": ["This field may not be blank."], "password": ["This field may not be blank."]}"#)
        .create_async()
        .await;

    //* When
    let client = ApiClient::new(server.url()).unwrap();
    let failure = client.login("", "").await.unwrap_err();

    //* Then
    mock.assert_async().await;
    assert_eq!(
        failure.first_error("username"),
        Some("This field may not be blank.")
    );
    assert_eq!(
        failure.first_error("password"),
        Some("This field may not be blank.")
    );
    assert!(failure.detail.is_none());
}

#[tokio::test]
async fn login_detail_error_on_401() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/token/")
        .with_status(401)
        .with_body(r#"{"detail": "No active account found with the given credentials"}"#)
        .create_async()
        .await;

    //* When
    let client = ApiClient::new(server.url()).unwrap();
    let failure = client.login("ana", "wrong").await.unwrap_err();

    //* Then
    assert!(failure.field_errors.is_empty());
    assert_eq!(
        failure.detail.as_deref(),
        Some("No active account found with the given credentials")
    );
}

#[tokio::test]
async fn login_empty_error_object_gets_fallback_detail() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/token/")
        .with_status(400)
        .with_body("{}")
        .create_async()
        .await;

    let client = ApiClient::new(server.url()).unwrap();
    let failure = client.login("ana", "pw").await.unwrap_err();

    assert_eq!(failure.detail.as_deref(), Some("Authentication error"));
}

#[tokio::test]
async fn login_json_error_that_is_not_an_object_gets_fallback_detail() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/token/")
        .with_status(400)
        .with_body("null")
        .create_async()
        .await;

    //* When
    let client = ApiClient::new(server.url()).unwrap();
    let failure = client.login("ana", "pw").await.unwrap_err();

    //* Then
    assert!(failure.field_errors.is_empty());
    assert_eq!(failure.detail.as_deref(), Some("Authentication error"));
}

#[tokio::test]
async fn login_non_json_error_is_generic() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/token/")
        .with_status(502)
        .with_body("<html>Bad Gateway</html>")
        .create_async()
        .await;

    let client = ApiClient::new(server.url()).unwrap();
    let failure = client.login("ana", "pw").await.unwrap_err();

    assert!(failure.field_errors.is_empty());
    assert_eq!(failure.detail.as_deref(), Some(LOGIN_REQUEST_ERROR));
}

#[tokio::test]
async fn login_alternate_token_shape_fails_closed() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/token/")
        .with_status(200)
        .with_body(r#"{"accessToken": "acc", "refreshToken": "ref"}"#)
        .create_async()
        .await;

    //* When
    let client = ApiClient::new(server.url()).unwrap();
    let failure = client.login("ana", "pw").await.unwrap_err();

    //* Then
    assert_eq!(failure.detail.as_deref(), Some(LOGIN_REQUEST_ERROR));
}

#[tokio::test]
async fn login_network_failure_is_generic() {
    // nothing listens on the discard port
    let client = ApiClient::new("http://127.0.0.1:9").unwrap();
    let failure = client.login("ana", "pw").await.unwrap_err();

    assert_eq!(failure.detail.as_deref(), Some(LOGIN_REQUEST_ERROR));
    assert!(failure.field_errors.is_empty());
}

#[tokio::test]
async fn register_success_returns_user() {
    //* Given
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/users/")
        .match_body(Matcher::Json(json!({
            "username": "ana",
            "email": "ana@example.com",
            "password": "s3cret!!"
        })))
        .with_status(201)
        .with_body(r#"{"id": 7, "username": "ana", "email": "ana@example.com"}"#)
        .expect(1)
        .create_async()
        .await;

    //* When
    let client = ApiClient::new(server.url()).unwrap();
    let user = client
        .register("ana", "ana@example.com", "s3cret!!")
        .await
        .unwrap();

    //* Then
    mock.assert_async().await;
    assert_eq!(user.username, "ana");
    assert_eq!(user.id, Some(7));
}

#[tokio::test]
async fn register_username_taken() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/users/")
        .with_status(400)
        .with_body(r#"{"username": ["already taken"]}"#)
        .create_async()
        .await;

    //* When
    let client = ApiClient::new(server.url()).unwrap();
    let failure = client
        .register("ana", "ana@example.com", "s3cret!!")
        .await
        .unwrap_err();

    //* Then
    assert_eq!(failure.field_errors["username"][0], "already taken");
}

#[tokio::test]
async fn register_success_without_username_fails_closed() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/users/")
        .with_status(201)
        .with_body(r#"{"id": 7}"#)
        .create_async()
        .await;

    let client = ApiClient::new(server.url()).unwrap();
    let failure = client
        .register("ana", "ana@example.com", "s3cret!!")
        .await
        .unwrap_err();

    assert_eq!(failure.detail.as_deref(), Some(REGISTER_REQUEST_ERROR));
}

#[tokio::test]
async fn verify_token_status_mapping() {
    //* Given
    let mut server = Server::new_async().await;
    let ok = server
        .mock("POST", "/auth/token/verify/")
        .match_body(Matcher::Json(json!({"token": "good"})))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let unauthorized = server
        .mock("POST", "/auth/token/verify/")
        .match_body(Matcher::Json(json!({"token": "expired"})))
        .with_status(401)
        .with_body(r#"{"detail": "Token is invalid or expired", "code": "token_not_valid"}"#)
        .create_async()
        .await;
    let server_error = server
        .mock("POST", "/auth/token/verify/")
        .match_body(Matcher::Json(json!({"token": "boom"})))
        .with_status(500)
        .create_async()
        .await;

    //* When
    let client = ApiClient::new(server.url()).unwrap();

    //* Then
    assert!(client.verify_token("good").await);
    assert!(!client.verify_token("expired").await);
    assert!(!client.verify_token("boom").await);
    ok.assert_async().await;
    unauthorized.assert_async().await;
    server_error.assert_async().await;
}

#[tokio::test]
async fn verify_empty_token_makes_no_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/token/verify/")
        .expect(0)
        .create_async()
        .await;

    let client = ApiClient::new(server.url()).unwrap();
    assert!(!client.verify_token("").await);

    mock.assert_async().await;
}

#[tokio::test]
async fn refresh_token_returns_new_access() {
    //* Given
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/token/refresh/")
        .match_body(Matcher::Json(json!({"refresh": "ref-1"})))
        .with_status(200)
        .with_body(r#"{"access": "new123"}"#)
        .expect(1)
        .create_async()
        .await;

    //* When
    let client = ApiClient::new(server.url()).unwrap();
    let access = client.refresh_token("ref-1").await;

    //* Then
    mock.assert_async().await;
    assert_eq!(access.as_deref(), Some("new123"));
}

#[tokio::test]
async fn refresh_token_failures_yield_none() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/token/refresh/")
        .match_body(Matcher::Json(json!({"refresh": "revoked"})))
        .with_status(401)
        .create_async()
        .await;
    server
        .mock("POST", "/auth/token/refresh/")
        .match_body(Matcher::Json(json!({"refresh": "teapot"})))
        .with_status(418)
        .create_async()
        .await;
    server
        .mock("POST", "/auth/token/refresh/")
        .match_body(Matcher::Json(json!({"refresh": "shapeless"})))
        .with_status(200)
        .with_body(r#"{"accessToken": "nope"}"#)
        .create_async()
        .await;

    //* When
    let client = ApiClient::new(server.url()).unwrap();

    //* Then
    assert!(client.refresh_token("revoked").await.is_none());
    assert!(client.refresh_token("teapot").await.is_none());
    assert!(client.refresh_token("shapeless").await.is_none());
}

#[tokio::test]
async fn refresh_empty_token_makes_no_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/token/refresh/")
        .expect(0)
        .create_async()
        .await;

    let client = ApiClient::new(server.url()).unwrap();
    assert!(client.refresh_token("").await.is_none());

    mock.assert_async().await;
}
