//! End-to-end OAuth2 chain: Microsoft login and callback hand off to the
//! LinkedIn leg, leaving both bearer tokens in the session.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::TestHarness;
use serde_json::json;
use unified_inbox::providers::Provider;
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

fn mock_token_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": "mock_access_token_123",
        "token_type": "bearer",
        "expires_in": 3600
    }))
}

/// Extract (cookie, state) from a login redirect.
fn parse_login_redirect(response: &axum::response::Response) -> (String, String) {
    let cookie = response
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let location = response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap();
    let url = Url::parse(location).unwrap();
    let state = url
        .query_pairs()
        .find(|(name, _)| name == "state")
        .map(|(_, value)| value.into_owned())
        .unwrap();

    (cookie, state)
}

fn session_id(cookie: &str) -> Uuid {
    cookie
        .strip_prefix("inbox_session=")
        .unwrap()
        .parse()
        .unwrap()
}

#[tokio::test]
async fn test_microsoft_login_and_callback_chain_to_linkedin() {
    let harness = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(path("/token/microsoft"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(mock_token_response())
        .mount(&harness.mock)
        .await;

    let response = harness
        .make_request(
            Request::builder()
                .uri("/login/microsoft")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let location = response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.contains("/authorize/microsoft"));
    assert!(location.contains("client_id=test-ms-client"));
    let (cookie, state) = parse_login_redirect(&response);

    let response = harness
        .make_request(
            Request::builder()
                .uri(format!(
                    "/callback/microsoft?code=auth-code-1&state={}",
                    state
                ))
                .header("Cookie", &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get("location").unwrap(), "/login/linkedin");

    let token = harness
        .server
        .sessions
        .token(session_id(&cookie), Provider::Microsoft)
        .await;
    assert_eq!(token.as_deref(), Some("mock_access_token_123"));
}

#[tokio::test]
async fn test_linkedin_callback_lands_on_inbox() {
    let harness = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(path("/token/linkedin"))
        .respond_with(mock_token_response())
        .mount(&harness.mock)
        .await;

    let response = harness
        .make_request(
            Request::builder()
                .uri("/login/linkedin")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    let (cookie, state) = parse_login_redirect(&response);

    let response = harness
        .make_request(
            Request::builder()
                .uri(format!("/callback/linkedin?code=auth-code-2&state={}", state))
                .header("Cookie", &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get("location").unwrap(), "/inbox");

    let token = harness
        .server
        .sessions
        .token(session_id(&cookie), Provider::Linkedin)
        .await;
    assert_eq!(token.as_deref(), Some("mock_access_token_123"));
}

#[tokio::test]
async fn test_callback_with_provider_error_returns_to_entry_page() {
    let harness = TestHarness::new().await;

    let response = harness
        .make_request(
            Request::builder()
                .uri("/callback/microsoft?error=access_denied&error_description=User%20refused")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get("location").unwrap(), "/");
}

#[tokio::test]
async fn test_callback_missing_code_is_bad_request() {
    let harness = TestHarness::new().await;

    let response = harness
        .make_request(
            Request::builder()
                .uri("/callback/microsoft?state=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_with_forged_state_is_rejected() {
    let harness = TestHarness::new().await;

    let response = harness
        .make_request(
            Request::builder()
                .uri("/login/microsoft")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    let (cookie, _state) = parse_login_redirect(&response);

    let response = harness
        .make_request(
            Request::builder()
                .uri("/callback/microsoft?code=auth-code&state=forged")
                .header("Cookie", &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // No token was stored for the session
    let token = harness
        .server
        .sessions
        .token(session_id(&cookie), Provider::Microsoft)
        .await;
    assert_eq!(token, None);
}

#[tokio::test]
async fn test_state_cannot_be_replayed() {
    let harness = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(path("/token/microsoft"))
        .respond_with(mock_token_response())
        .mount(&harness.mock)
        .await;

    let response = harness
        .make_request(
            Request::builder()
                .uri("/login/microsoft")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    let (cookie, state) = parse_login_redirect(&response);

    let callback_uri = format!("/callback/microsoft?code=auth-code&state={}", state);
    let response = harness
        .make_request(
            Request::builder()
                .uri(&callback_uri)
                .header("Cookie", &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // The state token was consumed by the first redemption
    let response = harness
        .make_request(
            Request::builder()
                .uri(&callback_uri)
                .header("Cookie", &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
