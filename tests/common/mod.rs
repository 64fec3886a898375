use axum::{body::Body, http::Request, Router};
use serde_json::Value;
use tower::ServiceExt;
use unified_inbox::{providers::Provider, Config, Server};
use wiremock::MockServer;

/// Test harness wiring the app against a wiremock upstream standing in
/// for both provider APIs.
pub struct TestHarness {
    pub server: Server,
    pub app: Router,
    pub mock: MockServer,
}

impl TestHarness {
    pub async fn new() -> Self {
        let mock = MockServer::start().await;
        let config = test_config(&mock);
        let server = Server::new(config).unwrap();
        let app = server.create_app();

        Self { server, app, mock }
    }

    /// Mint a session holding both provider tokens; returns its Cookie
    /// header value.
    pub async fn authenticated_session(&self) -> String {
        let id = self.server.sessions.create().await;
        self.server
            .sessions
            .set_token(id, Provider::Microsoft, "ms-token".to_string())
            .await;
        self.server
            .sessions
            .set_token(id, Provider::Linkedin, "li-token".to_string())
            .await;
        format!("inbox_session={}", id)
    }

    /// Mint a session with only one provider connected.
    #[allow(dead_code)]
    pub async fn partial_session(&self, provider: Provider, token: &str) -> String {
        let id = self.server.sessions.create().await;
        self.server
            .sessions
            .set_token(id, provider, token.to_string())
            .await;
        format!("inbox_session={}", id)
    }

    pub async fn make_request(&self, request: Request<Body>) -> axum::response::Response {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

/// Config pointing every provider endpoint at the mock server.
pub fn test_config(mock: &MockServer) -> Config {
    let mut config = Config::default();

    config.providers.microsoft.client_id = "test-ms-client".to_string();
    config.providers.microsoft.client_secret = "test-ms-secret".to_string();
    config.providers.microsoft.authorization_url = format!("{}/authorize/microsoft", mock.uri());
    config.providers.microsoft.token_url = format!("{}/token/microsoft", mock.uri());
    config.providers.microsoft.messages_url = format!("{}/v1.0/me/messages", mock.uri());

    config.providers.linkedin.client_id = "test-li-client".to_string();
    config.providers.linkedin.client_secret = "test-li-secret".to_string();
    config.providers.linkedin.authorization_url = format!("{}/authorize/linkedin", mock.uri());
    config.providers.linkedin.token_url = format!("{}/token/linkedin", mock.uri());
    config.providers.linkedin.messages_url = format!("{}/v2/conversations", mock.uri());

    config
}

#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
