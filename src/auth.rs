//! OAuth2 authorization-code flows for the two providers, chained so the
//! Microsoft callback hands off to the LinkedIn login.

use crate::config::Config;
use crate::error::AppError;
use crate::providers::Provider;
use crate::session::SessionStore;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, Scope, TokenResponse as OAuth2TokenResponse,
    TokenUrl,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

// Avoid oauth2 type madness
pub type Oauth2Client =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

pub struct OAuthService {
    config: Arc<Config>,
    clients: HashMap<Provider, Oauth2Client>,
    http_client: reqwest::Client,
}

impl OAuthService {
    pub fn new(config: Arc<Config>) -> Result<Self, AppError> {
        let mut clients = HashMap::new();
        for provider in Provider::ALL {
            clients.insert(provider, create_oauth_client(&config, provider)?);
        }

        let http_client = reqwest::ClientBuilder::new()
            // Following redirects opens the client up to SSRF vulnerabilities.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(format!("reqwest build error: {}", e)))?;

        Ok(Self {
            config,
            clients,
            http_client,
        })
    }

    fn client(&self, provider: Provider) -> &Oauth2Client {
        // Both providers are inserted in new()
        &self.clients[&provider]
    }

    /// Build the provider authorization URL and record the CSRF state in
    /// the session for the callback to redeem.
    pub async fn authorization_url(
        &self,
        provider: Provider,
        sessions: &SessionStore,
        session_id: Uuid,
    ) -> Result<String, AppError> {
        let state = Uuid::new_v4().to_string();
        if !sessions.insert_state(session_id, &state, provider).await {
            return Err(AppError::Unauthorized("Session expired".to_string()));
        }

        let scopes = &self.config.provider(provider).scopes;
        let (authorization_url, _csrf_token) = self
            .client(provider)
            .authorize_url(|| CsrfToken::new(state.clone()))
            .add_scopes(scopes.iter().map(|s| Scope::new(s.clone())))
            .url();

        Ok(authorization_url.to_string())
    }

    /// Validate the pending state, exchange the authorization code, and
    /// return the bearer token.
    pub async fn exchange_code(
        &self,
        provider: Provider,
        code: String,
        state: &str,
        sessions: &SessionStore,
        session_id: Uuid,
    ) -> Result<String, AppError> {
        match sessions.take_state(session_id, state).await {
            Some(expected) if expected == provider => {}
            Some(_) => {
                return Err(AppError::OAuth("State token provider mismatch".to_string()));
            }
            None => {
                return Err(AppError::OAuth("Invalid or expired state token".to_string()));
            }
        }

        let token_result = self
            .client(provider)
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::OAuth(format!("Token exchange failed: {}", e)))?;

        Ok(token_result.access_token().secret().clone())
    }
}

/// Where the callback sends the browser next: the login chain visits
/// Microsoft first, then LinkedIn, then lands on the inbox.
pub fn next_chain_step(provider: Provider) -> &'static str {
    match provider {
        Provider::Microsoft => "/login/linkedin",
        Provider::Linkedin => "/inbox",
    }
}

fn create_oauth_client(config: &Config, provider: Provider) -> Result<Oauth2Client, AppError> {
    let settings = config.provider(provider);

    let auth_url = AuthUrl::new(settings.authorization_url.clone()).map_err(|e| {
        AppError::BadRequest(format!(
            "Invalid authorization URL for provider '{}': {}",
            provider, e
        ))
    })?;

    let token_url = TokenUrl::new(settings.token_url.clone()).map_err(|e| {
        AppError::BadRequest(format!(
            "Invalid token URL for provider '{}': {}",
            provider, e
        ))
    })?;

    let redirect_url = RedirectUrl::new(config.redirect_uri(provider)).map_err(|e| {
        AppError::BadRequest(format!(
            "Invalid redirect URI for provider '{}': {}",
            provider, e
        ))
    })?;

    Ok(BasicClient::new(ClientId::new(settings.client_id.clone()))
        .set_client_secret(ClientSecret::new(settings.client_secret.clone()))
        .set_auth_uri(auth_url)
        .set_token_uri(token_url)
        .set_redirect_uri(redirect_url))
}
