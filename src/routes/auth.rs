use crate::auth::next_chain_step;
use crate::error::AppError;
use crate::providers::Provider;
use crate::server::Server;
use crate::session::session_id_from_headers;
use axum::{
    extract::{Path, Query, State},
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

pub fn create_auth_routes() -> Router<Server> {
    Router::new()
        .route("/login/{provider}", get(login_handler))
        .route("/callback/{provider}", get(callback_handler))
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

pub async fn login_handler(
    State(server): State<Server>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let provider = parse_provider(&provider)?;

    let (session_id, set_cookie) = server.sessions.resolve(&headers).await;
    let authorization_url = server
        .oauth
        .authorization_url(provider, &server.sessions, session_id)
        .await?;

    let redirect = Redirect::to(&authorization_url);
    Ok(match set_cookie {
        Some(cookie) => (AppendHeaders([(SET_COOKIE, cookie)]), redirect).into_response(),
        None => redirect.into_response(),
    })
}

pub async fn callback_handler(
    State(server): State<Server>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let provider = parse_provider(&provider)?;

    // Provider refused the authorization; send the user back to the start.
    if let Some(error) = params.error {
        tracing::warn!(
            "{} authorization refused: {} {}",
            provider,
            error,
            params.error_description.unwrap_or_default()
        );
        return Ok(Redirect::to("/").into_response());
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;
    let state = params
        .state
        .ok_or_else(|| AppError::BadRequest("Missing state parameter".to_string()))?;

    let session_id = session_id_from_headers(&headers)
        .ok_or_else(|| AppError::Unauthorized("Missing session cookie".to_string()))?;

    let token = server
        .oauth
        .exchange_code(provider, code, &state, &server.sessions, session_id)
        .await?;

    if !server.sessions.set_token(session_id, provider, token).await {
        return Err(AppError::Unauthorized("Session expired".to_string()));
    }

    tracing::info!("Stored {} bearer token for session", provider);
    Ok(Redirect::to(next_chain_step(provider)).into_response())
}

fn parse_provider(name: &str) -> Result<Provider, AppError> {
    Provider::parse(name)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown provider: {}", name)))
}
