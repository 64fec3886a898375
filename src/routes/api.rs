//! JSON endpoints backing the inbox page's incremental "load more" links.

use crate::aggregator::{filter_and_sort, SortOption};
use crate::error::AppError;
use crate::providers::Provider;
use crate::server::Server;
use crate::session::session_id_from_headers;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

pub fn create_api_routes() -> Router<Server> {
    Router::new()
        .route("/load_more_emails", get(load_more_emails_handler))
        .route(
            "/load_more_linkedin_messages",
            get(load_more_linkedin_messages_handler),
        )
}

#[derive(Deserialize, Default)]
pub struct LoadMoreQuery {
    pub office365_next_page: Option<String>,
    pub linkedin_next_page: Option<String>,
    pub search_query: Option<String>,
    pub sort_option: Option<String>,
}

pub async fn load_more_emails_handler(
    State(server): State<Server>,
    headers: HeaderMap,
    Query(query): Query<LoadMoreQuery>,
) -> Result<Json<Value>, AppError> {
    load_more(server, headers, Provider::Microsoft, query).await
}

pub async fn load_more_linkedin_messages_handler(
    State(server): State<Server>,
    headers: HeaderMap,
    Query(query): Query<LoadMoreQuery>,
) -> Result<Json<Value>, AppError> {
    load_more(server, headers, Provider::Linkedin, query).await
}

/// Incremental fetch for one provider. Unlike the page path there is no
/// degraded view to fall back to, so a fetch failure surfaces as HTTP 500
/// with an error body. The same search/sort parameters as the page path
/// are honored so incremental pages match what is already on screen.
async fn load_more(
    server: Server,
    headers: HeaderMap,
    provider: Provider,
    query: LoadMoreQuery,
) -> Result<Json<Value>, AppError> {
    let session_id = session_id_from_headers(&headers)
        .ok_or_else(|| AppError::Unauthorized("Missing session cookie".to_string()))?;
    let token = server
        .sessions
        .token(session_id, provider)
        .await
        .ok_or_else(|| {
            AppError::Unauthorized(format!(
                "Not authenticated with {}",
                provider.display_name()
            ))
        })?;

    let cursor = match provider {
        Provider::Microsoft => query.office365_next_page,
        Provider::Linkedin => query.linkedin_next_page,
    };

    let page = server
        .aggregator
        .fetch_page(provider, &token, cursor.as_deref(), false)
        .await?;

    let sort_option = SortOption::parse(query.sort_option.as_deref());
    let search_query = query.search_query.unwrap_or_default();
    let items = filter_and_sort(page.items, provider, &search_query, sort_option);

    let body = match provider {
        Provider::Microsoft => json!({"emails": items, "next_page": page.next_cursor}),
        Provider::Linkedin => json!({"messages": items, "next_page": page.next_cursor}),
    };
    Ok(Json(body))
}
