use crate::aggregator::{AggregateParams, NoticeLevel, SortOption, UnifiedView};
use crate::providers::Provider;
use crate::server::Server;
use crate::session::session_id_from_headers;
use axum::{
    extract::{Form, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use url::form_urlencoded;

pub fn create_inbox_routes() -> Router<Server> {
    Router::new()
        .route("/", get(index_handler))
        .route("/inbox", get(inbox_get_handler).post(inbox_post_handler))
        .route("/clear_cache", get(clear_cache_handler))
}

#[derive(Deserialize, Default)]
pub struct InboxQuery {
    pub office365_next_page: Option<String>,
    pub linkedin_next_page: Option<String>,
    pub refresh: Option<String>,
    pub search_query: Option<String>,
    pub sort_option: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct InboxForm {
    pub search_query: Option<String>,
    pub sort_option: Option<String>,
}

pub async fn index_handler() -> Html<String> {
    Html(render_entry_page())
}

pub async fn inbox_get_handler(
    State(server): State<Server>,
    headers: HeaderMap,
    Query(query): Query<InboxQuery>,
) -> Response {
    run_inbox(server, headers, query, InboxForm::default()).await
}

pub async fn inbox_post_handler(
    State(server): State<Server>,
    headers: HeaderMap,
    Query(query): Query<InboxQuery>,
    Form(form): Form<InboxForm>,
) -> Response {
    run_inbox(server, headers, query, form).await
}

/// The unified inbox page. Requires both provider tokens; otherwise the
/// user is sent back to the entry page to start the login chain.
async fn run_inbox(
    server: Server,
    headers: HeaderMap,
    query: InboxQuery,
    form: InboxForm,
) -> Response {
    let Some(session_id) = session_id_from_headers(&headers) else {
        return Redirect::to("/").into_response();
    };

    let email_token = server.sessions.token(session_id, Provider::Microsoft).await;
    let messaging_token = server.sessions.token(session_id, Provider::Linkedin).await;
    let (Some(email_token), Some(messaging_token)) = (email_token, messaging_token) else {
        return Redirect::to("/").into_response();
    };

    // Form fields win over query parameters on the POST path.
    let search_query = form
        .search_query
        .or(query.search_query)
        .unwrap_or_default();
    let sort_option = SortOption::parse(form.sort_option.or(query.sort_option).as_deref());

    let params = AggregateParams {
        office365_cursor: query.office365_next_page,
        linkedin_cursor: query.linkedin_next_page,
        search_query: search_query.clone(),
        sort_option,
        force_refresh: query.refresh.is_some(),
    };

    let view = server
        .aggregator
        .aggregate(&email_token, &messaging_token, &params)
        .await;

    Html(render_inbox_page(&view, &search_query, sort_option)).into_response()
}

pub async fn clear_cache_handler(State(server): State<Server>) -> Redirect {
    server.cache.clear().await;
    tracing::info!("Response cache cleared");
    Redirect::to("/inbox?refresh=true")
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_entry_page() -> String {
    concat!(
        "<!doctype html><html><head><title>Unified Inbox</title></head><body>",
        "<h1>Unified Inbox</h1>",
        "<p>Connect both accounts to view your unified inbox.</p>",
        "<p><a href=\"/login/microsoft\">Sign in with Microsoft</a></p>",
        "</body></html>"
    )
    .to_string()
}

fn render_inbox_page(view: &UnifiedView, search_query: &str, sort_option: SortOption) -> String {
    let mut page = String::from(
        "<!doctype html><html><head><title>Unified Inbox</title></head><body><h1>Unified Inbox</h1>",
    );

    for notice in &view.notices {
        let class = match notice.level {
            NoticeLevel::Info => "notice-info",
            NoticeLevel::Warning => "notice-warning",
        };
        page.push_str(&format!(
            "<p class=\"{}\">{}</p>",
            class,
            escape_html(&notice.text)
        ));
    }

    page.push_str(&render_controls(search_query, sort_option));
    page.push_str(&render_message_list(
        "Office 365 emails",
        Provider::Microsoft,
        &view.emails,
        view.office365_next_page.as_deref(),
        "/load_more_emails",
        "office365_next_page",
    ));
    page.push_str(&render_message_list(
        "LinkedIn messages",
        Provider::Linkedin,
        &view.linkedin_messages,
        view.linkedin_next_page.as_deref(),
        "/load_more_linkedin_messages",
        "linkedin_next_page",
    ));

    page.push_str("<p><a href=\"/clear_cache\">Refresh</a></p></body></html>");
    page
}

fn render_controls(search_query: &str, sort_option: SortOption) -> String {
    let mut controls = String::from("<form method=\"post\" action=\"/inbox\">");
    controls.push_str(&format!(
        "<input type=\"text\" name=\"search_query\" value=\"{}\" placeholder=\"Search subjects\">",
        escape_html(search_query)
    ));
    controls.push_str("<select name=\"sort_option\">");
    for option in [
        SortOption::DateDesc,
        SortOption::DateAsc,
        SortOption::SubjectAsc,
        SortOption::SubjectDesc,
    ] {
        let selected = if option == sort_option { " selected" } else { "" };
        controls.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            option.as_str(),
            selected,
            option.as_str()
        ));
    }
    controls.push_str("</select><button type=\"submit\">Apply</button></form>");
    controls
}

fn render_message_list(
    heading: &str,
    provider: Provider,
    items: &[crate::providers::Message],
    next_page: Option<&str>,
    load_more_path: &str,
    cursor_param: &str,
) -> String {
    let mut section = format!("<h2>{}</h2><ul>", heading);
    for item in items {
        section.push_str(&format!(
            "<li>{} <small>{}</small></li>",
            escape_html(item.subject()),
            escape_html(item.timestamp(provider))
        ));
    }
    section.push_str("</ul>");

    if let Some(cursor) = next_page {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair(cursor_param, cursor)
            .finish();
        section.push_str(&format!(
            "<p><a href=\"{}?{}\">Load more</a></p>",
            load_more_path, query
        ));
    }
    section
}
