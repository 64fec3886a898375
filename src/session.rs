//! Session-scoped token store. Bearer tokens live in process memory for
//! the lifetime of the session and are never persisted.

use crate::providers::Provider;
use axum::http::{header::COOKIE, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "inbox_session";

/// Pending OAuth2 CSRF state, redeemable once before its TTL elapses.
#[derive(Debug, Clone)]
struct PendingState {
    provider: Provider,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Session {
    tokens: HashMap<Provider, String>,
    pending_states: HashMap<String, PendingState>,
    expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    session_ttl: Duration,
    state_ttl: Duration,
}

impl SessionStore {
    pub fn new(session_ttl_secs: i64, state_ttl_secs: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            session_ttl: Duration::seconds(session_ttl_secs),
            state_ttl: Duration::seconds(state_ttl_secs),
        }
    }

    /// Create a fresh session, sweeping out expired ones while the write
    /// lock is held anyway.
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| session.expires_at > now);
        sessions.insert(
            id,
            Session {
                tokens: HashMap::new(),
                pending_states: HashMap::new(),
                expires_at: now + self.session_ttl,
            },
        );
        id
    }

    /// Resolve the session referenced by the request cookie, creating one
    /// when the cookie is absent or stale. Returns a `Set-Cookie` value
    /// when a new session was minted.
    pub async fn resolve(&self, headers: &HeaderMap) -> (Uuid, Option<String>) {
        if let Some(id) = session_id_from_headers(headers) {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(&id) {
                if session.expires_at > Utc::now() {
                    return (id, None);
                }
            }
        }
        let id = self.create().await;
        (id, Some(session_cookie(id)))
    }

    /// The one operation the aggregation core needs: current bearer token
    /// for a provider, or none.
    pub async fn token(&self, id: Uuid, provider: Provider) -> Option<String> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&id)?;
        if session.expires_at <= Utc::now() {
            return None;
        }
        session.tokens.get(&provider).cloned()
    }

    /// Returns false when the session is unknown or expired.
    pub async fn set_token(&self, id: Uuid, provider: Provider, token: String) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session) if session.expires_at > Utc::now() => {
                session.tokens.insert(provider, token);
                true
            }
            _ => false,
        }
    }

    pub async fn insert_state(&self, id: Uuid, state: &str, provider: Provider) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session) if session.expires_at > Utc::now() => {
                session.pending_states.insert(
                    state.to_string(),
                    PendingState {
                        provider,
                        expires_at: Utc::now() + self.state_ttl,
                    },
                );
                true
            }
            _ => false,
        }
    }

    /// Redeem a CSRF state token. The state is consumed whether or not it
    /// is still valid; expired states return `None`.
    pub async fn take_state(&self, id: Uuid, state: &str) -> Option<Provider> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id)?;
        let pending = session.pending_states.remove(state)?;
        if pending.expires_at <= Utc::now() {
            return None;
        }
        Some(pending.provider)
    }
}

pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|cookie| {
        let (name, value) = cookie.trim().split_once('=')?;
        if name == SESSION_COOKIE {
            Uuid::parse_str(value).ok()
        } else {
            None
        }
    })
}

pub fn session_cookie(id: Uuid) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}
