use crate::{
    aggregator::Aggregator,
    auth::OAuthService,
    cache::ResponseCache,
    config::Config,
    error::AppError,
    fetch::MessageFetcher,
    routes::{create_api_routes, create_auth_routes, create_health_routes, create_inbox_routes},
    session::SessionStore,
};
use axum::Router;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Clone)]
pub struct Server {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
    pub cache: Arc<ResponseCache>,
    pub aggregator: Arc<Aggregator>,
    pub oauth: Arc<OAuthService>,
}

impl Server {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);

        let sessions = Arc::new(SessionStore::new(
            config.session.ttl_secs,
            config.session.oauth_state_ttl_secs,
        ));
        let cache = Arc::new(ResponseCache::new(
            config.cache.ttl_secs,
            config.cache.max_entries,
        ));
        let fetcher = MessageFetcher::new(&config)?;
        let aggregator = Arc::new(Aggregator::new(fetcher, cache.clone()));
        let oauth = Arc::new(OAuthService::new(config.clone())?);

        Ok(Self {
            config,
            sessions,
            cache,
            aggregator,
            oauth,
        })
    }

    // Creates the application router
    pub fn create_app(&self) -> Router {
        Router::new()
            .merge(create_inbox_routes())
            .merge(create_auth_routes())
            .merge(create_api_routes())
            .merge(create_health_routes())
            .with_state(self.clone())
    }

    pub async fn run(&self) -> Result<(), AppError> {
        let app = self.create_app();

        let host: IpAddr = self
            .config
            .server
            .host
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid server host: {}", e)))?;
        let addr = SocketAddr::from((host, self.config.server.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to bind to address: {}", e)))?;

        info!("Server listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

        info!("Server shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    } else {
        info!("Graceful shutdown initiated");
    }
}
