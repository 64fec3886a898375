use crate::config::Config;
use crate::error::AppError;
use crate::providers::{Message, MessagePage, Provider};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Upstream fetch failure. Carries the provider so callers can degrade
/// one side of the view without touching the other.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{provider}: request failed: {source}")]
    Transport {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider}: upstream returned {status}")]
    Status {
        provider: Provider,
        status: StatusCode,
    },
    #[error("{provider}: invalid response body: {source}")]
    Decode {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },
}

/// One fetcher for both providers, parameterized by provider identity
/// instead of duplicating per-provider request logic.
#[derive(Clone)]
pub struct MessageFetcher {
    client: Client,
    microsoft_url: String,
    linkedin_url: String,
}

impl MessageFetcher {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            microsoft_url: config.providers.microsoft.messages_url.clone(),
            linkedin_url: config.providers.linkedin.messages_url.clone(),
        })
    }

    fn first_page_url(&self, provider: Provider) -> &str {
        match provider {
            Provider::Microsoft => &self.microsoft_url,
            Provider::Linkedin => &self.linkedin_url,
        }
    }

    /// Issue one GET against the cursor URL (a prior page's opaque
    /// next-link) or the provider's first-page endpoint. A single attempt;
    /// timeouts surface as transport errors.
    pub async fn fetch(
        &self,
        provider: Provider,
        token: &str,
        cursor: Option<&str>,
    ) -> Result<MessagePage, FetchError> {
        let url = cursor.unwrap_or_else(|| self.first_page_url(provider));

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .map_err(|source| FetchError::Transport { provider, source })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Failed to fetch {} messages: {}", provider, status);
            return Err(FetchError::Status { provider, status });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|source| FetchError::Decode { provider, source })?;

        Ok(parse_page(provider, &body))
    }
}

/// Extract (items, next-cursor) from a provider response body. Missing
/// fields decode as an empty page rather than an error.
pub fn parse_page(provider: Provider, body: &Value) -> MessagePage {
    let items = body
        .get(provider.items_field())
        .and_then(Value::as_array)
        .map(|items| items.iter().cloned().map(Message).collect())
        .unwrap_or_default();

    MessagePage {
        items,
        next_cursor: provider.next_cursor(body),
    }
}
