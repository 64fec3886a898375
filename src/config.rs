use crate::providers::Provider;
use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// External base URL used to build OAuth redirect URIs.
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub microsoft: ProviderConfig,
    pub linkedin: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorization_url: String,
    pub token_url: String,
    /// Default first-page messages endpoint.
    pub messages_url: String,
    pub scopes: Vec<String>,
    /// Overrides the redirect URI derived from `server.public_url`.
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub ttl_secs: i64,
    pub oauth_state_ttl_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                public_url: "http://localhost:3000".to_string(),
            },
            providers: ProvidersConfig {
                microsoft: ProviderConfig {
                    client_id: String::new(),
                    client_secret: String::new(),
                    authorization_url:
                        "https://login.microsoftonline.com/common/oauth2/v2.0/authorize"
                            .to_string(),
                    token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token"
                        .to_string(),
                    messages_url: "https://graph.microsoft.com/v1.0/me/messages".to_string(),
                    scopes: vec!["Mail.Read".to_string()],
                    redirect_uri: None,
                },
                linkedin: ProviderConfig {
                    client_id: String::new(),
                    client_secret: String::new(),
                    authorization_url: "https://www.linkedin.com/oauth/v2/authorization"
                        .to_string(),
                    token_url: "https://www.linkedin.com/oauth/v2/accessToken".to_string(),
                    messages_url: "https://api.linkedin.com/v2/conversations".to_string(),
                    scopes: vec![
                        "r_emailaddress".to_string(),
                        "r_liteprofile".to_string(),
                        "w_messaging".to_string(),
                    ],
                    redirect_uri: None,
                },
            },
            cache: CacheConfig {
                ttl_secs: 300,
                max_entries: 100,
            },
            fetch: FetchConfig { timeout_secs: 10 },
            session: SessionConfig {
                ttl_secs: 8 * 3600,
                oauth_state_ttl_secs: 600,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder =
            ConfigBuilder::builder().add_source(config::Config::try_from(&Config::default())?);

        if Path::new("config.yaml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("INBOX")
                .prefix_separator("_")
                .separator("__"),
        );

        builder.build()?.try_deserialize()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut builder =
            ConfigBuilder::builder().add_source(config::Config::try_from(&Config::default())?);

        if path.as_ref().exists() {
            builder = builder.add_source(File::from(path.as_ref()));
        }

        builder = builder.add_source(
            Environment::with_prefix("INBOX")
                .prefix_separator("_")
                .separator("__"),
        );

        builder.build()?.try_deserialize()
    }

    pub fn provider(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::Microsoft => &self.providers.microsoft,
            Provider::Linkedin => &self.providers.linkedin,
        }
    }

    /// Redirect URI for a provider's OAuth callback.
    pub fn redirect_uri(&self, provider: Provider) -> String {
        self.provider(provider)
            .redirect_uri
            .clone()
            .unwrap_or_else(|| {
                format!(
                    "{}/callback/{}",
                    self.server.public_url.trim_end_matches('/'),
                    provider.name()
                )
            })
    }
}
