//! Firebolt client over the HTTP query API.
//!
//! Authentication uses the OAuth client-credentials flow of a service
//! account. The access token is cached until shortly before it expires. The
//! engine endpoint is looked up once per client and reused.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument};

use crate::client::Warehouse;
use crate::error::{Result, WarehouseError};
use crate::sql::Dialect;

/// Refresh the token this long before the server says it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone, Serialize, Deserialize)]
pub struct FireboltConfig {
    /// Account name (slug)
    pub account: String,
    pub client_id: String,
    pub client_secret: String,
    pub database: String,
    pub engine: String,
    /// Identity service base URL
    pub auth_url: String,
    /// Management API base URL
    pub api_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl FireboltConfig {
    pub const DEFAULT_AUTH_URL: &'static str = "https://id.app.firebolt.io";
    pub const DEFAULT_API_URL: &'static str = "https://api.app.firebolt.io";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new(
        account: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        database: impl Into<String>,
        engine: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            database: database.into(),
            engine: engine.into(),
            auth_url: Self::DEFAULT_AUTH_URL.to_string(),
            api_url: Self::DEFAULT_API_URL.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for FireboltConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FireboltConfig")
            .field("account", &self.account)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("database", &self.database)
            .field("engine", &self.engine)
            .field("auth_url", &self.auth_url)
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct EngineUrlResponse {
    #[serde(rename = "engineUrl")]
    engine_url: String,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct FireboltClient {
    config: FireboltConfig,
    client: Client,
    token: Mutex<Option<CachedToken>>,
    endpoint: OnceCell<String>,
}

impl FireboltClient {
    pub fn new(config: FireboltConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent("gfs-loader/0.1")
            .build()?;

        Ok(Self {
            config,
            client,
            token: Mutex::new(None),
            endpoint: OnceCell::new(),
        })
    }

    /// Bearer token, fetched on first use and refreshed before expiry.
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}/oauth/token", self.config.auth_url.trim_end_matches('/'));
        debug!(url = %url, "Requesting access token");

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("audience", "https://api.firebolt.io"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WarehouseError::Auth(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        info!(expires_in = token.expires_in, "Obtained Firebolt access token");

        let value = token.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(value)
    }

    /// Query endpoint of the account, looked up once.
    async fn engine_endpoint(&self) -> Result<&str> {
        self.endpoint
            .get_or_try_init(|| async {
                let token = self.access_token().await?;
                let url = format!(
                    "{}/web/v3/account/{}/engineUrl",
                    self.config.api_url.trim_end_matches('/'),
                    self.config.account
                );

                let response = self.client.get(&url).bearer_auth(&token).send().await?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(WarehouseError::Api {
                        status: status.as_u16(),
                        body,
                    });
                }

                let found: EngineUrlResponse = response.json().await?;
                let endpoint = if found.engine_url.starts_with("http://")
                    || found.engine_url.starts_with("https://")
                {
                    found.engine_url
                } else {
                    format!("https://{}", found.engine_url)
                };
                info!(endpoint = %endpoint, "Resolved Firebolt engine endpoint");
                Ok::<_, WarehouseError>(endpoint)
            })
            .await
            .map(String::as_str)
    }
}

#[async_trait]
impl Warehouse for FireboltClient {
    fn dialect(&self) -> Dialect {
        Dialect::Firebolt
    }

    #[instrument(skip(self, sql), fields(database = %self.config.database, engine = %self.config.engine))]
    async fn execute(&self, sql: &str) -> Result<()> {
        let endpoint = self.engine_endpoint().await?;
        let token = self.access_token().await?;

        let response = self
            .client
            .post(endpoint)
            .query(&[
                ("database", self.config.database.as_str()),
                ("engine", self.config.engine.as_str()),
            ])
            .bearer_auth(&token)
            .body(sql.to_string())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            // Token revoked early; drop it so the next call re-authenticates
            self.token.lock().await.take();
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WarehouseError::Api {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = %status, "Statement executed");
        Ok(())
    }
}
