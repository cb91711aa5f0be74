//! HTTP transport for the embed host's sources and player script endpoints

use crate::error::ExtractError;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Sources endpoint, the video ID is appended
pub const DEFAULT_SOURCES_ENDPOINT: &str = "https://megacloud.tv/embed-2/ajax/e-1/getSources?id=";

/// Player script endpoint, a cache-busting timestamp is appended
pub const DEFAULT_SCRIPT_ENDPOINT: &str =
    "https://megacloud.tv/js/player/a/prod/e1-player.min.js?v=";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Proxy URL
    pub proxy_url: Option<String>,
    /// Prefix the video ID is appended to
    pub sources_endpoint: String,
    /// Prefix the cache-busting timestamp is appended to
    pub script_endpoint: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy_url: None,
            sources_endpoint: DEFAULT_SOURCES_ENDPOINT.to_string(),
            script_endpoint: DEFAULT_SCRIPT_ENDPOINT.to_string(),
        }
    }
}

/// Source of manifest and player script bodies.
///
/// `None` means the host answered without a usable body.
#[async_trait]
pub trait EmbedSource: Send + Sync {
    /// Fetch the raw manifest JSON for `video_id`, sent with `referer` as Referer
    async fn fetch_manifest(
        &self,
        video_id: &str,
        referer: &str,
    ) -> Result<Option<String>, ExtractError>;

    /// Fetch the current player script text
    async fn fetch_script(&self) -> Result<Option<String>, ExtractError>;

    /// Key identifying the script this source serves, used for caching
    fn script_key(&self) -> &str;
}

/// reqwest-backed embed host client
#[derive(Debug, Clone)]
pub struct EmbedClient {
    client: Client,
    config: HttpClientConfig,
}

impl EmbedClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self, ExtractError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self, ExtractError> {
        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.clone());

        if let Some(proxy_url) = &config.proxy_url {
            match reqwest::Proxy::all(proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => warn!("Ignoring invalid proxy {}: {}", proxy_url, e),
            }
        }

        let client = builder.build()?;
        Ok(Self { client, config })
    }

    /// Full manifest URL for a video ID
    pub fn manifest_url(&self, video_id: &str) -> String {
        format!("{}{}", self.config.sources_endpoint, video_id)
    }

    /// Full script URL with the current timestamp as cache buster
    pub fn script_url(&self) -> String {
        format!(
            "{}{}",
            self.config.script_endpoint,
            chrono::Utc::now().timestamp_millis()
        )
    }
}

#[async_trait]
impl EmbedSource for EmbedClient {
    async fn fetch_manifest(
        &self,
        video_id: &str,
        referer: &str,
    ) -> Result<Option<String>, ExtractError> {
        let url = self.manifest_url(video_id);
        debug!("Fetching manifest: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "*/*")
            .header("X-Requested-With", "XMLHttpRequest")
            .header("User-Agent", &self.config.user_agent)
            .header("Referer", referer)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ExtractError::UpstreamUnavailable(format!(
                "manifest request returned {}",
                status
            )));
        }

        let body = response.text().await?;
        Ok(non_empty(body))
    }

    async fn fetch_script(&self) -> Result<Option<String>, ExtractError> {
        let url = self.script_url();
        debug!("Fetching player script: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            ExtractError::UpstreamUnavailable(format!("player script request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::UpstreamUnavailable(format!(
                "player script request returned {}",
                status
            )));
        }

        let body = response.text().await.map_err(|e| {
            ExtractError::UpstreamUnavailable(format!("player script body unreadable: {}", e))
        })?;
        Ok(non_empty(body))
    }

    fn script_key(&self) -> &str {
        &self.config.script_endpoint
    }
}

fn non_empty(body: String) -> Option<String> {
    if body.trim().is_empty() {
        None
    } else {
        Some(body)
    }
}
