use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;

use crate::config::ResolverConfig;
use crate::errors::{AppResult, ResolveError, ResolveResult};
use crate::utils::svg_sanitizer::ContentSanitizer;

/// Network seam of the resolver
///
/// `load` is a render attempt: it succeeds only when the URL serves content
/// that can be displayed as-is. `fetch_text` returns the raw body without
/// judging it, for the sanitize fallback.
#[async_trait]
pub trait IconFetcher: Send + Sync {
    async fn load(&self, url: &str) -> ResolveResult<()>;

    async fn fetch_text(&self, url: &str) -> ResolveResult<String>;
}

/// reqwest-backed fetcher
pub struct HttpIconFetcher {
    client: Client,
}

impl HttpIconFetcher {
    /// Create new HTTP fetcher with connection timeout only
    ///
    /// Total waits are bounded by the resolver, per operation.
    pub fn new(connect_timeout: Duration, user_agent: &str) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    pub fn from_config(config: &ResolverConfig) -> AppResult<Self> {
        Self::new(config.connect_timeout, &config.user_agent)
    }

    async fn get(&self, url: &str) -> Result<Response, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            ));
        }

        Ok(response)
    }

    async fn read_body(response: Response) -> Result<String, String> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("Failed to read response: {e}"))?;

        debug!("Fetched {} bytes of raw content", bytes.len());

        String::from_utf8(bytes.to_vec())
            .map_err(|e| format!("Failed to decode content as UTF-8: {e}"))
    }
}

#[async_trait]
impl IconFetcher for HttpIconFetcher {
    async fn load(&self, url: &str) -> ResolveResult<()> {
        debug!("Loading icon candidate: {}", url);

        let response = self
            .get(url)
            .await
            .map_err(|reason| ResolveError::load_failed(url, reason))?;
        let body = Self::read_body(response)
            .await
            .map_err(|reason| ResolveError::load_failed(url, reason))?;

        if !ContentSanitizer::is_renderable(&body) {
            return Err(ResolveError::UnrenderableContent {
                url: url.to_string(),
                reason: format!("{:?}", ContentSanitizer::inspect(&body)),
            });
        }

        Ok(())
    }

    async fn fetch_text(&self, url: &str) -> ResolveResult<String> {
        debug!("Fetching raw icon content from: {}", url);

        let response = self
            .get(url)
            .await
            .map_err(|message| ResolveError::fetch_failed(url, message))?;
        let content = Self::read_body(response)
            .await
            .map_err(|message| ResolveError::fetch_failed(url, message))?;

        debug!("Successfully fetched {} characters of icon content", content.len());
        Ok(content)
    }
}
