use crate::types::{FetchConfig, PipelineError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Shared HTTP layer for feeds, searches, link resolution and media.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    no_redirect_client: Client,
    config: FetchConfig,
}

/// Downloaded binary body and its declared content type.
#[derive(Debug)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        let no_redirect_client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.link_timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            no_redirect_client,
            config,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// GET a feed or search document as text.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let start_time = Instant::now();
        debug!("Fetching: {}", url);

        let response = self.client.get(url).send().await?;
        let response = Self::ensure_success(response)?;

        if let Some(content_length) = response.content_length() {
            let size_mb = content_length as usize / (1024 * 1024);
            if size_mb > self.config.max_feed_size_mb {
                return Err(PipelineError::FeedTooLarge { size_mb });
            }
        }

        let content = response.text().await?;
        info!(
            "Fetched {} ({} bytes in {}ms)",
            url,
            content.len(),
            start_time.elapsed().as_millis()
        );
        Ok(content)
    }

    /// GET a binary resource with the media timeout.
    pub async fn fetch_binary(&self, url: &str) -> Result<Download> {
        debug!("Downloading: {}", url);

        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(self.config.media_timeout_seconds))
            .send()
            .await?;
        let response = Self::ensure_success(response)?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let bytes = response.bytes().await?.to_vec();

        Ok(Download {
            bytes,
            content_type,
        })
    }

    /// Follow a single redirect hop. `Ok(None)` when the response is not
    /// a redirect.
    pub async fn redirect_target(&self, url: &str) -> Result<Option<String>> {
        let base = Url::parse(url)?;
        let response = self.no_redirect_client.get(url).send().await?;

        if !response.status().is_redirection() {
            debug!("No redirect for {} (HTTP {})", url, response.status());
            return Ok(None);
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| PipelineError::General(format!("Redirect without Location: {}", url)))?;

        Ok(Some(base.join(location)?.to_string()))
    }

    fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::General(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }
        Ok(response)
    }
}
