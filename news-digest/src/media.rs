use crate::types::{Candidate, PipelineError, Result, StageResult};
use crate::utils::hash::short_sha256;
use crate::utils::url::is_http_url;
use crate::Fetcher;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Write-once object storage with public URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create the target bucket if it does not exist yet.
    async fn ensure_bucket(&self) -> Result<()>;

    /// Upload `bytes` under `name` and return its public URL.
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}

/// Supabase storage REST API.
pub struct SupabaseStore {
    base_url: String,
    service_key: String,
    bucket: String,
    client: Client,
}

impl SupabaseStore {
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        bucket: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            bucket: bucket.into(),
            client,
        })
    }

    pub fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, name
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn ensure_bucket(&self) -> Result<()> {
        let url = format!("{}/storage/v1/bucket/{}", self.base_url, self.bucket);
        let existing = self.authorized(self.client.get(&url)).send().await?;
        if existing.status().is_success() {
            debug!("Bucket {} exists", self.bucket);
            return Ok(());
        }

        info!("Creating public bucket {}", self.bucket);
        let created = self
            .authorized(self.client.post(format!("{}/storage/v1/bucket", self.base_url)))
            .json(&json!({ "id": self.bucket, "name": self.bucket, "public": true }))
            .send()
            .await?;

        if !created.status().is_success() {
            let status = created.status();
            let body = created.text().await.unwrap_or_default();
            return Err(PipelineError::Storage(format!(
                "bucket creation failed ({}): {}",
                status, body
            )));
        }
        Ok(())
    }

    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, name
        );
        let response = self
            .authorized(self.client.post(&url))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Storage(format!(
                "upload of {} failed ({}): {}",
                name, status, body
            )));
        }
        Ok(self.public_url(name))
    }
}

/// Re-hosts each selected candidate's image, or clears the reference.
pub struct MediaResolver {
    fetcher: Fetcher,
    store: Option<Arc<dyn ObjectStore>>,
    /// Per-run object name prefix, e.g. `20261019`
    date_prefix: String,
}

impl MediaResolver {
    pub fn new(fetcher: Fetcher, store: Option<Arc<dyn ObjectStore>>, date_prefix: String) -> Self {
        Self {
            fetcher,
            store,
            date_prefix,
        }
    }

    /// `<date>/<title hash>.<ext>`; stable for a title within one run day.
    pub fn object_name(&self, title: &str, content_type: &str) -> String {
        format!(
            "{}/{}.{}",
            self.date_prefix,
            short_sha256(title, 16),
            extension_for(content_type)
        )
    }

    pub async fn resolve(&self, candidates: &mut [Candidate]) -> StageResult<usize> {
        if !candidates.iter().any(Candidate::has_image) {
            return StageResult::ok(0);
        }

        let mut hosted = 0;
        let mut failures = Vec::new();
        let mut bucket_ready = false;

        for candidate in candidates.iter_mut().filter(|c| c.has_image()) {
            match self.rehost(candidate, &mut bucket_ready).await {
                Ok(url) => {
                    candidate.image_ref = url;
                    hosted += 1;
                }
                Err(e) => {
                    warn!("Dropping image for '{}': {}", candidate.title, e);
                    failures.push(format!("{}: {}", candidate.image_ref, e));
                    candidate.image_ref.clear();
                }
            }
        }

        info!("Hosted {} images ({} dropped)", hosted, failures.len());
        StageResult {
            value: hosted,
            failures,
        }
    }

    async fn rehost(&self, candidate: &Candidate, bucket_ready: &mut bool) -> Result<String> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| PipelineError::Storage("no object store configured".to_string()))?;

        if !is_http_url(&candidate.image_ref) {
            return Err(PipelineError::General("not an http(s) reference".to_string()));
        }

        let download = self.fetcher.fetch_binary(&candidate.image_ref).await?;
        if !download.content_type.trim().to_lowercase().starts_with("image/") {
            return Err(PipelineError::General(format!(
                "not an image: '{}'",
                download.content_type
            )));
        }

        if !*bucket_ready {
            store.ensure_bucket().await?;
            *bucket_ready = true;
        }

        let name = self.object_name(&candidate.title, &download.content_type);
        store
            .upload(&name, download.bytes, &download.content_type)
            .await
    }
}

fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    match essence.as_str() {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/avif" => "avif",
        _ => "jpg",
    }
}
