use crate::types::{Candidate, PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

/// What the ranking service is asked to do.
#[derive(Debug, Clone)]
pub struct RankingRequest {
    /// Enumerated, 1-indexed candidate listing
    pub digest: String,
    pub guidance: String,
    pub count: usize,
}

/// External text-ranking call. The answer is untrusted: callers must
/// validate the returned 1-indexed selections.
#[async_trait]
pub trait RankingService: Send + Sync {
    fn service_name(&self) -> String;

    async fn rank(&self, request: &RankingRequest) -> Result<Vec<usize>>;
}

/// Render the candidates as the numbered listing sent for ranking.
pub fn candidate_digest(candidates: &[Candidate]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if c.summary.is_empty() {
                format!("{}. [{}] {}", i + 1, c.source_id, c.title)
            } else {
                format!("{}. [{}] {}\n   {}", i + 1, c.source_id, c.title, c.summary)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn ranking_prompt(request: &RankingRequest) -> String {
    format!(
        r#"You select news items for a downstream writer.

CANDIDATES:
{digest}

SELECTION GUIDANCE:
{guidance}

RULES:
1. Apply negative constraints in the guidance first (anything it says to exclude, avoid or forbid).
2. Among the remaining candidates, rank by how well they match the positive preferences.
3. If fewer than {count} candidates satisfy the negative constraints, fill the rest with the best remaining candidates that still satisfy them.
4. Select exactly {count} distinct candidates by their number.

Respond with JSON only:
{{"selected": [numbers in order of preference]}}"#,
        digest = request.digest,
        guidance = request.guidance,
        count = request.count,
    )
}

#[derive(Debug, Deserialize)]
struct SelectionAnswer {
    selected: Vec<usize>,
}

/// Pull the `selected` list out of a model answer that may carry fences
/// or prose around the JSON object.
pub fn parse_selection(text: &str) -> Result<Vec<usize>> {
    let json = extract_json_from_text(text)
        .ok_or_else(|| PipelineError::Ranking(format!("no JSON object in answer: {}", text)))?;
    let answer: SelectionAnswer = serde_json::from_str(&json)?;
    Ok(answer.selected)
}

fn extract_json_from_text(text: &str) -> Option<String> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return Some(text[start..=end].to_string());
        }
    }

    None
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Ranking through the Anthropic Messages API.
pub struct ClaudeRankingService {
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: Client,
}

impl ClaudeRankingService {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 256,
            client,
        })
    }
}

#[async_trait]
impl RankingService for ClaudeRankingService {
    fn service_name(&self) -> String {
        format!("claude ({})", self.model)
    }

    async fn rank(&self, request: &RankingRequest) -> Result<Vec<usize>> {
        let body = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: ranking_prompt(request),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Ranking(format!("API error {}: {}", status, text)));
        }

        let answer: ClaudeResponse = response.json().await?;
        let text = answer
            .content
            .first()
            .map(|block| block.text.as_str())
            .ok_or_else(|| PipelineError::Ranking("empty response".to_string()))?;

        debug!("Ranking answer: {}", text);
        let selected = parse_selection(text)?;
        info!("Ranking service selected {:?}", selected);
        Ok(selected)
    }
}

/// Mock ranking service for development and testing. Replays a fixed
/// answer and records every request it receives.
pub struct MockRankingService {
    answer: std::result::Result<Vec<usize>, String>,
    requests: Mutex<Vec<RankingRequest>>,
}

impl MockRankingService {
    pub fn answering(selection: Vec<usize>) -> Self {
        Self {
            answer: Ok(selection),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            answer: Err(reason.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RankingRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RankingService for MockRankingService {
    fn service_name(&self) -> String {
        "mock".to_string()
    }

    async fn rank(&self, request: &RankingRequest) -> Result<Vec<usize>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.answer.clone().map_err(PipelineError::Ranking)
    }
}
