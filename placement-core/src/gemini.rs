//! Client for the hosted generative-language API (`generateContent`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::prompt::GenerateRequest;
use crate::relay::RelayError;

/// Finish reasons that mean the model refused to answer.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

/// Anything that can turn a request into raw model text.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, RelayError>;
}

pub struct GeminiClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(cfg: &UpstreamConfig, api_key: String) -> Result<Self, RelayError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| RelayError::UpstreamTransport(format!("build http client: {e}")))?;
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            cfg.base_url.trim_end_matches('/'),
            cfg.model
        );
        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Upstream for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, RelayError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| RelayError::UpstreamTransport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %truncate(&body, 2048), "upstream returned an error status");
            return Err(RelayError::UpstreamStatus(status.as_u16()));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| RelayError::UpstreamTransport(format!("invalid upstream body: {e}")))?;
        unwrap_envelope(&value)
    }
}

/// Outer response wrapper around the model's text.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamEnvelope {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Pull the first candidate's text out of a response envelope.
///
/// Blocked or empty responses are reported as upstream errors here so they
/// never reach the extractor.
pub fn unwrap_envelope(value: &Value) -> Result<String, RelayError> {
    let env = UpstreamEnvelope::deserialize(value)
        .map_err(|e| RelayError::UpstreamTransport(format!("unexpected upstream response: {e}")))?;

    if let Some(err) = env.error {
        warn!(
            code = ?err.code,
            status = ?err.status,
            message = ?err.message,
            "upstream reported an error"
        );
        return Err(RelayError::UpstreamStatus(err.code.unwrap_or(502)));
    }
    if let Some(reason) = env.prompt_feedback.and_then(|f| f.block_reason) {
        warn!(%reason, "upstream blocked the prompt");
        return Err(RelayError::UpstreamBlocked(reason));
    }

    let Some(candidate) = env.candidates.into_iter().next() else {
        warn!("upstream returned no candidates");
        return Err(RelayError::UpstreamEmpty);
    };
    if let Some(reason) = candidate
        .finish_reason
        .as_deref()
        .filter(|r| BLOCKING_FINISH_REASONS.contains(r))
    {
        warn!(%reason, "upstream candidate was blocked");
        return Err(RelayError::UpstreamBlocked(reason.to_string()));
    }

    let texts: Vec<String> = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if texts.is_empty() {
        warn!("upstream candidate had no text parts");
        return Err(RelayError::UpstreamEmpty);
    }
    let text = texts.concat();
    debug!(len = text.len(), "unwrapped upstream text");
    Ok(text)
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
