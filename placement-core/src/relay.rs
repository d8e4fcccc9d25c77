//! The credential-hiding relay between the placement page and the model.
//!
//! The browser never sees the API key or the upstream envelope. It sends a
//! prompt (or a full `generateContent` body), and gets back either the parsed
//! JSON value or a single error message.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::PlacementConfig;
use crate::feedback::{shape_from_schema, FeedbackKind};
use crate::gemini::{GeminiClient, Upstream};
use crate::json_extract::{extract, ExpectedShape, ExtractFailure};
use crate::prompt::GenerateRequest;
use crate::session::ResultsSummary;
use crate::store::{JsonlStore, ResultStore, StoreError, StoredResult};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("API key is not configured on the server")]
    MissingApiKey,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("upstream transport error: {0}")]
    UpstreamTransport(String),
    #[error("upstream returned status {0}")]
    UpstreamStatus(u16),
    #[error("upstream blocked the request: {0}")]
    UpstreamBlocked(String),
    #[error("upstream returned no candidates")]
    UpstreamEmpty,
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractFailure),
    #[error("result saving is disabled")]
    StoreDisabled,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl RelayError {
    /// HTTP status for the relay's response.
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::MissingApiKey | RelayError::Store(_) => 500,
            RelayError::BadRequest(_)
            | RelayError::UpstreamBlocked(_)
            | RelayError::UpstreamEmpty
            | RelayError::Extraction(_) => 400,
            RelayError::UpstreamTransport(_) | RelayError::UpstreamStatus(_) => 502,
            RelayError::StoreDisabled => 503,
        }
    }

    /// The one message the page shows. Never includes upstream payloads.
    pub fn user_message(&self) -> String {
        match self {
            RelayError::MissingApiKey => "API key is not configured on the server.".to_string(),
            RelayError::BadRequest(detail) => format!("Invalid request: {detail}."),
            RelayError::UpstreamTransport(_) => {
                "The AI service could not be reached. Please try again later.".to_string()
            }
            RelayError::UpstreamStatus(code) => {
                format!("The AI service returned an error (status {code}).")
            }
            RelayError::UpstreamBlocked(reason) => format!(
                "The AI could not process this request, possibly due to safety filters ({reason})."
            ),
            RelayError::UpstreamEmpty => {
                "The AI could not process this request, possibly due to safety filters or an invalid prompt."
                    .to_string()
            }
            RelayError::Extraction(reason) => {
                format!("The AI response could not be read: {reason}.")
            }
            RelayError::StoreDisabled => "Saving results is not enabled on this server.".to_string(),
            RelayError::Store(_) => "Results could not be saved.".to_string(),
        }
    }
}

/// Inbound scoring request.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AnalyseRequest {
    Prompt(PromptRequest),
    /// A complete `generateContent` body built by the page.
    Passthrough(GenerateRequest),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptRequest {
    pub prompt: String,
    #[serde(default)]
    pub kind: Option<FeedbackKind>,
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub expected: Option<ExpectedShape>,
}

impl AnalyseRequest {
    /// Parses an inbound body. A body with a `prompt` key is read as the prompt
    /// form so its own field errors (an unknown `kind`, say) reach the caller.
    pub fn from_slice(body: &[u8]) -> Result<Self, RelayError> {
        let shape_error = || {
            RelayError::BadRequest(
                "expected a JSON object with a `prompt` or a `contents` field".to_string(),
            )
        };
        let value: Value = serde_json::from_slice(body).map_err(|_| shape_error())?;
        let Some(fields) = value.as_object() else {
            return Err(shape_error());
        };
        if fields.contains_key("prompt") {
            return PromptRequest::deserialize(value)
                .map(AnalyseRequest::Prompt)
                .map_err(|e| RelayError::BadRequest(format!("prompt request: {e}")));
        }
        if fields.contains_key("contents") {
            return GenerateRequest::deserialize(value)
                .map(AnalyseRequest::Passthrough)
                .map_err(|e| RelayError::BadRequest(format!("generateContent body: {e}")));
        }
        Err(shape_error())
    }

    /// Upstream body plus the shape to prefer during extraction.
    fn into_upstream(self) -> Result<(GenerateRequest, ExpectedShape), RelayError> {
        let (request, expected) = match self {
            AnalyseRequest::Prompt(p) => {
                if p.prompt.trim().is_empty() {
                    return Err(RelayError::BadRequest("prompt is empty".to_string()));
                }
                let schema = p.schema.or_else(|| p.kind.map(FeedbackKind::response_schema));
                let expected = p
                    .expected
                    .or_else(|| p.kind.map(FeedbackKind::expected_shape))
                    .or_else(|| schema.as_ref().map(shape_from_schema))
                    .unwrap_or_default();
                (GenerateRequest::json_prompt(p.prompt, schema), expected)
            }
            AnalyseRequest::Passthrough(req) => {
                let expected = req
                    .response_schema()
                    .map(shape_from_schema)
                    .unwrap_or_default();
                (req, expected)
            }
        };
        if request.is_blank() {
            return Err(RelayError::BadRequest("request has no text".to_string()));
        }
        Ok((request, expected))
    }
}

pub struct Relay {
    upstream: Option<Arc<dyn Upstream>>,
    store: Option<Arc<dyn ResultStore>>,
}

impl Relay {
    pub fn new(upstream: Option<Arc<dyn Upstream>>, store: Option<Arc<dyn ResultStore>>) -> Self {
        Self { upstream, store }
    }

    /// Wire up the Gemini client and the file store from configuration.
    ///
    /// A missing API key is not fatal at startup: each analyse call reports
    /// it instead, so saving keeps working.
    pub fn from_config(cfg: &PlacementConfig, root: &Path) -> Result<Self, RelayError> {
        let upstream: Option<Arc<dyn Upstream>> = match cfg.upstream.api_key() {
            Some(key) => Some(Arc::new(GeminiClient::new(&cfg.upstream, key)?)),
            None => {
                warn!(env = %cfg.upstream.api_key_env, "no API key in environment; analysis disabled");
                None
            }
        };
        let store: Option<Arc<dyn ResultStore>> = cfg.store.resolve(root).map(|path| {
            info!(path = %path.display(), "saving results");
            Arc::new(JsonlStore::new(path)) as Arc<dyn ResultStore>
        });
        Ok(Self::new(upstream, store))
    }

    pub fn can_save(&self) -> bool {
        self.store.is_some()
    }

    /// Forward to the model and return the JSON value found in its answer.
    pub async fn analyse(&self, request: AnalyseRequest) -> Result<Value, RelayError> {
        let upstream = self.upstream.as_ref().ok_or(RelayError::MissingApiKey)?;
        let (request, expected) = request.into_upstream()?;

        let text = upstream.generate(&request).await?;
        let extracted = extract(&text, expected).map_err(|reason| {
            warn!(reason = reason.code(), len = text.len(), "could not extract JSON from model output");
            RelayError::Extraction(reason)
        })?;
        info!(kind = %extracted.kind, "analysis complete");
        Ok(extracted.value)
    }

    /// Append a finished test's results to the store.
    pub async fn save(&self, results: ResultsSummary) -> Result<StoredResult, RelayError> {
        let store = self.store.as_ref().ok_or(RelayError::StoreDisabled)?;
        let stored = store.append(results).await.map_err(|e| {
            warn!(error = %e, "saving results failed");
            RelayError::Store(e)
        })?;
        Ok(stored)
    }
}
