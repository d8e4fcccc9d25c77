//! Prompt construction and the upstream `generateContent` request body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::feedback::{FeedbackKind, FeedbackShape, SpeakingFeedback, WritingFeedback};

/// Question the candidate answers aloud.
pub const SPEAKING_QUESTION: &str = "Why do you want to improve your English?";

const JSON_ONLY: &str = "You are an API that ONLY returns valid JSON. \
Do not include any introductory text, markdown, or explanations.";

pub fn writing_prompt(sample: &str) -> String {
    format!(
        "{JSON_ONLY}\n\
Your task is to act as an expert English teacher evaluating a student's writing. \
Evaluate the following text: \"{sample}\".\n\
Provide feedback in a JSON object. The JSON object must have these exact keys: \
\"overallScore\" (a number out of 10), \"grammarMistakes\" (an array of strings explaining errors), \
and \"suggestions\" (an array of strings).\n\
The \"overallScore\" is mandatory. If the text is too short or simple to evaluate properly, \
assign a low score like 1 or 2, but always provide a score.\n\
Your response must be ONLY the raw JSON object."
    )
}

pub fn speaking_prompt(transcript: &str) -> String {
    format!(
        "{JSON_ONLY}\n\
Your task is to act as an expert English teacher evaluating a student's spoken response. \
The student was asked \"{SPEAKING_QUESTION}\".\n\
Evaluate the following transcript of their speech: \"{transcript}\".\n\
Provide feedback in a JSON object with these keys: \"clarityScore\" (a number out of 10), \
\"corrections\" (an array of strings), and \"positivePoints\" (an array of strings).\n\
The \"clarityScore\" is mandatory. If the text is too short or simple to evaluate properly, \
please assign a low score like 1 or 2, but always provide a score.\n\
Your response must be ONLY the raw JSON object."
    )
}

pub fn questions_prompt(count: usize) -> String {
    format!(
        "{JSON_ONLY}\n\
Write {count} multiple-choice English grammar and vocabulary questions of mixed difficulty \
for a placement test. Return a JSON array where each element has \"question\" (use _____ for the gap), \
\"options\" (exactly four strings) and \"correct\" (the zero-based index of the right option).\n\
Your response must be ONLY the raw JSON array."
    )
}

/// `generateContent` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    /// Top-level fields such as `systemInstruction` or `safetySettings`, forwarded as sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    /// Other generation options (temperature, topK, ...) passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GenerateRequest {
    /// Single user turn asking for JSON, optionally constrained by a schema.
    pub fn json_prompt(prompt: impl Into<String>, schema: Option<Value>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.into(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: schema,
                extra: Map::new(),
            }),
            extra: Map::new(),
        }
    }

    pub fn for_writing(sample: &str) -> Self {
        Self::json_prompt(writing_prompt(sample), Some(WritingFeedback::response_schema()))
    }

    pub fn for_speaking(transcript: &str) -> Self {
        Self::json_prompt(
            speaking_prompt(transcript),
            Some(SpeakingFeedback::response_schema()),
        )
    }

    pub fn for_questions(count: usize) -> Self {
        Self::json_prompt(
            questions_prompt(count),
            Some(FeedbackKind::Questions.response_schema()),
        )
    }

    pub fn response_schema(&self) -> Option<&Value> {
        self.generation_config
            .as_ref()
            .and_then(|c| c.response_schema.as_ref())
    }

    /// True when no part carries any non-blank text.
    pub fn is_blank(&self) -> bool {
        self.contents
            .iter()
            .flat_map(|c| &c.parts)
            .all(|p| p.text.trim().is_empty())
    }
}
