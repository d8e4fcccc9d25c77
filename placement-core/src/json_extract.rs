use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Best-effort JSON extraction from model output.
///
/// The scoring model is asked for raw JSON but still wraps it in markdown
/// fences or surrounds it with commentary from time to time. Extraction works
/// on bracket boundaries only:
/// - strip every triple-backtick fence marker (with or without a language tag)
/// - take first `{` .. last `}` and first `[` .. last `]` as candidate spans
/// - parse the spans in an order decided by [`ExpectedShape`]
///
/// Nothing inside a span is ever rewritten; if the bytes between the brackets
/// are not valid JSON the span is rejected, not repaired. Text holding an
/// opening bracket but no closed span (a truncated reply) is malformed rather
/// than JSON-free.
pub fn extract(text: &str, expected: ExpectedShape) -> ExtractionResult {
    if text.trim().is_empty() {
        return Err(ExtractFailure::EmptyInput);
    }

    let text = strip_fences(text);
    let object = locate_span(&text, '{', '}', JsonKind::Object);
    let array = locate_span(&text, '[', ']', JsonKind::Array);

    let order = expected.order(object, array);
    if order.is_empty() {
        // An opening bracket with no usable span is truncated or unbalanced JSON.
        if text.contains(['{', '[']) {
            debug!(len = text.len(), "opening bracket without a closing span");
            return Err(ExtractFailure::MalformedJson);
        }
        debug!(len = text.len(), "no bracket in model output");
        return Err(ExtractFailure::NoJsonFound);
    }

    for span in order {
        let cand = &text[span.start..=span.end];
        match serde_json::from_str::<Value>(cand) {
            Ok(value) => {
                return Ok(Extracted {
                    value,
                    kind: span.kind,
                })
            }
            Err(err) => {
                debug!(kind = %span.kind, start = span.start, end = span.end, %err, "span did not parse");
            }
        }
    }
    Err(ExtractFailure::MalformedJson)
}

/// [`extract`] with no preference between objects and arrays.
pub fn extract_any(text: &str) -> ExtractionResult {
    extract(text, ExpectedShape::Either)
}

/// Outcome of [`extract`].
pub type ExtractionResult = Result<Extracted, ExtractFailure>;

/// A JSON value recovered from model output.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub value: Value,
    pub kind: JsonKind,
}

/// Top-level structural kind of an extracted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonKind {
    Object,
    Array,
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonKind::Object => f.write_str("object"),
            JsonKind::Array => f.write_str("array"),
        }
    }
}

/// Which top-level kind the caller expects. Only decides which span is tried
/// first; a valid value of the other kind is still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedShape {
    Object,
    Array,
    #[default]
    Either,
}

impl ExpectedShape {
    fn order(self, object: Option<Span>, array: Option<Span>) -> Vec<Span> {
        let (first, second) = match self {
            ExpectedShape::Object => (object, array),
            ExpectedShape::Array => (array, object),
            ExpectedShape::Either => match (object, array) {
                // Ties go to the object span.
                (Some(o), Some(a)) if a.start < o.start => (Some(a), Some(o)),
                (o, a) => (o, a),
            },
        };
        first.into_iter().chain(second).collect()
    }
}

impl FromStr for ExpectedShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "object" => Ok(ExpectedShape::Object),
            "array" => Ok(ExpectedShape::Array),
            "either" | "any" => Ok(ExpectedShape::Either),
            other => Err(format!(
                "unknown shape `{other}` (expected object, array or either)"
            )),
        }
    }
}

impl From<JsonKind> for ExpectedShape {
    fn from(kind: JsonKind) -> Self {
        match kind {
            JsonKind::Object => ExpectedShape::Object,
            JsonKind::Array => ExpectedShape::Array,
        }
    }
}

/// Why extraction produced no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ExtractFailure {
    #[error("response was empty")]
    EmptyInput,
    #[error("no JSON found in response")]
    NoJsonFound,
    #[error("response contained malformed JSON")]
    MalformedJson,
}

impl ExtractFailure {
    /// Stable machine-readable reason code.
    pub fn code(self) -> &'static str {
        match self {
            ExtractFailure::EmptyInput => "empty_input",
            ExtractFailure::NoJsonFound => "no_json_found",
            ExtractFailure::MalformedJson => "malformed_json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
    kind: JsonKind,
}

// Fence marker plus an optional language tag glued to it (```json, ```JSON, ```jsonc).
static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[A-Za-z0-9_+.\-]*").expect("fence pattern is valid"));

fn strip_fences(s: &str) -> Cow<'_, str> {
    FENCE.replace_all(s, "")
}

fn locate_span(s: &str, open: char, close: char, kind: JsonKind) -> Option<Span> {
    let start = s.find(open)?;
    let end = s.rfind(close)?;
    if end < start {
        return None;
    }
    Some(Span { start, end, kind })
}
