//! Typed shapes for the JSON the scoring model returns.
//!
//! Every field is optional: a model that forgets `grammarMistakes` still yields
//! a usable [`WritingFeedback`], and the presentation layer decides what "no
//! data" looks like. Only a value of the wrong structural kind, or a field of
//! the wrong type, is an error.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::json_extract::{ExpectedShape, Extracted, JsonKind};

/// A shape the model can be asked to produce.
pub trait FeedbackShape: DeserializeOwned {
    /// Name used in error messages.
    const NAME: &'static str;
    /// Top-level kind the shape deserializes from.
    const KIND: JsonKind;

    /// Output-schema hint sent upstream with the prompt.
    fn response_schema() -> Value;
}

#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error("expected a JSON {expected} for {shape}, got {actual}")]
    WrongKind {
        shape: &'static str,
        expected: JsonKind,
        actual: JsonKind,
    },
    #[error("response does not match the {shape} shape: {source}")]
    Fields {
        shape: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Validate an extracted value against a shape.
pub fn parse_as<T: FeedbackShape>(extracted: &Extracted) -> Result<T, ShapeError> {
    if extracted.kind != T::KIND {
        return Err(ShapeError::WrongKind {
            shape: T::NAME,
            expected: T::KIND,
            actual: extracted.kind,
        });
    }
    serde_json::from_value(extracted.value.clone()).map_err(|source| ShapeError::Fields {
        shape: T::NAME,
        source,
    })
}

/// Scores for a free-text writing sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingFeedback {
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar_mistakes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl FeedbackShape for WritingFeedback {
    const NAME: &'static str = "writing feedback";
    const KIND: JsonKind = JsonKind::Object;

    fn response_schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "overallScore": { "type": "NUMBER" },
                "grammarMistakes": { "type": "ARRAY", "items": { "type": "STRING" } },
                "suggestions": { "type": "ARRAY", "items": { "type": "STRING" } }
            }
        })
    }
}

/// Scores for a transcribed spoken answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakingFeedback {
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub clarity_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrections: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive_points: Option<Vec<String>>,
    /// Filled in by the caller from the speech recognizer, never by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

impl FeedbackShape for SpeakingFeedback {
    const NAME: &'static str = "speaking feedback";
    const KIND: JsonKind = JsonKind::Object;

    fn response_schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "clarityScore": { "type": "NUMBER" },
                "corrections": { "type": "ARRAY", "items": { "type": "STRING" } },
                "positivePoints": { "type": "ARRAY", "items": { "type": "STRING" } }
            }
        })
    }
}

/// A multiple-choice question written by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct: usize,
}

impl GeneratedQuestion {
    /// The `correct` index points at one of the options.
    pub fn is_consistent(&self) -> bool {
        self.correct < self.options.len()
    }
}

/// A model-generated question set (top-level array).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedQuiz(pub Vec<GeneratedQuestion>);

impl FeedbackShape for GeneratedQuiz {
    const NAME: &'static str = "question set";
    const KIND: JsonKind = JsonKind::Array;

    fn response_schema() -> Value {
        json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "question": { "type": "STRING" },
                    "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                    "correct": { "type": "INTEGER" }
                },
                "required": ["question", "options", "correct"]
            }
        })
    }
}

/// The kinds of scoring request the page makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Writing,
    Speaking,
    Questions,
}

impl FeedbackKind {
    pub fn expected_shape(self) -> ExpectedShape {
        match self {
            FeedbackKind::Writing => WritingFeedback::KIND.into(),
            FeedbackKind::Speaking => SpeakingFeedback::KIND.into(),
            FeedbackKind::Questions => GeneratedQuiz::KIND.into(),
        }
    }

    pub fn response_schema(self) -> Value {
        match self {
            FeedbackKind::Writing => WritingFeedback::response_schema(),
            FeedbackKind::Speaking => SpeakingFeedback::response_schema(),
            FeedbackKind::Questions => GeneratedQuiz::response_schema(),
        }
    }
}

/// Expected top-level kind implied by an upstream schema hint (`"type": "ARRAY"`).
pub fn shape_from_schema(schema: &Value) -> ExpectedShape {
    match schema.get("type").and_then(Value::as_str) {
        Some(t) if t.eq_ignore_ascii_case("array") => ExpectedShape::Array,
        Some(t) if t.eq_ignore_ascii_case("object") => ExpectedShape::Object,
        _ => ExpectedShape::Either,
    }
}

// Models occasionally quote numbers ("7" or "7/10").
fn lenient_score<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(de)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let head = s.split('/').next().unwrap_or_default().trim();
            head.parse::<f64>().ok()
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_extract::extract_any;

    #[test]
    fn writing_feedback_from_fenced_output() {
        let ex = extract_any(
            "```json\n{\"overallScore\": 7, \"suggestions\": [\"Use past tense correctly.\"]}\n```",
        )
        .unwrap();
        let fb: WritingFeedback = parse_as(&ex).unwrap();
        assert_eq!(fb.overall_score, Some(7.0));
        assert_eq!(fb.grammar_mistakes, None);
        assert_eq!(
            fb.suggestions,
            Some(vec!["Use past tense correctly.".to_string()])
        );
    }

    #[test]
    fn quoted_scores_are_accepted() {
        let ex = extract_any(r#"{"clarityScore": "6/10", "corrections": []}"#).unwrap();
        let fb: SpeakingFeedback = parse_as(&ex).unwrap();
        assert_eq!(fb.clarity_score, Some(6.0));
        assert_eq!(fb.corrections, Some(vec![]));

        let ex = extract_any(r#"{"clarityScore": "excellent"}"#).unwrap();
        let fb: SpeakingFeedback = parse_as(&ex).unwrap();
        assert_eq!(fb.clarity_score, None);
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let ex = extract_any("[1, 2]").unwrap();
        let err = parse_as::<WritingFeedback>(&ex).unwrap_err();
        assert!(matches!(
            err,
            ShapeError::WrongKind {
                expected: JsonKind::Object,
                actual: JsonKind::Array,
                ..
            }
        ));
    }

    #[test]
    fn wrong_field_type_is_rejected() {
        let ex = extract_any(r#"{"suggestions": "write more"}"#).unwrap();
        let err = parse_as::<WritingFeedback>(&ex).unwrap_err();
        assert!(matches!(err, ShapeError::Fields { .. }));
        assert!(err.to_string().contains("writing feedback"));
    }

    #[test]
    fn generated_quiz_from_array() {
        let ex = extract_any(
            r#"Sure! Here you go: [{"question":"Q1","options":["a","b","c","d"],"correct":1}]"#,
        )
        .unwrap();
        let quiz: GeneratedQuiz = parse_as(&ex).unwrap();
        assert_eq!(quiz.0.len(), 1);
        assert!(quiz.0[0].is_consistent());
        assert_eq!(quiz.0[0].options[1], "b");
    }

    #[test]
    fn schema_hints_match_kinds() {
        for kind in [
            FeedbackKind::Writing,
            FeedbackKind::Speaking,
            FeedbackKind::Questions,
        ] {
            assert_eq!(shape_from_schema(&kind.response_schema()), kind.expected_shape());
        }
        assert_eq!(shape_from_schema(&json!({})), ExpectedShape::Either);
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let fb = WritingFeedback {
            overall_score: Some(5.0),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&fb).unwrap(), json!({"overallScore": 5.0}));
    }
}
