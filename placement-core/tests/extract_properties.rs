//! Property checks for the tolerant extractor: clean, fenced and prose-wrapped
//! JSON all come back unchanged, and arbitrary text never panics.

use placement_core::{extract, extract_any, ExpectedShape, ExtractFailure, JsonKind};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 .,!?'_-]{0,16}".prop_map(Value::String),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Objects or arrays only (the top level the extractor recovers).
fn container() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::collection::vec(value(), 0..4).prop_map(Value::Array),
        prop::collection::btree_map("[a-zA-Z]{1,8}", value(), 0..4)
            .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
    ]
}

fn kind_of(v: &Value) -> JsonKind {
    if v.is_array() {
        JsonKind::Array
    } else {
        JsonKind::Object
    }
}

/// Prose with no brackets and no backticks.
fn prose() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,:;!?'\n-]{0,40}"
}

proptest! {
    #[test]
    fn clean_json_round_trips(v in container()) {
        let s = serde_json::to_string(&v).unwrap();
        let got = extract_any(&s).unwrap();
        prop_assert_eq!(got.kind, kind_of(&v));
        prop_assert_eq!(got.value, v);
    }

    #[test]
    fn pretty_json_round_trips(v in container()) {
        let s = serde_json::to_string_pretty(&v).unwrap();
        prop_assert_eq!(extract_any(&s).unwrap().value, v);
    }

    #[test]
    fn fenced_json_round_trips(v in container(), tag in prop_oneof![Just(""), Just("json"), Just("JSON")]) {
        let s = format!("```{tag}\n{}\n```", serde_json::to_string(&v).unwrap());
        prop_assert_eq!(extract_any(&s).unwrap().value, v);
    }

    #[test]
    fn prose_wrapped_json_round_trips(v in container(), before in prose(), after in prose()) {
        let s = format!("{before}{}{after}", serde_json::to_string(&v).unwrap());
        let got = extract_any(&s).unwrap();
        prop_assert_eq!(got.kind, kind_of(&v));
        prop_assert_eq!(got.value, v.clone());
        let preferred = extract(&s, ExpectedShape::from(kind_of(&v))).unwrap();
        prop_assert_eq!(preferred.value, v);
    }

    #[test]
    fn truncated_before_first_close_is_malformed(v in container(), before in prose()) {
        let full = serde_json::to_string(&v).unwrap();
        let cut = full.find(['}', ']']).unwrap();
        let s = format!("{before}{}", &full[..cut]);
        prop_assert_eq!(extract_any(&s), Err(ExtractFailure::MalformedJson));
    }

    #[test]
    fn arbitrary_text_never_panics(s in "\\PC{0,200}", shape in prop_oneof![
        Just(ExpectedShape::Object),
        Just(ExpectedShape::Array),
        Just(ExpectedShape::Either),
    ]) {
        let first = extract(&s, shape);
        prop_assert_eq!(first.clone(), extract(&s, shape));
    }

    #[test]
    fn bracket_free_text_is_empty_or_no_json(s in prose()) {
        let expected = if s.trim().is_empty() {
            ExtractFailure::EmptyInput
        } else {
            ExtractFailure::NoJsonFound
        };
        prop_assert_eq!(extract_any(&s), Err(expected));
    }
}

#[test]
fn end_to_end_scenarios() {
    let writing = extract_any(
        "```json\n{\"overallScore\": 7, \"suggestions\": [\"Use past tense correctly.\"]}\n```",
    )
    .unwrap();
    assert_eq!(
        writing.value,
        json!({"overallScore": 7, "suggestions": ["Use past tense correctly."]})
    );

    let quiz = extract_any(
        r#"Sure! Here you go: [{"question":"Q1","options":["a","b","c","d"],"correct":1}]"#,
    )
    .unwrap();
    assert_eq!(quiz.kind, JsonKind::Array);
    assert_eq!(quiz.value.as_array().map(Vec::len), Some(1));

    assert_eq!(
        extract_any("I cannot evaluate this."),
        Err(ExtractFailure::NoJsonFound)
    );
}
