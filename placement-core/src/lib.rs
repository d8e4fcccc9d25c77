//! Core of the placement test: scoring relay, tolerant JSON extraction from
//! model output, typed feedback shapes, question bank and per-test state.

pub mod config;
pub mod feedback;
pub mod gemini;
pub mod json_extract;
pub mod present;
pub mod prompt;
pub mod questions;
pub mod relay;
pub mod session;
pub mod store;

pub use feedback::{parse_as, FeedbackKind, SpeakingFeedback, WritingFeedback};
pub use json_extract::{
    extract, extract_any, ExpectedShape, ExtractFailure, Extracted, ExtractionResult, JsonKind,
};
pub use relay::{AnalyseRequest, Relay, RelayError};
pub use session::{ResultsSummary, StudentDetails, TestSession};
