//! Plain-text rendering of feedback and final results.
//!
//! Missing data is never an error here. An absent score renders as
//! `Not available`; an absent or empty list renders its fixed fallback line.

use std::fmt::Write as _;

use crate::feedback::{SpeakingFeedback, WritingFeedback};
use crate::session::ResultsSummary;

pub const NOT_AVAILABLE: &str = "Not available";
pub const NOT_ATTEMPTED: &str = "Not attempted.";
/// Summary line for a speaking section that came back without a clarity score.
const SPEAKING_UNSCORED: &str = "Not attempted";

/// `7/10`, or [`NOT_AVAILABLE`].
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(s) if s.is_finite() => format!("{s}/10"),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn render_writing(feedback: &WritingFeedback) -> String {
    let mut out = String::new();
    out.push_str("AI Writing Analysis\n");
    let _ = writeln!(out, "Overall Score: {}", format_score(feedback.overall_score));
    push_list(
        &mut out,
        "Grammar Mistakes:",
        feedback.grammar_mistakes.as_deref(),
        "No significant mistakes found. Great job!",
    );
    push_list(
        &mut out,
        "Suggestions for Improvement:",
        feedback.suggestions.as_deref(),
        "Keep up the good work!",
    );
    out
}

pub fn render_speaking(feedback: &SpeakingFeedback) -> String {
    let mut out = String::new();
    out.push_str("AI Speaking Analysis\n");
    if let Some(transcript) = feedback.transcript.as_deref() {
        let _ = writeln!(out, "Your response: \"{transcript}\"");
    }
    let _ = writeln!(
        out,
        "Clarity & Fluency Score: {}",
        format_score(feedback.clarity_score)
    );
    push_list(
        &mut out,
        "Suggested Corrections:",
        feedback.corrections.as_deref(),
        "Sounded great!",
    );
    push_list(
        &mut out,
        "What You Did Well:",
        feedback.positive_points.as_deref(),
        "Clear and well-spoken.",
    );
    out
}

pub fn render_summary(summary: &ResultsSummary) -> String {
    let mut out = String::new();
    let name = summary.student.name.trim();
    if name.is_empty() {
        out.push_str("Placement Test Results\n");
    } else {
        let _ = writeln!(out, "{name}'s Placement Test Results");
    }
    out.push_str("Summary of Your Assessment\n");
    let _ = writeln!(
        out,
        "Grammar & Vocabulary Score: {} / {}",
        summary.mcq_score, summary.mcq_total
    );
    let writing = summary
        .writing
        .as_ref()
        .map(|w| format_score(w.overall_score))
        .unwrap_or_else(|| NOT_ATTEMPTED.to_string());
    let _ = writeln!(out, "AI Writing Score: {writing}");
    let speaking = summary
        .speaking
        .as_ref()
        .map(|s| match s.clarity_score {
            Some(score) if score.is_finite() => format_score(Some(score)),
            _ => SPEAKING_UNSCORED.to_string(),
        })
        .unwrap_or_else(|| NOT_ATTEMPTED.to_string());
    let _ = writeln!(out, "AI Speaking Score: {speaking}");
    out.push_str(
        "Based on these results, a teacher will contact you to confirm your placement. Thank you!\n",
    );
    out
}

/// The single line shown in place of feedback when scoring failed.
pub fn render_failure(message: &str) -> String {
    format!("Sorry, something went wrong. Please try again later. ({message})")
}

fn push_list(out: &mut String, heading: &str, items: Option<&[String]>, fallback: &str) {
    out.push_str(heading);
    out.push('\n');
    match items {
        Some(items) if !items.is_empty() => {
            for item in items {
                let _ = writeln!(out, "  - {item}");
            }
        }
        _ => {
            let _ = writeln!(out, "  - {fallback}");
        }
    }
}
