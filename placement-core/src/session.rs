//! Per-candidate test state, from the details form to the results screen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feedback::{SpeakingFeedback, WritingFeedback};
use crate::questions::Question;

/// Shortest writing sample (trimmed characters) worth sending for scoring.
pub const MIN_WRITING_CHARS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDetails {
    pub name: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub qualification: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("question {index} does not exist (test has {count})")]
    NoSuchQuestion { index: usize, count: usize },
    #[error("question {index} has no option {option}")]
    NoSuchOption { index: usize, option: usize },
    #[error("please write at least {} characters before analyzing", MIN_WRITING_CHARS)]
    WritingTooShort,
}

/// State for one candidate's test. Created when the details form is
/// submitted, consumed by [`TestSession::finish`] when results are shown.
#[derive(Debug, Clone)]
pub struct TestSession {
    student: StudentDetails,
    questions: Vec<Question>,
    answers: Vec<Option<usize>>,
    writing: Option<WritingFeedback>,
    speaking: Option<SpeakingFeedback>,
    started_at: DateTime<Utc>,
}

impl TestSession {
    pub fn start(student: StudentDetails, questions: Vec<Question>) -> Self {
        let answers = vec![None; questions.len()];
        Self {
            student,
            questions,
            answers,
            writing: None,
            speaking: None,
            started_at: Utc::now(),
        }
    }

    pub fn student(&self) -> &StudentDetails {
        &self.student
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Record (or change) the selected option for a question.
    pub fn answer(&mut self, index: usize, option: usize) -> Result<(), SessionError> {
        let count = self.questions.len();
        let question = self
            .questions
            .get(index)
            .ok_or(SessionError::NoSuchQuestion { index, count })?;
        if option >= question.options.len() {
            return Err(SessionError::NoSuchOption { index, option });
        }
        self.answers[index] = Some(option);
        Ok(())
    }

    /// Correct answers so far; unanswered questions score zero.
    pub fn mcq_score(&self) -> usize {
        self.questions
            .iter()
            .zip(&self.answers)
            .filter(|(q, a)| **a == Some(q.correct))
            .count()
    }

    pub fn record_writing(&mut self, feedback: WritingFeedback) {
        self.writing = Some(feedback);
    }

    /// Store speaking feedback, attaching the transcript it was scored on.
    pub fn record_speaking(&mut self, mut feedback: SpeakingFeedback, transcript: &str) {
        feedback.transcript = Some(transcript.trim().to_string());
        self.speaking = Some(feedback);
    }

    pub fn writing(&self) -> Option<&WritingFeedback> {
        self.writing.as_ref()
    }

    pub fn speaking(&self) -> Option<&SpeakingFeedback> {
        self.speaking.as_ref()
    }

    pub fn finish(self) -> ResultsSummary {
        ResultsSummary {
            mcq_score: self.mcq_score(),
            mcq_total: self.questions.len(),
            student: self.student,
            writing: self.writing,
            speaking: self.speaking,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Trimmed writing sample, if long enough to score.
pub fn check_writing_sample(text: &str) -> Result<&str, SessionError> {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_WRITING_CHARS {
        return Err(SessionError::WritingTooShort);
    }
    Ok(trimmed)
}

/// Final results; this is the record the relay persists on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSummary {
    pub student: StudentDetails,
    pub mcq_score: usize,
    pub mcq_total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writing: Option<WritingFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaking: Option<SpeakingFeedback>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
