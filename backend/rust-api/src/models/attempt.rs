use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use super::quiz::QuestionType;
use super::snapshot::QuizSnapshot;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Started,
    InProgress,
    Submitted,
    Graded,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Started => "started",
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Submitted => "submitted",
            AttemptStatus::Graded => "graded",
        }
    }

    /// Started and InProgress both count as "active": answers may still be
    /// recorded and the attempt can be resumed.
    pub fn is_active(&self) -> bool {
        matches!(self, AttemptStatus::Started | AttemptStatus::InProgress)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptStatus::Submitted | AttemptStatus::Graded)
    }
}

/// The learner's answer to one question. A closed tagged enum so the scoring
/// engine can match exhaustively instead of sniffing runtime shapes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerPayload {
    /// Single-choice and true/false questions.
    Selected { option_id: String },
    /// Multiple-answer questions; order is not significant.
    SelectedMany { option_ids: Vec<String> },
    /// Fill-blank questions.
    Text { text: String },
    /// Ordering and matching questions; order is the answer.
    Ordered { option_ids: Vec<String> },
}

impl AnswerPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            AnswerPayload::Selected { .. } => "selected",
            AnswerPayload::SelectedMany { .. } => "selected_many",
            AnswerPayload::Text { .. } => "text",
            AnswerPayload::Ordered { .. } => "ordered",
        }
    }

    /// Whether this payload shape is the right one for the question type.
    pub fn matches(&self, question_type: QuestionType) -> bool {
        matches!(
            (self, question_type),
            (
                AnswerPayload::Selected { .. },
                QuestionType::SingleChoice | QuestionType::TrueFalse
            ) | (
                AnswerPayload::SelectedMany { .. },
                QuestionType::MultipleAnswer
            ) | (AnswerPayload::Text { .. }, QuestionType::FillBlank)
                | (
                    AnswerPayload::Ordered { .. },
                    QuestionType::Ordering | QuestionType::Matching
                )
        )
    }
}

/// One recorded answer, keyed by question id on the attempt. The correctness
/// fields stay empty until grading so no correctness signal can leak while
/// the attempt is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question_id: String,
    pub payload: AnswerPayload,
    pub answered_at: DateTime<Utc>,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub points_awarded: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionOutcome {
    pub question_id: String,
    pub answered: bool,
    pub is_correct: bool,
    pub points_awarded: f64,
    pub max_points: f64,
}

/// Output of the scoring engine. Persisted on the attempt at grading time so
/// a duplicate submit returns the identical result without recomputation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptResult {
    pub total_points: f64,
    pub max_points: f64,
    pub percentage: f64,
    pub passed: bool,
    pub questions: Vec<QuestionOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    /// Monotonically increasing per (user, quiz).
    pub attempt_number: u32,
    /// Drives the snapshot shuffle; stored so resume rebuilds the exact tree
    /// the learner first saw.
    pub shuffle_seed: i64,
    pub status: AttemptStatus,
    /// Set once at start, never advanced by resume.
    pub started_at: DateTime<Utc>,
    /// `started_at + duration`, precomputed so the deadline sweep can find
    /// overdue attempts without consulting the catalog.
    #[serde(default)]
    pub deadline_at: Option<DateTime<Utc>>,
    /// Set iff status is Submitted or Graded.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_spent_seconds: i64,
    #[serde(default)]
    pub answers: HashMap<String, AnsweredQuestion>,
    #[serde(default)]
    pub result: Option<AttemptResult>,
    /// Optimistic concurrency token checked by the attempt store on update.
    pub version: i64,
}

impl Attempt {
    pub fn new(
        quiz_id: &str,
        user_id: &str,
        attempt_number: u32,
        shuffle_seed: i64,
        started_at: DateTime<Utc>,
        deadline_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            user_id: user_id.to_string(),
            attempt_number,
            shuffle_seed,
            status: AttemptStatus::Started,
            started_at,
            deadline_at,
            submitted_at: None,
            time_spent_seconds: 0,
            answers: HashMap::new(),
            result: None,
            version: 0,
        }
    }

    /// Accumulated time is monotonic and never exceeds the quiz duration.
    pub fn touch_time_spent(&mut self, now: DateTime<Utc>) {
        let mut elapsed = (now - self.started_at).num_seconds().max(0);
        if let Some(deadline) = self.deadline_at {
            let cap = (deadline - self.started_at).num_seconds().max(0);
            elapsed = elapsed.min(cap);
        }
        self.time_spent_seconds = self.time_spent_seconds.max(elapsed);
    }
}

// ---- Request / response DTOs --------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct StartAttemptRequest {
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub user_id: String,
}

/// Subset of the attempt safe to return to the client on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptView {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub attempt_number: u32,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub deadline_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub time_spent_seconds: i64,
}

impl From<&Attempt> for AttemptView {
    fn from(attempt: &Attempt) -> Self {
        Self {
            id: attempt.id.clone(),
            quiz_id: attempt.quiz_id.clone(),
            user_id: attempt.user_id.clone(),
            attempt_number: attempt.attempt_number,
            status: attempt.status,
            started_at: attempt.started_at,
            deadline_at: attempt.deadline_at,
            submitted_at: attempt.submitted_at,
            time_spent_seconds: attempt.time_spent_seconds,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartAttemptResponse {
    pub attempt: AttemptView,
    pub snapshot: QuizSnapshot,
    /// True when an already-active attempt was returned instead of a new one.
    pub resumed: bool,
}

/// Recorded answer as echoed back on resume: payload only, no correctness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerView {
    pub question_id: String,
    pub payload: AnswerPayload,
    pub answered_at: DateTime<Utc>,
}

impl From<&AnsweredQuestion> for AnswerView {
    fn from(answer: &AnsweredQuestion) -> Self {
        Self {
            question_id: answer.question_id.clone(),
            payload: answer.payload.clone(),
            answered_at: answer.answered_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResumeAttemptResponse {
    pub attempt: AttemptView,
    pub snapshot: QuizSnapshot,
    pub answers: Vec<AnswerView>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordAnswerRequest {
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub user_id: String,
    pub payload: AnswerPayload,
}

/// Acknowledgement only: the response never reveals whether the answer is
/// right. Remaining time is advisory display data, never an authority.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordAnswerAck {
    pub attempt_id: String,
    pub question_id: String,
    pub status: AttemptStatus,
    pub recorded_at: DateTime<Utc>,
    pub remaining_seconds: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAttemptResponse {
    pub attempt: AttemptView,
    pub result: AttemptResult,
}

/// What triggered a submit: a learner action or the deadline enforcer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    Manual,
    Forced,
}

impl SubmitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitMode::Manual => "manual",
            SubmitMode::Forced => "forced",
        }
    }
}
