use chrono::Utc;
use std::sync::Arc;

use crate::catalog::ContentCatalog;
use crate::error::{AppError, AppResult};
use crate::metrics::{
    ANSWERS_RECORDED_TOTAL, ATTEMPTS_ACTIVE, ATTEMPTS_STARTED_TOTAL, ATTEMPTS_SUBMITTED_TOTAL,
    ATTEMPT_SCORE_PERCENTAGE,
};
use crate::models::{
    AnswerPayload, AnswerView, AnsweredQuestion, Attempt, AttemptStatus, AttemptView,
    RecordAnswerAck, ResumeAttemptResponse, StartAttemptResponse, SubmitAttemptResponse,
    SubmitMode,
};
use crate::services::{deadline, scoring_service, snapshot_service};
use crate::store::AttemptStore;
use crate::utils::retry::{retry_async_with_config, RetryConfig};

/// The attempt lifecycle state machine and the single authority on
/// transition legality. User ids arrive explicitly with every call; nothing
/// here reads ambient request state, and nothing here trusts a client clock.
#[derive(Clone)]
pub struct AttemptService {
    catalog: Arc<dyn ContentCatalog>,
    store: Arc<dyn AttemptStore>,
}

impl AttemptService {
    pub fn new(catalog: Arc<dyn ContentCatalog>, store: Arc<dyn AttemptStore>) -> Self {
        Self { catalog, store }
    }

    /// Starts an attempt, idempotently: when an active attempt already exists
    /// for (quiz, user) it is returned with its original snapshot instead of
    /// creating a duplicate.
    pub async fn start(&self, quiz_id: &str, user_id: &str) -> AppResult<StartAttemptResponse> {
        let definition = self.catalog.quiz_definition(quiz_id).await?;
        let policy = self.catalog.quiz_policy(quiz_id).await?;

        let latest = self.store.latest_attempt(quiz_id, user_id).await?;

        if let Some(active) = latest.as_ref().filter(|a| a.status.is_active()) {
            tracing::info!(
                "Start for quiz {} user {} returned active attempt {} (number {})",
                quiz_id,
                user_id,
                active.id,
                active.attempt_number
            );
            let snapshot = snapshot_service::build_snapshot(&definition, &policy, active.shuffle_seed)?;
            ATTEMPTS_STARTED_TOTAL.with_label_values(&["resumed"]).inc();
            return Ok(StartAttemptResponse {
                attempt: AttemptView::from(active),
                snapshot,
                resumed: true,
            });
        }

        let attempt_number = latest.map(|a| a.attempt_number + 1).unwrap_or(1);
        if let Some(max_attempts) = policy.max_attempts {
            if attempt_number > max_attempts {
                return Err(AppError::LimitExceeded(format!(
                    "Quiz {} allows {} attempts, user {} has used them all",
                    quiz_id, max_attempts, user_id
                )));
            }
        }

        let seed: i64 = rand::random();
        // Validates the quiz has gradeable content before anything persists.
        let snapshot = snapshot_service::build_snapshot(&definition, &policy, seed)?;

        let now = Utc::now();
        let attempt = Attempt::new(
            quiz_id,
            user_id,
            attempt_number,
            seed,
            now,
            deadline::deadline_for(now, &policy),
        );

        match self.store.create_attempt(&attempt).await {
            Ok(()) => {}
            Err(AppError::Conflict(_)) => {
                // Lost a start race; the other caller's attempt is the active
                // one and the idempotent contract says to hand it back.
                tracing::warn!(
                    "Concurrent start detected for quiz {} user {}, returning existing attempt",
                    quiz_id,
                    user_id
                );
                let existing = self
                    .store
                    .latest_attempt(quiz_id, user_id)
                    .await?
                    .filter(|a| a.status.is_active())
                    .ok_or_else(|| {
                        AppError::Conflict(format!(
                            "Start race for quiz {} user {} left no active attempt",
                            quiz_id, user_id
                        ))
                    })?;
                let snapshot =
                    snapshot_service::build_snapshot(&definition, &policy, existing.shuffle_seed)?;
                ATTEMPTS_STARTED_TOTAL.with_label_values(&["resumed"]).inc();
                return Ok(StartAttemptResponse {
                    attempt: AttemptView::from(&existing),
                    snapshot,
                    resumed: true,
                });
            }
            Err(e) => return Err(e),
        }

        ATTEMPTS_STARTED_TOTAL.with_label_values(&["new"]).inc();
        ATTEMPTS_ACTIVE.inc();
        tracing::info!(
            "Attempt {} started: quiz {} user {} number {} deadline {:?}",
            attempt.id,
            quiz_id,
            user_id,
            attempt_number,
            attempt.deadline_at
        );

        Ok(StartAttemptResponse {
            attempt: AttemptView::from(&attempt),
            snapshot,
            resumed: false,
        })
    }

    /// Rebuilds the snapshot from the stored seed and merges in the answers
    /// recorded so far. Never advances `started_at` or the deadline.
    pub async fn resume(&self, attempt_id: &str, user_id: &str) -> AppResult<ResumeAttemptResponse> {
        let attempt = self.owned_attempt(attempt_id, user_id).await?;

        if !attempt.status.is_active() {
            return Err(AppError::InvalidState(format!(
                "Attempt {} is {}; start a new attempt instead of resuming",
                attempt_id,
                attempt.status.as_str()
            )));
        }

        let definition = self.catalog.quiz_definition(&attempt.quiz_id).await?;
        let policy = self.catalog.quiz_policy(&attempt.quiz_id).await?;
        let snapshot =
            snapshot_service::build_snapshot(&definition, &policy, attempt.shuffle_seed)?;

        let mut answers: Vec<AnswerView> = attempt.answers.values().map(AnswerView::from).collect();
        answers.sort_by(|a, b| a.question_id.cmp(&b.question_id));

        tracing::info!(
            "Attempt {} resumed with {} recorded answers",
            attempt_id,
            answers.len()
        );

        Ok(ResumeAttemptResponse {
            attempt: AttemptView::from(&attempt),
            snapshot,
            answers,
        })
    }

    /// Upserts one answer, last write per question wins. Rejected after the
    /// deadline so the enforcer never races a still-mutating client. The
    /// response carries no correctness feedback.
    pub async fn record_answer(
        &self,
        attempt_id: &str,
        user_id: &str,
        question_id: &str,
        payload: &AnswerPayload,
    ) -> AppResult<RecordAnswerAck> {
        // A lost version race is retried once with a fresh read; the upsert
        // is idempotent so replaying it is safe.
        let ack = retry_async_with_config(
            RetryConfig::conflict_once(),
            |e: &AppError| matches!(e, AppError::Conflict(_)),
            || self.record_answer_once(attempt_id, user_id, question_id, payload),
        )
        .await;

        match &ack {
            Ok(_) => ANSWERS_RECORDED_TOTAL.with_label_values(&["recorded"]).inc(),
            Err(AppError::DeadlineExceeded(_)) => ANSWERS_RECORDED_TOTAL
                .with_label_values(&["rejected_deadline"])
                .inc(),
            Err(_) => ANSWERS_RECORDED_TOTAL.with_label_values(&["rejected"]).inc(),
        }

        ack
    }

    async fn record_answer_once(
        &self,
        attempt_id: &str,
        user_id: &str,
        question_id: &str,
        payload: &AnswerPayload,
    ) -> AppResult<RecordAnswerAck> {
        let mut attempt = self.owned_attempt(attempt_id, user_id).await?;

        if !attempt.status.is_active() {
            return Err(AppError::InvalidState(format!(
                "Attempt {} is {}; answers can no longer be recorded",
                attempt_id,
                attempt.status.as_str()
            )));
        }

        let now = Utc::now();
        if deadline::is_expired(&attempt, now) {
            tracing::warn!(
                "Rejected late answer for attempt {} question {} ({}s past deadline)",
                attempt_id,
                question_id,
                (now - attempt.deadline_at.unwrap_or(now)).num_seconds()
            );
            return Err(AppError::DeadlineExceeded(attempt_id.to_string()));
        }

        let definition = self.catalog.quiz_definition(&attempt.quiz_id).await?;
        let question = definition.question(question_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "Question {} is not part of quiz {}",
                question_id, attempt.quiz_id
            ))
        })?;

        if !payload.matches(question.question_type) {
            return Err(AppError::Validation(format!(
                "Payload kind {} does not fit question type {}",
                payload.kind(),
                question.question_type.as_str()
            )));
        }

        attempt.answers.insert(
            question_id.to_string(),
            AnsweredQuestion {
                question_id: question_id.to_string(),
                payload: payload.clone(),
                answered_at: now,
                is_correct: None,
                points_awarded: None,
            },
        );
        if attempt.status == AttemptStatus::Started {
            attempt.status = AttemptStatus::InProgress;
        }
        attempt.touch_time_spent(now);

        let updated = self.store.update_attempt(&attempt).await?;

        tracing::debug!(
            "Answer recorded: attempt {} question {} kind {}",
            attempt_id,
            question_id,
            payload.kind()
        );

        Ok(RecordAnswerAck {
            attempt_id: updated.id.clone(),
            question_id: question_id.to_string(),
            status: updated.status,
            recorded_at: now,
            remaining_seconds: deadline::remaining_seconds(&updated, now),
        })
    }

    /// Terminal transition. Idempotent: a second submit, whether a double
    /// click or the deadline enforcer racing a manual submit, observes the
    /// stored result instead of rescoring.
    pub async fn submit(
        &self,
        attempt_id: &str,
        user_id: &str,
        mode: SubmitMode,
    ) -> AppResult<SubmitAttemptResponse> {
        let attempt = self.owned_attempt(attempt_id, user_id).await?;

        if attempt.status.is_terminal() {
            return self.existing_result(attempt).await;
        }

        let now = Utc::now();
        let mut claiming = attempt;
        claiming.status = AttemptStatus::Submitted;
        claiming.submitted_at = Some(now);
        claiming.touch_time_spent(now);

        // The version check makes this CAS the single-writer gate: exactly
        // one submitter claims the transition, everyone else re-reads.
        let claimed = match self.store.update_attempt(&claiming).await {
            Ok(claimed) => claimed,
            Err(AppError::Conflict(_)) => {
                tracing::info!(
                    "Submit race on attempt {}; deferring to the winning writer",
                    attempt_id
                );
                let current = self.store.attempt_by_id(attempt_id).await?;
                if current.status.is_terminal() {
                    return self.existing_result(current).await;
                }
                // An answer write slipped in between read and claim; the
                // caller retries against the fresh version.
                return Err(AppError::Conflict(format!(
                    "Attempt {} changed while submitting; retry",
                    attempt_id
                )));
            }
            Err(e) => return Err(e),
        };

        let definition = self.catalog.quiz_definition(&claimed.quiz_id).await?;
        let policy = self.catalog.quiz_policy(&claimed.quiz_id).await?;
        let result = scoring_service::score_attempt(&definition, &policy, &claimed);

        let mut graded = claimed;
        for outcome in &result.questions {
            if let Some(answer) = graded.answers.get_mut(&outcome.question_id) {
                answer.is_correct = Some(outcome.is_correct);
                answer.points_awarded = Some(outcome.points_awarded);
            }
        }
        graded.status = AttemptStatus::Graded;
        graded.result = Some(result.clone());

        let graded = self.store.update_attempt(&graded).await?;

        ATTEMPTS_SUBMITTED_TOTAL
            .with_label_values(&[mode.as_str()])
            .inc();
        ATTEMPTS_ACTIVE.dec();
        ATTEMPT_SCORE_PERCENTAGE.observe(result.percentage);

        tracing::info!(
            "Attempt {} graded ({}): {:.1}% ({} / {} points), passed={}",
            attempt_id,
            mode.as_str(),
            result.percentage,
            result.total_points,
            result.max_points,
            result.passed
        );

        Ok(SubmitAttemptResponse {
            attempt: AttemptView::from(&graded),
            result,
        })
    }

    async fn existing_result(&self, attempt: Attempt) -> AppResult<SubmitAttemptResponse> {
        let Some(result) = attempt.result.clone() else {
            // Claimed by another submitter whose grading write has not landed
            // yet; the window is one synchronous scoring pass wide.
            return Err(AppError::Conflict(format!(
                "Attempt {} is being graded; retry",
                attempt.id
            )));
        };

        ATTEMPTS_SUBMITTED_TOTAL
            .with_label_values(&["duplicate"])
            .inc();
        tracing::info!(
            "Duplicate submit for attempt {} returned stored result",
            attempt.id
        );

        Ok(SubmitAttemptResponse {
            attempt: AttemptView::from(&attempt),
            result,
        })
    }

    /// Fetches the attempt and checks ownership. A foreign attempt id reads
    /// as missing so the response does not confirm its existence.
    async fn owned_attempt(&self, attempt_id: &str, user_id: &str) -> AppResult<Attempt> {
        let attempt = self.store.attempt_by_id(attempt_id).await?;
        if attempt.user_id != user_id {
            return Err(AppError::NotFound(format!(
                "Attempt {} not found",
                attempt_id
            )));
        }
        Ok(attempt)
    }
}
