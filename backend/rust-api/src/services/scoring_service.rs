use std::collections::HashSet;

use crate::models::{
    AnswerPayload, AnsweredQuestion, Attempt, AttemptResult, MultiAnswerPolicy, Question,
    QuestionOutcome, QuestionType, QuizDefinition, QuizPolicy,
};

/// Grades a submitted attempt against the quiz definition. Pure: no I/O, no
/// clock, fully deterministic for a given (definition, policy, attempt).
///
/// Every question in the definition appears in the outcome list; unanswered
/// questions score zero, they are never an error.
pub fn score_attempt(
    definition: &QuizDefinition,
    policy: &QuizPolicy,
    attempt: &Attempt,
) -> AttemptResult {
    let questions: Vec<QuestionOutcome> = definition
        .questions()
        .map(|question| score_question(question, policy, attempt.answers.get(&question.id)))
        .collect();

    let total_points: f64 = questions.iter().map(|o| o.points_awarded).sum();
    let max_points: f64 = questions.iter().map(|o| o.max_points).sum();
    let percentage = if max_points > 0.0 {
        total_points / max_points * 100.0
    } else {
        0.0
    };

    AttemptResult {
        total_points,
        max_points,
        percentage,
        passed: percentage >= policy.passing_threshold,
        questions,
    }
}

fn score_question(
    question: &Question,
    policy: &QuizPolicy,
    answer: Option<&AnsweredQuestion>,
) -> QuestionOutcome {
    let max_points = question.points as f64;

    let Some(answer) = answer else {
        return QuestionOutcome {
            question_id: question.id.clone(),
            answered: false,
            is_correct: false,
            points_awarded: 0.0,
            max_points,
        };
    };

    // One rule per question type; the match is exhaustive so adding a type
    // without a rule fails to compile.
    let points_awarded = match question.question_type {
        QuestionType::SingleChoice | QuestionType::TrueFalse => {
            score_single_choice(question, &answer.payload)
        }
        QuestionType::MultipleAnswer => {
            score_multiple_answer(question, policy.multi_answer_policy, &answer.payload)
        }
        QuestionType::FillBlank => score_fill_blank(question, &answer.payload),
        QuestionType::Ordering | QuestionType::Matching => score_ordered(question, &answer.payload),
    };

    QuestionOutcome {
        question_id: question.id.clone(),
        answered: true,
        is_correct: points_awarded >= max_points && max_points > 0.0,
        points_awarded,
        max_points,
    }
}

/// Full points iff the selected id is the unique correct option.
fn score_single_choice(question: &Question, payload: &AnswerPayload) -> f64 {
    let AnswerPayload::Selected { option_id } = payload else {
        return 0.0;
    };

    let correct = question.correct_option_ids();
    if correct.len() == 1 && correct[0] == option_id {
        question.points as f64
    } else {
        0.0
    }
}

/// Strict: full points only for the exact correct set. Partial: proportional
/// credit for correct picks minus a penalty per wrong pick, floored at zero.
fn score_multiple_answer(
    question: &Question,
    policy: MultiAnswerPolicy,
    payload: &AnswerPayload,
) -> f64 {
    let AnswerPayload::SelectedMany { option_ids } = payload else {
        return 0.0;
    };

    let selected: HashSet<&str> = option_ids.iter().map(String::as_str).collect();
    let correct: HashSet<&str> = question.correct_option_ids().into_iter().collect();

    if correct.is_empty() {
        return 0.0;
    }

    match policy {
        MultiAnswerPolicy::Strict => {
            if selected == correct {
                question.points as f64
            } else {
                0.0
            }
        }
        MultiAnswerPolicy::Partial => {
            let hits = selected.intersection(&correct).count() as f64;
            let misses = selected.difference(&correct).count() as f64;
            let fraction = ((hits - misses) / correct.len() as f64).max(0.0);
            fraction * question.points as f64
        }
    }
}

/// Case-insensitive, whitespace-trimmed match against any accepted string.
fn score_fill_blank(question: &Question, payload: &AnswerPayload) -> f64 {
    let AnswerPayload::Text { text } = payload else {
        return 0.0;
    };

    let normalized = normalize_text(text);
    let accepted = question
        .accepted_texts
        .iter()
        .any(|candidate| normalize_text(candidate) == normalized);

    if accepted {
        question.points as f64
    } else {
        0.0
    }
}

/// All-or-nothing: the submitted sequence must equal the canonical one.
/// Partial credit for orderings is ambiguous and deliberately unsupported.
fn score_ordered(question: &Question, payload: &AnswerPayload) -> f64 {
    let AnswerPayload::Ordered { option_ids } = payload else {
        return 0.0;
    };

    let canonical = question.canonical_order();
    let submitted: Vec<&str> = option_ids.iter().map(String::as_str).collect();

    if !canonical.is_empty() && submitted == canonical {
        question.points as f64
    } else {
        0.0
    }
}

fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerOption, QuizSection};
    use chrono::Utc;

    fn option(id: &str, correct: bool) -> AnswerOption {
        AnswerOption {
            id: id.to_string(),
            text: format!("option {}", id),
            is_correct: correct,
        }
    }

    fn question(id: &str, question_type: QuestionType, points: u32) -> Question {
        Question {
            id: id.to_string(),
            prompt: format!("prompt {}", id),
            question_type,
            points,
            options: vec![],
            accepted_texts: vec![],
        }
    }

    fn single_quiz(questions: Vec<Question>) -> QuizDefinition {
        QuizDefinition {
            id: "quiz-1".to_string(),
            title: "Quiz".to_string(),
            sections: vec![QuizSection {
                id: "s1".to_string(),
                title: String::new(),
                questions,
                groups: vec![],
            }],
        }
    }

    fn attempt_with(answers: Vec<(&str, AnswerPayload)>) -> Attempt {
        let mut attempt = Attempt::new("quiz-1", "user-1", 1, 42, Utc::now(), None);
        for (question_id, payload) in answers {
            attempt.answers.insert(
                question_id.to_string(),
                AnsweredQuestion {
                    question_id: question_id.to_string(),
                    payload,
                    answered_at: Utc::now(),
                    is_correct: None,
                    points_awarded: None,
                },
            );
        }
        attempt
    }

    fn selected(id: &str) -> AnswerPayload {
        AnswerPayload::Selected {
            option_id: id.to_string(),
        }
    }

    fn selected_many(ids: &[&str]) -> AnswerPayload {
        AnswerPayload::SelectedMany {
            option_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn single_choice_full_points_or_zero() {
        let mut q = question("q1", QuestionType::SingleChoice, 5);
        q.options = vec![option("a", true), option("b", false), option("c", false)];
        let quiz = single_quiz(vec![q]);
        let policy = QuizPolicy::default();

        let correct = score_attempt(&quiz, &policy, &attempt_with(vec![("q1", selected("a"))]));
        assert_eq!(correct.total_points, 5.0);
        assert!(correct.questions[0].is_correct);

        let wrong = score_attempt(&quiz, &policy, &attempt_with(vec![("q1", selected("b"))]));
        assert_eq!(wrong.total_points, 0.0);
        assert!(!wrong.questions[0].is_correct);
    }

    #[test]
    fn strict_multi_answer_rejects_supersets() {
        let mut q = question("q1", QuestionType::MultipleAnswer, 4);
        q.options = vec![
            option("a", true),
            option("b", false),
            option("c", true),
            option("d", false),
        ];
        let quiz = single_quiz(vec![q]);
        let policy = QuizPolicy::default(); // strict

        // Correct set is {a, c}; selecting {a, b, c} scores 0 under strict.
        let superset = score_attempt(
            &quiz,
            &policy,
            &attempt_with(vec![("q1", selected_many(&["a", "b", "c"]))]),
        );
        assert_eq!(superset.total_points, 0.0);

        let exact = score_attempt(
            &quiz,
            &policy,
            &attempt_with(vec![("q1", selected_many(&["c", "a"]))]),
        );
        assert_eq!(exact.total_points, 4.0);
    }

    #[test]
    fn partial_multi_answer_penalizes_wrong_picks_floored_at_zero() {
        let mut q = question("q1", QuestionType::MultipleAnswer, 4);
        q.options = vec![
            option("a", true),
            option("b", false),
            option("c", true),
            option("d", false),
        ];
        let quiz = single_quiz(vec![q]);
        let policy = QuizPolicy {
            multi_answer_policy: MultiAnswerPolicy::Partial,
            ..QuizPolicy::default()
        };

        // 2 hits, 1 miss of 2 correct: (2 - 1) / 2 * 4 = 2.
        let mixed = score_attempt(
            &quiz,
            &policy,
            &attempt_with(vec![("q1", selected_many(&["a", "b", "c"]))]),
        );
        assert_eq!(mixed.total_points, 2.0);
        assert!(!mixed.questions[0].is_correct);

        // 1 hit, 2 misses: (1 - 2) / 2 floors at 0.
        let mostly_wrong = score_attempt(
            &quiz,
            &policy,
            &attempt_with(vec![("q1", selected_many(&["a", "b", "d"]))]),
        );
        assert_eq!(mostly_wrong.total_points, 0.0);
    }

    #[test]
    fn fill_blank_ignores_case_and_whitespace() {
        let mut q = question("q1", QuestionType::FillBlank, 2);
        q.accepted_texts = vec!["Ottawa".to_string(), "ottawa city".to_string()];
        let quiz = single_quiz(vec![q]);
        let policy = QuizPolicy::default();

        let text = |t: &str| AnswerPayload::Text { text: t.to_string() };

        let ok = score_attempt(&quiz, &policy, &attempt_with(vec![("q1", text("  OTTAWA "))]));
        assert_eq!(ok.total_points, 2.0);

        let no = score_attempt(&quiz, &policy, &attempt_with(vec![("q1", text("Toronto"))]));
        assert_eq!(no.total_points, 0.0);
    }

    #[test]
    fn ordering_is_all_or_nothing() {
        let mut q = question("q1", QuestionType::Ordering, 3);
        q.options = vec![option("a", false), option("b", false), option("c", false)];
        let quiz = single_quiz(vec![q]);
        let policy = QuizPolicy::default();

        let ordered = |ids: &[&str]| AnswerPayload::Ordered {
            option_ids: ids.iter().map(|s| s.to_string()).collect(),
        };

        let exact = score_attempt(
            &quiz,
            &policy,
            &attempt_with(vec![("q1", ordered(&["a", "b", "c"]))]),
        );
        assert_eq!(exact.total_points, 3.0);

        // One transposition: no partial credit.
        let swapped = score_attempt(
            &quiz,
            &policy,
            &attempt_with(vec![("q1", ordered(&["a", "c", "b"]))]),
        );
        assert_eq!(swapped.total_points, 0.0);
    }

    #[test]
    fn unanswered_questions_score_zero_and_are_reported() {
        let mut q1 = question("q1", QuestionType::SingleChoice, 5);
        q1.options = vec![option("a", true), option("b", false)];
        let q2 = question("q2", QuestionType::FillBlank, 5);
        let quiz = single_quiz(vec![q1, q2]);
        let policy = QuizPolicy {
            passing_threshold: 50.0,
            ..QuizPolicy::default()
        };

        let result = score_attempt(&quiz, &policy, &attempt_with(vec![("q1", selected("a"))]));

        assert_eq!(result.questions.len(), 2);
        assert_eq!(result.total_points, 5.0);
        assert_eq!(result.max_points, 10.0);
        assert_eq!(result.percentage, 50.0);
        assert!(result.passed);

        let unanswered = &result.questions[1];
        assert_eq!(unanswered.question_id, "q2");
        assert!(!unanswered.answered);
        assert_eq!(unanswered.points_awarded, 0.0);
    }

    #[test]
    fn mismatched_payload_shape_scores_zero() {
        let mut q = question("q1", QuestionType::SingleChoice, 5);
        q.options = vec![option("a", true)];
        let quiz = single_quiz(vec![q]);

        let result = score_attempt(
            &quiz,
            &QuizPolicy::default(),
            &attempt_with(vec![("q1", selected_many(&["a"]))]),
        );
        assert_eq!(result.total_points, 0.0);
    }

    #[test]
    fn zero_point_quiz_grades_without_division_error() {
        let quiz = single_quiz(vec![question("q1", QuestionType::FillBlank, 0)]);
        let result = score_attempt(&quiz, &QuizPolicy::default(), &attempt_with(vec![]));
        assert_eq!(result.percentage, 0.0);
        assert!(!result.passed);
    }
}
