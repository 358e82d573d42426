use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{AppError, AppResult};
use crate::models::{
    Question, QuizDefinition, QuizPolicy, QuizSnapshot, SnapshotGroup, SnapshotOption,
    SnapshotQuestion, SnapshotSection,
};

/// Builds the client-visible snapshot for one attempt: the quiz tree with
/// seeded shuffling applied and every correctness flag stripped.
///
/// The same (definition, policy, seed) triple always produces an identical
/// tree. That property is what makes resume safe: re-shuffling on resume
/// would let a learner fish for a friendlier ordering by abandoning and
/// resuming, so the permutation is pinned to the attempt's stored seed.
/// ChaCha8 is used because its output stream is specified and stable across
/// platforms and releases, which `StdRng` does not promise.
pub fn build_snapshot(
    definition: &QuizDefinition,
    policy: &QuizPolicy,
    seed: i64,
) -> AppResult<QuizSnapshot> {
    if definition.question_count() == 0 {
        return Err(AppError::NotFound(format!(
            "Quiz {} has no eligible questions",
            definition.id
        )));
    }

    // One stream for question order, consumed in tree walk order.
    let mut question_rng = ChaCha8Rng::seed_from_u64(seed as u64);

    let sections = definition
        .sections
        .iter()
        .map(|section| {
            let mut questions: Vec<&Question> = section.questions.iter().collect();
            if policy.shuffle_questions {
                questions.shuffle(&mut question_rng);
            }

            let groups = section
                .groups
                .iter()
                .map(|group| {
                    let mut group_questions: Vec<&Question> = group.questions.iter().collect();
                    if policy.shuffle_questions {
                        group_questions.shuffle(&mut question_rng);
                    }
                    SnapshotGroup {
                        id: group.id.clone(),
                        title: group.title.clone(),
                        questions: group_questions
                            .into_iter()
                            .map(|q| snapshot_question(q, policy, seed))
                            .collect(),
                    }
                })
                .collect();

            SnapshotSection {
                id: section.id.clone(),
                title: section.title.clone(),
                questions: questions
                    .into_iter()
                    .map(|q| snapshot_question(q, policy, seed))
                    .collect(),
                groups,
            }
        })
        .collect();

    Ok(QuizSnapshot {
        quiz_id: definition.id.clone(),
        title: definition.title.clone(),
        sections,
    })
}

fn snapshot_question(question: &Question, policy: &QuizPolicy, seed: i64) -> SnapshotQuestion {
    let mut options: Vec<SnapshotOption> = question
        .options
        .iter()
        .map(|o| SnapshotOption {
            id: o.id.clone(),
            text: o.text.clone(),
        })
        .collect();

    if policy.shuffle_answers {
        // Each question gets its own stream derived from (seed, question id)
        // so one question's option order never depends on how many questions
        // were shuffled before it.
        let mut option_rng = ChaCha8Rng::seed_from_u64((seed as u64) ^ fnv1a(&question.id));
        options.shuffle(&mut option_rng);
    }

    SnapshotQuestion {
        id: question.id.clone(),
        prompt: question.prompt.clone(),
        question_type: question.question_type,
        points: question.points,
        options,
    }
}

/// FNV-1a over the question id. `DefaultHasher` is not stable across std
/// releases, and the derived option streams must be.
fn fnv1a(input: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in input.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerOption, QuestionGroup, QuestionType, QuizSection};

    fn option(id: &str, correct: bool) -> AnswerOption {
        AnswerOption {
            id: id.to_string(),
            text: format!("option {}", id),
            is_correct: correct,
        }
    }

    fn question(id: &str, option_count: usize) -> Question {
        Question {
            id: id.to_string(),
            prompt: format!("prompt {}", id),
            question_type: QuestionType::SingleChoice,
            points: 1,
            options: (0..option_count)
                .map(|i| option(&format!("{}-o{}", id, i), i == 0))
                .collect(),
            accepted_texts: vec![],
        }
    }

    fn definition(question_count: usize) -> QuizDefinition {
        QuizDefinition {
            id: "quiz-1".to_string(),
            title: "Quiz".to_string(),
            sections: vec![QuizSection {
                id: "s1".to_string(),
                title: "Section".to_string(),
                questions: (0..question_count)
                    .map(|i| question(&format!("q{}", i), 6))
                    .collect(),
                groups: vec![QuestionGroup {
                    id: "g1".to_string(),
                    title: "Group".to_string(),
                    questions: (0..question_count)
                        .map(|i| question(&format!("gq{}", i), 6))
                        .collect(),
                }],
            }],
        }
    }

    fn shuffling_policy() -> QuizPolicy {
        QuizPolicy {
            shuffle_questions: true,
            shuffle_answers: true,
            ..QuizPolicy::default()
        }
    }

    #[test]
    fn same_seed_rebuilds_identical_tree() {
        let def = definition(8);
        let policy = shuffling_policy();

        let first = build_snapshot(&def, &policy, 12345).unwrap();
        let second = build_snapshot(&def, &policy, 12345).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn different_seeds_permute_question_order() {
        let def = definition(10);
        let policy = shuffling_policy();

        let a = build_snapshot(&def, &policy, 1).unwrap();
        let b = build_snapshot(&def, &policy, 2).unwrap();
        assert_ne!(a.question_ids(), b.question_ids());
    }

    #[test]
    fn no_shuffle_preserves_catalog_order() {
        let def = definition(4);
        let policy = QuizPolicy::default();

        let snapshot = build_snapshot(&def, &policy, 999).unwrap();
        assert_eq!(
            snapshot.question_ids(),
            vec!["q0", "q1", "q2", "q3", "gq0", "gq1", "gq2", "gq3"]
        );

        let options: Vec<&str> = snapshot.sections[0].questions[0]
            .options
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(
            options,
            vec!["q0-o0", "q0-o1", "q0-o2", "q0-o3", "q0-o4", "q0-o5"]
        );
    }

    #[test]
    fn correctness_flags_never_cross_into_snapshot() {
        let def = definition(2);
        let snapshot = build_snapshot(&def, &shuffling_policy(), 7).unwrap();

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("is_correct"));
        assert!(!json.contains("accepted_texts"));
    }

    #[test]
    fn shuffle_only_permutes_never_drops() {
        let def = definition(6);
        let snapshot = build_snapshot(&def, &shuffling_policy(), 42).unwrap();

        let mut ids = snapshot.question_ids();
        ids.sort_unstable();
        let mut expected: Vec<&str> = def.questions().map(|q| q.id.as_str()).collect();
        expected.sort_unstable();
        assert_eq!(ids, expected);
    }

    #[test]
    fn empty_quiz_is_rejected() {
        let def = QuizDefinition {
            id: "empty".to_string(),
            title: "Empty".to_string(),
            sections: vec![],
        };
        let err = build_snapshot(&def, &QuizPolicy::default(), 1).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn fnv1a_is_stable() {
        // Pinned values; a change here would silently re-shuffle every
        // stored attempt's option order.
        assert_eq!(fnv1a(""), 0xcbf29ce484222325);
        assert_eq!(fnv1a("q1"), fnv1a("q1"));
        assert_ne!(fnv1a("q1"), fnv1a("q2"));
    }
}
