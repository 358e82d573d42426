use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Closed set of question types the scoring engine knows how to grade.
/// Free-text/essay questions are graded by a separate pipeline and never
/// reach this service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    TrueFalse,
    MultipleAnswer,
    FillBlank,
    Ordering,
    Matching,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::MultipleAnswer => "multiple_answer",
            QuestionType::FillBlank => "fill_blank",
            QuestionType::Ordering => "ordering",
            QuestionType::Matching => "matching",
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().replace('-', "_").as_str() {
            "single_choice" => Ok(QuestionType::SingleChoice),
            "true_false" => Ok(QuestionType::TrueFalse),
            "multiple_answer" => Ok(QuestionType::MultipleAnswer),
            "fill_blank" => Ok(QuestionType::FillBlank),
            "ordering" => Ok(QuestionType::Ordering),
            "matching" => Ok(QuestionType::Matching),
            _ => Err(format!("Invalid question type: {}", value)),
        }
    }
}

/// Answer option as stored in the content catalog. The `is_correct` flag is
/// stripped by the snapshot builder before anything crosses to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub question_type: QuestionType,
    pub points: u32,
    /// Catalog order of options is the canonical order for ordering and
    /// matching questions.
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    /// Accepted strings for fill-blank questions, compared case-insensitively
    /// after trimming.
    #[serde(default)]
    pub accepted_texts: Vec<String>,
}

impl Question {
    /// Ids of the options flagged correct, in catalog order.
    pub fn correct_option_ids(&self) -> Vec<&str> {
        self.options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| o.id.as_str())
            .collect()
    }

    /// Canonical option id sequence for ordering/matching questions.
    pub fn canonical_order(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.id.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionGroup {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSection {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Questions owned directly by the section, ahead of any groups.
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub groups: Vec<QuestionGroup>,
}

/// Read-only quiz tree as served by the content catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub sections: Vec<QuizSection>,
}

impl QuizDefinition {
    /// Walks the tree in catalog order: per section, direct questions first,
    /// then each group's questions.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections.iter().flat_map(|section| {
            section
                .questions
                .iter()
                .chain(section.groups.iter().flat_map(|g| g.questions.iter()))
        })
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions().find(|q| q.id == question_id)
    }

    pub fn question_count(&self) -> usize {
        self.questions().count()
    }

    pub fn max_points(&self) -> f64 {
        self.questions().map(|q| q.points as f64).sum()
    }
}

/// How a multiple-answer question is credited. Fixed per quiz in the policy,
/// never inferred from the submission.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MultiAnswerPolicy {
    /// Full points only when the selected set equals the correct set.
    #[default]
    Strict,
    /// Proportional credit for correct selections minus a penalty for wrong
    /// ones, floored at zero.
    Partial,
}

/// Per-quiz attempt policy served by the content catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizPolicy {
    /// Absent duration means the attempt has no deadline.
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    /// Pass mark as a percentage in [0, 100].
    #[serde(default = "default_passing_threshold")]
    pub passing_threshold: f64,
    #[serde(default)]
    pub shuffle_questions: bool,
    #[serde(default)]
    pub shuffle_answers: bool,
    /// Absent cap means unlimited retries.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub multi_answer_policy: MultiAnswerPolicy,
}

fn default_passing_threshold() -> f64 {
    60.0
}

impl Default for QuizPolicy {
    fn default() -> Self {
        Self {
            duration_seconds: None,
            passing_threshold: default_passing_threshold(),
            shuffle_questions: false,
            shuffle_answers: false,
            max_attempts: None,
            multi_answer_policy: MultiAnswerPolicy::Strict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, points: u32) -> Question {
        Question {
            id: id.to_string(),
            prompt: format!("prompt {}", id),
            question_type: QuestionType::SingleChoice,
            points,
            options: vec![],
            accepted_texts: vec![],
        }
    }

    #[test]
    fn questions_walk_sections_then_groups_in_order() {
        let quiz = QuizDefinition {
            id: "quiz-1".to_string(),
            title: "Quiz".to_string(),
            sections: vec![
                QuizSection {
                    id: "s1".to_string(),
                    title: String::new(),
                    questions: vec![question("q1", 1)],
                    groups: vec![QuestionGroup {
                        id: "g1".to_string(),
                        title: String::new(),
                        questions: vec![question("q2", 2)],
                    }],
                },
                QuizSection {
                    id: "s2".to_string(),
                    title: String::new(),
                    questions: vec![question("q3", 3)],
                    groups: vec![],
                },
            ],
        };

        let ids: Vec<&str> = quiz.questions().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q3"]);
        assert_eq!(quiz.question_count(), 3);
        assert_eq!(quiz.max_points(), 6.0);
        assert_eq!(quiz.question("q2").unwrap().points, 2);
        assert!(quiz.question("missing").is_none());
    }

    #[test]
    fn question_type_parses_kebab_and_snake_case() {
        assert_eq!(
            "single-choice".parse::<QuestionType>().unwrap(),
            QuestionType::SingleChoice
        );
        assert_eq!(
            "multiple_answer".parse::<QuestionType>().unwrap(),
            QuestionType::MultipleAnswer
        );
        assert!("essay".parse::<QuestionType>().is_err());
    }

    #[test]
    fn policy_defaults_to_strict_scoring_and_no_deadline() {
        let policy = QuizPolicy::default();
        assert!(policy.duration_seconds.is_none());
        assert!(policy.max_attempts.is_none());
        assert_eq!(policy.multi_answer_policy, MultiAnswerPolicy::Strict);
        assert_eq!(policy.passing_threshold, 60.0);
    }
}
