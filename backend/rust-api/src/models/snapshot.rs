use serde::{Deserialize, Serialize};

/// Client-visible rendering of a quiz for one attempt: shuffled according to
/// the attempt's stored seed, with all correctness information stripped.
/// Rebuilding with the same (quiz, seed) must yield an identical tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizSnapshot {
    pub quiz_id: String,
    pub title: String,
    pub sections: Vec<SnapshotSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotSection {
    pub id: String,
    pub title: String,
    pub questions: Vec<SnapshotQuestion>,
    pub groups: Vec<SnapshotGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotGroup {
    pub id: String,
    pub title: String,
    pub questions: Vec<SnapshotQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotQuestion {
    pub id: String,
    pub prompt: String,
    pub question_type: super::quiz::QuestionType,
    pub points: u32,
    pub options: Vec<SnapshotOption>,
}

/// Option without its correctness flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotOption {
    pub id: String,
    pub text: String,
}

impl QuizSnapshot {
    /// Question ids in the order the learner sees them.
    pub fn question_ids(&self) -> Vec<&str> {
        self.sections
            .iter()
            .flat_map(|section| {
                section
                    .questions
                    .iter()
                    .chain(section.groups.iter().flat_map(|g| g.questions.iter()))
            })
            .map(|q| q.id.as_str())
            .collect()
    }
}
