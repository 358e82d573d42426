use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::ContentCatalog;
use crate::error::{AppError, AppResult};
use crate::models::{QuizDefinition, QuizPolicy};

/// In-memory catalog used by the test suite and local development fixtures.
#[derive(Default)]
pub struct InMemoryCatalog {
    quizzes: RwLock<HashMap<String, (QuizDefinition, QuizPolicy)>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, definition: QuizDefinition, policy: QuizPolicy) {
        self.quizzes
            .write()
            .expect("catalog lock poisoned")
            .insert(definition.id.clone(), (definition, policy));
    }
}

#[async_trait]
impl ContentCatalog for InMemoryCatalog {
    async fn quiz_definition(&self, quiz_id: &str) -> AppResult<QuizDefinition> {
        self.quizzes
            .read()
            .expect("catalog lock poisoned")
            .get(quiz_id)
            .map(|(definition, _)| definition.clone())
            .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", quiz_id)))
    }

    async fn quiz_policy(&self, quiz_id: &str) -> AppResult<QuizPolicy> {
        self.quizzes
            .read()
            .expect("catalog lock poisoned")
            .get(quiz_id)
            .map(|(_, policy)| policy.clone())
            .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", quiz_id)))
    }
}
