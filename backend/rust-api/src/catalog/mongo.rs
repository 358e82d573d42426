use anyhow::Context;
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};

use super::ContentCatalog;
use crate::error::{AppError, AppResult};
use crate::metrics::track_db_operation;
use crate::models::{QuizDefinition, QuizPolicy, QuizSection};

/// Quiz document as stored by the catalog service: the definition tree with
/// the attempt policy embedded as a subdocument.
#[derive(Debug, Serialize, Deserialize)]
struct QuizDocument {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    #[serde(default)]
    sections: Vec<QuizSection>,
    #[serde(default)]
    policy: QuizPolicy,
}

pub struct MongoContentCatalog {
    quizzes: Collection<QuizDocument>,
}

impl MongoContentCatalog {
    pub fn new(mongo: Database) -> Self {
        Self {
            quizzes: mongo.collection("quizzes"),
        }
    }

    async fn fetch(&self, quiz_id: &str) -> AppResult<QuizDocument> {
        let doc = track_db_operation("find_one", "quizzes", async {
            self.quizzes
                .find_one(doc! { "_id": quiz_id })
                .await
                .context("Failed to query quizzes collection")
        })
        .await
        .map_err(AppError::Internal)?;

        doc.ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", quiz_id)))
    }
}

#[async_trait]
impl ContentCatalog for MongoContentCatalog {
    async fn quiz_definition(&self, quiz_id: &str) -> AppResult<QuizDefinition> {
        let doc = self.fetch(quiz_id).await?;
        Ok(QuizDefinition {
            id: doc.id,
            title: doc.title,
            sections: doc.sections,
        })
    }

    async fn quiz_policy(&self, quiz_id: &str) -> AppResult<QuizPolicy> {
        Ok(self.fetch(quiz_id).await?.policy)
    }
}
