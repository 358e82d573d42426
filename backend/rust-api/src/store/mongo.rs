use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOneOptions;
use mongodb::{Collection, Database};

use super::AttemptStore;
use crate::error::{AppError, AppResult};
use crate::metrics::track_db_operation;
use crate::models::{Attempt, AttemptStatus};

const COLLECTION: &str = "attempts";

/// Mongo-backed attempt store. Relies on a unique index over
/// (quiz_id, user_id, attempt_number) so concurrent starts cannot mint two
/// attempts with the same number.
pub struct MongoAttemptStore {
    attempts: Collection<Attempt>,
}

impl MongoAttemptStore {
    pub fn new(mongo: Database) -> Self {
        Self {
            attempts: mongo.collection(COLLECTION),
        }
    }

    fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
        if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we)) =
            *err.kind
        {
            return we.code == 11000;
        }
        false
    }
}

#[async_trait]
impl AttemptStore for MongoAttemptStore {
    async fn create_attempt(&self, attempt: &Attempt) -> AppResult<()> {
        let result = track_db_operation("insert_one", COLLECTION, async {
            self.attempts.insert_one(attempt).await
        })
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(ref e) if Self::is_duplicate_key(e) => Err(AppError::Conflict(format!(
                "Attempt {} for quiz {} user {} already exists",
                attempt.attempt_number, attempt.quiz_id, attempt.user_id
            ))),
            Err(e) => Err(AppError::Internal(
                anyhow::Error::new(e).context("Failed to insert attempt"),
            )),
        }
    }

    async fn attempt_by_id(&self, attempt_id: &str) -> AppResult<Attempt> {
        let found = track_db_operation("find_one", COLLECTION, async {
            self.attempts
                .find_one(doc! { "_id": attempt_id })
                .await
                .context("Failed to query attempt by id")
        })
        .await
        .map_err(AppError::Internal)?;

        found.ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", attempt_id)))
    }

    async fn latest_attempt(&self, quiz_id: &str, user_id: &str) -> AppResult<Option<Attempt>> {
        let options = FindOneOptions::builder()
            .sort(doc! { "attempt_number": -1 })
            .build();

        track_db_operation("find_one", COLLECTION, async {
            self.attempts
                .find_one(doc! { "quiz_id": quiz_id, "user_id": user_id })
                .with_options(options)
                .await
                .context("Failed to query latest attempt")
        })
        .await
        .map_err(AppError::Internal)
    }

    async fn update_attempt(&self, attempt: &Attempt) -> AppResult<Attempt> {
        let mut updated = attempt.clone();
        updated.version = attempt.version + 1;

        let result = track_db_operation("replace_one", COLLECTION, async {
            self.attempts
                .replace_one(
                    doc! { "_id": &attempt.id, "version": attempt.version },
                    &updated,
                )
                .await
                .context("Failed to update attempt")
        })
        .await
        .map_err(AppError::Internal)?;

        if result.matched_count == 0 {
            // Distinguish a lost version race from a missing record.
            return match self.attempt_by_id(&attempt.id).await {
                Ok(_) => Err(AppError::Conflict(format!(
                    "Attempt {} was modified concurrently (version {})",
                    attempt.id, attempt.version
                ))),
                Err(e) => Err(e),
            };
        }

        Ok(updated)
    }

    async fn list_expired_active(&self, now: DateTime<Utc>) -> AppResult<Vec<Attempt>> {
        // Coarse filter in Mongo (active attempts that carry a deadline at
        // all); the timestamp comparison happens here to stay independent of
        // how the driver encodes datetimes.
        let filter = doc! {
            "status": { "$in": [
                AttemptStatus::Started.as_str(),
                AttemptStatus::InProgress.as_str(),
            ] },
            "deadline_at": { "$ne": null },
        };

        let candidates: Vec<Attempt> = track_db_operation("find", COLLECTION, async {
            let cursor = self
                .attempts
                .find(filter)
                .await
                .context("Failed to query active attempts")?;
            cursor
                .try_collect()
                .await
                .context("Failed to read active attempts cursor")
        })
        .await
        .map_err(AppError::Internal)?;

        Ok(candidates
            .into_iter()
            .filter(|a| matches!(a.deadline_at, Some(deadline) if now >= deadline))
            .collect())
    }
}
