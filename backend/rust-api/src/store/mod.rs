use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::models::Attempt;

pub mod memory;
pub mod mongo;

pub use memory::InMemoryAttemptStore;
pub use mongo::MongoAttemptStore;

/// Persistence seam for attempt records.
///
/// `update_attempt` carries the optimistic concurrency contract: the write
/// only lands when the stored version still equals `attempt.version`, and the
/// stored version is bumped atomically. A failed check surfaces as
/// `AppError::Conflict`, which is what serializes racing submits down to a
/// single writer.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Persists a new attempt. A uniqueness violation on
    /// (quiz, user, attempt_number) surfaces as `Conflict` so a racing start
    /// can fall back to the attempt the other caller created.
    async fn create_attempt(&self, attempt: &Attempt) -> AppResult<()>;

    async fn attempt_by_id(&self, attempt_id: &str) -> AppResult<Attempt>;

    /// Highest-numbered attempt for (quiz, user), if any.
    async fn latest_attempt(&self, quiz_id: &str, user_id: &str) -> AppResult<Option<Attempt>>;

    /// Version-checked update; returns the attempt with its bumped version.
    async fn update_attempt(&self, attempt: &Attempt) -> AppResult<Attempt>;

    /// Active attempts whose deadline has passed, for the enforcer sweep.
    async fn list_expired_active(&self, now: DateTime<Utc>) -> AppResult<Vec<Attempt>>;
}
