use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use super::AttemptStore;
use crate::error::{AppError, AppResult};
use crate::models::Attempt;

/// In-memory attempt store with the same versioning contract as the Mongo
/// implementation. Used by the test suite and local development fixtures.
#[derive(Default)]
pub struct InMemoryAttemptStore {
    attempts: RwLock<HashMap<String, Attempt>>,
}

impl InMemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn create_attempt(&self, attempt: &Attempt) -> AppResult<()> {
        let mut attempts = self.attempts.write().expect("store lock poisoned");

        let duplicate = attempts.values().any(|a| {
            a.quiz_id == attempt.quiz_id
                && a.user_id == attempt.user_id
                && a.attempt_number == attempt.attempt_number
        });
        if duplicate {
            return Err(AppError::Conflict(format!(
                "Attempt {} for quiz {} user {} already exists",
                attempt.attempt_number, attempt.quiz_id, attempt.user_id
            )));
        }

        attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(())
    }

    async fn attempt_by_id(&self, attempt_id: &str) -> AppResult<Attempt> {
        self.attempts
            .read()
            .expect("store lock poisoned")
            .get(attempt_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", attempt_id)))
    }

    async fn latest_attempt(&self, quiz_id: &str, user_id: &str) -> AppResult<Option<Attempt>> {
        Ok(self
            .attempts
            .read()
            .expect("store lock poisoned")
            .values()
            .filter(|a| a.quiz_id == quiz_id && a.user_id == user_id)
            .max_by_key(|a| a.attempt_number)
            .cloned())
    }

    async fn update_attempt(&self, attempt: &Attempt) -> AppResult<Attempt> {
        let mut attempts = self.attempts.write().expect("store lock poisoned");

        let stored = attempts
            .get(&attempt.id)
            .ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", attempt.id)))?;

        if stored.version != attempt.version {
            return Err(AppError::Conflict(format!(
                "Attempt {} was modified concurrently (version {})",
                attempt.id, attempt.version
            )));
        }

        let mut updated = attempt.clone();
        updated.version = attempt.version + 1;
        attempts.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    async fn list_expired_active(&self, now: DateTime<Utc>) -> AppResult<Vec<Attempt>> {
        Ok(self
            .attempts
            .read()
            .expect("store lock poisoned")
            .values()
            .filter(|a| {
                a.status.is_active()
                    && matches!(a.deadline_at, Some(deadline) if now >= deadline)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttemptStatus;
    use chrono::Duration;

    fn attempt(number: u32) -> Attempt {
        Attempt::new("quiz-1", "user-1", number, 42, Utc::now(), None)
    }

    #[tokio::test]
    async fn create_rejects_duplicate_attempt_number() {
        let store = InMemoryAttemptStore::new();
        store.create_attempt(&attempt(1)).await.unwrap();

        let err = store.create_attempt(&attempt(1)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        store.create_attempt(&attempt(2)).await.unwrap();
    }

    #[tokio::test]
    async fn latest_attempt_returns_highest_number() {
        let store = InMemoryAttemptStore::new();
        let first = attempt(1);
        let second = attempt(2);
        store.create_attempt(&first).await.unwrap();
        store.create_attempt(&second).await.unwrap();

        let latest = store
            .latest_attempt("quiz-1", "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, second.id);

        assert!(store
            .latest_attempt("quiz-1", "someone-else")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_enforces_version_check() {
        let store = InMemoryAttemptStore::new();
        let a = attempt(1);
        store.create_attempt(&a).await.unwrap();

        let updated = store.update_attempt(&a).await.unwrap();
        assert_eq!(updated.version, 1);

        // The stale copy loses.
        let err = store.update_attempt(&a).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The fresh copy wins again.
        let updated = store.update_attempt(&updated).await.unwrap();
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    async fn expired_sweep_only_sees_active_overdue_attempts() {
        let store = InMemoryAttemptStore::new();
        let now = Utc::now();

        let mut overdue = attempt(1);
        overdue.deadline_at = Some(now - Duration::seconds(5));
        store.create_attempt(&overdue).await.unwrap();

        let mut not_due = Attempt::new("quiz-2", "user-1", 1, 7, now, None);
        not_due.deadline_at = Some(now + Duration::seconds(300));
        store.create_attempt(&not_due).await.unwrap();

        let mut terminal = Attempt::new("quiz-3", "user-1", 1, 7, now, None);
        terminal.deadline_at = Some(now - Duration::seconds(5));
        terminal.status = AttemptStatus::Graded;
        store.create_attempt(&terminal).await.unwrap();

        let expired = store.list_expired_active(now).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, overdue.id);
    }
}
