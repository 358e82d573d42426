use chrono::{DateTime, Duration, Utc};

use crate::models::{Attempt, QuizPolicy};

/// `started_at + duration`. A quiz without a duration has no deadline.
pub fn deadline_for(started_at: DateTime<Utc>, policy: &QuizPolicy) -> Option<DateTime<Utc>> {
    policy
        .duration_seconds
        .map(|secs| started_at + Duration::seconds(secs))
}

/// The server-side cutoff predicate. `now` is always the server clock;
/// anything the client reports about remaining time is display-only.
pub fn is_expired(attempt: &Attempt, now: DateTime<Utc>) -> bool {
    match attempt.deadline_at {
        Some(deadline) => now > deadline,
        None => false,
    }
}

/// Advisory remaining time for display. Never gates correctness.
pub fn remaining_seconds(attempt: &Attempt, now: DateTime<Utc>) -> Option<i64> {
    attempt
        .deadline_at
        .map(|deadline| (deadline - now).num_seconds().max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuizPolicy;

    fn attempt_with_deadline(offset_seconds: Option<i64>) -> Attempt {
        let started = Utc::now();
        Attempt::new(
            "quiz-1",
            "user-1",
            1,
            42,
            started,
            offset_seconds.map(|s| started + Duration::seconds(s)),
        )
    }

    #[test]
    fn no_duration_means_no_deadline() {
        let policy = QuizPolicy::default();
        assert!(deadline_for(Utc::now(), &policy).is_none());

        let attempt = attempt_with_deadline(None);
        assert!(!is_expired(&attempt, Utc::now() + Duration::days(365)));
        assert!(remaining_seconds(&attempt, Utc::now()).is_none());
    }

    #[test]
    fn deadline_is_started_at_plus_duration() {
        let policy = QuizPolicy {
            duration_seconds: Some(600),
            ..QuizPolicy::default()
        };
        let started = Utc::now();
        assert_eq!(
            deadline_for(started, &policy),
            Some(started + Duration::seconds(600))
        );
    }

    #[test]
    fn expired_strictly_after_deadline() {
        let attempt = attempt_with_deadline(Some(60));
        let deadline = attempt.deadline_at.unwrap();

        assert!(!is_expired(&attempt, deadline));
        assert!(is_expired(&attempt, deadline + Duration::seconds(1)));
    }

    #[test]
    fn remaining_seconds_floors_at_zero() {
        let attempt = attempt_with_deadline(Some(60));
        let deadline = attempt.deadline_at.unwrap();

        assert_eq!(
            remaining_seconds(&attempt, deadline - Duration::seconds(10)),
            Some(10)
        );
        assert_eq!(
            remaining_seconds(&attempt, deadline + Duration::seconds(30)),
            Some(0)
        );
    }
}
