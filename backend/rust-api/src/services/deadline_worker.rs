use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Utc;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::AppError;
use crate::metrics::DEADLINE_WORKER_TICKS_TOTAL;
use crate::models::SubmitMode;
use crate::services::attempt_service::AttemptService;
use crate::store::AttemptStore;

/// Server-side deadline enforcement. Clients may auto-submit when their
/// display timer runs out, but that is an optimization: this sweep is the
/// authoritative path that closes every overdue attempt.
pub struct DeadlineWorker {
    service: AttemptService,
    store: Arc<dyn AttemptStore>,
    interval: Duration,
}

impl DeadlineWorker {
    pub fn new(service: AttemptService, store: Arc<dyn AttemptStore>, interval: Duration) -> Self {
        Self {
            service,
            store,
            interval,
        }
    }

    pub async fn run(&self) {
        info!(
            "Starting deadline enforcer loop (interval {}s)",
            self.interval.as_secs()
        );

        loop {
            match self.run_once().await {
                Ok(submitted) => {
                    DEADLINE_WORKER_TICKS_TOTAL
                        .with_label_values(&["success"])
                        .inc();
                    if submitted > 0 {
                        info!("Deadline sweep force-submitted {} attempts", submitted);
                    }
                }
                Err(err) => {
                    DEADLINE_WORKER_TICKS_TOTAL
                        .with_label_values(&["error"])
                        .inc();
                    warn!(error = %err, "Deadline sweep failed");
                }
            }

            sleep(self.interval).await;
        }
    }

    /// One sweep: force-submit every active attempt whose deadline passed.
    /// Returns how many attempts were closed.
    pub async fn run_once(&self) -> Result<usize> {
        let expired = self.store.list_expired_active(Utc::now()).await?;
        let mut submitted = 0usize;

        for attempt in expired {
            match self
                .service
                .submit(&attempt.id, &attempt.user_id, SubmitMode::Forced)
                .await
            {
                Ok(_) => submitted += 1,
                // A manual submit won the race; the attempt is closed either
                // way, which is all the sweep cares about.
                Err(AppError::Conflict(_)) | Err(AppError::InvalidState(_)) => {}
                Err(err) => {
                    warn!(
                        "Forced submit failed for attempt {}: {}",
                        attempt.id, err
                    );
                }
            }
        }

        Ok(submitted)
    }
}
