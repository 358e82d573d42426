use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{QuizDefinition, QuizPolicy};

pub mod memory;
pub mod mongo;

pub use memory::InMemoryCatalog;
pub use mongo::MongoContentCatalog;

/// Read-only view onto the content catalog. The attempt engine never writes
/// quiz content; it consumes definitions (with correctness flags) and the
/// per-quiz attempt policy through this seam.
#[async_trait]
pub trait ContentCatalog: Send + Sync {
    async fn quiz_definition(&self, quiz_id: &str) -> AppResult<QuizDefinition>;

    async fn quiz_policy(&self, quiz_id: &str) -> AppResult<QuizPolicy>;
}
