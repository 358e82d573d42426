use std::sync::Arc;

use mongodb::{Client as MongoClient, Database};

use crate::catalog::{ContentCatalog, MongoContentCatalog};
use crate::config::Config;
use crate::store::{AttemptStore, MongoAttemptStore};

pub mod attempt_service;
pub mod deadline;
pub mod deadline_worker;
pub mod scoring_service;
pub mod snapshot_service;

pub use attempt_service::AttemptService;
pub use deadline_worker::DeadlineWorker;

pub struct AppState {
    pub config: Config,
    /// Present when running against MongoDB; `None` under in-memory
    /// collaborators (tests, local fixtures), where there is nothing to ping.
    pub mongo: Option<Database>,
    pub catalog: Arc<dyn ContentCatalog>,
    pub attempts: Arc<dyn AttemptStore>,
}

impl AppState {
    pub async fn new(config: Config, mongo_client: MongoClient) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        tracing::info!("Verifying MongoDB connection...");
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            mongo.run_command(mongodb::bson::doc! { "ping": 1 }),
        )
        .await
        .map_err(|_| anyhow::anyhow!("MongoDB ping timeout after 5s"))??;
        tracing::info!("MongoDB connection established successfully");

        Ok(Self {
            config,
            mongo: Some(mongo.clone()),
            catalog: Arc::new(MongoContentCatalog::new(mongo.clone())),
            attempts: Arc::new(MongoAttemptStore::new(mongo)),
        })
    }

    /// Wires the state over explicit collaborators. Used by the test suite
    /// and anywhere the engine should run without real infrastructure.
    pub fn with_collaborators(
        config: Config,
        catalog: Arc<dyn ContentCatalog>,
        attempts: Arc<dyn AttemptStore>,
    ) -> Self {
        Self {
            config,
            mongo: None,
            catalog,
            attempts,
        }
    }

    pub fn attempt_service(&self) -> AttemptService {
        AttemptService::new(self.catalog.clone(), self.attempts.clone())
    }
}
