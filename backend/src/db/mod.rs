pub mod dynamodb_repository;
pub mod memory_repository;
pub mod model;

use async_trait::async_trait;

use model::PredictionRecord;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable home for prediction records. Records are append-only.
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Writes one new record and returns its generated id.
    async fn save(&self, record: &PredictionRecord) -> Result<String, RepositoryError>;
}
