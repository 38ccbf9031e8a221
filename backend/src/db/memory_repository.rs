use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::{PredictionRecord, StoredPrediction};
use super::{PredictionStore, RepositoryError};

/// Process-local store used when no DynamoDB table is configured.
#[derive(Default)]
pub struct InMemoryPredictionStore {
    records: RwLock<Vec<StoredPrediction>>,
}

impl InMemoryPredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn records(&self) -> Vec<StoredPrediction> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl PredictionStore for InMemoryPredictionStore {
    async fn save(&self, record: &PredictionRecord) -> Result<String, RepositoryError> {
        let stored = StoredPrediction {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            record: record.clone(),
        };
        let id = stored.id.clone();
        self.records.write().await.push(stored);
        log::info!("Prediction saved with ID: {} (in memory)", id);
        Ok(id)
    }
}
