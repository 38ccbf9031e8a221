use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use super::model::PredictionRecord;
use super::{PredictionStore, RepositoryError};

#[derive(Clone)]
pub struct DynamoDbPredictionStore {
    client: Client,
    predictions_table: String,
}

impl DynamoDbPredictionStore {
    pub fn new(client: Client, predictions_table: String) -> Self {
        Self {
            client,
            predictions_table,
        }
    }
}

fn prediction_to_item(
    id: &str,
    record: &PredictionRecord,
    created_at: DateTime<Utc>,
) -> Result<HashMap<String, AttributeValue>, RepositoryError> {
    let mut item = HashMap::new();
    item.insert("id".to_string(), AttributeValue::S(id.to_string()));
    item.insert(
        "user_id".to_string(),
        AttributeValue::S(record.user_id.clone()),
    );
    item.insert(
        "diagnosis".to_string(),
        AttributeValue::S(record.diagnosis.clone()),
    );
    item.insert(
        "confidence".to_string(),
        AttributeValue::N(record.confidence.to_string()),
    );
    item.insert(
        "labels".to_string(),
        AttributeValue::S(serde_json::to_string(&record.labels)?),
    );
    item.insert(
        "objects".to_string(),
        AttributeValue::S(serde_json::to_string(&record.objects)?),
    );
    item.insert(
        "image_hash".to_string(),
        AttributeValue::S(record.image_hash.clone()),
    );
    item.insert(
        "timestamp".to_string(),
        AttributeValue::S(created_at.to_rfc3339()),
    );
    item.insert("source".to_string(), AttributeValue::S(record.source.clone()));
    Ok(item)
}

#[async_trait]
impl PredictionStore for DynamoDbPredictionStore {
    async fn save(&self, record: &PredictionRecord) -> Result<String, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        let item = prediction_to_item(&id, record, Utc::now())?;

        match self
            .client
            .put_item()
            .table_name(&self.predictions_table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await
        {
            Ok(_) => {
                log::info!("Prediction saved with ID: {}", id);
                Ok(id)
            }
            Err(e) => {
                log::error!(
                    "DynamoDB put_item failed for prediction of user {}: {:?}",
                    record.user_id,
                    e
                );
                Err(RepositoryError::DynamoDb(e.to_string()))
            }
        }
    }
}
