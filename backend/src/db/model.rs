use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::{AnnotationLabel, DetectedObject};

use crate::diagnosis::classifier::Diagnosis;

pub const CLOUD_VISION_SOURCE: &str = "cloud_vision";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSnapshot {
    pub description: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub name: String,
    pub score: f64,
}

/// One classification outcome, as handed to a `PredictionStore`. The store assigns
/// the id and the server timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub user_id: String,
    pub diagnosis: String,
    pub confidence: f64,
    pub labels: Vec<LabelSnapshot>,
    pub objects: Vec<ObjectSnapshot>,
    pub image_hash: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPrediction {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub record: PredictionRecord,
}

pub fn calculate_image_hash(image_data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_data);
    hex::encode(hasher.finalize())
}

impl PredictionRecord {
    pub fn new(
        user_id: &str,
        diagnosis: &Diagnosis,
        labels: &[AnnotationLabel],
        objects: &[DetectedObject],
        image_data: &[u8],
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            diagnosis: diagnosis.label.clone(),
            confidence: diagnosis.confidence,
            labels: labels
                .iter()
                .map(|l| LabelSnapshot {
                    description: l.description.clone(),
                    score: l.score,
                })
                .collect(),
            objects: objects
                .iter()
                .map(|o| ObjectSnapshot {
                    name: o.name.clone(),
                    score: o.score,
                })
                .collect(),
            image_hash: calculate_image_hash(image_data),
            source: CLOUD_VISION_SOURCE.to_string(),
        }
    }
}
