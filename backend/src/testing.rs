//! Fake collaborators shared by the unit tests.

use async_trait::async_trait;
use serde_json::json;
use shared::{AnnotateImageResponse, Feature};
use std::sync::Mutex;

use crate::auth::models::CallerIdentity;
use crate::db::model::PredictionRecord;
use crate::db::{PredictionStore, RepositoryError};
use crate::vision::{VisionAnnotator, VisionError};

pub fn caller() -> CallerIdentity {
    CallerIdentity {
        uid: "grower-1".into(),
        email: Some("grower@example.com".into()),
    }
}

/// `{"image": {"content": base64("hello")}}`
pub fn image_body() -> Vec<u8> {
    serde_json::to_vec(&json!({"image": {"content": "aGVsbG8="}})).unwrap()
}

pub struct FakeAnnotator {
    outcome: Result<AnnotateImageResponse, String>,
    calls: Mutex<Vec<(String, Vec<Feature>)>>,
}

impl FakeAnnotator {
    pub fn returning(response: AnnotateImageResponse) -> Self {
        Self {
            outcome: Ok(response),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<Feature>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl VisionAnnotator for FakeAnnotator {
    async fn annotate(
        &self,
        content: &str,
        features: &[Feature],
    ) -> Result<AnnotateImageResponse, VisionError> {
        self.calls
            .lock()
            .unwrap()
            .push((content.to_string(), features.to_vec()));
        match &self.outcome {
            Ok(response) => Ok(response.clone()),
            Err(message) => Err(VisionError::Upstream {
                code: 8,
                message: message.clone(),
            }),
        }
    }
}

pub struct FailingStore;

#[async_trait]
impl PredictionStore for FailingStore {
    async fn save(&self, _record: &PredictionRecord) -> Result<String, RepositoryError> {
        Err(RepositoryError::DynamoDb("table unavailable".into()))
    }
}
