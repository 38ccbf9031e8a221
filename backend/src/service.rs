use shared::{
    AnnotateImageRequest, AnnotateImageResponse, ApiResponse, DetectPlantDiseaseRequest, Feature,
    FeatureType, PlantDiseaseResult,
};
use std::sync::Arc;

use crate::auth::models::CallerIdentity;
use crate::db::model::PredictionRecord;
use crate::db::PredictionStore;
use crate::diagnosis::classifier::{classify, plant_related};
use crate::diagnosis::response::{plant_disease_result, success};
use crate::error::ApiError;
use crate::validation::{parse_body, require_identity, validate_features, validate_image};
use crate::vision::VisionAnnotator;

pub const ANNOTATE_FAILURE: &str = "Failed to process image with Cloud Vision API";
pub const DETECT_FAILURE: &str = "Failed to detect plant disease";

pub fn plant_disease_features() -> Vec<Feature> {
    vec![
        Feature::new(FeatureType::LabelDetection, Some(10)),
        Feature::new(FeatureType::ImageProperties, None),
        Feature::new(FeatureType::ObjectLocalization, Some(5)),
    ]
}

/// Both entry points, wired to the collaborators chosen at startup.
#[derive(Clone)]
pub struct PlantVisionService {
    annotator: Arc<dyn VisionAnnotator>,
    store: Arc<dyn PredictionStore>,
}

impl PlantVisionService {
    pub fn new(annotator: Arc<dyn VisionAnnotator>, store: Arc<dyn PredictionStore>) -> Self {
        Self { annotator, store }
    }

    /// Forwards an image and caller-chosen features, returning the raw annotation.
    pub async fn annotate_image(
        &self,
        identity: Option<&CallerIdentity>,
        body: &[u8],
    ) -> Result<ApiResponse<AnnotateImageResponse>, ApiError> {
        let caller = require_identity(identity)?;
        let request: AnnotateImageRequest = parse_body(body)?;
        let image = validate_image(request.image.as_ref())?;
        let features = validate_features(request.features)?;

        log::info!(
            "annotateImage for user {} with {} feature(s)",
            caller.uid,
            features.len()
        );

        let annotation = self
            .annotator
            .annotate(&image.content, &features)
            .await
            .map_err(|e| {
                log::error!("Vision API error: {}", e);
                ApiError::internal(ANNOTATE_FAILURE, e)
            })?;

        Ok(success(annotation))
    }

    /// Annotates with a fixed feature set, diagnoses the labels and records the result.
    pub async fn detect_plant_disease(
        &self,
        identity: Option<&CallerIdentity>,
        body: &[u8],
    ) -> Result<ApiResponse<PlantDiseaseResult>, ApiError> {
        let caller = require_identity(identity)?;
        let request: DetectPlantDiseaseRequest = parse_body(body)?;
        let image = validate_image(request.image.as_ref())?;

        let annotation = self
            .annotator
            .annotate(&image.content, &plant_disease_features())
            .await
            .map_err(|e| {
                log::error!("Plant disease detection error: {}", e);
                ApiError::internal(DETECT_FAILURE, e)
            })?;

        let labels = &annotation.label_annotations;
        let diagnosis = classify(labels);
        log::debug!(
            "{} of {} labels look plant related",
            plant_related(labels).len(),
            labels.len()
        );

        let record = PredictionRecord::new(
            &caller.uid,
            &diagnosis,
            labels,
            &annotation.localized_object_annotations,
            &image.bytes,
        );
        let prediction_id = self.store.save(&record).await.map_err(|e| {
            log::error!("Plant disease detection error: {}", e);
            ApiError::internal(DETECT_FAILURE, e)
        })?;

        log::info!(
            "Diagnosed '{}' ({:.2}, diseased: {}) for user {}, prediction {}",
            diagnosis.label,
            diagnosis.confidence,
            diagnosis.is_diseased,
            caller.uid,
            prediction_id
        );

        Ok(success(plant_disease_result(
            diagnosis,
            prediction_id,
            annotation,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_repository::InMemoryPredictionStore;
    use crate::testing::{caller, image_body, FailingStore, FakeAnnotator};
    use serde_json::json;
    use shared::{AnnotationLabel, DetectedObject};

    fn leaf_annotation() -> AnnotateImageResponse {
        AnnotateImageResponse {
            label_annotations: vec![
                AnnotationLabel::new("Plant", 0.97),
                AnnotationLabel::new("Leaf", 0.95),
                AnnotationLabel::new("Leaf spot", 0.71),
                AnnotationLabel::new("Botany", 0.7),
                AnnotationLabel::new("Green", 0.69),
                AnnotationLabel::new("Fungus", 0.55),
            ],
            localized_object_annotations: vec![DetectedObject::new("Leaf", 0.88)],
            image_properties_annotation: Some(json!({"dominantColors": {"colors": []}})),
            ..Default::default()
        }
    }

    #[actix_web::test]
    async fn annotate_requires_identity_before_anything_else() {
        let annotator = Arc::new(FakeAnnotator::returning(AnnotateImageResponse::default()));
        let service = PlantVisionService::new(annotator.clone(), Arc::new(InMemoryPredictionStore::new()));

        let err = service.annotate_image(None, b"not even json").await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthenticated));
        assert_eq!(annotator.call_count(), 0);
    }

    #[actix_web::test]
    async fn annotate_uses_default_features() {
        let annotator = Arc::new(FakeAnnotator::returning(leaf_annotation()));
        let service = PlantVisionService::new(annotator.clone(), Arc::new(InMemoryPredictionStore::new()));

        let response = service
            .annotate_image(Some(&caller()), &image_body())
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.data, leaf_annotation());
        let calls = annotator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "aGVsbG8=");
        assert_eq!(
            calls[0].1,
            vec![Feature::new(FeatureType::LabelDetection, Some(10))]
        );
    }

    #[actix_web::test]
    async fn annotate_forwards_caller_features() {
        let annotator = Arc::new(FakeAnnotator::returning(AnnotateImageResponse::default()));
        let service = PlantVisionService::new(annotator.clone(), Arc::new(InMemoryPredictionStore::new()));
        let body = serde_json::to_vec(&json!({
            "image": {"content": "aGVsbG8="},
            "features": [{"type": "TEXT_DETECTION"}, {"type": "CROP_HINTS", "maxResults": 2}]
        }))
        .unwrap();

        service.annotate_image(Some(&caller()), &body).await.unwrap();

        assert_eq!(
            annotator.calls()[0].1,
            vec![
                Feature::new(FeatureType::TextDetection, None),
                Feature::new(FeatureType::CropHints, Some(2)),
            ]
        );
    }

    #[actix_web::test]
    async fn annotate_forwards_unmodelled_feature_keys() {
        let annotator = Arc::new(FakeAnnotator::returning(AnnotateImageResponse::default()));
        let service = PlantVisionService::new(annotator.clone(), Arc::new(InMemoryPredictionStore::new()));
        let body = serde_json::to_vec(&json!({
            "image": {"content": "aGVsbG8="},
            "features": [{"type": "LABEL_DETECTION", "maxResults": 4, "model": "builtin/latest"}]
        }))
        .unwrap();

        service.annotate_image(Some(&caller()), &body).await.unwrap();

        let forwarded = serde_json::to_value(&annotator.calls()[0].1).unwrap();
        assert_eq!(
            forwarded,
            json!([{"type": "LABEL_DETECTION", "maxResults": 4, "model": "builtin/latest"}])
        );
    }

    #[actix_web::test]
    async fn annotate_rejects_negative_max_results_before_calling_out() {
        let annotator = Arc::new(FakeAnnotator::returning(AnnotateImageResponse::default()));
        let service = PlantVisionService::new(annotator.clone(), Arc::new(InMemoryPredictionStore::new()));
        let body = serde_json::to_vec(&json!({
            "image": {"content": "aGVsbG8="},
            "features": [{"type": "CROP_HINTS", "maxResults": -2}]
        }))
        .unwrap();

        match service.annotate_image(Some(&caller()), &body).await {
            Err(ApiError::InvalidArgument(message)) => assert!(message.contains("`features`")),
            other => panic!("expected invalid argument, got {:?}", other),
        }
        assert_eq!(annotator.call_count(), 0);
    }

    #[actix_web::test]
    async fn annotate_wraps_upstream_failure() {
        let annotator = Arc::new(FakeAnnotator::failing("quota exceeded"));
        let service = PlantVisionService::new(annotator, Arc::new(InMemoryPredictionStore::new()));

        match service.annotate_image(Some(&caller()), &image_body()).await {
            Err(ApiError::Internal { message, details }) => {
                assert_eq!(message, ANNOTATE_FAILURE);
                assert!(details.unwrap().contains("quota exceeded"));
            }
            other => panic!("expected internal error, got {:?}", other),
        }
    }

    #[actix_web::test]
    async fn detect_diagnoses_records_and_formats() {
        let annotator = Arc::new(FakeAnnotator::returning(leaf_annotation()));
        let store = Arc::new(InMemoryPredictionStore::new());
        let service = PlantVisionService::new(annotator.clone(), store.clone());

        let response = service
            .detect_plant_disease(Some(&caller()), &image_body())
            .await
            .unwrap();

        assert_eq!(annotator.calls()[0].1, plant_disease_features());

        let data = response.data;
        assert_eq!(data.disease, "Leaf spot");
        assert_eq!(data.confidence, 0.71);
        assert!(!data.is_healthy);
        assert_eq!(data.top_predictions.len(), 5);
        assert_eq!(data.top_predictions[0].class_name, "Plant");
        assert_eq!(data.all_labels.len(), 6);
        assert_eq!(data.detected_objects.len(), 1);
        assert!(data.image_properties.is_some());

        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, data.prediction_id);
        assert_eq!(records[0].record.user_id, "grower-1");
        assert_eq!(records[0].record.diagnosis, "Leaf spot");
        assert_eq!(records[0].record.confidence, 0.71);
        assert_eq!(records[0].record.labels.len(), 6);
        assert_eq!(records[0].record.objects[0].name, "Leaf");
        assert_eq!(
            records[0].record.image_hash,
            crate::db::model::calculate_image_hash(b"hello")
        );
    }

    #[actix_web::test]
    async fn detect_rejects_missing_content_without_recording() {
        let annotator = Arc::new(FakeAnnotator::returning(leaf_annotation()));
        let store = Arc::new(InMemoryPredictionStore::new());
        let service = PlantVisionService::new(annotator.clone(), store.clone());

        for body in [json!({}), json!({"image": {}}), json!({"image": {"content": ""}})] {
            let err = service
                .detect_plant_disease(Some(&caller()), &serde_json::to_vec(&body).unwrap())
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::InvalidArgument(_)));
        }

        assert_eq!(annotator.call_count(), 0);
        assert!(store.records().await.is_empty());
    }

    #[actix_web::test]
    async fn detect_unauthenticated_makes_no_calls() {
        let annotator = Arc::new(FakeAnnotator::returning(leaf_annotation()));
        let store = Arc::new(InMemoryPredictionStore::new());
        let service = PlantVisionService::new(annotator.clone(), store.clone());

        let err = service
            .detect_plant_disease(None, &image_body())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Unauthenticated));
        assert_eq!(annotator.call_count(), 0);
        assert!(store.records().await.is_empty());
    }

    #[actix_web::test]
    async fn detect_upstream_failure_records_nothing() {
        let store = Arc::new(InMemoryPredictionStore::new());
        let service = PlantVisionService::new(Arc::new(FakeAnnotator::failing("deadline exceeded")), store.clone());

        match service.detect_plant_disease(Some(&caller()), &image_body()).await {
            Err(ApiError::Internal { message, .. }) => assert_eq!(message, DETECT_FAILURE),
            other => panic!("expected internal error, got {:?}", other),
        }
        assert!(store.records().await.is_empty());
    }

    #[actix_web::test]
    async fn detect_store_failure_is_internal() {
        let service = PlantVisionService::new(
            Arc::new(FakeAnnotator::returning(leaf_annotation())),
            Arc::new(FailingStore),
        );

        match service.detect_plant_disease(Some(&caller()), &image_body()).await {
            Err(ApiError::Internal { message, details }) => {
                assert_eq!(message, DETECT_FAILURE);
                assert!(details.unwrap().contains("table unavailable"));
            }
            other => panic!("expected internal error, got {:?}", other),
        }
    }

    #[actix_web::test]
    async fn detect_with_no_labels_is_unknown() {
        let store = Arc::new(InMemoryPredictionStore::new());
        let service = PlantVisionService::new(
            Arc::new(FakeAnnotator::returning(AnnotateImageResponse::default())),
            store.clone(),
        );

        let data = service
            .detect_plant_disease(Some(&caller()), &image_body())
            .await
            .unwrap()
            .data;

        assert_eq!(data.disease, "Unknown");
        assert_eq!(data.confidence, 0.0);
        assert!(!data.is_healthy);
        assert!(data.top_predictions.is_empty());
        assert!(data.image_properties.is_none());
        assert_eq!(store.records().await[0].record.diagnosis, "Unknown");
    }
}
