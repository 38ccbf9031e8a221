use chrono::{DateTime, SecondsFormat, Utc};
use shared::{AnnotateImageResponse, AnnotationLabel, ApiResponse, PlantDiseaseResult, TopPrediction};

use super::classifier::Diagnosis;

pub const TOP_PREDICTIONS: usize = 5;

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Wraps a payload in the success envelope, stamped with the current time.
pub fn success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        timestamp: format_timestamp(Utc::now()),
    }
}

/// First labels in provider order, not re-sorted by score.
pub fn top_predictions(labels: &[AnnotationLabel]) -> Vec<TopPrediction> {
    labels
        .iter()
        .take(TOP_PREDICTIONS)
        .map(|label| TopPrediction {
            class_name: label.description.clone(),
            confidence: label.score,
        })
        .collect()
}

pub fn plant_disease_result(
    diagnosis: Diagnosis,
    prediction_id: String,
    annotation: AnnotateImageResponse,
) -> PlantDiseaseResult {
    PlantDiseaseResult {
        disease: diagnosis.label,
        confidence: diagnosis.confidence,
        is_healthy: diagnosis.is_healthy,
        prediction_id,
        top_predictions: top_predictions(&annotation.label_annotations),
        all_labels: annotation.label_annotations,
        detected_objects: annotation.localized_object_annotations,
        image_properties: annotation.image_properties_annotation,
    }
}
