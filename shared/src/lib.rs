use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{Display, EnumString};

/// Analysis kinds understood by the vision provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    TypeUnspecified,
    FaceDetection,
    LandmarkDetection,
    LogoDetection,
    LabelDetection,
    TextDetection,
    DocumentTextDetection,
    SafeSearchDetection,
    ImageProperties,
    CropHints,
    WebDetection,
    ProductSearch,
    ObjectLocalization,
}

/// A requested analysis. `maxResults` is signed so that a non-positive value reaches
/// request validation instead of failing deserialization; other keys (`model`) are
/// forwarded as sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: FeatureType,
    #[serde(rename = "maxResults", skip_serializing_if = "Option::is_none", default)]
    pub max_results: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Feature {
    pub fn new(kind: FeatureType, max_results: Option<i64>) -> Self {
        Self {
            kind,
            max_results,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageContent {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotateImageRequest {
    #[serde(default)]
    pub image: Option<ImageContent>,
    #[serde(default)]
    pub features: Option<Vec<Feature>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectPlantDiseaseRequest {
    #[serde(default)]
    pub image: Option<ImageContent>,
}

// The provider omits default-valued fields, so they are omitted again on the way out.
fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationLabel {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub score: f64,
    // mid, topicality and anything else the provider sends
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnnotationLabel {
    pub fn new(description: impl Into<String>, score: f64) -> Self {
        Self {
            description: description.into(),
            score,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub score: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DetectedObject {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
            extra: Map::new(),
        }
    }
}

/// Per-image error object reported inside an otherwise successful provider reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// One image's annotation result. Fields the backend does not interpret are kept in
/// `other` so the result can be handed back to callers untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateImageResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_annotations: Vec<AnnotationLabel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub localized_object_annotations: Vec<DetectedObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_properties_annotation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProviderStatus>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPrediction {
    pub class_name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantDiseaseResult {
    pub disease: String,
    pub confidence: f64,
    pub is_healthy: bool,
    pub prediction_id: String,
    pub top_predictions: Vec<TopPrediction>,
    pub all_labels: Vec<AnnotationLabel>,
    pub detected_objects: Vec<DetectedObject>,
    pub image_properties: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}
