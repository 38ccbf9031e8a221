use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use shared::{Feature, FeatureType, ImageContent};

use crate::auth::models::CallerIdentity;
use crate::error::ApiError;

pub const DEFAULT_MAX_LABELS: i64 = 10;

/// Image content that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    /// Base64 text with whitespace removed, as forwarded to the provider.
    pub content: String,
    pub bytes: Vec<u8>,
}

pub fn require_identity(identity: Option<&CallerIdentity>) -> Result<&CallerIdentity, ApiError> {
    identity.ok_or(ApiError::Unauthenticated)
}

/// Parses a JSON request body. Only called once the caller is known.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::missing_field("image.content"));
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidArgument(format!("Malformed request body: {}", e)))
}

pub fn validate_image(image: Option<&ImageContent>) -> Result<ValidatedImage, ApiError> {
    let content: String = image
        .and_then(|image| image.content.as_deref())
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if content.is_empty() {
        return Err(ApiError::missing_field("image.content"));
    }

    let bytes = STANDARD.decode(&content).map_err(|e| {
        ApiError::InvalidArgument(format!("`image.content` is not valid base64: {}", e))
    })?;
    if bytes.is_empty() {
        return Err(ApiError::missing_field("image.content"));
    }

    Ok(ValidatedImage { content, bytes })
}

pub fn default_features() -> Vec<Feature> {
    vec![Feature::new(FeatureType::LabelDetection, Some(DEFAULT_MAX_LABELS))]
}

pub fn validate_features(features: Option<Vec<Feature>>) -> Result<Vec<Feature>, ApiError> {
    let Some(features) = features else {
        return Ok(default_features());
    };

    if features.is_empty() {
        return Err(ApiError::InvalidArgument(
            "`features` must contain at least one entry when provided.".to_string(),
        ));
    }
    if let Some(feature) = features
        .iter()
        .find(|f| f.max_results.is_some_and(|max| max <= 0))
    {
        return Err(ApiError::InvalidArgument(format!(
            "`features` entry {} has a non-positive maxResults.",
            feature.kind
        )));
    }
    Ok(features)
}
