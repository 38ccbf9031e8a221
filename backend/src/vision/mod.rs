pub mod client;

use async_trait::async_trait;
use reqwest::StatusCode;
use shared::{AnnotateImageResponse, Feature};

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected status {status}: {text}")]
    UnexpectedStatus { status: StatusCode, text: String },
    #[error("Vision API returned no annotation result")]
    EmptyResponse,
    #[error("Vision API error {code}: {message}")]
    Upstream { code: i32, message: String },
}

/// Access to an external image-annotation provider.
#[async_trait]
pub trait VisionAnnotator: Send + Sync {
    /// `content` is the base64-encoded image exactly as the caller supplied it.
    async fn annotate(
        &self,
        content: &str,
        features: &[Feature],
    ) -> Result<AnnotateImageResponse, VisionError>;
}
