use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use shared::{AnnotateImageResponse, Feature};
use std::time::Duration;
use url::Url;

use super::{VisionAnnotator, VisionError};
use crate::config::{VisionConfig, VisionCredentials};

#[derive(Serialize)]
struct ImagePayload<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    image: ImagePayload<'a>,
    features: &'a [Feature],
}

#[derive(Serialize)]
struct BatchAnnotateRequest<'a> {
    requests: [AnnotateRequest<'a>; 1],
}

#[derive(Deserialize)]
struct BatchAnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

/// Google Cloud Vision `images:annotate` over REST.
pub struct CloudVisionClient {
    http_client: Client,
    endpoint: Url,
    credentials: VisionCredentials,
}

impl CloudVisionClient {
    pub fn new(config: &VisionConfig) -> Result<Self, VisionError> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            credentials: config.credentials.clone(),
        })
    }

    fn request_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        if let VisionCredentials::ApiKey(key) = &self.credentials {
            url.query_pairs_mut().append_pair("key", key);
        }
        url
    }
}

fn first_result(batch: BatchAnnotateResponse) -> Result<AnnotateImageResponse, VisionError> {
    let result = batch
        .responses
        .into_iter()
        .next()
        .ok_or(VisionError::EmptyResponse)?;

    match &result.error {
        Some(status) if status.code != 0 || !status.message.is_empty() => {
            Err(VisionError::Upstream {
                code: status.code,
                message: status.message.clone(),
            })
        }
        _ => Ok(result),
    }
}

#[async_trait]
impl VisionAnnotator for CloudVisionClient {
    async fn annotate(
        &self,
        content: &str,
        features: &[Feature],
    ) -> Result<AnnotateImageResponse, VisionError> {
        let body = BatchAnnotateRequest {
            requests: [AnnotateRequest {
                image: ImagePayload { content },
                features,
            }],
        };

        let mut request = self.http_client.post(self.request_url()).json(&body);
        if let VisionCredentials::AccessToken(token) = &self.credentials {
            request = request.bearer_auth(token);
        }

        log::debug!(
            "Requesting {} feature(s) from {}",
            features.len(),
            self.endpoint
        );
        let response = request.send().await?;

        match response.status() {
            StatusCode::OK => {
                let batch: BatchAnnotateResponse = response.json().await?;
                let result = first_result(batch)?;
                log::info!("Vision API response received successfully");
                Ok(result)
            }
            status => {
                let text = response.text().await?;
                log::error!("Vision API returned {}: {}", status, text);
                Err(VisionError::UnexpectedStatus { status, text })
            }
        }
    }
}
