use serde::Deserialize;
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";
pub const DEFAULT_VISION_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisionCredentials {
    ApiKey(String),
    AccessToken(String),
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub endpoint: Url,
    pub credentials: VisionCredentials,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub vision: VisionConfig,
    /// `None` keeps predictions in memory.
    pub predictions_table: Option<String>,
    pub max_payload_bytes: usize,
}

/// Optional YAML file; environment variables win over anything set here.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    port: Option<u16>,
    jwt_secret: Option<String>,
    vision_api_endpoint: Option<String>,
    vision_api_key: Option<String>,
    vision_access_token: Option<String>,
    vision_timeout_secs: Option<u64>,
    dynamodb_predictions_table: Option<String>,
    max_payload_bytes: Option<usize>,
}

impl FileConfig {
    fn read(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let file = match env::var("APP_CONFIG_FILE") {
            Ok(path) if !path.trim().is_empty() => {
                log::info!("Loading settings from {}", path);
                FileConfig::read(&path)?
            }
            _ => FileConfig::default(),
        };
        Self::resolve(file, |key| env::var(key).ok())
    }

    fn resolve(
        file: FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => parse("PORT", &raw)?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let jwt_secret = var("JWT_SECRET")
            .or(file.jwt_secret)
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let endpoint_raw = var("VISION_API_ENDPOINT")
            .or(file.vision_api_endpoint)
            .unwrap_or_else(|| DEFAULT_VISION_ENDPOINT.to_string());
        let endpoint = Url::parse(&endpoint_raw).map_err(|e| ConfigError::Invalid {
            key: "VISION_API_ENDPOINT",
            reason: e.to_string(),
        })?;

        let credentials = match (
            var("VISION_API_KEY").or(file.vision_api_key),
            var("VISION_ACCESS_TOKEN").or(file.vision_access_token),
        ) {
            (Some(key), _) => VisionCredentials::ApiKey(key),
            (None, Some(token)) => VisionCredentials::AccessToken(token),
            (None, None) => return Err(ConfigError::Missing("VISION_API_KEY or VISION_ACCESS_TOKEN")),
        };

        let timeout_secs = match var("VISION_TIMEOUT_SECS") {
            Some(raw) => parse("VISION_TIMEOUT_SECS", &raw)?,
            None => file.vision_timeout_secs.unwrap_or(DEFAULT_VISION_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "VISION_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let max_payload_bytes = match var("MAX_PAYLOAD_BYTES") {
            Some(raw) => parse("MAX_PAYLOAD_BYTES", &raw)?,
            None => file.max_payload_bytes.unwrap_or(DEFAULT_MAX_PAYLOAD_BYTES),
        };

        Ok(Self {
            port,
            jwt_secret,
            vision: VisionConfig {
                endpoint,
                credentials,
                timeout: Duration::from_secs(timeout_secs),
            },
            predictions_table: var("DYNAMODB_PREDICTIONS_TABLE").or(file.dynamodb_predictions_table),
            max_payload_bytes,
        })
    }
}
