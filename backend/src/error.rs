use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use shared::{ErrorDetail, ErrorResponse};

/// Every failure a caller can observe. Lower layers keep their own error enums and
/// are folded into `Internal` at the service boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("The function must be called while authenticated.")]
    Unauthenticated,
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{message}")]
    Internal {
        message: String,
        details: Option<String>,
    },
}

impl ApiError {
    pub fn missing_field(field: &str) -> Self {
        ApiError::InvalidArgument(format!(
            "The function must be called with a non-empty `{}` field.",
            field
        ))
    }

    pub fn internal(message: &str, details: impl ToString) -> Self {
        ApiError::Internal {
            message: message.to_string(),
            details: Some(details.to_string()),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ApiError::Internal { .. } => "INTERNAL",
        }
    }

    pub fn to_body(&self) -> ErrorResponse {
        let details = match self {
            ApiError::Internal { details, .. } => details.clone(),
            _ => None,
        };
        ErrorResponse {
            error: ErrorDetail {
                status: self.status().to_string(),
                message: self.to_string(),
                details,
            },
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.to_body())
    }
}
