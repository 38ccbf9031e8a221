use actix_web::{web, HttpResponse};
use futures::StreamExt;
use log::warn;

use crate::auth::middleware::AuthMiddleware;
use crate::auth::models::CallerIdentity;
use crate::error::ApiError;
use crate::service::PlantVisionService;
use crate::validation::require_identity;

/// Largest request body, in bytes, either endpoint will read.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimit(pub usize);

pub fn configure_routes(
    cfg: &mut web::ServiceConfig,
    auth_middleware: AuthMiddleware,
    max_body_bytes: usize,
) {
    cfg.service(
        web::scope("/api")
            .wrap(auth_middleware)
            .app_data(web::Data::new(BodyLimit(max_body_bytes)))
            .service(web::resource("/annotateImage").route(web::post().to(annotate_image)))
            .service(
                web::resource("/detectPlantDisease").route(web::post().to(detect_plant_disease)),
            ),
    );
}

/// Reads the body only once the caller is known; an oversized body is an
/// `InvalidArgument` like any other bad input.
async fn read_body(
    identity: Option<&CallerIdentity>,
    mut payload: web::Payload,
    limit: BodyLimit,
) -> Result<web::BytesMut, ApiError> {
    require_identity(identity)?;

    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let data = chunk.map_err(|e| {
            ApiError::InvalidArgument(format!("Failed to read request body: {}", e))
        })?;
        if body.len() + data.len() > limit.0 {
            return Err(ApiError::InvalidArgument(format!(
                "Request body exceeds the {} byte limit",
                limit.0
            )));
        }
        body.extend_from_slice(&data);
    }
    Ok(body)
}

async fn annotate_image(
    service: web::Data<PlantVisionService>,
    limit: web::Data<BodyLimit>,
    identity: Option<CallerIdentity>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    let response = async {
        let body = read_body(identity.as_ref(), payload, **limit).await?;
        service.annotate_image(identity.as_ref(), &body).await
    }
    .await
    .inspect_err(|e| warn!("annotateImage failed: {} ({})", e.status(), e))?;
    Ok(HttpResponse::Ok().json(response))
}

async fn detect_plant_disease(
    service: web::Data<PlantVisionService>,
    limit: web::Data<BodyLimit>,
    identity: Option<CallerIdentity>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    let response = async {
        let body = read_body(identity.as_ref(), payload, **limit).await?;
        service.detect_plant_disease(identity.as_ref(), &body).await
    }
    .await
    .inspect_err(|e| warn!("detectPlantDisease failed: {} ({})", e.status(), e))?;
    Ok(HttpResponse::Ok().json(response))
}
