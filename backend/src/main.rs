mod auth;
mod config;
mod db;
mod diagnosis;
mod error;
mod routes;
mod service;
#[cfg(test)]
mod testing;
mod validation;
mod vision;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use auth::jwt::JwtService;
use auth::middleware::AuthMiddleware;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use config::AppConfig;
use db::dynamodb_repository::DynamoDbPredictionStore;
use db::memory_repository::InMemoryPredictionStore;
use db::PredictionStore;
use routes::configure_routes;
use service::PlantVisionService;
use std::sync::Arc;
use vision::client::CloudVisionClient;

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, e);
    std::io::Error::other(format!("{}: {}", context, e))
}

/// `backend issue-token <uid> [email]` prints a 24h token signed with `JWT_SECRET`,
/// for calling the API from a local client.
fn issue_token(config: &AppConfig, mut args: impl Iterator<Item = String>) -> std::io::Result<()> {
    let uid = args
        .next()
        .ok_or_else(|| startup_error("issue-token", "usage: issue-token <uid> [email]"))?;
    let email = args.next();
    let token = JwtService::new(&config.jwt_secret)
        .generate_token(&uid, email.as_deref(), chrono::Duration::hours(24))
        .map_err(|e| startup_error("Failed to sign token", e))?;
    println!("{}", token);
    Ok(())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::load().map_err(|e| startup_error("Invalid configuration", e))?;

    let mut args = std::env::args().skip(1);
    if let Some(command) = args.next() {
        return match command.as_str() {
            "issue-token" => issue_token(&config, args),
            other => Err(startup_error("Unknown command", other)),
        };
    }

    let annotator = CloudVisionClient::new(&config.vision)
        .map_err(|e| startup_error("Failed to build Vision API client", e))?;
    log::info!("Vision API endpoint: {}", config.vision.endpoint);

    let store: Arc<dyn PredictionStore> = match &config.predictions_table {
        Some(table) => {
            let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            log::info!("Recording predictions in DynamoDB table '{}'", table);
            Arc::new(DynamoDbPredictionStore::new(
                DynamoDbClient::new(&aws_config),
                table.clone(),
            ))
        }
        None => {
            log::warn!(
                "DYNAMODB_PREDICTIONS_TABLE is not set; predictions are kept in memory and lost on restart"
            );
            Arc::new(InMemoryPredictionStore::new())
        }
    };

    let service = PlantVisionService::new(Arc::new(annotator), store);
    let auth_middleware = AuthMiddleware::new(JwtService::new(&config.jwt_secret));
    let max_payload_bytes = config.max_payload_bytes;

    let bind_address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(service.clone()))
            .configure(|cfg| configure_routes(cfg, auth_middleware.clone(), max_payload_bytes))
    })
    .bind(&bind_address)?
    .run()
    .await
}
