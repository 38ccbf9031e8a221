use super::jwt::{JwtError, JwtService};
use super::models::CallerIdentity;
use crate::error::ApiError;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use actix_web::{FromRequest, HttpRequest};
use futures::future::{err, ok, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

/// Resolves `Authorization: Bearer` tokens into a `CallerIdentity`.
///
/// Requests without a usable token are passed on without an identity; the
/// handlers decide whether that is an error.
#[derive(Clone)]
pub struct AuthMiddleware {
    jwt_service: Arc<JwtService>,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self {
            jwt_service: Arc::new(jwt_service),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Rc::new(service),
            jwt_service: self.jwt_service.clone(),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    jwt_service: Arc<JwtService>,
}

#[derive(Debug)]
enum AuthError {
    NoAuthHeader,
    InvalidHeaderFormat,
    NotBearerToken,
    VerificationFailed(JwtError),
}

impl AuthError {
    fn log_message(&self, path: &str) -> String {
        match self {
            AuthError::NoAuthHeader => format!("No Authorization header found for path: {}", path),
            AuthError::InvalidHeaderFormat => format!("Invalid Authorization header format (non-UTF-8) for path: {}", path),
            AuthError::NotBearerToken => format!("Authorization header for path {} doesn't start with 'Bearer '", path),
            AuthError::VerificationFailed(e) => format!("JWT token verification failed for path {}: {}", path, e),
        }
    }
}

fn resolve_identity(
    req: &ServiceRequest,
    jwt_service: &JwtService,
) -> Result<CallerIdentity, AuthError> {
    let auth_header = req.headers().get("Authorization").ok_or(AuthError::NoAuthHeader)?;
    let auth_str = auth_header.to_str().map_err(|_| AuthError::InvalidHeaderFormat)?;
    let token = auth_str.strip_prefix("Bearer ").ok_or(AuthError::NotBearerToken)?;

    log::debug!("Found Bearer token, verifying...");
    let claims = jwt_service
        .verify_token(token.trim())
        .map_err(AuthError::VerificationFailed)?;

    log::debug!("JWT token verified for user: {}", claims.sub);
    Ok(CallerIdentity::from(claims))
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let jwt_service = self.jwt_service.clone();

        Box::pin(async move {
            match resolve_identity(&req, &jwt_service) {
                Ok(identity) => {
                    req.extensions_mut().insert(identity);
                }
                Err(AuthError::NoAuthHeader) => {
                    log::debug!("{}", AuthError::NoAuthHeader.log_message(req.path()));
                }
                Err(auth_error) => {
                    log::warn!("{}", auth_error.log_message(req.path()));
                }
            }
            service.call(req).await
        })
    }
}

impl FromRequest for CallerIdentity {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<CallerIdentity>() {
            Some(identity) => ok(identity.clone()),
            None => err(ApiError::Unauthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};
    use chrono::Duration;

    async fn whoami(identity: Option<CallerIdentity>) -> HttpResponse {
        match identity {
            Some(identity) => HttpResponse::Ok().body(identity.uid),
            None => HttpResponse::Ok().body("anonymous"),
        }
    }

    async fn body_for(header: Option<String>) -> String {
        let jwt = JwtService::new("middleware-secret");
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(jwt))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let mut req = test::TestRequest::get().uri("/whoami");
        if let Some(value) = header {
            req = req.insert_header(("Authorization", value));
        }
        let body = test::call_and_read_body(&app, req.to_request()).await;
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[actix_web::test]
    async fn valid_token_attaches_identity() {
        let token = JwtService::new("middleware-secret")
            .generate_token("grower-1", None, Duration::minutes(5))
            .unwrap();
        assert_eq!(body_for(Some(format!("Bearer {}", token))).await, "grower-1");
    }

    #[actix_web::test]
    async fn missing_or_bad_tokens_pass_through_anonymous() {
        assert_eq!(body_for(None).await, "anonymous");
        assert_eq!(body_for(Some("Basic abc".into())).await, "anonymous");
        assert_eq!(body_for(Some("Bearer a.b.c".into())).await, "anonymous");

        let foreign = JwtService::new("other-secret")
            .generate_token("intruder", None, Duration::minutes(5))
            .unwrap();
        assert_eq!(body_for(Some(format!("Bearer {}", foreign))).await, "anonymous");
    }
}
