use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::application::{error::ApplicationError, services::AuthValidator};

const MALFORMED_HEADER: &str = "authorization header must be in format 'Bearer <token>'";

/// Requires `Authorization: Bearer <token>` and a token the auth service
/// accepts. Runs before any handler extractor.
pub async fn require_bearer_token(
    State(auth_validator): State<Arc<dyn AuthValidator>>,
    headers: HeaderMap,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApplicationError> {
    let token = bearer_token(&headers)?;

    auth_validator.validate(token).await?;
    debug!("Bearer token validated");

    Ok(next.run(request).await)
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApplicationError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApplicationError::BadRequest("no authorization header found".to_string()))?;

    let value = value
        .to_str()
        .map_err(|_| ApplicationError::BadRequest(MALFORMED_HEADER.to_string()))?;

    match value.split(' ').collect::<Vec<_>>().as_slice() {
        ["Bearer", token] if !token.is_empty() => Ok(*token),
        _ => Err(ApplicationError::BadRequest(MALFORMED_HEADER.to_string())),
    }
}
