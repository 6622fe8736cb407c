//! API middleware

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Authentication middleware
///
/// Validates the bearer token and stores the claims in the request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "));

    let Some(token) = token else {
        warn!("Missing or invalid Authorization header");
        return ApiError::Unauthorized.into_response();
    };

    match crate::auth::validate_token(token, &state.config.jwt_secret) {
        Ok(claims) => {
            request.extensions_mut().insert(claims.clone());
            let mut response = next.run(request).await;
            // Lets the outer audit layer see the caller
            response.extensions_mut().insert(claims);
            response
        }
        Err(e) => {
            warn!(error = %e, "Token validation failed");
            ApiError::from(e).into_response()
        }
    }
}

/// Audit logging middleware
///
/// Logs every request with its request id, caller and status
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::now_v7().to_string());
    let start = Utc::now();

    let mut response = next.run(request).await;

    let duration = Utc::now() - start;
    let status = response.status();
    let user_id = response
        .extensions()
        .get::<Claims>()
        .map(|c| c.sub.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        user = %user_id,
        status = %status.as_u16(),
        duration_ms = duration.num_milliseconds(),
        "API request"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
