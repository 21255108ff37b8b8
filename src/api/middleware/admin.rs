//! Platform-owner authentication for the admin routes.
//!
//! Admin requests carry the configured admin token as a bearer token.
//! They never resolve to a user session.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{hash_token, ApiContext};

/// Marker inserted into request extensions once the admin token matched.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

pub async fn require_admin(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_admin_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_admin_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let Some(expected) = ctx.state.config.admin_token.as_deref() else {
        tracing::warn!("Admin request refused: no admin token configured");
        return Err(ApiError::Unauthorized);
    };

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    // Compared as digests, never as raw secrets
    if hash_token(token) != hash_token(expected) {
        tracing::warn!("Admin request refused: token mismatch");
        return Err(ApiError::Unauthorized);
    }

    req.extensions_mut().insert(AdminAccess);
    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));
    Ok(response)
}
