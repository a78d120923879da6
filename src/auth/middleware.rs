use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use tracing::warn;

use super::{Auth, AuthError, Permission};
use crate::utils::http::ApiResponse;

pub const API_KEY_HEADER: &str = "X-API-Key";

type Rejection = (StatusCode, Json<ApiResponse<()>>);

/// Reads need `Read`, every other method needs `Write`.
pub async fn auth_middleware(
    State(auth): State<Arc<Auth>>,
    req: Request,
    next: Next,
) -> Result<Response, Rejection> {
    let required = if req.method() == Method::GET || req.method() == Method::HEAD {
        Permission::Read
    } else {
        Permission::Write
    };
    authorize(&auth, req, next, required).await
}

pub async fn admin_middleware(
    State(auth): State<Arc<Auth>>,
    req: Request,
    next: Next,
) -> Result<Response, Rejection> {
    authorize(&auth, req, next, Permission::Admin).await
}

async fn authorize(
    auth: &Auth,
    req: Request,
    next: Next,
    required_permission: Permission,
) -> Result<Response, Rejection> {
    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if let Err(e) = auth.verify_api_key(api_key, required_permission).await {
        warn!("Rejected {} {}: {}", req.method(), req.uri().path(), e);
        return Err((status_for(&e), Json(ApiResponse::error(e.to_string()))));
    }

    Ok(next.run(req).await)
}

pub fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::MissingApiKey | AuthError::InvalidApiKey => StatusCode::UNAUTHORIZED,
        AuthError::KeyExpired | AuthError::KeySuspended | AuthError::InsufficientPermissions => {
            StatusCode::FORBIDDEN
        }
        AuthError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        AuthError::KeyNotFound => StatusCode::NOT_FOUND,
        AuthError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        AuthError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
