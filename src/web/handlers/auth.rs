use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use tracing::error;

use crate::auth::middleware::{admin_middleware, status_for};
use crate::auth::{ApiKeyInfo, Auth, Permission, RateLimit};
use crate::utils::http::ApiResponse;
use crate::web::extract::{ApiJson, ApiPath};

pub fn auth_router(auth: Arc<Auth>) -> Router {
    Router::new()
        .route("/api-keys", get(list_api_keys).post(create_api_key))
        .route("/api-keys/:api_key", delete(revoke_api_key))
        .route_layer(middleware::from_fn_with_state(auth.clone(), admin_middleware))
        .with_state(auth)
}

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub rate_limit: RateLimit,
    pub expires_in_days: Option<i64>,
}

async fn create_api_key(
    State(auth): State<Arc<Auth>>,
    ApiJson(req): ApiJson<CreateApiKeyRequest>,
) -> impl IntoResponse {
    match auth.create_api_key(
        req.name,
        req.permissions,
        req.rate_limit,
        req.expires_in_days,
        None,
    ) {
        Ok(key_info) => (StatusCode::CREATED, Json(ApiResponse::success(key_info))),
        Err(e) => {
            error!("Failed to create API key: {}", e);
            (status_for(&e), Json(ApiResponse::<ApiKeyInfo>::error(e.to_string())))
        }
    }
}

async fn list_api_keys(State(auth): State<Arc<Auth>>) -> impl IntoResponse {
    match auth.list_api_keys() {
        Ok(keys) => (StatusCode::OK, Json(ApiResponse::success(keys))),
        Err(e) => (status_for(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

async fn revoke_api_key(
    State(auth): State<Arc<Auth>>,
    ApiPath(api_key): ApiPath<String>,
) -> impl IntoResponse {
    match auth.revoke_api_key(&api_key).await {
        Ok(_) => (StatusCode::OK, Json(ApiResponse::<()>::success(()))),
        Err(e) => (status_for(&e), Json(ApiResponse::error(e.to_string()))),
    }
}
