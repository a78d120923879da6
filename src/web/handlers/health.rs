use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::utils::http::ApiResponse;

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
    git_hash: &'static str,
}

pub fn health_router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<ApiResponse<Health>> {
    Json(ApiResponse::success(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
    }))
}
