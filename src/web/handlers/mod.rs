use std::sync::Arc;

use axum::Router;

use crate::AppContext;

pub mod auth;
pub mod contacts;
pub mod health;
pub mod invoices;

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .nest("/contacts", contacts::contact_router(ctx.clone()))
        .nest("/invoices", invoices::invoice_router(ctx.clone()))
        .nest("/auth", auth::auth_router(ctx.auth.clone()))
        .merge(health::health_router())
}
