use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::auth::middleware::auth_middleware;
use crate::billing::{Invoice, InvoiceFilter, InvoiceStatus, NewInvoice};
use crate::utils::http::ApiResponse;
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::{ApiError, PaginatedList, Pagination};
use crate::AppContext;

pub fn invoice_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route(
            "/:invoice_id",
            get(get_invoice).put(update_invoice).delete(delete_invoice),
        )
        .route("/:invoice_id/status", post(update_invoice_status))
        .route("/:invoice_id/send", post(send_invoice))
        .route_layer(middleware::from_fn_with_state(ctx.auth.clone(), auth_middleware))
        .with_state(ctx)
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: InvoiceStatus,
}

// filter and paging share the query string
async fn list_invoices(
    State(ctx): State<Arc<AppContext>>,
    ApiQuery(filter): ApiQuery<InvoiceFilter>,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> Result<Json<ApiResponse<PaginatedList<Invoice>>>, ApiError> {
    let page = ctx.invoices.list(&filter, &pagination).await?;
    Ok(Json(ApiResponse::success(page)))
}

async fn create_invoice(
    State(ctx): State<Arc<AppContext>>,
    ApiJson(new): ApiJson<NewInvoice>,
) -> Result<(StatusCode, Json<ApiResponse<Invoice>>), ApiError> {
    let invoice = ctx.invoices.create(new).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(invoice))))
}

async fn get_invoice(
    State(ctx): State<Arc<AppContext>>,
    ApiPath(invoice_id): ApiPath<String>,
) -> Result<Json<ApiResponse<Invoice>>, ApiError> {
    let invoice = ctx.invoices.get(&invoice_id).await?;
    Ok(Json(ApiResponse::success(invoice)))
}

async fn update_invoice(
    State(ctx): State<Arc<AppContext>>,
    ApiPath(invoice_id): ApiPath<String>,
    ApiJson(new): ApiJson<NewInvoice>,
) -> Result<Json<ApiResponse<Invoice>>, ApiError> {
    let invoice = ctx.invoices.update(&invoice_id, new).await?;
    Ok(Json(ApiResponse::success(invoice)))
}

async fn delete_invoice(
    State(ctx): State<Arc<AppContext>>,
    ApiPath(invoice_id): ApiPath<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    ctx.invoices.delete(&invoice_id).await?;
    Ok(Json(ApiResponse::success(())))
}

async fn update_invoice_status(
    State(ctx): State<Arc<AppContext>>,
    ApiPath(invoice_id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Invoice>>, ApiError> {
    let invoice = ctx.invoices.set_status(&invoice_id, req.status).await?;
    Ok(Json(ApiResponse::success(invoice)))
}

async fn send_invoice(
    State(ctx): State<Arc<AppContext>>,
    ApiPath(invoice_id): ApiPath<String>,
) -> Result<Json<ApiResponse<Invoice>>, ApiError> {
    let invoice = ctx.invoices.send(&invoice_id).await?;
    Ok(Json(ApiResponse::success(invoice)))
}
