use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};

use crate::auth::middleware::auth_middleware;
use crate::billing::{Contact, Invoice, NewContact};
use crate::utils::http::ApiResponse;
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::{ApiError, PaginatedList, Pagination};
use crate::AppContext;

pub fn contact_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(list_contacts).post(create_contact))
        .route(
            "/:contact_id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
        .route("/:contact_id/invoices", get(list_contact_invoices))
        .route_layer(middleware::from_fn_with_state(ctx.auth.clone(), auth_middleware))
        .with_state(ctx)
}

async fn list_contacts(
    State(ctx): State<Arc<AppContext>>,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> Result<Json<ApiResponse<PaginatedList<Contact>>>, ApiError> {
    let page = ctx.contacts.list(&pagination).await?;
    Ok(Json(ApiResponse::success(page)))
}

async fn create_contact(
    State(ctx): State<Arc<AppContext>>,
    ApiJson(new): ApiJson<NewContact>,
) -> Result<(StatusCode, Json<ApiResponse<Contact>>), ApiError> {
    let contact = ctx.contacts.create(new).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(contact))))
}

async fn get_contact(
    State(ctx): State<Arc<AppContext>>,
    ApiPath(contact_id): ApiPath<String>,
) -> Result<Json<ApiResponse<Contact>>, ApiError> {
    let contact = ctx.contacts.get(&contact_id).await?;
    Ok(Json(ApiResponse::success(contact)))
}

async fn update_contact(
    State(ctx): State<Arc<AppContext>>,
    ApiPath(contact_id): ApiPath<String>,
    ApiJson(new): ApiJson<NewContact>,
) -> Result<Json<ApiResponse<Contact>>, ApiError> {
    let contact = ctx.contacts.update(&contact_id, new).await?;
    Ok(Json(ApiResponse::success(contact)))
}

async fn delete_contact(
    State(ctx): State<Arc<AppContext>>,
    ApiPath(contact_id): ApiPath<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    ctx.contacts.delete(&contact_id).await?;
    Ok(Json(ApiResponse::success(())))
}

async fn list_contact_invoices(
    State(ctx): State<Arc<AppContext>>,
    ApiPath(contact_id): ApiPath<String>,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> Result<Json<ApiResponse<PaginatedList<Invoice>>>, ApiError> {
    let page = ctx.invoices.list_for_contact(&contact_id, &pagination).await?;
    Ok(Json(ApiResponse::success(page)))
}
