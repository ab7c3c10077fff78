//! Product catalog handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::{ListQuery, MessageResponse};
use crate::services::notification::Audience;
use crate::services::product::{CreateProductInput, UpdateProductInput};
use crate::services::{NotificationService, ProductService};
use crate::AppState;
use shared::models::Product;
use shared::notification::PushPayload;

/// Paginated product list sorted by name
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Value>> {
    let pagination = query.pagination();
    let service = ProductService::new(state.db);
    let (products, total) = service.list(query.search.as_deref(), pagination).await?;

    Ok(Json(json!({
        "products": products,
        "totalPages": pagination.total_pages(total),
        "currentPage": pagination.page,
    })))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    Ok(Json(service.get(product_id).await?))
}

/// Create a product and tell the sales team about it
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let service = ProductService::new(state.db.clone());
    let product = service.create(input).await?;

    NotificationService::from_state(&state).notify_in_background(
        Audience::SalesUsers,
        PushPayload::new_product(&product.name, product.price),
    );

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    Ok(Json(service.update(product_id, input).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let service = ProductService::new(state.db);
    service.delete(product_id).await?;
    Ok(Json(MessageResponse::new("Product removed")))
}
