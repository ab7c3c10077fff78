//! Customer handlers
//!
//! Sales users work with the customers assigned to them; admins see and
//! assign every customer.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::MessageResponse;
use crate::middleware::CurrentUser;
use crate::services::customer::{CreateCustomerInput, CustomerSort, UpdateCustomerInput};
use crate::services::notification::Audience;
use crate::services::{CustomerService, NotificationService};
use crate::AppState;
use shared::models::Customer;
use shared::notification::PushPayload;
use shared::types::Pagination;

#[derive(Debug, Deserialize)]
pub struct CustomerListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: CustomerSort,
}

pub async fn list_customers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<CustomerListQuery>,
) -> AppResult<Json<Value>> {
    let pagination = Pagination::from_query(query.page, query.limit);
    let service = CustomerService::new(state.db);
    let (customers, total) = service
        .list(
            current_user.0.owner_scope(),
            query.search.as_deref(),
            query.sort,
            pagination,
        )
        .await?;

    Ok(Json(json!({
        "customers": customers,
        "totalPages": pagination.total_pages(total),
        "currentPage": pagination.page,
    })))
}

pub async fn get_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<Customer>> {
    let service = CustomerService::new(state.db);
    Ok(Json(service.get_for(&current_user.0, customer_id).await?))
}

/// Create a customer; the assignee is notified
pub async fn create_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateCustomerInput>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    let service = CustomerService::new(state.db.clone());
    let customer = service.create(&current_user.0, input).await?;

    NotificationService::from_state(&state).notify_in_background(
        Audience::User(customer.user_id),
        PushPayload::customer_assigned(&customer.name),
    );

    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<UpdateCustomerInput>,
) -> AppResult<Json<Customer>> {
    let service = CustomerService::new(state.db.clone());
    let update = service.update(&current_user.0, customer_id, input).await?;

    if update.reassigned_from.is_some() {
        NotificationService::from_state(&state).notify_in_background(
            Audience::User(update.customer.user_id),
            PushPayload::customer_reassigned(&update.customer.name),
        );
    }

    Ok(Json(update.customer))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let service = CustomerService::new(state.db);
    service.delete(&current_user.0, customer_id).await?;
    Ok(Json(MessageResponse::new("Customer removed")))
}
