//! Dashboard handlers

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::handlers::RangeQuery;
use crate::middleware::CurrentUser;
use crate::services::DashboardService;
use crate::AppState;
use shared::aggregation::{DailySummary, RankedSales, RankedUnits};
use shared::consignment::ActiveConsignment;
use shared::models::CustomerSummary;

pub async fn dashboard_summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<DailySummary>> {
    let service = DashboardService::new(state.db, state.tz);
    Ok(Json(service.summary(&current_user.0).await?))
}

pub async fn top_customers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<Vec<RankedSales>>> {
    let service = DashboardService::new(state.db, state.tz);
    Ok(Json(service.top_customers(&current_user.0, query.range()?).await?))
}

pub async fn top_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<Vec<RankedUnits>>> {
    let service = DashboardService::new(state.db, state.tz);
    Ok(Json(service.top_products(&current_user.0, query.range()?).await?))
}

pub async fn top_sales(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<Vec<RankedSales>>> {
    let service = DashboardService::new(state.db, state.tz);
    Ok(Json(service.top_sales(&current_user.0, query.range()?).await?))
}

pub async fn active_consignments(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ActiveConsignment>>> {
    let service = DashboardService::new(state.db, state.tz);
    Ok(Json(service.active_consignments(&current_user.0).await?))
}

pub async fn inactive_consignments(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<CustomerSummary>>> {
    let service = DashboardService::new(state.db, state.tz);
    Ok(Json(service.inactive_consignments(&current_user.0).await?))
}
