//! Reporting handlers for analytics and data export

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::ReportService;
use crate::time::parse_date;
use crate::AppState;
use shared::aggregation::ProductStockReport;
use shared::types::DateRange;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesPerformanceQuery {
    pub user_id: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub format: Option<String>, // "json" or "csv"
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStockQuery {
    pub product_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct VisitsByDateQuery {
    pub date: Option<String>,
    pub format: Option<String>,
}

fn csv_response(body: String, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

fn required_date(field: &str, value: Option<&str>) -> AppResult<chrono::NaiveDate> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::field(field, format!("{} is required", field)))?;
    parse_date(field, value)
}

/// Sales performance of one rep; sales users always get their own
pub async fn sales_performance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<SalesPerformanceQuery>,
) -> AppResult<Response> {
    let user = current_user.0;
    let user_id = if user.is_admin() {
        query
            .user_id
            .ok_or_else(|| AppError::field("userId", "userId is required"))?
    } else {
        user.user_id
    };
    let start = required_date("startDate", query.start_date.as_deref())?;
    let end = required_date("endDate", query.end_date.as_deref())?;

    let service = ReportService::new(state.db.clone(), state.tz);
    let (report, catalog) = service
        .sales_performance(user_id, DateRange::new(Some(start), Some(end)))
        .await?;

    if query.format.as_deref() == Some("csv") {
        let rows = service.csv_rows(&report.visits, &catalog);
        let csv = ReportService::export_to_csv(&rows)?;
        Ok(csv_response(
            csv,
            &format!("sales_performance_{}_{}.csv", start, end),
        ))
    } else {
        Ok(Json(report).into_response())
    }
}

/// Where one product's consignment stock sits (admin)
pub async fn product_stock(
    State(state): State<AppState>,
    Query(query): Query<ProductStockQuery>,
) -> AppResult<Json<ProductStockReport>> {
    let product_id = query
        .product_id
        .ok_or_else(|| AppError::field("productId", "productId is required"))?;
    let service = ReportService::new(state.db, state.tz);
    Ok(Json(service.product_stock(product_id).await?))
}

/// Route report: every visit on one day (admin)
pub async fn visits_by_date(
    State(state): State<AppState>,
    Query(query): Query<VisitsByDateQuery>,
) -> AppResult<Response> {
    let date = required_date("date", query.date.as_deref())?;
    let service = ReportService::new(state.db.clone(), state.tz);
    let visits = service.visits_by_date(date).await?;

    if query.format.as_deref() == Some("csv") {
        let catalog = crate::services::ProductService::new(state.db).catalog().await?;
        let rows = service.csv_rows(&visits, &catalog);
        let csv = ReportService::export_to_csv(&rows)?;
        Ok(csv_response(csv, &format!("visits_{}.csv", date)))
    } else {
        Ok(Json(visits).into_response())
    }
}
