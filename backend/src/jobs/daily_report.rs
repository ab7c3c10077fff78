//! End-of-day sales report pushed to admins

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::AppResult;
use crate::services::notification::{Audience, DeliveryReport};
use crate::services::visit::VisitFilter;
use crate::services::{NotificationService, ProductService, VisitService};
use crate::time::{local_today, UtcBounds};
use crate::AppState;
use shared::aggregation::sales_totals;
use shared::notification::PushPayload;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReportOutcome {
    pub date: NaiveDate,
    pub total_sales: Decimal,
    pub total_profit: Decimal,
    pub visit_count: usize,
    pub delivery: DeliveryReport,
}

/// Total today's sales across every visit and push the figure to admins
///
/// Recomputed from the ledger on each run, so repeated runs on the same
/// data report the same totals.
pub async fn run(state: &AppState) -> AppResult<DailyReportOutcome> {
    let today = local_today(state.tz);
    let visits = VisitService::new(state.db.clone())
        .load(VisitFilter {
            bounds: UtcBounds::day(today, state.tz),
            ..Default::default()
        })
        .await?;
    let catalog = ProductService::new(state.db.clone()).catalog().await?;
    let totals = sales_totals(&visits, &catalog);

    tracing::info!(
        %today,
        visit_count = totals.visit_count,
        total_sales = %totals.total_sales,
        "Daily report computed"
    );

    let payload = PushPayload::daily_report(today, totals.total_sales, totals.visit_count);
    let delivery = match NotificationService::from_state(state)
        .notify(Audience::Admins, &payload)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!("Daily report notification failed: {}", e);
            DeliveryReport::default()
        }
    };

    Ok(DailyReportOutcome {
        date: today,
        total_sales: totals.total_sales,
        total_profit: totals.total_profit,
        visit_count: totals.visit_count,
        delivery,
    })
}
