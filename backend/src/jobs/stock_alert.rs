//! Hourly low-stock check over outstanding consignment stock

use serde::Serialize;

use crate::error::AppResult;
use crate::services::notification::Audience;
use crate::services::visit::VisitFilter;
use crate::services::{NotificationService, ProductService, SettingsService, VisitService};
use crate::AppState;
use shared::consignment::{low_stock_products, outstanding_by_product, LowStockProduct};
use shared::notification::PushPayload;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAlertOutcome {
    pub threshold: i64,
    pub low_products: Vec<LowStockProduct>,
    /// Pushes delivered across all alerts
    pub sent: usize,
    pub failed: usize,
}

/// Alert admins about every product below the configured threshold
pub async fn run(state: &AppState) -> AppResult<StockAlertOutcome> {
    let settings = SettingsService::new(state.db.clone()).get().await?;
    let visits = VisitService::new(state.db.clone())
        .load(VisitFilter::default())
        .await?;
    let catalog = ProductService::new(state.db.clone()).catalog().await?;

    let outstanding = outstanding_by_product(&visits);
    let low_products = low_stock_products(&outstanding, &catalog, settings.low_stock_threshold);

    if low_products.is_empty() {
        tracing::debug!(threshold = settings.low_stock_threshold, "No products below stock threshold");
    } else {
        tracing::info!(
            count = low_products.len(),
            threshold = settings.low_stock_threshold,
            "Products below stock threshold"
        );
    }

    let payloads: Vec<PushPayload> = low_products
        .iter()
        .map(|product| PushPayload::low_stock(&product.name, product.outstanding))
        .collect();
    let report = match NotificationService::from_state(state)
        .notify_each(Audience::Admins, &payloads)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!("Low-stock notifications failed: {}", e);
            Default::default()
        }
    };

    Ok(StockAlertOutcome {
        threshold: settings.low_stock_threshold,
        low_products,
        sent: report.sent,
        failed: report.failed,
    })
}
