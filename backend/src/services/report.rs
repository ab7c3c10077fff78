//! Reporting service
//!
//! Per-rep performance, per-product stock and per-day visit reports, plus
//! CSV export of visit listings.

use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::visit::{VisitDetail, VisitFilter};
use crate::services::{ProductService, VisitService};
use crate::time::UtcBounds;
use shared::aggregation::{self, ProductStockReport};
use shared::ledger::{visit_contribution, ProductCatalog};
use shared::models::Visit;
use shared::types::DateRange;

#[derive(Clone)]
pub struct ReportService {
    db: PgPool,
    tz: Tz,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub total_sales: Decimal,
    pub total_profit: Decimal,
    pub visit_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesPerformance {
    pub summary: PerformanceSummary,
    pub visits: Vec<VisitDetail>,
}

/// Flat visit row for CSV export
#[derive(Debug, Serialize)]
pub struct VisitCsvRow {
    pub visit_id: Uuid,
    pub visited_at: String,
    pub sales_rep: String,
    pub customer: String,
    pub customer_address: String,
    pub sales_latitude: Option<f64>,
    pub sales_longitude: Option<f64>,
    pub units_sold: i64,
    pub total_sales: Decimal,
    pub total_profit: Decimal,
}

impl ReportService {
    pub fn new(db: PgPool, tz: Tz) -> Self {
        Self { db, tz }
    }

    /// Totals and visit list for one sales user over a date range
    pub async fn sales_performance(
        &self,
        user_id: Uuid,
        range: DateRange,
    ) -> AppResult<(SalesPerformance, ProductCatalog)> {
        let visits = VisitService::new(self.db.clone())
            .load(VisitFilter {
                owner: Some(user_id),
                bounds: UtcBounds::from_range(range, self.tz),
                ..Default::default()
            })
            .await?;
        let catalog = ProductService::new(self.db.clone()).catalog().await?;
        let totals = aggregation::sales_totals(&visits, &catalog);

        let newest_first: Vec<Visit> = visits.into_iter().rev().collect();
        let visits = VisitService::new(self.db.clone())
            .populate(newest_first)
            .await?;

        tracing::debug!(
            %user_id,
            visit_count = totals.visit_count,
            total_sales = %totals.total_sales,
            "Sales performance computed"
        );

        Ok((
            SalesPerformance {
                summary: PerformanceSummary {
                    total_sales: totals.total_sales,
                    total_profit: totals.total_profit,
                    visit_count: totals.visit_count,
                },
                visits,
            },
            catalog,
        ))
    }

    /// Where a product's consignment stock currently sits
    pub async fn product_stock(&self, product_id: Uuid) -> AppResult<ProductStockReport> {
        ProductService::new(self.db.clone())
            .find(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let visits = VisitService::new(self.db.clone())
            .load(VisitFilter {
                product_id: Some(product_id),
                ..Default::default()
            })
            .await?;

        let customer_names: HashMap<Uuid, String> =
            sqlx::query_as::<_, (Uuid, String)>("SELECT id, name FROM customers")
                .fetch_all(&self.db)
                .await?
                .into_iter()
                .collect();

        Ok(aggregation::product_stock_report(
            product_id,
            &visits,
            &customer_names,
        ))
    }

    /// Every visit on one local day, oldest first
    pub async fn visits_by_date(&self, date: NaiveDate) -> AppResult<Vec<VisitDetail>> {
        let service = VisitService::new(self.db.clone());
        let visits = service
            .load(VisitFilter {
                bounds: UtcBounds::day(date, self.tz),
                ..Default::default()
            })
            .await?;
        service.populate(visits).await
    }

    /// Flatten populated visits into CSV rows
    pub fn csv_rows(&self, visits: &[VisitDetail], catalog: &ProductCatalog) -> Vec<VisitCsvRow> {
        visits
            .iter()
            .map(|visit| {
                let items: Vec<_> = visit
                    .inventory
                    .iter()
                    .map(|line| shared::models::InventoryLineItem {
                        product_id: line.product_id,
                        initial_stock: line.initial_stock,
                        added_stock: line.added_stock,
                        final_stock: line.final_stock,
                        returns: line.returns,
                    })
                    .collect();
                let sold = visit_contribution(&items, catalog);

                VisitCsvRow {
                    visit_id: visit.id,
                    visited_at: visit
                        .created_at
                        .with_timezone(&self.tz)
                        .format("%Y-%m-%d %H:%M")
                        .to_string(),
                    sales_rep: visit
                        .user
                        .as_ref()
                        .map(|u| u.name.clone())
                        .unwrap_or_default(),
                    customer: visit
                        .customer
                        .as_ref()
                        .map(|c| c.name.clone())
                        .unwrap_or_default(),
                    customer_address: visit
                        .customer
                        .as_ref()
                        .map(|c| c.address.clone())
                        .unwrap_or_default(),
                    sales_latitude: visit.sales_latitude,
                    sales_longitude: visit.sales_longitude,
                    units_sold: sold.units,
                    total_sales: sold.sales,
                    total_profit: sold.profit,
                }
            })
            .collect()
    }

    /// Export data to CSV format
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_to_csv_writes_header_and_rows() {
        let rows = vec![VisitCsvRow {
            visit_id: Uuid::nil(),
            visited_at: "2024-03-01 10:00".to_string(),
            sales_rep: "Budi".to_string(),
            customer: "Toko Maju".to_string(),
            customer_address: "Jl. Merdeka 1".to_string(),
            sales_latitude: Some(-6.2),
            sales_longitude: None,
            units_sold: 15,
            total_sales: Decimal::new(15000, 0),
            total_profit: Decimal::new(3000, 0),
        }];

        let csv = ReportService::export_to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "visit_id,visited_at,sales_rep,customer,customer_address,sales_latitude,sales_longitude,units_sold,total_sales,total_profit"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("Toko Maju"));
        assert!(row.ends_with(",15,15000,3000"));
    }

    #[test]
    fn test_export_empty_is_empty() {
        let rows: Vec<VisitCsvRow> = Vec::new();
        assert_eq!(ReportService::export_to_csv(&rows).unwrap(), "");
    }
}
