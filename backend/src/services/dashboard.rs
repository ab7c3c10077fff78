//! Dashboard aggregates
//!
//! Every figure is computed from the visit ledger at read time. Sales users
//! only ever see their own visits and customers.

use chrono_tz::Tz;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::services::visit::VisitFilter;
use crate::services::{CustomerService, ProductService, VisitService};
use crate::time::{local_today, UtcBounds};
use shared::aggregation::{self, DailySummary, RankedSales, RankedUnits, TOP_N};
use shared::consignment::{self, ActiveConsignment};
use shared::models::CustomerSummary;
use shared::types::DateRange;

#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
    tz: Tz,
}

impl DashboardService {
    pub fn new(db: PgPool, tz: Tz) -> Self {
        Self { db, tz }
    }

    /// Today's visits, sales, profit and best-selling product
    pub async fn summary(&self, user: &AuthUser) -> AppResult<DailySummary> {
        let today = local_today(self.tz);
        let visits = VisitService::new(self.db.clone())
            .load(VisitFilter {
                owner: user.owner_scope(),
                bounds: UtcBounds::day(today, self.tz),
                ..Default::default()
            })
            .await?;
        let catalog = ProductService::new(self.db.clone()).catalog().await?;

        Ok(aggregation::daily_summary(&visits, &catalog))
    }

    pub async fn top_customers(
        &self,
        user: &AuthUser,
        range: DateRange,
    ) -> AppResult<Vec<RankedSales>> {
        let visits = self.visits_in(user, range).await?;
        let catalog = ProductService::new(self.db.clone()).catalog().await?;
        let names = self.names("customers").await?;

        Ok(aggregation::top_customers(&visits, &catalog, &names, TOP_N))
    }

    pub async fn top_products(
        &self,
        user: &AuthUser,
        range: DateRange,
    ) -> AppResult<Vec<RankedUnits>> {
        let visits = self.visits_in(user, range).await?;
        let catalog = ProductService::new(self.db.clone()).catalog().await?;

        Ok(aggregation::top_products(&visits, &catalog, TOP_N))
    }

    pub async fn top_sales(&self, user: &AuthUser, range: DateRange) -> AppResult<Vec<RankedSales>> {
        let visits = self.visits_in(user, range).await?;
        let catalog = ProductService::new(self.db.clone()).catalog().await?;
        let names = self.names("users").await?;

        Ok(aggregation::top_sales_reps(&visits, &catalog, &names, TOP_N))
    }

    /// Customers whose latest visit left stock on the shelf
    pub async fn active_consignments(&self, user: &AuthUser) -> AppResult<Vec<ActiveConsignment>> {
        let (customers, visits) = self.consignment_inputs(user).await?;
        Ok(consignment::active_consignments(&customers, &visits))
    }

    /// Customers with no visit yet or an empty shelf after the latest one
    pub async fn inactive_consignments(&self, user: &AuthUser) -> AppResult<Vec<CustomerSummary>> {
        let (customers, visits) = self.consignment_inputs(user).await?;
        Ok(consignment::inactive_consignments(&customers, &visits))
    }

    async fn visits_in(
        &self,
        user: &AuthUser,
        range: DateRange,
    ) -> AppResult<Vec<shared::models::Visit>> {
        VisitService::new(self.db.clone())
            .load(VisitFilter {
                owner: user.owner_scope(),
                bounds: UtcBounds::from_range(range, self.tz),
                ..Default::default()
            })
            .await
    }

    async fn consignment_inputs(
        &self,
        user: &AuthUser,
    ) -> AppResult<(Vec<shared::models::Customer>, Vec<shared::models::Visit>)> {
        let owner = user.owner_scope();
        let customers = CustomerService::new(self.db.clone()).list_all(owner).await?;
        let visits = VisitService::new(self.db.clone())
            .load(VisitFilter {
                owner,
                ..Default::default()
            })
            .await?;
        Ok((customers, visits))
    }

    /// Display names of every row in `table`; only called with fixed table names
    async fn names(&self, table: &'static str) -> AppResult<HashMap<Uuid, String>> {
        let rows = sqlx::query_as::<_, (Uuid, String)>(&format!("SELECT id, name FROM {}", table))
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().collect())
    }
}
