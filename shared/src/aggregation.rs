//! Sales and profit aggregation over visit ledgers
//!
//! Callers load the visits in scope (date range, owner) in ascending
//! recency order and hand them here together with the current product
//! catalog. Rankings group by key, sort descending with ties kept in first
//! appearance order, and keep the top N.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::AddAssign;
use uuid::Uuid;

use crate::ledger::{contribution, Contribution, ProductCatalog};
use crate::models::Visit;

/// Size of every dashboard ranking
pub const TOP_N: usize = 5;

/// Placeholder product name when nothing was sold
pub const NO_TOP_PRODUCT: &str = "-";

/// Group `(key, value)` pairs, sort descending and keep the first `n`
///
/// Ties keep the order in which each key first appeared.
pub fn rank_top_n<K, V>(entries: impl IntoIterator<Item = (K, V)>, n: usize) -> Vec<(K, V)>
where
    K: Eq + Hash + Copy,
    V: Ord + Copy + AddAssign,
{
    let mut grouped: Vec<(K, V)> = Vec::new();
    let mut index: HashMap<K, usize> = HashMap::new();

    for (key, value) in entries {
        match index.get(&key) {
            Some(&i) => grouped[i].1 += value,
            None => {
                index.insert(key, grouped.len());
                grouped.push((key, value));
            }
        }
    }

    // sort_by is stable, so equal totals stay in first-seen order
    grouped.sort_by(|a, b| b.1.cmp(&a.1));
    grouped.truncate(n);
    grouped
}

/// Totals over a set of visits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesTotals {
    pub total_sales: Decimal,
    pub total_profit: Decimal,
    pub units_sold: i64,
    pub visit_count: usize,
}

pub fn sales_totals(visits: &[Visit], catalog: &ProductCatalog) -> SalesTotals {
    let mut sum = Contribution::default();
    for visit in visits {
        for item in &visit.inventory {
            if let Some(c) = contribution(item, catalog) {
                sum += c;
            }
        }
    }
    SalesTotals {
        total_sales: sum.sales,
        total_profit: sum.profit,
        units_sold: sum.units,
        visit_count: visits.len(),
    }
}

/// Dashboard summary for a single day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub visits_today: usize,
    pub sales_today: Decimal,
    pub total_profit_today: Decimal,
    pub top_product: String,
}

/// Summarize visits already restricted to one day
pub fn daily_summary(visits: &[Visit], catalog: &ProductCatalog) -> DailySummary {
    let totals = sales_totals(visits, catalog);
    let top_product = rank_top_n(product_units(visits, catalog), 1)
        .first()
        .and_then(|(id, _)| catalog.get(id))
        .map(|p| p.name.clone())
        .unwrap_or_else(|| NO_TOP_PRODUCT.to_string());

    DailySummary {
        visits_today: totals.visit_count,
        sales_today: totals.total_sales,
        total_profit_today: totals.total_profit,
        top_product,
    }
}

/// Ranking entry valued in currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSales {
    pub id: Uuid,
    pub name: String,
    pub total_sales: Decimal,
}

/// Ranking entry valued in units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedUnits {
    pub id: Uuid,
    pub name: String,
    pub total_sold: i64,
}

fn product_units<'a>(
    visits: &'a [Visit],
    catalog: &'a ProductCatalog,
) -> impl Iterator<Item = (Uuid, i64)> + 'a {
    visits.iter().flat_map(move |v| {
        v.inventory
            .iter()
            .filter_map(move |item| contribution(item, catalog).map(|c| (item.product_id, c.units)))
    })
}

fn sales_by<'a>(
    visits: &'a [Visit],
    catalog: &'a ProductCatalog,
    key: impl Fn(&Visit) -> Uuid + 'a,
) -> impl Iterator<Item = (Uuid, Decimal)> + 'a {
    visits.iter().flat_map(move |v| {
        let k = key(v);
        v.inventory
            .iter()
            .filter_map(move |item| contribution(item, catalog).map(|c| (k, c.sales)))
    })
}

/// Top customers by sales value; deleted customers are skipped before truncation
pub fn top_customers(
    visits: &[Visit],
    catalog: &ProductCatalog,
    customer_names: &HashMap<Uuid, String>,
    n: usize,
) -> Vec<RankedSales> {
    let entries = sales_by(visits, catalog, |v| v.customer_id)
        .filter(|(id, _)| customer_names.contains_key(id));
    rank_top_n(entries, n)
        .into_iter()
        .filter_map(|(id, total_sales)| {
            customer_names.get(&id).map(|name| RankedSales {
                id,
                name: name.clone(),
                total_sales,
            })
        })
        .collect()
}

/// Top products by units sold
pub fn top_products(visits: &[Visit], catalog: &ProductCatalog, n: usize) -> Vec<RankedUnits> {
    rank_top_n(product_units(visits, catalog), n)
        .into_iter()
        .filter_map(|(id, total_sold)| {
            catalog.get(&id).map(|p| RankedUnits {
                id,
                name: p.name.clone(),
                total_sold,
            })
        })
        .collect()
}

/// Top sales users by sales value; deleted users are skipped before truncation
pub fn top_sales_reps(
    visits: &[Visit],
    catalog: &ProductCatalog,
    user_names: &HashMap<Uuid, String>,
    n: usize,
) -> Vec<RankedSales> {
    let entries =
        sales_by(visits, catalog, |v| v.user_id).filter(|(id, _)| user_names.contains_key(id));
    rank_top_n(entries, n)
        .into_iter()
        .filter_map(|(id, total_sales)| {
            user_names.get(&id).map(|name| RankedSales {
                id,
                name: name.clone(),
                total_sales,
            })
        })
        .collect()
}

/// A customer currently holding stock of one product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStock {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub last_visit_date: DateTime<Utc>,
    pub final_stock: i64,
}

/// Where one product's stock sits and how much of it has sold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStockReport {
    pub product_id: Uuid,
    pub total_stock_outside: i64,
    pub total_sold: i64,
    pub customers_with_stock: Vec<CustomerStock>,
}

/// Build the stock report for one product
///
/// Outstanding stock comes from each customer's most recent visit that
/// recorded the product. Units sold sum every positive line. Visits to
/// customers that no longer exist are ignored.
pub fn product_stock_report(
    product_id: Uuid,
    visits: &[Visit],
    customer_names: &HashMap<Uuid, String>,
) -> ProductStockReport {
    let mut latest: HashMap<Uuid, (&Visit, i64)> = HashMap::new();
    let mut total_sold = 0;

    for visit in visits {
        if !customer_names.contains_key(&visit.customer_id) {
            continue;
        }
        let Some(item) = visit.item_for(product_id) else {
            continue;
        };
        total_sold += item.units_sold().max(0);

        let newer = latest
            .get(&visit.customer_id)
            .map_or(true, |(seen, _)| visit.recency_key() > seen.recency_key());
        if newer {
            latest.insert(visit.customer_id, (visit, item.outstanding()));
        }
    }

    let total_stock_outside = latest.values().map(|(_, stock)| stock).sum();
    let mut customers_with_stock: Vec<CustomerStock> = latest
        .into_iter()
        .filter(|(_, (_, stock))| *stock > 0)
        .filter_map(|(customer_id, (visit, stock))| {
            customer_names.get(&customer_id).map(|name| CustomerStock {
                customer_id,
                customer_name: name.clone(),
                last_visit_date: visit.created_at,
                final_stock: stock,
            })
        })
        .collect();
    customers_with_stock.sort_by(|a, b| {
        a.customer_name
            .cmp(&b.customer_name)
            .then(a.customer_id.cmp(&b.customer_id))
    });

    ProductStockReport {
        product_id,
        total_stock_outside,
        total_sold,
        customers_with_stock,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_groups_and_sorts() {
        let ranked = rank_top_n(vec![("a", 3), ("b", 5), ("a", 4), ("c", 1)], 2);
        assert_eq!(ranked, vec![("a", 7), ("b", 5)]);
    }

    #[test]
    fn test_rank_ties_keep_first_seen_order() {
        let ranked = rank_top_n(vec![("x", 2), ("y", 2), ("z", 2)], 5);
        assert_eq!(ranked, vec![("x", 2), ("y", 2), ("z", 2)]);
    }

    #[test]
    fn test_rank_empty() {
        let ranked: Vec<(u8, i64)> = rank_top_n(Vec::new(), TOP_N);
        assert!(ranked.is_empty());
    }
}
