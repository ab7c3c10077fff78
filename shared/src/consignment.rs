//! Consignment state reconstruction
//!
//! The most recent visit to a customer is the authoritative record of what
//! stock sits there now. Recency is decided by creation time, then visit id.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::ledger::{outstanding_stock, ProductCatalog};
use crate::models::{Customer, CustomerSummary, Visit};

/// Most recent visit per customer
pub fn latest_visit_per_customer(visits: &[Visit]) -> HashMap<Uuid, &Visit> {
    let mut latest: HashMap<Uuid, &Visit> = HashMap::new();
    for visit in visits {
        let newer = latest
            .get(&visit.customer_id)
            .map_or(true, |seen| visit.recency_key() > seen.recency_key());
        if newer {
            latest.insert(visit.customer_id, visit);
        }
    }
    latest
}

/// Outstanding stock per customer, from each customer's latest visit
pub fn outstanding_by_customer(visits: &[Visit]) -> HashMap<Uuid, i64> {
    latest_visit_per_customer(visits)
        .into_iter()
        .map(|(customer_id, visit)| (customer_id, outstanding_stock(&visit.inventory)))
        .collect()
}

/// A customer holding consignment stock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveConsignment {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub outstanding_stock: i64,
}

/// Customers whose latest visit left stock behind, in customer order
pub fn active_consignments(customers: &[Customer], visits: &[Visit]) -> Vec<ActiveConsignment> {
    let outstanding = outstanding_by_customer(visits);
    customers
        .iter()
        .filter_map(|c| {
            let stock = outstanding.get(&c.id).copied().unwrap_or(0);
            (stock > 0).then(|| ActiveConsignment {
                id: c.id,
                name: c.name.clone(),
                address: c.address.clone(),
                outstanding_stock: stock,
            })
        })
        .collect()
}

/// Every customer not in the active set, including never-visited ones
pub fn inactive_consignments(customers: &[Customer], visits: &[Visit]) -> Vec<CustomerSummary> {
    let active: HashSet<Uuid> = active_consignments(customers, visits)
        .into_iter()
        .map(|a| a.id)
        .collect();
    customers
        .iter()
        .filter(|c| !active.contains(&c.id))
        .map(CustomerSummary::from)
        .collect()
}

/// Outstanding stock per product summed across customers
///
/// For each (customer, product) pair only the most recent visit that
/// recorded the product counts.
pub fn outstanding_by_product(visits: &[Visit]) -> HashMap<Uuid, i64> {
    let mut latest: HashMap<(Uuid, Uuid), (&Visit, i64)> = HashMap::new();
    for visit in visits {
        for item in &visit.inventory {
            let key = (visit.customer_id, item.product_id);
            let newer = latest
                .get(&key)
                .map_or(true, |(seen, _)| visit.recency_key() > seen.recency_key());
            if newer {
                latest.insert(key, (visit, item.outstanding()));
            }
        }
    }

    let mut totals: HashMap<Uuid, i64> = HashMap::new();
    for ((_, product_id), (_, stock)) in latest {
        *totals.entry(product_id).or_insert(0) += stock;
    }
    totals
}

/// A product whose consignment stock fell below the threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockProduct {
    pub product_id: Uuid,
    pub name: String,
    pub outstanding: i64,
}

/// Products present in the ledger whose outstanding stock is strictly below
/// `threshold`; deleted products are skipped. Sorted by name.
pub fn low_stock_products(
    outstanding: &HashMap<Uuid, i64>,
    catalog: &ProductCatalog,
    threshold: i64,
) -> Vec<LowStockProduct> {
    let mut low: Vec<LowStockProduct> = outstanding
        .iter()
        .filter(|(_, &stock)| stock < threshold)
        .filter_map(|(id, &stock)| {
            catalog.get(id).map(|p| LowStockProduct {
                product_id: *id,
                name: p.name.clone(),
                outstanding: stock,
            })
        })
        .collect();
    low.sort_by(|a, b| a.name.cmp(&b.name).then(a.product_id.cmp(&b.product_id)));
    low
}
