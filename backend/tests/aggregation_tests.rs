//! Sales aggregation tests
//!
//! Tests for dashboard and report figures including:
//! - Property 4: Top-N rankings are bounded and sorted
//! - Property 6: Daily report totals are a pure recomputation
//! - Per-product stock report

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::aggregation::{
    daily_summary, product_stock_report, rank_top_n, sales_totals, top_customers, top_products,
    top_sales_reps, NO_TOP_PRODUCT, TOP_N,
};
use shared::ledger::ProductCatalog;
use shared::models::{InventoryLineItem, ProductPricing, Visit, VisitPhotos};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap()
}

/// Visit where each `(product, sold, left)` line sold `sold` units and left `left`
fn visit(customer_id: Uuid, user_id: Uuid, minutes: i64, lines: &[(Uuid, i32, i32)]) -> Visit {
    Visit {
        id: Uuid::new_v4(),
        user_id,
        customer_id,
        inventory: lines
            .iter()
            .map(|&(product_id, sold, left)| InventoryLineItem {
                product_id,
                initial_stock: sold + left,
                added_stock: 0,
                final_stock: left,
                returns: 0,
            })
            .collect(),
        photos: VisitPhotos::new(),
        attendance_photo: None,
        sales_latitude: None,
        sales_longitude: None,
        total_profit: Decimal::ZERO,
        created_at: base_time() + Duration::minutes(minutes),
    }
}

fn pricing(name: &str, price: &str, profit: &str) -> ProductPricing {
    ProductPricing {
        name: name.to_string(),
        price: dec(price),
        profit: dec(profit),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_daily_summary_totals_and_top_product() {
        let kacang = Uuid::new_v4();
        let emping = Uuid::new_v4();
        let catalog: ProductCatalog = [
            (kacang, pricing("Kacang", "1000", "200")),
            (emping, pricing("Emping", "5000", "1000")),
        ]
        .into_iter()
        .collect();

        let customer = Uuid::new_v4();
        let rep = Uuid::new_v4();
        let visits = vec![
            visit(customer, rep, 0, &[(kacang, 10, 5), (emping, 2, 3)]),
            visit(customer, rep, 30, &[(kacang, 4, 1)]),
        ];

        let summary = daily_summary(&visits, &catalog);
        assert_eq!(summary.visits_today, 2);
        assert_eq!(summary.sales_today, dec("24000"));
        assert_eq!(summary.total_profit_today, dec("4800"));
        assert_eq!(summary.top_product, "Kacang");
    }

    #[test]
    fn test_daily_summary_without_sales() {
        let summary = daily_summary(&[], &ProductCatalog::new());
        assert_eq!(summary.visits_today, 0);
        assert_eq!(summary.sales_today, Decimal::ZERO);
        assert_eq!(summary.top_product, NO_TOP_PRODUCT);
    }

    /// Property 6: recomputing over unchanged visits gives the same totals
    #[test]
    fn test_daily_report_is_idempotent() {
        let product = Uuid::new_v4();
        let catalog: ProductCatalog = [(product, pricing("Kacang", "1500", "300"))]
            .into_iter()
            .collect();
        let visits = vec![
            visit(Uuid::new_v4(), Uuid::new_v4(), 0, &[(product, 7, 3)]),
            visit(Uuid::new_v4(), Uuid::new_v4(), 5, &[(product, 3, 0)]),
        ];

        let first = sales_totals(&visits, &catalog);
        let second = sales_totals(&visits, &catalog);
        assert_eq!(first, second);
        assert_eq!(first.total_sales, dec("15000"));
        assert_eq!(first.visit_count, 2);
    }

    #[test]
    fn test_top_customers_skip_deleted_before_truncating() {
        let product = Uuid::new_v4();
        let catalog: ProductCatalog = [(product, pricing("Kacang", "1000", "100"))]
            .into_iter()
            .collect();
        let rep = Uuid::new_v4();

        let customers: Vec<Uuid> = (0..7).map(|_| Uuid::new_v4()).collect();
        let mut names = HashMap::new();
        let mut visits = Vec::new();
        for (i, id) in customers.iter().enumerate() {
            visits.push(visit(*id, rep, i as i64, &[(product, 10 * (i as i32 + 1), 0)]));
            names.insert(*id, format!("Toko {}", i));
        }
        // the biggest buyer was deleted
        names.remove(&customers[6]);

        let top = top_customers(&visits, &catalog, &names, TOP_N);
        assert_eq!(top.len(), TOP_N);
        assert_eq!(top[0].name, "Toko 5");
        assert_eq!(top[0].total_sales, dec("60000"));
        assert_eq!(top[4].name, "Toko 1");
    }

    #[test]
    fn test_top_products_rank_by_units() {
        let cheap = Uuid::new_v4();
        let pricey = Uuid::new_v4();
        let catalog: ProductCatalog = [
            (cheap, pricing("Permen", "500", "50")),
            (pricey, pricing("Madu", "90000", "15000")),
        ]
        .into_iter()
        .collect();
        let visits = vec![visit(
            Uuid::new_v4(),
            Uuid::new_v4(),
            0,
            &[(cheap, 40, 0), (pricey, 3, 0)],
        )];

        let top = top_products(&visits, &catalog, TOP_N);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Permen");
        assert_eq!(top[0].total_sold, 40);
        assert_eq!(top[1].total_sold, 3);
    }

    #[test]
    fn test_top_sales_ties_keep_first_seen() {
        let product = Uuid::new_v4();
        let catalog: ProductCatalog = [(product, pricing("Kacang", "1000", "100"))]
            .into_iter()
            .collect();
        let (budi, sari) = (Uuid::new_v4(), Uuid::new_v4());
        let names: HashMap<Uuid, String> =
            [(budi, "Budi".to_string()), (sari, "Sari".to_string())].into_iter().collect();
        let visits = vec![
            visit(Uuid::new_v4(), sari, 0, &[(product, 5, 0)]),
            visit(Uuid::new_v4(), budi, 1, &[(product, 5, 0)]),
        ];

        let top = top_sales_reps(&visits, &catalog, &names, TOP_N);
        assert_eq!(top[0].name, "Sari");
        assert_eq!(top[1].name, "Budi");
    }

    #[test]
    fn test_product_stock_report() {
        let product = Uuid::new_v4();
        let (a, b, gone) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let names: HashMap<Uuid, String> = [(a, "Toko A".to_string()), (b, "Toko B".to_string())]
            .into_iter()
            .collect();
        let rep = Uuid::new_v4();
        let visits = vec![
            visit(a, rep, 0, &[(product, 10, 20)]),
            visit(a, rep, 60, &[(product, 5, 15)]),
            visit(b, rep, 30, &[(product, 8, 0)]),
            visit(gone, rep, 10, &[(product, 50, 50)]),
        ];

        let report = product_stock_report(product, &visits, &names);
        assert_eq!(report.total_stock_outside, 15);
        assert_eq!(report.total_sold, 23);
        assert_eq!(report.customers_with_stock.len(), 1);
        assert_eq!(report.customers_with_stock[0].customer_id, a);
        assert_eq!(report.customers_with_stock[0].final_stock, 15);
        assert_eq!(
            report.customers_with_stock[0].last_visit_date,
            base_time() + Duration::minutes(60)
        );
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property 4: never more than N entries, sorted descending
        #[test]
        fn prop_top_n_bounded_and_sorted(
            entries in prop::collection::vec((0u8..20, 0i64..1000), 0..60),
            n in 0usize..10,
        ) {
            let ranked = rank_top_n(entries.clone(), n);

            prop_assert!(ranked.len() <= n);
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].1 >= pair[1].1);
            }

            // every ranked total equals the sum for its key
            for (key, total) in &ranked {
                let expected: i64 = entries.iter().filter(|(k, _)| k == key).map(|(_, v)| v).sum();
                prop_assert_eq!(*total, expected);
            }
        }

        /// Property 6: totals do not depend on how often they are computed
        #[test]
        fn prop_sales_totals_deterministic(
            lines in prop::collection::vec((0i32..50, 0i32..50), 0..20),
        ) {
            let product = Uuid::new_v4();
            let catalog: ProductCatalog = [(product, pricing("Kacang", "1000", "250"))]
                .into_iter()
                .collect();
            let visits: Vec<Visit> = lines
                .iter()
                .enumerate()
                .map(|(i, &(sold, left))| visit(Uuid::new_v4(), Uuid::new_v4(), i as i64, &[(product, sold, left)]))
                .collect();

            let totals = sales_totals(&visits, &catalog);
            prop_assert_eq!(totals, sales_totals(&visits, &catalog));

            let units: i64 = lines.iter().map(|&(sold, _)| i64::from(sold)).sum();
            prop_assert_eq!(totals.units_sold, units);
            prop_assert_eq!(totals.total_sales, Decimal::from(units) * dec("1000"));
        }
    }
}
