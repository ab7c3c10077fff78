//! Consignment state tests
//!
//! Tests for reconstructing outstanding stock including:
//! - Property 2: Latest visit decides whether a customer is active
//! - Property 5: Low-stock threshold is strict
//! - Property 7: Never-visited customers are inactive

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::consignment::{
    active_consignments, inactive_consignments, low_stock_products, outstanding_by_product,
};
use shared::ledger::ProductCatalog;
use shared::models::{Customer, InventoryLineItem, ProductPricing, Visit, VisitPhotos};
use std::collections::HashMap;
use uuid::Uuid;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap()
}

fn customer(name: &str) -> Customer {
    Customer {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        name: name.to_string(),
        address: format!("Jl. {} No. 1", name),
        phone: "0812000000".to_string(),
        latitude: Some(-6.2),
        longitude: Some(106.8),
        created_at: base_time(),
        updated_at: base_time(),
    }
}

fn visit(customer_id: Uuid, minutes: i64, items: Vec<(Uuid, i32)>) -> Visit {
    Visit {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        customer_id,
        inventory: items
            .into_iter()
            .map(|(product_id, final_stock)| InventoryLineItem {
                product_id,
                initial_stock: final_stock,
                added_stock: 0,
                final_stock,
                returns: 0,
            })
            .collect(),
        photos: VisitPhotos::new(),
        attendance_photo: None,
        sales_latitude: Some(-6.2),
        sales_longitude: Some(106.8),
        total_profit: Decimal::ZERO,
        created_at: base_time() + Duration::minutes(minutes),
    }
}

fn catalog(names: &[(Uuid, &str)]) -> ProductCatalog {
    names
        .iter()
        .map(|(id, name)| {
            (
                *id,
                ProductPricing {
                    name: name.to_string(),
                    price: Decimal::from(1000),
                    profit: Decimal::from(200),
                },
            )
        })
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Property 2: V1 (older, 5 left) then V2 (newer, 0 left)
    #[test]
    fn test_emptied_shelf_is_inactive() {
        let product = Uuid::new_v4();
        let toko = customer("Toko Maju");
        let visits = vec![
            visit(toko.id, 0, vec![(product, 5)]),
            visit(toko.id, 60, vec![(product, 0)]),
        ];
        let customers = vec![toko.clone()];

        assert!(active_consignments(&customers, &visits).is_empty());
        let inactive = inactive_consignments(&customers, &visits);
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].id, toko.id);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let product = Uuid::new_v4();
        let toko = customer("Toko Maju");
        // newest first in the slice; recency still decides
        let visits = vec![
            visit(toko.id, 60, vec![(product, 0)]),
            visit(toko.id, 0, vec![(product, 5)]),
        ];

        assert!(active_consignments(&[toko], &visits).is_empty());
    }

    /// Property 7: zero visits is inactive; one visit leaving 10 is active
    #[test]
    fn test_never_visited_and_single_visit() {
        let product = Uuid::new_v4();
        let fresh = customer("Warung Baru");
        let stocked = customer("Toko Lama");
        let customers = vec![fresh.clone(), stocked.clone()];
        let visits = vec![visit(stocked.id, 0, vec![(product, 10)])];

        let active = active_consignments(&customers, &visits);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, stocked.id);
        assert_eq!(active[0].outstanding_stock, 10);

        let inactive = inactive_consignments(&customers, &visits);
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].id, fresh.id);
    }

    #[test]
    fn test_outstanding_sums_every_line_of_latest_visit() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let toko = customer("Toko Maju");
        let visits = vec![visit(toko.id, 0, vec![(a, 3), (b, 4)])];

        let active = active_consignments(&[toko], &visits);
        assert_eq!(active[0].outstanding_stock, 7);
    }

    /// Property 5: threshold 50, outstanding 40 is low
    #[test]
    fn test_low_stock_threshold() {
        let low = Uuid::new_v4();
        let edge = Uuid::new_v4();
        let plenty = Uuid::new_v4();
        let catalog = catalog(&[(low, "Kacang"), (edge, "Emping"), (plenty, "Rengginang")]);

        let mut outstanding = HashMap::new();
        outstanding.insert(low, 40);
        outstanding.insert(edge, 50);
        outstanding.insert(plenty, 120);

        let alerts = low_stock_products(&outstanding, &catalog, 50);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].product_id, low);
        assert_eq!(alerts[0].outstanding, 40);
    }

    #[test]
    fn test_outstanding_by_product_uses_latest_per_customer() {
        let product = Uuid::new_v4();
        let a = customer("A");
        let b = customer("B");
        let visits = vec![
            visit(a.id, 0, vec![(product, 30)]),
            visit(a.id, 10, vec![(product, 12)]),
            visit(b.id, 5, vec![(product, 8)]),
            // a later visit to A without the product keeps the 12
            visit(a.id, 20, vec![(Uuid::new_v4(), 99)]),
        ];

        assert_eq!(outstanding_by_product(&visits).get(&product), Some(&20));
    }

    #[test]
    fn test_deleted_products_never_alert() {
        let gone = Uuid::new_v4();
        let mut outstanding = HashMap::new();
        outstanding.insert(gone, 0);

        assert!(low_stock_products(&outstanding, &ProductCatalog::new(), 50).is_empty());
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

        /// Active and inactive partition the customer list
        #[test]
        fn prop_active_inactive_partition(
            stocks in prop::collection::vec(prop::option::of(0i32..20), 1..12),
        ) {
            let product = Uuid::new_v4();
            let customers: Vec<Customer> = (0..stocks.len())
                .map(|i| customer(&format!("Toko {}", i)))
                .collect();
            let visits: Vec<Visit> = customers
                .iter()
                .zip(&stocks)
                .filter_map(|(c, stock)| stock.map(|s| visit(c.id, 0, vec![(product, s)])))
                .collect();

            let active = active_consignments(&customers, &visits);
            let inactive = inactive_consignments(&customers, &visits);

            prop_assert_eq!(active.len() + inactive.len(), customers.len());
            for a in &active {
                prop_assert!(a.outstanding_stock > 0);
                prop_assert!(!inactive.iter().any(|i| i.id == a.id));
            }
        }

        /// Property 5: flagged iff outstanding < threshold
        #[test]
        fn prop_low_stock_is_strict(stock in 0i64..200, threshold in 0i64..200) {
            let product = Uuid::new_v4();
            let catalog = catalog(&[(product, "Kacang")]);
            let mut outstanding = HashMap::new();
            outstanding.insert(product, stock);

            let flagged = !low_stock_products(&outstanding, &catalog, threshold).is_empty();
            prop_assert_eq!(flagged, stock < threshold);
        }
    }
}
