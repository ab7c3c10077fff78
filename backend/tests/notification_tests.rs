//! Push notification payload tests
//!
//! Tests for the messages sent on business events:
//! - Visit recorded, product added, customer (re)assigned
//! - Daily sales report and low-stock warning
//! - Subscription JSON as sent by browsers

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::PushSubscription;
use shared::notification::{format_rupiah, PushPayload, DEFAULT_ICON};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_visit_recorded_names_both_parties() {
        let p = PushPayload::visit_recorded("Budi", "Toko Maju");
        assert!(p.body.contains("Budi"));
        assert!(p.body.contains("Toko Maju"));
        assert_eq!(p.icon, DEFAULT_ICON);
    }

    #[test]
    fn test_new_product_shows_price_in_rupiah() {
        let p = PushPayload::new_product("Keripik Singkong", dec("15000"));
        assert!(p.body.contains("'Keripik Singkong'"));
        assert!(p.body.contains("Rp 15.000"));
    }

    #[test]
    fn test_assignment_messages_differ() {
        let created = PushPayload::customer_assigned("Warung Bu Tini");
        let moved = PushPayload::customer_reassigned("Warung Bu Tini");
        assert_ne!(created.title, moved.title);
        assert!(created.body.contains("Warung Bu Tini"));
        assert!(moved.body.contains("Warung Bu Tini"));
    }

    #[test]
    fn test_daily_report_body() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let p = PushPayload::daily_report(date, dec("2750000"), 12);
        assert!(p.body.contains("01-03-2024"));
        assert!(p.body.contains("Rp 2.750.000"));
        assert!(p.body.contains("12 visits"));

        let single = PushPayload::daily_report(date, Decimal::ZERO, 1);
        assert!(single.body.contains("1 visit."));
    }

    #[test]
    fn test_low_stock_body() {
        let p = PushPayload::low_stock("Emping Melinjo", 40);
        assert!(p.body.contains("'Emping Melinjo'"));
        assert!(p.body.contains("40 pcs"));
    }

    #[test]
    fn test_browser_subscription_json() {
        let json = r#"{
            "endpoint": "https://push.example.com/send/abc",
            "expirationTime": null,
            "keys": { "p256dh": "BNc...", "auth": "tBH..." }
        }"#;
        let sub: PushSubscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub.endpoint, "https://push.example.com/send/abc");
        assert_eq!(sub.keys.auth, "tBH...");
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

        /// Whole amounts keep every digit, grouped in threes
        #[test]
        fn prop_rupiah_keeps_digits(amount in 0i64..10_000_000_000i64) {
            let text = format_rupiah(Decimal::from(amount));
            prop_assert!(text.starts_with("Rp "));

            let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
            prop_assert_eq!(digits, amount.to_string());

            for group in text.trim_start_matches("Rp ").split('.').skip(1) {
                prop_assert_eq!(group.len(), 3);
            }
        }
    }
}
