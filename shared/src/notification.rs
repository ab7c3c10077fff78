//! Push notification payloads
//!
//! The payload shape matches what the service worker expects:
//! `{ "title": ..., "body": ..., "icon": ... }`.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ICON: &str = "/logo192.png";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl PushPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: DEFAULT_ICON.to_string(),
        }
    }

    /// Sent to admins after a visit is saved
    pub fn visit_recorded(sales_name: &str, customer_name: &str) -> Self {
        Self::new(
            "New Visit Recorded",
            format!("Sales {} finished a visit at {}.", sales_name, customer_name),
        )
    }

    /// Sent to sales users when a product is added
    pub fn new_product(product_name: &str, price: Decimal) -> Self {
        Self::new(
            "New Product Available",
            format!(
                "New product '{}' has been added at {}.",
                product_name,
                format_rupiah(price)
            ),
        )
    }

    /// Sent to a sales user given a newly created customer
    pub fn customer_assigned(customer_name: &str) -> Self {
        Self::new(
            "New Customer Assigned",
            format!("New customer \"{}\" has been assigned to you.", customer_name),
        )
    }

    /// Sent to a sales user taking over an existing customer
    pub fn customer_reassigned(customer_name: &str) -> Self {
        Self::new(
            "You Have a New Customer",
            format!(
                "Customer \"{}\" has been transferred and assigned to you.",
                customer_name
            ),
        )
    }

    pub fn daily_report(date: NaiveDate, total_sales: Decimal, visit_count: usize) -> Self {
        Self::new(
            "Daily Sales Report",
            format!(
                "Total sales for {}: {} from {} visit{}.",
                date.format("%d-%m-%Y"),
                format_rupiah(total_sales),
                visit_count,
                if visit_count == 1 { "" } else { "s" }
            ),
        )
    }

    pub fn low_stock(product_name: &str, outstanding: i64) -> Self {
        Self::new(
            "Low Stock Warning",
            format!(
                "Stock for '{}' is running low. {} pcs remaining across all customers.",
                product_name, outstanding
            ),
        )
    }

    pub fn test() -> Self {
        Self::new(
            "Test Push Notification",
            "If you can see this, push notifications are working!",
        )
    }
}

/// Format an amount as Rupiah: `.` groups thousands, `,` marks decimals
pub fn format_rupiah(amount: Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (text, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let mut out = String::from("Rp ");
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(&frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_format_rupiah() {
        assert_eq!(format_rupiah(Decimal::from(0)), "Rp 0");
        assert_eq!(format_rupiah(Decimal::from(999)), "Rp 999");
        assert_eq!(format_rupiah(Decimal::from(1000)), "Rp 1.000");
        assert_eq!(format_rupiah(Decimal::from(1_500_000)), "Rp 1.500.000");
        assert_eq!(format_rupiah(Decimal::from(-25_000)), "Rp -25.000");
        assert_eq!(
            format_rupiah(Decimal::from_str("12500.50").unwrap()),
            "Rp 12.500,5"
        );
    }

    #[test]
    fn test_payload_serializes_with_icon() {
        let json = serde_json::to_value(PushPayload::test()).unwrap();
        assert_eq!(json["icon"], "/logo192.png");
        assert!(json["title"].is_string());
    }

    #[test]
    fn test_low_stock_body() {
        let p = PushPayload::low_stock("Keripik Pedas", 12);
        assert!(p.body.contains("'Keripik Pedas'"));
        assert!(p.body.contains("12 pcs"));
    }
}
