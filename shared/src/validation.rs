//! Validation utilities for the sales tracker

use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::models::InventoryLineItem;
use crate::types::GeoPoint;

pub const MIN_PASSWORD_LENGTH: usize = 6;

// ============================================================================
// Account Validations
// ============================================================================

/// Validate password length
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 6 characters");
    }
    Ok(())
}

/// Usernames are stored lowercase and trimmed
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Validate a normalized username: 3-32 chars of `a-z`, `0-9`, `.`, `_`, `-`
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err("Username must be between 3 and 32 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
    {
        return Err("Username may only contain lowercase letters, digits, '.', '_' and '-'");
    }
    Ok(())
}

/// Validate that a required text field is not blank
pub fn validate_required(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("Field is required");
    }
    Ok(())
}

// ============================================================================
// Master Data Validations
// ============================================================================

/// Validate a unit price or profit margin
pub fn validate_money(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

/// Validate coordinate ranges
pub fn validate_coordinates(point: GeoPoint) -> Result<(), &'static str> {
    if !point.latitude.is_finite() || !point.longitude.is_finite() {
        return Err("Coordinates must be numbers");
    }
    if !(-90.0..=90.0).contains(&point.latitude) {
        return Err("Latitude must be between -90 and 90");
    }
    if !(-180.0..=180.0).contains(&point.longitude) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

// ============================================================================
// Ledger Validations
// ============================================================================

/// Validate the stock counts of a single line
pub fn validate_line_item(item: &InventoryLineItem) -> Result<(), &'static str> {
    if item.initial_stock < 0 || item.added_stock < 0 || item.final_stock < 0 || item.returns < 0
    {
        return Err("Stock counts cannot be negative");
    }
    Ok(())
}

/// Validate every line of a visit and reject a product listed twice
pub fn validate_line_items(items: &[InventoryLineItem]) -> Result<(), &'static str> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        validate_line_item(item)?;
        if !seen.insert(item.product_id) {
            return Err("A product may appear only once per visit");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn line(initial: i32, added: i32, fin: i32, returns: i32) -> InventoryLineItem {
        InventoryLineItem {
            product_id: Uuid::new_v4(),
            initial_stock: initial,
            added_stock: added,
            final_stock: fin,
            returns,
        }
    }

    // ========================================================================
    // Account Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_password() {
        assert!(validate_password("123456").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  Budi.Santoso "), "budi.santoso");
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("budi").is_ok());
        assert!(validate_username("sales_01").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("Budi").is_err());
        assert!(validate_username("budi santoso").is_err());
    }

    #[test]
    fn test_validate_required() {
        assert!(validate_required("Toko Maju").is_ok());
        assert!(validate_required("   ").is_err());
    }

    // ========================================================================
    // Master Data Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_money() {
        assert!(validate_money(Decimal::ZERO).is_ok());
        assert!(validate_money(Decimal::from(15_000)).is_ok());
        assert!(validate_money(Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(GeoPoint::new(-6.2, 106.8)).is_ok());
        assert!(validate_coordinates(GeoPoint::new(90.0, 180.0)).is_ok());
        assert!(validate_coordinates(GeoPoint::new(91.0, 0.0)).is_err());
        assert!(validate_coordinates(GeoPoint::new(0.0, -180.5)).is_err());
        assert!(validate_coordinates(GeoPoint::new(f64::NAN, 0.0)).is_err());
    }

    // ========================================================================
    // Ledger Validation Tests
    // ========================================================================

    #[test]
    fn test_negative_counts_rejected() {
        assert!(validate_line_item(&line(10, 0, 5, 0)).is_ok());
        assert!(validate_line_item(&line(-1, 0, 5, 0)).is_err());
        assert!(validate_line_item(&line(10, -2, 5, 0)).is_err());
        assert!(validate_line_item(&line(10, 0, -5, 0)).is_err());
        assert!(validate_line_item(&line(10, 0, 5, -1)).is_err());
    }

    #[test]
    fn test_net_restock_line_is_valid() {
        // Nothing sold, more stock left than found
        assert!(validate_line_item(&line(0, 40, 40, 0)).is_ok());
    }

    #[test]
    fn test_duplicate_product_rejected() {
        let a = line(10, 0, 5, 0);
        let b = line(3, 0, 3, 0);
        assert!(validate_line_items(&[a, b]).is_ok());
        assert!(validate_line_items(&[a, a]).is_err());
        assert!(validate_line_items(&[]).is_ok());
    }
}
