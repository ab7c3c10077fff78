//! Product master data

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product carried on consignment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// Unit selling price
    pub price: Decimal,
    /// Unit profit margin
    pub profit: Decimal,
    pub barcode: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn pricing(&self) -> ProductPricing {
        ProductPricing {
            name: self.name.clone(),
            price: self.price,
            profit: self.profit,
        }
    }
}

/// The subset of a product the ledger needs to value a line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductPricing {
    pub name: String,
    pub price: Decimal,
    pub profit: Decimal,
}

/// Normalize a barcode: surrounding whitespace trimmed, blank becomes `None`
pub fn normalize_barcode(barcode: Option<&str>) -> Option<String> {
    barcode
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_barcode_is_none() {
        assert_eq!(normalize_barcode(Some("")), None);
        assert_eq!(normalize_barcode(Some("   ")), None);
        assert_eq!(normalize_barcode(None), None);
        assert_eq!(normalize_barcode(Some(" 899123 ")), Some("899123".to_string()));
    }
}
