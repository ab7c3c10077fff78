//! Visits and their inventory ledger lines

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One product's stock movement during a visit
///
/// Identified by (visit id, product id); never mutated after creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLineItem {
    #[serde(alias = "product")]
    pub product_id: Uuid,
    pub initial_stock: i32,
    #[serde(default)]
    pub added_stock: i32,
    pub final_stock: i32,
    pub returns: i32,
}

/// Before/after photo file references for one product
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductPhotos {
    #[serde(default)]
    pub before: Vec<String>,
    #[serde(default)]
    pub after: Vec<String>,
}

/// Photo evidence keyed by product id
pub type VisitPhotos = BTreeMap<Uuid, ProductPhotos>;

/// Which side of the stock count a photo documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoStage {
    Before,
    After,
}

impl PhotoStage {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "before" => Some(PhotoStage::Before),
            "after" => Some(PhotoStage::After),
            _ => None,
        }
    }
}

/// Parse a multipart photo field name of the form `photo_<productId>_<before|after>`
pub fn parse_photo_field(name: &str) -> Option<(Uuid, PhotoStage)> {
    let rest = name.strip_prefix("photo_")?;
    let (product, stage) = rest.rsplit_once('_')?;
    Some((Uuid::parse_str(product).ok()?, PhotoStage::parse(stage)?))
}

/// A recorded visit with its ledger lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_id: Uuid,
    pub inventory: Vec<InventoryLineItem>,
    #[serde(default)]
    pub photos: VisitPhotos,
    pub attendance_photo: Option<String>,
    pub sales_latitude: Option<f64>,
    pub sales_longitude: Option<f64>,
    /// Profit frozen at creation time
    pub total_profit: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Visit {
    /// Ordering key for "most recent" resolution
    pub fn recency_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id)
    }

    /// Line item for a product, if the visit recorded one
    pub fn item_for(&self, product_id: Uuid) -> Option<&InventoryLineItem> {
        self.inventory.iter().find(|i| i.product_id == product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_photo_field() {
        let id = Uuid::new_v4();
        assert_eq!(
            parse_photo_field(&format!("photo_{}_before", id)),
            Some((id, PhotoStage::Before))
        );
        assert_eq!(
            parse_photo_field(&format!("photo_{}_after", id)),
            Some((id, PhotoStage::After))
        );
        assert_eq!(parse_photo_field(&format!("photo_{}_during", id)), None);
        assert_eq!(parse_photo_field("photo_notauuid_before"), None);
        assert_eq!(parse_photo_field("attendancePhoto"), None);
    }

    #[test]
    fn test_added_stock_defaults_to_zero() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"product":"{}","initialStock":10,"finalStock":4,"returns":1}}"#,
            id
        );
        let item: InventoryLineItem = serde_json::from_str(&json).unwrap();
        assert_eq!(item.product_id, id);
        assert_eq!(item.added_stock, 0);
    }
}
