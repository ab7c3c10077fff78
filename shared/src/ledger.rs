//! Consignment stock ledger
//!
//! Every visit records, per product, the stock found on arrival, the stock
//! added, the stock left behind and the units taken back. Units sold fall out
//! of those four counts:
//!
//! ```text
//! units_sold = initial_stock + added_stock - final_stock - returns
//! ```
//!
//! A line with zero or negative units sold is valid (net restocking) but
//! contributes nothing to sales or profit. A line whose product has since been
//! deleted also contributes nothing.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::ops::{Add, AddAssign};
use uuid::Uuid;

use crate::models::{InventoryLineItem, ProductPricing};

/// Current pricing for every product that still exists
pub type ProductCatalog = HashMap<Uuid, ProductPricing>;

impl InventoryLineItem {
    /// Units sold since the previous visit; may be zero or negative
    pub fn units_sold(&self) -> i64 {
        i64::from(self.initial_stock) + i64::from(self.added_stock)
            - i64::from(self.final_stock)
            - i64::from(self.returns)
    }

    /// Stock left at the customer after this visit
    pub fn outstanding(&self) -> i64 {
        i64::from(self.final_stock)
    }
}

/// What a line item adds to the sales totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contribution {
    pub units: i64,
    pub sales: Decimal,
    pub profit: Decimal,
}

impl Add for Contribution {
    type Output = Contribution;

    fn add(self, rhs: Self) -> Self::Output {
        Contribution {
            units: self.units + rhs.units,
            sales: self.sales + rhs.sales,
            profit: self.profit + rhs.profit,
        }
    }
}

impl AddAssign for Contribution {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Value a single line against the catalog
///
/// Returns `None` when nothing was sold or the product no longer exists.
pub fn contribution(item: &InventoryLineItem, catalog: &ProductCatalog) -> Option<Contribution> {
    let units = item.units_sold();
    if units <= 0 {
        return None;
    }
    let pricing = catalog.get(&item.product_id)?;
    let qty = Decimal::from(units);
    Some(Contribution {
        units,
        sales: qty * pricing.price,
        profit: qty * pricing.profit,
    })
}

/// Sum the contributions of a visit's lines
pub fn visit_contribution(items: &[InventoryLineItem], catalog: &ProductCatalog) -> Contribution {
    items
        .iter()
        .filter_map(|item| contribution(item, catalog))
        .fold(Contribution::default(), Add::add)
}

/// Total profit to freeze on a visit at creation time
pub fn total_profit(items: &[InventoryLineItem], catalog: &ProductCatalog) -> Decimal {
    visit_contribution(items, catalog).profit
}

/// Stock left at the customer across all lines of a visit
pub fn outstanding_stock(items: &[InventoryLineItem]) -> i64 {
    items.iter().map(InventoryLineItem::outstanding).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: Uuid, initial: i32, added: i32, fin: i32, returns: i32) -> InventoryLineItem {
        InventoryLineItem {
            product_id,
            initial_stock: initial,
            added_stock: added,
            final_stock: fin,
            returns,
        }
    }

    fn catalog_with(id: Uuid, price: i64, profit: i64) -> ProductCatalog {
        let mut catalog = ProductCatalog::new();
        catalog.insert(
            id,
            ProductPricing {
                name: "Keripik".into(),
                price: Decimal::from(price),
                profit: Decimal::from(profit),
            },
        );
        catalog
    }

    #[test]
    fn test_units_sold_formula() {
        let id = Uuid::new_v4();
        assert_eq!(item(id, 100, 0, 80, 5).units_sold(), 15);
        assert_eq!(item(id, 10, 20, 25, 0).units_sold(), 5);
        assert_eq!(item(id, 0, 30, 30, 0).units_sold(), 0);
        assert_eq!(item(id, 5, 30, 30, 0).units_sold(), 5);
        assert_eq!(item(id, 0, 50, 40, 20).units_sold(), -10);
    }

    #[test]
    fn test_contribution_values_sales_and_profit() {
        let id = Uuid::new_v4();
        let catalog = catalog_with(id, 1000, 200);
        let c = contribution(&item(id, 100, 0, 80, 5), &catalog).unwrap();
        assert_eq!(c.units, 15);
        assert_eq!(c.sales, Decimal::from(15_000));
        assert_eq!(c.profit, Decimal::from(3_000));
    }

    #[test]
    fn test_non_positive_units_do_not_contribute() {
        let id = Uuid::new_v4();
        let catalog = catalog_with(id, 1000, 200);
        assert!(contribution(&item(id, 10, 0, 10, 0), &catalog).is_none());
        assert!(contribution(&item(id, 0, 20, 30, 0), &catalog).is_none());
    }

    #[test]
    fn test_deleted_product_does_not_contribute() {
        let catalog = catalog_with(Uuid::new_v4(), 1000, 200);
        assert!(contribution(&item(Uuid::new_v4(), 100, 0, 80, 5), &catalog).is_none());
    }

    #[test]
    fn test_visit_totals_skip_restock_lines() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut catalog = catalog_with(a, 1000, 200);
        catalog.extend(catalog_with(b, 500, 100));
        let lines = [item(a, 100, 0, 80, 5), item(b, 0, 40, 40, 0)];
        assert_eq!(total_profit(&lines, &catalog), Decimal::from(3_000));
        assert_eq!(outstanding_stock(&lines), 120);
    }
}
