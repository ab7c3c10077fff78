//! Product catalog management

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::{like_pattern, map_unique_violation};
use shared::ledger::ProductCatalog;
use shared::models::{normalize_barcode, Product};
use shared::types::Pagination;
use shared::validation::{validate_money, validate_required};

#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price: Decimal,
    profit: Decimal,
    barcode: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            price: row.price,
            profit: row.profit,
            barcode: row.barcode,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub price: Decimal,
    pub profit: Decimal,
    pub barcode: Option<String>,
}

/// Partial update; an empty barcode clears it
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub profit: Option<Decimal>,
    pub barcode: Option<String>,
}

const PRODUCT_COLUMNS: &str = "id, name, price, profit, barcode, created_at, updated_at";

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Page through products by name, optionally filtered by a name search
    pub async fn list(
        &self,
        search: Option<&str>,
        pagination: Pagination,
    ) -> AppResult<(Vec<Product>, i64)> {
        let pattern = search.filter(|s| !s.trim().is_empty()).map(like_pattern);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE ($1::text IS NULL OR name ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {}
            FROM products
            WHERE ($1::text IS NULL OR name ILIKE $1)
            ORDER BY name ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&pattern)
        .bind(i64::from(pagination.limit))
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok((rows.into_iter().map(Product::from).collect(), total))
    }

    pub async fn get(&self, product_id: Uuid) -> AppResult<Product> {
        self.find(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    pub async fn find(&self, product_id: Uuid) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Current pricing of every existing product
    pub async fn catalog(&self) -> AppResult<ProductCatalog> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let product = Product::from(row);
                (product.id, product.pricing())
            })
            .collect())
    }

    /// Pricing for the given products; missing ids are simply absent
    pub async fn catalog_for(&self, product_ids: &[Uuid]) -> AppResult<ProductCatalog> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = ANY($1)",
            PRODUCT_COLUMNS
        ))
        .bind(product_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let product = Product::from(row);
                (product.id, product.pricing())
            })
            .collect())
    }

    pub async fn create(&self, input: CreateProductInput) -> AppResult<Product> {
        validate_required(&input.name).map_err(|msg| AppError::field("name", msg))?;
        validate_money(input.price).map_err(|msg| AppError::field("price", msg))?;
        validate_money(input.profit).map_err(|msg| AppError::field("profit", msg))?;

        let barcode = normalize_barcode(input.barcode.as_deref());
        if let Some(code) = &barcode {
            self.ensure_barcode_free(code, None).await?;
        }

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (name, price, profit, barcode)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(input.price)
        .bind(input.profit)
        .bind(&barcode)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, "barcode"))?;

        tracing::info!(product_id = %row.id, name = %row.name, "Product created");

        Ok(row.into())
    }

    pub async fn update(&self, product_id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        let current = self.get(product_id).await?;

        let name = match input.name {
            Some(name) => {
                validate_required(&name).map_err(|msg| AppError::field("name", msg))?;
                name.trim().to_string()
            }
            None => current.name,
        };
        let price = input.price.unwrap_or(current.price);
        let profit = input.profit.unwrap_or(current.profit);
        validate_money(price).map_err(|msg| AppError::field("price", msg))?;
        validate_money(profit).map_err(|msg| AppError::field("profit", msg))?;

        let barcode = match input.barcode {
            Some(code) => normalize_barcode(Some(&code)),
            None => current.barcode,
        };
        if let Some(code) = &barcode {
            self.ensure_barcode_free(code, Some(product_id)).await?;
        }

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET name = $2, price = $3, profit = $4, barcode = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(&name)
        .bind(price)
        .bind(profit)
        .bind(&barcode)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, "barcode"))?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(row.into())
    }

    /// Delete a product; ledger lines referencing it are kept
    pub async fn delete(&self, product_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        tracing::info!(%product_id, "Product deleted");
        Ok(())
    }

    async fn ensure_barcode_free(&self, barcode: &str, except: Option<Uuid>) -> AppResult<()> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE barcode = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(barcode)
        .bind(except)
        .fetch_one(&self.db)
        .await?;

        if taken {
            return Err(AppError::DuplicateEntry("barcode".to_string()));
        }
        Ok(())
    }
}
