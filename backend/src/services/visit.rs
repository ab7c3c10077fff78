//! Visit recording and retrieval
//!
//! Recording is split in two steps so that photos are only written once
//! every check has passed: `prepare` validates the submission (customer,
//! geofence, ledger lines, products) and `record` persists the visit and its
//! ledger lines in one transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::auth::UserRef;
use crate::services::{like_pattern, CustomerService, ProductService, SettingsService};
use crate::time::UtcBounds;
use shared::geofence::check_attendance;
use shared::ledger::{self, ProductCatalog};
use shared::models::{Customer, InventoryLineItem, Visit, VisitPhotos};
use shared::types::{GeoPoint, Pagination};
use shared::validation::{validate_coordinates, validate_line_items};

#[derive(Clone)]
pub struct VisitService {
    db: PgPool,
}

/// Which visits to load
#[derive(Debug, Clone, Copy, Default)]
pub struct VisitFilter {
    pub owner: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub bounds: UtcBounds,
}

/// A submission that passed every check and is ready to persist
#[derive(Debug)]
pub struct PreparedVisit {
    pub user_id: Uuid,
    pub customer: Customer,
    pub items: Vec<InventoryLineItem>,
    pub location: GeoPoint,
    pub distance_m: f64,
    pub total_profit: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRef {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

/// A ledger line with its product resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDetail {
    pub product_id: Uuid,
    /// `None` when the product has been deleted
    pub product: Option<ProductRef>,
    pub initial_stock: i32,
    pub added_stock: i32,
    pub final_stock: i32,
    pub returns: i32,
    pub units_sold: i64,
}

/// A visit with customer, user and products resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitDetail {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer: Option<CustomerRef>,
    pub user_id: Uuid,
    pub user: Option<UserRef>,
    pub inventory: Vec<LineDetail>,
    pub photos: VisitPhotos,
    pub attendance_photo: Option<String>,
    pub sales_latitude: Option<f64>,
    pub sales_longitude: Option<f64>,
    pub total_profit: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct VisitRow {
    id: Uuid,
    user_id: Uuid,
    customer_id: Uuid,
    photos: Value,
    attendance_photo: Option<String>,
    sales_latitude: Option<f64>,
    sales_longitude: Option<f64>,
    total_profit: Decimal,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    visit_id: Uuid,
    product_id: Uuid,
    initial_stock: i32,
    added_stock: i32,
    final_stock: i32,
    returns: i32,
}

#[derive(Debug, FromRow)]
struct CustomerRefRow {
    id: Uuid,
    name: String,
    address: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

const VISIT_COLUMNS: &str = "v.id, v.user_id, v.customer_id, v.photos, v.attendance_photo, \
    v.sales_latitude, v.sales_longitude, v.total_profit, v.created_at";

const VISIT_FILTER: &str = r#"
    ($1::uuid IS NULL OR v.user_id = $1)
    AND ($2::uuid IS NULL OR v.customer_id = $2)
    AND ($3::timestamptz IS NULL OR v.created_at >= $3)
    AND ($4::timestamptz IS NULL OR v.created_at < $4)
    AND ($5::uuid IS NULL OR EXISTS (
        SELECT 1 FROM visit_items vi WHERE vi.visit_id = v.id AND vi.product_id = $5
    ))
"#;

fn decode_photos(visit_id: Uuid, value: Value) -> VisitPhotos {
    serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!(%visit_id, "Ignoring malformed visit photos: {}", e);
        VisitPhotos::default()
    })
}

impl VisitService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Validate a submission without writing anything
    pub async fn prepare(
        &self,
        user: &AuthUser,
        customer_id: Uuid,
        items: Vec<InventoryLineItem>,
        location: Option<GeoPoint>,
    ) -> AppResult<PreparedVisit> {
        let customer = CustomerService::new(self.db.clone())
            .find(customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

        if !user.is_admin() && customer.user_id != user.user_id {
            return Err(AppError::InsufficientPermissions);
        }

        let location = location.ok_or_else(|| {
            AppError::field("salesLatitude", "Your current location is required")
        })?;
        validate_coordinates(location).map_err(|msg| AppError::field("salesLatitude", msg))?;

        let settings = SettingsService::new(self.db.clone()).get().await?;
        let distance_m = check_attendance(
            location,
            customer.location(),
            settings.attendance_distance_tolerance,
        )?;

        validate_line_items(&items).map_err(|msg| AppError::field("inventory", msg))?;

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let catalog = ProductService::new(self.db.clone())
            .catalog_for(&product_ids)
            .await?;
        if let Some(missing) = product_ids.iter().find(|id| !catalog.contains_key(id)) {
            return Err(AppError::NotFound(format!("Product {}", missing)));
        }

        let total_profit = ledger::total_profit(&items, &catalog);

        Ok(PreparedVisit {
            user_id: user.user_id,
            customer,
            items,
            location,
            distance_m,
            total_profit,
        })
    }

    /// Persist a prepared visit with its photo references
    pub async fn record(
        &self,
        prepared: PreparedVisit,
        photos: VisitPhotos,
        attendance_photo: Option<String>,
    ) -> AppResult<VisitDetail> {
        let photos_json = serde_json::to_value(&photos)
            .map_err(|e| AppError::Internal(format!("Failed to encode photos: {}", e)))?;

        let mut tx = self.db.begin().await?;

        let visit_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO visits (
                user_id, customer_id, photos, attendance_photo,
                sales_latitude, sales_longitude, total_profit
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(prepared.user_id)
        .bind(prepared.customer.id)
        .bind(photos_json)
        .bind(&attendance_photo)
        .bind(prepared.location.latitude)
        .bind(prepared.location.longitude)
        .bind(prepared.total_profit)
        .fetch_one(&mut *tx)
        .await?;

        for (position, item) in prepared.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO visit_items (
                    visit_id, product_id, position,
                    initial_stock, added_stock, final_stock, returns
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(visit_id)
            .bind(item.product_id)
            .bind(position as i32)
            .bind(item.initial_stock)
            .bind(item.added_stock)
            .bind(item.final_stock)
            .bind(item.returns)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            %visit_id,
            customer_id = %prepared.customer.id,
            user_id = %prepared.user_id,
            lines = prepared.items.len(),
            distance_m = prepared.distance_m.round(),
            total_profit = %prepared.total_profit,
            "Visit recorded"
        );

        self.find_detail(visit_id)
            .await?
            .ok_or_else(|| AppError::Internal("Visit vanished after insert".to_string()))
    }

    /// Paginated visit history, newest first
    pub async fn list(
        &self,
        owner: Option<Uuid>,
        bounds: UtcBounds,
        search: Option<&str>,
        pagination: Pagination,
    ) -> AppResult<(Vec<VisitDetail>, i64)> {
        let pattern = search.filter(|s| !s.trim().is_empty()).map(like_pattern);

        let total = sqlx::query_scalar::<_, i64>(&format!(
            r#"
            SELECT COUNT(*)
            FROM visits v
            LEFT JOIN customers c ON c.id = v.customer_id
            WHERE {} AND ($6::text IS NULL OR c.name ILIKE $6)
            "#,
            VISIT_FILTER
        ))
        .bind(owner)
        .bind(None::<Uuid>)
        .bind(bounds.start)
        .bind(bounds.end)
        .bind(None::<Uuid>)
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, VisitRow>(&format!(
            r#"
            SELECT {}
            FROM visits v
            LEFT JOIN customers c ON c.id = v.customer_id
            WHERE {} AND ($6::text IS NULL OR c.name ILIKE $6)
            ORDER BY v.created_at DESC, v.id DESC
            LIMIT $7 OFFSET $8
            "#,
            VISIT_COLUMNS, VISIT_FILTER
        ))
        .bind(owner)
        .bind(None::<Uuid>)
        .bind(bounds.start)
        .bind(bounds.end)
        .bind(None::<Uuid>)
        .bind(&pattern)
        .bind(i64::from(pagination.limit))
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let visits = self.attach_items(rows).await?;
        Ok((self.populate(visits).await?, total))
    }

    /// Load ledger visits matching a filter, oldest first
    pub async fn load(&self, filter: VisitFilter) -> AppResult<Vec<Visit>> {
        let rows = sqlx::query_as::<_, VisitRow>(&format!(
            r#"
            SELECT {}
            FROM visits v
            WHERE {}
            ORDER BY v.created_at ASC, v.id ASC
            "#,
            VISIT_COLUMNS, VISIT_FILTER
        ))
        .bind(filter.owner)
        .bind(filter.customer_id)
        .bind(filter.bounds.start)
        .bind(filter.bounds.end)
        .bind(filter.product_id)
        .fetch_all(&self.db)
        .await?;

        self.attach_items(rows).await
    }

    /// A single visit; sales users only see their own
    pub async fn get(&self, user: &AuthUser, visit_id: Uuid) -> AppResult<VisitDetail> {
        let detail = self
            .find_detail(visit_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Visit".to_string()))?;

        if !user.is_admin() && detail.user_id != user.user_id {
            return Err(AppError::NotFound("Visit".to_string()));
        }
        Ok(detail)
    }

    /// The caller's most recent visit to a customer
    pub async fn last_for_customer(&self, user_id: Uuid, customer_id: Uuid) -> AppResult<VisitDetail> {
        let row = sqlx::query_as::<_, VisitRow>(&format!(
            r#"
            SELECT {}
            FROM visits v
            WHERE v.user_id = $1 AND v.customer_id = $2
            ORDER BY v.created_at DESC, v.id DESC
            LIMIT 1
            "#,
            VISIT_COLUMNS
        ))
        .bind(user_id)
        .bind(customer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Previous visit".to_string()))?;

        let visits = self.attach_items(vec![row]).await?;
        self.populate(visits)
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound("Previous visit".to_string()))
    }

    /// Final stock of a product at a customer from the latest visit recording
    /// it; zero when it was never recorded
    pub async fn last_stock(&self, customer_id: Uuid, product_id: Uuid) -> AppResult<i64> {
        let stock = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT vi.final_stock
            FROM visit_items vi
            JOIN visits v ON v.id = vi.visit_id
            WHERE v.customer_id = $1 AND vi.product_id = $2
            ORDER BY v.created_at DESC, v.id DESC
            LIMIT 1
            "#,
        )
        .bind(customer_id)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(stock.map(i64::from).unwrap_or(0))
    }

    async fn find_detail(&self, visit_id: Uuid) -> AppResult<Option<VisitDetail>> {
        let row = sqlx::query_as::<_, VisitRow>(&format!(
            "SELECT {} FROM visits v WHERE v.id = $1",
            VISIT_COLUMNS
        ))
        .bind(visit_id)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let visits = self.attach_items(vec![row]).await?;
        Ok(self.populate(visits).await?.pop())
    }

    /// Join ledger lines onto visit rows, keeping row order
    async fn attach_items(&self, rows: Vec<VisitRow>) -> AppResult<Vec<Visit>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT visit_id, product_id, initial_stock, added_stock, final_stock, returns
            FROM visit_items
            WHERE visit_id = ANY($1)
            ORDER BY visit_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_visit: HashMap<Uuid, Vec<InventoryLineItem>> = HashMap::new();
        for item in items {
            by_visit
                .entry(item.visit_id)
                .or_default()
                .push(InventoryLineItem {
                    product_id: item.product_id,
                    initial_stock: item.initial_stock,
                    added_stock: item.added_stock,
                    final_stock: item.final_stock,
                    returns: item.returns,
                });
        }

        Ok(rows
            .into_iter()
            .map(|row| Visit {
                id: row.id,
                user_id: row.user_id,
                customer_id: row.customer_id,
                inventory: by_visit.remove(&row.id).unwrap_or_default(),
                photos: decode_photos(row.id, row.photos),
                attendance_photo: row.attendance_photo,
                sales_latitude: row.sales_latitude,
                sales_longitude: row.sales_longitude,
                total_profit: row.total_profit,
                created_at: row.created_at,
            })
            .collect())
    }

    /// Resolve customers, users and products for display
    pub async fn populate(&self, visits: Vec<Visit>) -> AppResult<Vec<VisitDetail>> {
        if visits.is_empty() {
            return Ok(Vec::new());
        }

        let customer_ids: Vec<Uuid> = unique(visits.iter().map(|v| v.customer_id));
        let user_ids: Vec<Uuid> = unique(visits.iter().map(|v| v.user_id));
        let product_ids: Vec<Uuid> =
            unique(visits.iter().flat_map(|v| v.inventory.iter().map(|i| i.product_id)));

        let customers: HashMap<Uuid, CustomerRef> = sqlx::query_as::<_, CustomerRefRow>(
            "SELECT id, name, address, latitude, longitude FROM customers WHERE id = ANY($1)",
        )
        .bind(&customer_ids)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|c| {
            (
                c.id,
                CustomerRef {
                    id: c.id,
                    name: c.name,
                    address: c.address,
                    latitude: c.latitude,
                    longitude: c.longitude,
                },
            )
        })
        .collect();

        let users: HashMap<Uuid, UserRef> =
            sqlx::query_as::<_, UserRef>("SELECT id, name FROM users WHERE id = ANY($1)")
                .bind(&user_ids)
                .fetch_all(&self.db)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect();

        let catalog = ProductService::new(self.db.clone())
            .catalog_for(&product_ids)
            .await?;

        Ok(visits
            .into_iter()
            .map(|visit| to_detail(visit, &customers, &users, &catalog))
            .collect())
    }
}

fn unique(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    ids.collect::<HashSet<_>>().into_iter().collect()
}

fn to_detail(
    visit: Visit,
    customers: &HashMap<Uuid, CustomerRef>,
    users: &HashMap<Uuid, UserRef>,
    catalog: &ProductCatalog,
) -> VisitDetail {
    let inventory = visit
        .inventory
        .iter()
        .map(|item| LineDetail {
            product_id: item.product_id,
            product: catalog.get(&item.product_id).map(|p| ProductRef {
                id: item.product_id,
                name: p.name.clone(),
                price: p.price,
            }),
            initial_stock: item.initial_stock,
            added_stock: item.added_stock,
            final_stock: item.final_stock,
            returns: item.returns,
            units_sold: item.units_sold(),
        })
        .collect();

    VisitDetail {
        id: visit.id,
        customer_id: visit.customer_id,
        customer: customers.get(&visit.customer_id).cloned(),
        user_id: visit.user_id,
        user: users.get(&visit.user_id).cloned(),
        inventory,
        photos: visit.photos,
        attendance_photo: visit.attendance_photo,
        sales_latitude: visit.sales_latitude,
        sales_longitude: visit.sales_longitude,
        total_profit: visit.total_profit,
        created_at: visit.created_at,
    }
}
