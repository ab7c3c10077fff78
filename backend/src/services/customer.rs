//! Customer management with per-owner scoping

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::like_pattern;
use shared::models::Customer;
use shared::types::{GeoPoint, Pagination};
use shared::validation::{validate_coordinates, validate_required};

#[derive(Clone)]
pub struct CustomerService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    address: String,
    phone: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            address: row.address,
            phone: row.phone,
            latitude: row.latitude,
            longitude: row.longitude,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Customer list ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum CustomerSort {
    #[default]
    #[serde(rename = "name-asc")]
    NameAsc,
    #[serde(rename = "name-desc")]
    NameDesc,
}

impl CustomerSort {
    fn order_by(&self) -> &'static str {
        match self {
            CustomerSort::NameAsc => "name ASC, id ASC",
            CustomerSort::NameDesc => "name DESC, id DESC",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerInput {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Assignee; only admins may set someone other than themselves
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerInput {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Reassign to another sales user (admin only)
    pub user_id: Option<Uuid>,
}

/// Result of an update, with the previous owner when it changed
pub struct CustomerUpdate {
    pub customer: Customer,
    pub reassigned_from: Option<Uuid>,
}

const CUSTOMER_COLUMNS: &str =
    "id, user_id, name, address, phone, latitude, longitude, created_at, updated_at";

fn validate_location(latitude: Option<f64>, longitude: Option<f64>) -> AppResult<()> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => validate_coordinates(GeoPoint::new(lat, lon))
            .map_err(|msg| AppError::field("location", msg)),
        (None, None) => Ok(()),
        _ => Err(AppError::field(
            "location",
            "Latitude and longitude must be given together",
        )),
    }
}

/// An owner id that references no user
fn map_owner_violation(err: sqlx::Error) -> AppError {
    let missing_owner = err
        .as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == "23503");
    if missing_owner {
        AppError::NotFound("User".to_string())
    } else {
        AppError::DatabaseError(err)
    }
}

fn required(field: &str, value: &str) -> AppResult<String> {
    validate_required(value).map_err(|msg| AppError::field(field, msg))?;
    Ok(value.trim().to_string())
}

impl CustomerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Page through customers visible to `owner` (all when `None`)
    pub async fn list(
        &self,
        owner: Option<Uuid>,
        search: Option<&str>,
        sort: CustomerSort,
        pagination: Pagination,
    ) -> AppResult<(Vec<Customer>, i64)> {
        let pattern = search.filter(|s| !s.trim().is_empty()).map(like_pattern);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM customers
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR name ILIKE $2)
            "#,
        )
        .bind(owner)
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            r#"
            SELECT {}
            FROM customers
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR name ILIKE $2)
            ORDER BY {}
            LIMIT $3 OFFSET $4
            "#,
            CUSTOMER_COLUMNS,
            sort.order_by()
        ))
        .bind(owner)
        .bind(&pattern)
        .bind(i64::from(pagination.limit))
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok((rows.into_iter().map(Customer::from).collect(), total))
    }

    /// Every customer visible to `owner`, by name
    pub async fn list_all(&self, owner: Option<Uuid>) -> AppResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {} FROM customers WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY name ASC, id ASC",
            CUSTOMER_COLUMNS
        ))
        .bind(owner)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    pub async fn find(&self, customer_id: Uuid) -> AppResult<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {} FROM customers WHERE id = $1",
            CUSTOMER_COLUMNS
        ))
        .bind(customer_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Customer::from))
    }

    /// Fetch a customer the caller owns (or any, for admins)
    pub async fn get_for(&self, user: &AuthUser, customer_id: Uuid) -> AppResult<Customer> {
        let customer = self
            .find(customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

        if !user.is_admin() && customer.user_id != user.user_id {
            return Err(AppError::InsufficientPermissions);
        }
        Ok(customer)
    }

    pub async fn create(&self, user: &AuthUser, input: CreateCustomerInput) -> AppResult<Customer> {
        let name = required("name", &input.name)?;
        let address = required("address", &input.address)?;
        let phone = required("phone", &input.phone)?;
        validate_location(input.latitude, input.longitude)?;

        let owner = match input.user_id {
            Some(id) if id != user.user_id => {
                user.require_admin()?;
                id
            }
            _ => user.user_id,
        };

        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r#"
            INSERT INTO customers (user_id, name, address, phone, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(owner)
        .bind(&name)
        .bind(&address)
        .bind(&phone)
        .bind(input.latitude)
        .bind(input.longitude)
        .fetch_one(&self.db)
        .await
        .map_err(map_owner_violation)?;

        tracing::info!(customer_id = %row.id, owner = %owner, "Customer created");

        Ok(row.into())
    }

    pub async fn update(
        &self,
        user: &AuthUser,
        customer_id: Uuid,
        input: UpdateCustomerInput,
    ) -> AppResult<CustomerUpdate> {
        let current = self.get_for(user, customer_id).await?;

        let name = match &input.name {
            Some(v) => required("name", v)?,
            None => current.name.clone(),
        };
        let address = match &input.address {
            Some(v) => required("address", v)?,
            None => current.address.clone(),
        };
        let phone = match &input.phone {
            Some(v) => required("phone", v)?,
            None => current.phone.clone(),
        };

        let (latitude, longitude) = match (input.latitude, input.longitude) {
            (None, None) => (current.latitude, current.longitude),
            (lat, lon) => (lat, lon),
        };
        validate_location(latitude, longitude)?;

        let owner = match input.user_id {
            Some(id) if id != current.user_id => {
                user.require_admin()?;
                id
            }
            _ => current.user_id,
        };

        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r#"
            UPDATE customers
            SET user_id = $2, name = $3, address = $4, phone = $5,
                latitude = $6, longitude = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(customer_id)
        .bind(owner)
        .bind(&name)
        .bind(&address)
        .bind(&phone)
        .bind(latitude)
        .bind(longitude)
        .fetch_optional(&self.db)
        .await
        .map_err(map_owner_violation)?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

        let reassigned_from = (owner != current.user_id).then_some(current.user_id);
        if let Some(previous) = reassigned_from {
            tracing::info!(%customer_id, from = %previous, to = %owner, "Customer reassigned");
        }

        Ok(CustomerUpdate {
            customer: row.into(),
            reassigned_from,
        })
    }

    pub async fn delete(&self, user: &AuthUser, customer_id: Uuid) -> AppResult<()> {
        self.get_for(user, customer_id).await?;

        sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(customer_id)
            .execute(&self.db)
            .await?;

        tracing::info!(%customer_id, "Customer deleted");
        Ok(())
    }
}
