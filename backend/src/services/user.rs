//! User administration

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::auth::hash_password;
use crate::services::map_unique_violation;
use shared::models::{Role, User};
use shared::validation::{normalize_username, validate_password, validate_username};

#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// User row without credentials
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub role: String,
    pub has_push_subscription: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            username: row.username,
            role: row.role.parse().map_err(AppError::Internal)?,
            has_push_subscription: row.has_push_subscription,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub role: Option<Role>,
}

const USER_COLUMNS: &str = "id, name, username, role, \
    push_subscription IS NOT NULL AS has_push_subscription, created_at";

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All users, newest first
    pub async fn list(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    pub async fn create(&self, input: CreateUserInput) -> AppResult<User> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let username = normalize_username(&input.username);
        validate_username(&username).map_err(|msg| AppError::field("username", msg))?;
        validate_password(&input.password).map_err(|msg| AppError::field("password", msg))?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
        )
        .bind(&username)
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::DuplicateEntry("username".to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (name, username, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(&username)
        .bind(&password_hash)
        .bind(input.role.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, "username"))?;

        tracing::info!(user_id = %row.id, role = %input.role, "User created");

        row.try_into()
    }

    /// Change a user's name and/or role
    pub async fn update(&self, user_id: Uuid, input: UpdateUserInput) -> AppResult<User> {
        if let Some(name) = &input.name {
            if name.trim().is_empty() {
                return Err(AppError::field("name", "Name is required"));
            }
        }

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                role = COALESCE($3, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.role.map(|r| r.as_str()))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        row.try_into()
    }

    /// Delete a user; admins cannot delete themselves
    pub async fn delete(&self, acting_user_id: Uuid, user_id: Uuid) -> AppResult<()> {
        if acting_user_id == user_id {
            return Err(AppError::ValidationError(
                "You cannot delete your own account".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                let owns_customers = e
                    .as_database_error()
                    .and_then(|db| db.code())
                    .map_or(false, |code| code == "23503");
                if owns_customers {
                    AppError::ValidationError(
                        "User still owns customers; reassign them first".to_string(),
                    )
                } else {
                    AppError::DatabaseError(e)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }

        tracing::info!(%user_id, "User deleted");
        Ok(())
    }

    /// Whether a user exists
    pub async fn exists(&self, user_id: Uuid) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }
}
