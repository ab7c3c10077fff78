//! Authentication service for registration, login and token issuance

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::Claims;
use crate::services::map_unique_violation;
use crate::services::user::UserRow;
use shared::models::{Role, User};
use shared::validation::{normalize_username, validate_password, validate_username};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// Input for self-registration
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub username: String,
    pub password: String,
}

/// Issued access token
#[derive(Debug, Serialize)]
pub struct AuthToken {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Minimal user reference
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    password_hash: String,
    role: String,
}

/// Hash a password with bcrypt
pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Register a new sales account and sign it in
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthToken> {
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

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (name, username, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(input.name.trim())
        .bind(&username)
        .bind(&password_hash)
        .bind(Role::Sales.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, "username"))?;

        tracing::info!(%user_id, %username, "User registered");

        self.generate_token(user_id, Role::Sales)
    }

    /// Authenticate with username and password
    pub async fn login(&self, username: &str, password: &str) -> AppResult<AuthToken> {
        let username = normalize_username(username);

        let user = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, password_hash, role FROM users WHERE username = $1",
        )
        .bind(&username)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let role = user
            .role
            .parse::<Role>()
            .map_err(AppError::Internal)?;

        self.generate_token(user.id, role)
    }

    /// Load the signed-in user's profile
    pub async fn current_user(&self, user_id: Uuid) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, username, role, push_subscription IS NOT NULL AS has_push_subscription,
                   created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        row.try_into()
    }

    /// All sales users, for assignment pickers
    pub async fn list_sales_users(&self) -> AppResult<Vec<UserRef>> {
        let users = sqlx::query_as::<_, UserRef>(
            "SELECT id, name FROM users WHERE role = 'sales' ORDER BY name ASC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    /// Sign an access token
    fn generate_token(&self, user_id: Uuid, role: Role) -> AppResult<AuthToken> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expiry);

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AuthToken {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }
}
