//! Authentication handlers

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::auth::{AuthToken, RegisterInput, UserRef};
use crate::services::AuthService;
use crate::AppState;
use shared::models::User;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthToken>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let token = auth_service.login(&body.username, &body.password).await?;
    Ok(Json(token))
}

/// Self-registration as a sales user
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<Json<AuthToken>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let token = auth_service.register(body).await?;
    Ok(Json(token))
}

/// The signed-in user's profile
pub async fn get_current_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<User>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let user = auth_service.current_user(current_user.0.user_id).await?;
    Ok(Json(user))
}

/// Sales users for assignment pickers (admin)
pub async fn list_sales_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<Vec<UserRef>>, AppError> {
    current_user.0.require_admin()?;
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    Ok(Json(auth_service.list_sales_users().await?))
}
