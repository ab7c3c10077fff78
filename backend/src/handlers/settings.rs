//! Settings handlers (admin only)

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::SettingsService;
use crate::AppState;
use shared::models::{Settings, SettingsUpdate};

pub async fn get_settings(State(state): State<AppState>) -> AppResult<Json<Settings>> {
    let service = SettingsService::new(state.db);
    Ok(Json(service.get().await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> AppResult<Json<Settings>> {
    let service = SettingsService::new(state.db);
    Ok(Json(service.update(update).await?))
}
