//! HTTP handlers for push notification endpoints

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::handlers::MessageResponse;
use crate::middleware::CurrentUser;
use crate::services::NotificationService;
use crate::AppState;
use shared::models::PushSubscription;

/// Store the caller's browser push subscription
pub async fn subscribe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(subscription): Json<PushSubscription>,
) -> AppResult<Json<MessageResponse>> {
    let service = NotificationService::from_state(&state);
    service
        .subscribe(current_user.0.user_id, &subscription)
        .await?;
    Ok(Json(MessageResponse::new("Subscribed to notifications")))
}

/// Push a test notification to the caller
pub async fn test_push(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<MessageResponse>> {
    let service = NotificationService::from_state(&state);
    service.send_test(current_user.0.user_id).await?;
    Ok(Json(MessageResponse::new("Test notification sent")))
}
