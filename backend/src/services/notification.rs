//! Push notification fan-out
//!
//! Recipients are resolved from stored subscriptions, then each delivery
//! runs as its own task. One recipient failing never affects another, and
//! subscriptions the push service reports as gone are cleared.

use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::{PushError, PushTransport};
use crate::AppState;
use shared::models::{PushRecipient, PushSubscription};
use shared::notification::PushPayload;

/// Notification service
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    push: Option<Arc<dyn PushTransport>>,
}

/// Who a notification is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Admins,
    SalesUsers,
    User(Uuid),
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
    /// Users whose subscription is no longer valid
    pub expired: Vec<Uuid>,
}

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    id: Uuid,
    name: String,
    push_subscription: Value,
}

impl SubscriptionRow {
    fn into_recipient(self) -> Option<PushRecipient> {
        match serde_json::from_value::<PushSubscription>(self.push_subscription) {
            Ok(subscription) => Some(PushRecipient {
                user_id: self.id,
                name: self.name,
                subscription,
            }),
            Err(e) => {
                tracing::warn!(user_id = %self.id, "Ignoring malformed push subscription: {}", e);
                None
            }
        }
    }
}

/// Deliver one payload to every recipient concurrently
pub async fn deliver_all(
    transport: Arc<dyn PushTransport>,
    recipients: Vec<PushRecipient>,
    payload: &PushPayload,
) -> DeliveryReport {
    let payload = Arc::new(payload.clone());
    let mut tasks = JoinSet::new();

    for recipient in recipients {
        let transport = transport.clone();
        let payload = payload.clone();
        tasks.spawn(async move {
            let result = transport.send(&recipient.subscription, &payload).await;
            (recipient, result)
        });
    }

    let mut report = DeliveryReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((recipient, Ok(()))) => {
                tracing::debug!(user = %recipient.name, "Push delivered");
                report.sent += 1;
            }
            Ok((recipient, Err(PushError::SubscriptionGone(status)))) => {
                tracing::warn!(user = %recipient.name, status, "Push subscription expired");
                report.failed += 1;
                report.expired.push(recipient.user_id);
            }
            Ok((recipient, Err(e))) => {
                tracing::warn!(user = %recipient.name, "Failed to deliver push: {}", e);
                report.failed += 1;
            }
            Err(e) => {
                tracing::error!("Push delivery task failed: {}", e);
                report.failed += 1;
            }
        }
    }

    report
}

/// Deliver each payload in turn to the same recipients
///
/// A recipient whose subscription expires is skipped for the remaining
/// payloads.
pub async fn deliver_each(
    transport: Arc<dyn PushTransport>,
    mut recipients: Vec<PushRecipient>,
    payloads: &[PushPayload],
) -> DeliveryReport {
    let mut total = DeliveryReport::default();
    for payload in payloads {
        if recipients.is_empty() {
            break;
        }
        let report = deliver_all(transport.clone(), recipients.clone(), payload).await;
        recipients.retain(|r| !report.expired.contains(&r.user_id));
        total.sent += report.sent;
        total.failed += report.failed;
        total.expired.extend(report.expired);
    }
    total
}

impl NotificationService {
    pub fn new(db: PgPool, push: Option<Arc<dyn PushTransport>>) -> Self {
        Self { db, push }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.db.clone(), state.push.clone())
    }

    /// Store (or replace) the caller's push subscription
    pub async fn subscribe(&self, user_id: Uuid, subscription: &PushSubscription) -> AppResult<()> {
        if subscription.endpoint.trim().is_empty() {
            return Err(AppError::field("endpoint", "Subscription endpoint is required"));
        }

        let value = serde_json::to_value(subscription)
            .map_err(|e| AppError::Internal(format!("Failed to encode subscription: {}", e)))?;

        let result = sqlx::query(
            "UPDATE users SET push_subscription = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(value)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }

        tracing::info!(%user_id, "Push subscription saved");
        Ok(())
    }

    /// Subscribed users in an audience
    pub async fn recipients(&self, audience: Audience) -> AppResult<Vec<PushRecipient>> {
        let base = "SELECT id, name, push_subscription FROM users WHERE push_subscription IS NOT NULL";
        let rows = match audience {
            Audience::Admins => {
                sqlx::query_as::<_, SubscriptionRow>(&format!("{} AND role = 'admin'", base))
                    .fetch_all(&self.db)
                    .await?
            }
            Audience::SalesUsers => {
                sqlx::query_as::<_, SubscriptionRow>(&format!("{} AND role = 'sales'", base))
                    .fetch_all(&self.db)
                    .await?
            }
            Audience::User(user_id) => {
                sqlx::query_as::<_, SubscriptionRow>(&format!("{} AND id = $1", base))
                    .bind(user_id)
                    .fetch_all(&self.db)
                    .await?
            }
        };

        Ok(rows
            .into_iter()
            .filter_map(SubscriptionRow::into_recipient)
            .collect())
    }

    /// Send a payload to an audience and wait for every delivery
    pub async fn notify(&self, audience: Audience, payload: &PushPayload) -> AppResult<DeliveryReport> {
        self.notify_each(audience, std::slice::from_ref(payload)).await
    }

    /// Send several payloads to one audience, resolving recipients once
    pub async fn notify_each(
        &self,
        audience: Audience,
        payloads: &[PushPayload],
    ) -> AppResult<DeliveryReport> {
        if payloads.is_empty() {
            return Ok(DeliveryReport::default());
        }
        let Some(transport) = self.push.clone() else {
            tracing::debug!(count = payloads.len(), "Push disabled, skipping notification");
            return Ok(DeliveryReport::default());
        };

        let recipients = self.recipients(audience).await?;
        if recipients.is_empty() {
            tracing::debug!(?audience, "No subscribed recipients");
            return Ok(DeliveryReport::default());
        }

        let report = deliver_each(transport, recipients, payloads).await;
        if !report.expired.is_empty() {
            self.clear_subscriptions(&report.expired).await?;
        }

        tracing::info!(
            payloads = payloads.len(),
            sent = report.sent,
            failed = report.failed,
            "Notification fan-out finished"
        );
        Ok(report)
    }

    /// Fire-and-forget variant for request handlers
    pub fn notify_in_background(&self, audience: Audience, payload: PushPayload) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.notify(audience, &payload).await {
                tracing::warn!(?audience, "Background notification failed: {}", e);
            }
        });
    }

    /// Send a test push to the caller
    pub async fn send_test(&self, user_id: Uuid) -> AppResult<()> {
        let recipient = self
            .recipients(Audience::User(user_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Push subscription".to_string()))?;

        let transport = self
            .push
            .clone()
            .ok_or_else(|| AppError::ExternalService("push gateway is not configured".to_string()))?;

        match transport.send(&recipient.subscription, &PushPayload::test()).await {
            Ok(()) => Ok(()),
            Err(PushError::SubscriptionGone(status)) => {
                self.clear_subscriptions(&[user_id]).await?;
                Err(AppError::ExternalService(format!(
                    "subscription is no longer valid (status {})",
                    status
                )))
            }
            Err(e) => Err(AppError::ExternalService(e.to_string())),
        }
    }

    async fn clear_subscriptions(&self, user_ids: &[Uuid]) -> AppResult<()> {
        sqlx::query("UPDATE users SET push_subscription = NULL WHERE id = ANY($1)")
            .bind(user_ids)
            .execute(&self.db)
            .await?;
        tracing::info!(count = user_ids.len(), "Cleared expired push subscriptions");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::SubscriptionKeys;
    use std::sync::Mutex;

    /// Transport that fails for chosen endpoints and records the rest
    struct MockTransport {
        delivered: Mutex<Vec<String>>,
    }

    #[axum::async_trait]
    impl PushTransport for MockTransport {
        async fn send(
            &self,
            subscription: &PushSubscription,
            _payload: &PushPayload,
        ) -> Result<(), PushError> {
            match subscription.endpoint.as_str() {
                "gone" => Err(PushError::SubscriptionGone(410)),
                "broken" => Err(PushError::Rejected {
                    status: 500,
                    message: "boom".into(),
                }),
                other => {
                    self.delivered.lock().unwrap().push(other.to_string());
                    Ok(())
                }
            }
        }
    }

    fn recipient(endpoint: &str) -> PushRecipient {
        PushRecipient {
            user_id: Uuid::new_v4(),
            name: endpoint.to_string(),
            subscription: PushSubscription {
                endpoint: endpoint.to_string(),
                expiration_time: None,
                keys: SubscriptionKeys {
                    p256dh: "key".into(),
                    auth: "auth".into(),
                },
            },
        }
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_others() {
        let transport = Arc::new(MockTransport {
            delivered: Mutex::new(Vec::new()),
        });
        let gone = recipient("gone");
        let gone_id = gone.user_id;
        let recipients = vec![recipient("a"), recipient("broken"), gone, recipient("b")];

        let report = deliver_all(transport.clone(), recipients, &PushPayload::test()).await;

        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.expired, vec![gone_id]);

        let mut delivered = transport.delivered.lock().unwrap().clone();
        delivered.sort();
        assert_eq!(delivered, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_several_payloads_share_one_recipient_list() {
        let transport = Arc::new(MockTransport {
            delivered: Mutex::new(Vec::new()),
        });
        let gone = recipient("gone");
        let gone_id = gone.user_id;
        let payloads = vec![
            PushPayload::low_stock("Kopi Susu", 12),
            PushPayload::low_stock("Teh Manis", 3),
        ];

        let report =
            deliver_each(transport.clone(), vec![recipient("a"), gone], &payloads).await;

        assert_eq!(report.sent, 2);
        // the expired subscription is only tried once
        assert_eq!(report.failed, 1);
        assert_eq!(report.expired, vec![gone_id]);
        assert_eq!(transport.delivered.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_recipients() {
        let transport = Arc::new(MockTransport {
            delivered: Mutex::new(Vec::new()),
        });
        let report = deliver_all(transport, Vec::new(), &PushPayload::test()).await;
        assert_eq!(report, DeliveryReport::default());
    }
}
