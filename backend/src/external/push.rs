//! Web push gateway client
//!
//! Payload encryption and VAPID signing happen in the gateway; this client
//! only hands it the browser subscription and the JSON payload.

use serde::Serialize;
use shared::models::PushSubscription;
use shared::notification::PushPayload;
use std::time::Duration;
use thiserror::Error;

use crate::config::PushConfig;

/// Time-to-live for queued pushes, in seconds
const PUSH_TTL_SECS: u32 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum PushError {
    /// The push service no longer accepts this subscription (404 / 410)
    #[error("subscription is gone (status {0})")]
    SubscriptionGone(u16),

    #[error("push gateway rejected the message (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("push gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Anything that can deliver a payload to one subscription
#[axum::async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), PushError>;
}

/// HTTP client for the push gateway
#[derive(Clone)]
pub struct PushGatewayClient {
    base_url: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

/// Gateway send request
#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    subscription: &'a PushSubscription,
    /// Payload as the JSON text the service worker will parse
    payload: String,
    ttl: u32,
}

impl PushGatewayClient {
    /// Create a new gateway client
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http_client,
        })
    }

    /// Create from configuration; `None` when no gateway is configured
    pub fn from_config(config: &PushConfig) -> Result<Option<Self>, reqwest::Error> {
        match config.gateway_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => Self::new(
                url.to_string(),
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs),
            )
            .map(Some),
            None => Ok(None),
        }
    }
}

#[axum::async_trait]
impl PushTransport for PushGatewayClient {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), PushError> {
        let request = GatewayRequest {
            subscription,
            payload: serde_json::to_string(payload)?,
            ttl: PUSH_TTL_SECS,
        };

        let mut builder = self
            .http_client
            .post(format!("{}/send", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 404 || status.as_u16() == 410 {
            return Err(PushError::SubscriptionGone(status.as_u16()));
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(PushError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
