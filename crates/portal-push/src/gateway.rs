//! HTTP push gateway client.
//!
//! The portal delegates actual device delivery (web-push subscriptions,
//! endpoint management, VAPID keys) to a gateway service; this client posts
//! one delivery request per user and counts the successes.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use portal_core::{defaults, Error, PushMessage, PushTransport, Result};

/// Default push gateway endpoint.
pub const DEFAULT_GATEWAY_URL: &str = defaults::PUSH_GATEWAY_URL;

/// Request body for a single-user delivery.
#[derive(Debug, Serialize)]
struct DeliverRequest<'a> {
    user_id: Uuid,
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Value>,
}

/// Gateway response for a delivery request.
#[derive(Debug, Deserialize)]
struct DeliverResponse {
    delivered: bool,
}

/// Push transport backed by an HTTP gateway.
pub struct GatewayPushClient {
    client: Client,
    base_url: String,
}

impl GatewayPushClient {
    /// Create a client for the given gateway base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let timeout = std::env::var("PUSH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::PUSH_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| Error::Push(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Create a client from environment variables (`PUSH_GATEWAY_URL`,
    /// `PUSH_TIMEOUT_SECS`), falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("PUSH_GATEWAY_URL").unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string());
        Self::new(base_url)
    }

    /// Deliver to a single user. Returns whether the gateway confirmed
    /// delivery; transport-level errors are mapped to `false` by the caller.
    async fn deliver_one(&self, user_id: Uuid, message: &PushMessage) -> Result<bool> {
        let request = DeliverRequest {
            user_id,
            title: &message.title,
            body: &message.body,
            data: message.data.as_ref(),
        };

        let response = self
            .client
            .post(format!("{}/push/deliver", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Push(e.to_string()))?;

        let body: DeliverResponse = response.json().await?;
        Ok(body.delivered)
    }
}

#[async_trait]
impl PushTransport for GatewayPushClient {
    async fn deliver(&self, user_ids: &[Uuid], message: &PushMessage) -> Result<usize> {
        let start = Instant::now();
        let mut sent = 0usize;

        // One user's dead subscription must not sink the rest of the batch,
        // so per-user failures are logged and counted as misses.
        for &user_id in user_ids {
            match self.deliver_one(user_id, message).await {
                Ok(true) => sent += 1,
                Ok(false) => {
                    debug!(subsystem = "push", %user_id, "Gateway declined delivery");
                }
                Err(e) => {
                    warn!(subsystem = "push", %user_id, error = %e, "Push delivery failed");
                }
            }
        }

        debug!(
            subsystem = "push",
            op = "deliver",
            recipients = user_ids.len(),
            sent,
            duration_ms = start.elapsed().as_millis() as u64,
            "Push batch delivered"
        );

        Ok(sent)
    }
}
