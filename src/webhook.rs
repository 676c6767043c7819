//! Delivery of chat messages to the Discord webhook

use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, info};

use crate::WebhookConfig;
use crate::error::{NotifierError, Result};
use crate::message::ChatMessage;

/// Longest response body kept in a delivery error
const MAX_ERROR_BODY_LEN: usize = 500;

pub struct WebhookSender {
    http: reqwest::Client,
    url: String,
}

impl WebhookSender {
    pub fn new(config: &WebhookConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| NotifierError::ConfigError("webhook url is not set".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.get_timeout_secs()))
            .build()?;

        Ok(Self { http, url })
    }

    /// POST the message as JSON. Any non-2xx answer is a delivery failure.
    pub async fn send(&self, message: &ChatMessage) -> Result<()> {
        let payload = serde_json::to_vec(message)?;
        debug!("Sending payload {}", String::from_utf8_lossy(&payload));

        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            // the webhook url embeds its token; keep it out of error text
            .map_err(|e| NotifierError::HttpError(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY_LEN {
                let cut = (0..=MAX_ERROR_BODY_LEN)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
                body.push_str("... (truncated)");
            }
            return Err(NotifierError::DeliveryFailed(format!(
                "webhook returned {}: {}",
                status, body
            )));
        }

        info!("Webhook accepted message ({})", status);
        Ok(())
    }
}
