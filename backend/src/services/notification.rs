//! Webhook delivery of order notifications
//!
//! Staff receive a JSON order summary on `order_webhook_url`; buyers receive
//! a short text relayed through `buyer_sms_webhook_url`. Either hook may be
//! left unconfigured, in which case that notification is skipped.

use async_trait::async_trait;
use serde::Serialize;
use shared::ledger::{Notifier, OrderSummary};
use std::time::Duration;

use crate::config::NotificationConfig;
use crate::error::{AppError, AppResult};

/// Body posted to the buyer SMS relay
#[derive(Debug, Serialize)]
struct SmsRelayRequest<'a> {
    to: &'a str,
    message: String,
}

/// Notifier posting to configured webhooks
#[derive(Clone)]
pub struct WebhookNotifier {
    http_client: reqwest::Client,
    order_webhook_url: Option<String>,
    buyer_sms_webhook_url: Option<String>,
}

impl WebhookNotifier {
    /// Create a new WebhookNotifier from configuration
    pub fn new(config: &NotificationConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            order_webhook_url: non_empty(&config.order_webhook_url),
            buyer_sms_webhook_url: non_empty(&config.buyer_sms_webhook_url),
        })
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<(), String> {
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("Failed to deliver notification: {}", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("Notification webhook returned {}", response.status()))
        }
    }
}

fn non_empty(url: &Option<String>) -> Option<String> {
    url.as_ref()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_order_created(&self, summary: &OrderSummary) -> Result<(), String> {
        let Some(url) = self.order_webhook_url.as_deref() else {
            tracing::debug!(order_id = %summary.order_id, "order webhook not configured");
            return Ok(());
        };
        self.post_json(url, summary).await
    }

    async fn notify_buyer_order_confirmed(
        &self,
        phone: &str,
        summary: &OrderSummary,
    ) -> Result<(), String> {
        let Some(url) = self.buyer_sms_webhook_url.as_deref() else {
            tracing::debug!(order_id = %summary.order_id, "buyer SMS relay not configured");
            return Ok(());
        };
        let request = SmsRelayRequest {
            to: phone,
            message: summary.to_text(),
        };
        self.post_json(url, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(order: Option<&str>, sms: Option<&str>) -> NotificationConfig {
        NotificationConfig {
            order_webhook_url: order.map(str::to_string),
            buyer_sms_webhook_url: sms.map(str::to_string),
            timeout_secs: 1,
        }
    }

    #[test]
    fn blank_urls_are_treated_as_unconfigured() {
        let notifier = WebhookNotifier::new(&config(Some("  "), None)).unwrap();
        assert!(notifier.order_webhook_url.is_none());
        assert!(notifier.buyer_sms_webhook_url.is_none());
    }

    #[test]
    fn configured_urls_are_kept() {
        let notifier =
            WebhookNotifier::new(&config(Some("http://hooks.local/orders"), Some("http://sms.local")))
                .unwrap();
        assert_eq!(notifier.order_webhook_url.as_deref(), Some("http://hooks.local/orders"));
        assert_eq!(notifier.buyer_sms_webhook_url.as_deref(), Some("http://sms.local"));
    }
}
