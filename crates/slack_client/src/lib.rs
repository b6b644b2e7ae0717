//! Slack incoming-webhook sink.
//!
//! Sending never raises across the dispatch boundary: failures are
//! logged and reported as `false` so the writer can count them.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use common::store::DispatchSink;
use common::text::truncate_utf8;
use common::{Error, Result};

const WEBHOOK_PREFIX: &str = "https://hooks.slack.com/services/";
const MIN_WEBHOOK_LEN: usize = 50;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Minimal incoming-webhook client with a short request timeout.
#[derive(Debug, Clone)]
pub struct SlackClient {
    client: reqwest::Client,
}

impl SlackClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Http(format!("failed to build Slack HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Post one message, surfacing transport and status errors.
    pub async fn post_message(&self, webhook_url: &str, message: &str) -> Result<()> {
        if !validate_webhook_url(webhook_url) {
            return Err(Error::Dispatch(format!(
                "invalid webhook url: {}",
                truncate_utf8(webhook_url, 40)
            )));
        }

        let resp = self
            .client
            .post(webhook_url)
            .json(&WebhookPayload { text: message })
            .send()
            .await
            .map_err(|e| Error::Dispatch(format!("webhook request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Dispatch(format!(
                "webhook returned {status}: {}",
                truncate_utf8(&body, 200)
            )));
        }

        debug!("webhook delivered ({} chars)", message.len());
        Ok(())
    }
}

/// Incoming-webhook URLs have a fixed service prefix and a long token tail.
pub fn validate_webhook_url(url: &str) -> bool {
    url.starts_with(WEBHOOK_PREFIX) && url.len() > MIN_WEBHOOK_LEN
}

#[async_trait]
impl DispatchSink for SlackClient {
    async fn send(&self, endpoint: &str, message: &str) -> bool {
        match self.post_message(endpoint, message).await {
            Ok(()) => true,
            Err(e) => {
                warn!("dispatch failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_real_looking_webhook() {
        assert!(validate_webhook_url(
            "https://hooks.slack.com/services/T0000000/B0000000/XXXXXXXXXXXXXXXXXXXXXXXX"
        ));
    }

    #[test]
    fn rejects_wrong_host_or_short_token() {
        assert!(!validate_webhook_url("https://example.com/webhook"));
        assert!(!validate_webhook_url("https://hooks.slack.com/services/x"));
        assert!(!validate_webhook_url(""));
    }

    #[tokio::test]
    async fn multibyte_invalid_url_yields_error_not_panic() {
        // The quoted prefix cut must not split a multi-byte character.
        let client = SlackClient::new().unwrap();
        let url = "한글주소".repeat(20);
        let err = client.post_message(&url, "hi").await.unwrap_err();
        assert!(matches!(err, Error::Dispatch(_)));
    }
}
