use crate::domain::ports::Notifier;
use crate::utils::error::{BackupError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

pub const SLACK_WEBHOOK_ENV: &str = "SLACK_WEBHOOK_URL";
const SLACK_SENDER: &str = "Atlassian backup service";

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    username: &'a str,
    text: &'a str,
}

/// Posts notifications to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: Client::new(),
        }
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let webhook = lookup(SLACK_WEBHOOK_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| BackupError::ConfigurationError {
                message: "Slack webhook URL is not specified (SLACK_WEBHOOK_URL)".to_string(),
            })?;
        Ok(Self::new(webhook))
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let message = WebhookMessage {
            username: SLACK_SENDER,
            text,
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| BackupError::DeliveryError {
                message: format!("can't send notification to Slack: {}", e.without_url()),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackupError::DeliveryError {
                message: format!(
                    "can't send notification to Slack: status {}: {}",
                    status, body
                ),
            });
        }

        tracing::debug!("Notification delivered to Slack");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_from_lookup_requires_webhook() {
        let err = SlackNotifier::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, BackupError::ConfigurationError { .. }));
    }

    #[tokio::test]
    async fn test_send_posts_webhook_message() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/services/T000/B000/XXX")
                .json_body(serde_json::json!({
                    "username": "Atlassian backup service",
                    "text": "Backup Jira successfully saved!",
                }));
            then.status(200).body("ok");
        });

        let notifier = SlackNotifier::new(server.url("/services/T000/B000/XXX"));
        notifier.send("Backup Jira successfully saved!").await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_send_non_success_is_delivery_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/hook");
            then.status(403).body("invalid_token");
        });

        let err = SlackNotifier::new(server.url("/hook"))
            .send("hello")
            .await
            .unwrap_err();
        match err {
            BackupError::DeliveryError { message } => assert!(message.contains("invalid_token")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
