//! Delivery of password reset tokens.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use super::ResetNotifier;
use crate::error::{AppError, AppResult};

/// Posts `{ "email", "token", "reset_url" }` to a mail relay webhook.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
    reset_page_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: &str, reset_page_url: &str) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build webhook client: {}", e)))?;

        Ok(Self {
            client,
            webhook_url: webhook_url.to_string(),
            reset_page_url: reset_page_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ResetNotifier for WebhookNotifier {
    async fn deliver(&self, email: &str, token: &str) -> AppResult<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&json!({
                "email": email,
                "token": token,
                "reset_url": format!("{}?token={}", self.reset_page_url, token),
            }))
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Reset webhook error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(anyhow::anyhow!(
                "Reset webhook returned {}: {}",
                status,
                body
            )));
        }
        Ok(())
    }
}

/// Local development fallback when no webhook is configured: the token is
/// only written to the debug log.
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl ResetNotifier for LogNotifier {
    async fn deliver(&self, email: &str, token: &str) -> AppResult<()> {
        tracing::warn!(email = %email, "No reset webhook configured, token written to debug log");
        tracing::debug!(email = %email, token = %token, "Password reset token");
        Ok(())
    }
}

/// Keeps every delivered token in memory.
#[derive(Clone, Default)]
pub struct MemoryOutbox {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sent.lock().await.is_empty()
    }

    /// Most recent token delivered to `email`.
    pub async fn last_token_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, token)| token.clone())
    }
}

#[async_trait]
impl ResetNotifier for MemoryOutbox {
    async fn deliver(&self, email: &str, token: &str) -> AppResult<()> {
        self.sent
            .lock()
            .await
            .push((email.to_string(), token.to_string()));
        Ok(())
    }
}
