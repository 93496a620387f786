use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DeliveryError;

/// Delivers a message to one owner. Failures stay with that owner.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, owner: i64, message: &str) -> Result<(), DeliveryError>;
}

/// Telegram Bot API `sendMessage`; the owner id is the chat id.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), token),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, owner: i64, message: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: owner,
                text: message,
            })
            .send()
            .await?;

        let status = response.status();
        let body: ApiResponse = response.json().await?;
        if !body.ok {
            return Err(DeliveryError::Rejected {
                description: body
                    .description
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            });
        }
        debug!(owner, "Notification delivered");
        Ok(())
    }
}

/// Prints notifications instead of sending them.
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn notify(&self, owner: i64, message: &str) -> Result<(), DeliveryError> {
        println!("── to {} ──\n{}\n", owner, message);
        Ok(())
    }
}
