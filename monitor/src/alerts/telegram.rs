//! Telegram bot API sink

use super::{AlertError, AlertSink};
use crate::config::TelegramConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub struct TelegramAlerts {
    client: reqwest::Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

impl TelegramAlerts {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.bot_token, method)
    }

    /// Check the bot token with `getMe`
    pub async fn verify(&self) -> Result<(), AlertError> {
        let response = self.client.get(self.method_url("getMe")).send().await?;
        let body = Self::check(response).await?;

        let username = body
            .result
            .as_ref()
            .and_then(|r| r.get("username"))
            .and_then(|u| u.as_str())
            .unwrap_or("unknown");
        info!("Telegram bot verified: @{}", username);

        Ok(())
    }

    async fn check(response: reqwest::Response) -> Result<ApiResponse, AlertError> {
        let status = response.status();
        let body: ApiResponse = response.json().await?;

        if !status.is_success() || !body.ok {
            return Err(AlertError::Rejected {
                status: status.as_u16(),
                description: body
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl AlertSink for TelegramAlerts {
    async fn deliver(&self, message: &str) -> Result<(), AlertError> {
        let request = SendMessage {
            chat_id: &self.chat_id,
            text: message,
            parse_mode: "Markdown",
        };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&request)
            .send()
            .await?;

        Self::check(response).await?;
        debug!("Alert delivered to chat {}", self.chat_id);

        Ok(())
    }
}
