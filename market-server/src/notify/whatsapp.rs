//! WhatsApp-style messaging API channel (primary)

use super::{NotificationChannel, NotificationMessage, SendError};
use async_trait::async_trait;
use serde_json::json;
use shared::models::ChannelKind;
use std::time::Duration;

pub struct WhatsAppChannel {
    client: reqwest::Client,
    api_url: String,
    api_token: Option<String>,
}

impl WhatsAppChannel {
    pub fn new(api_url: String, api_token: Option<String>, timeout: Duration) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SendError::Transport(format!("failed to build client: {e}")))?;
        Ok(Self {
            client,
            api_url,
            api_token,
        })
    }
}

/// Provider expects digits only, country code without `+`
fn normalize_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    match digits.strip_prefix('0') {
        Some(rest) => format!("62{rest}"),
        None => digits,
    }
}

#[async_trait]
impl NotificationChannel for WhatsAppChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Whatsapp
    }

    async fn send(&self, target: &str, message: &NotificationMessage) -> Result<(), SendError> {
        let mut req = self.client.post(&self.api_url).json(&json!({
            "messaging_product": "whatsapp",
            "to": normalize_phone(target),
            "type": "text",
            "text": { "body": format!("*{}*\n{}", message.subject, message.body) },
        }));
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                SendError::Timeout
            } else {
                SendError::Transport(e.to_string())
            }
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SendError::Rejected {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        tracing::debug!(to = target, "WhatsApp message accepted");
        Ok(())
    }
}
