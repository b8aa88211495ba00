use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::error::Error;

/// Delivers composed notification text.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), Error>;
}

#[derive(Serialize)]
struct DiscordMessage {
    content: String,
}

/// Posts notifications to a Discord webhook.
pub struct DiscordNotifier {
    client: Client,
    webhook_url: Option<String>,
    discord_id: Option<u64>,
}

impl DiscordNotifier {
    pub fn new(
        webhook_url: Option<String>,
        discord_id: Option<u64>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            webhook_url,
            discord_id,
        })
    }

    fn payload(&self, message: &str) -> DiscordMessage {
        // If discord_id is None, we don't want to mention anyone
        let tag = self.discord_id.map_or(String::new(), |id| format!("<@{id}> "));
        DiscordMessage {
            content: format!("{tag}{message}"),
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, message: &str) -> Result<(), Error> {
        let Some(webhook) = &self.webhook_url else {
            warn!("Webhook is not set, skipping notification");
            return Ok(());
        };

        self.client
            .post(webhook)
            .json(&self.payload(message))
            .send()
            .await?
            .error_for_status()?;

        info!("Notification sent to Discord");
        Ok(())
    }
}
