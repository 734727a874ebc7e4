use anyhow::{anyhow, Context, Result};

use crate::models::ParsedChat;
use crate::services::chat_parser::parse_json_chat;

/// Fetches chat replay for a VOD from an HTTP provider that serves
/// twitch-dl-shaped JSON. Twitch's own API has no chat replay, so this
/// points at whatever logging service the operator runs. Entirely optional:
/// the pipeline falls back to other sources when no provider is configured.
#[derive(Debug, Clone)]
pub struct ChatReplayClient {
    base_url: String,
    client: reqwest::Client,
}

impl ChatReplayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch messages for `vod_id` within `[start, end]` seconds.
    pub async fn fetch(&self, vod_id: &str, start: f64, end: f64) -> Result<ParsedChat> {
        let url = format!(
            "{}/comments?video_id={}&start={:.0}&end={:.0}",
            self.base_url.trim_end_matches('/'),
            vod_id,
            start,
            end
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch chat replay from {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "chat provider returned {} for VOD {}",
                response.status(),
                vod_id
            ));
        }

        let body = response.text().await.context("Failed to read chat reply")?;
        parse_json_chat(&body)
    }
}
