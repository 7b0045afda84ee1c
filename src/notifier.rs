use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::{Reading, Status};

pub const LINE_BROADCAST_URL: &str = "https://api.line.me/v2/bot/message/broadcast";

/// Outbound push channel. Failures are reported, never raised.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str, image_url: Option<&str>) -> bool;
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("rejected with {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

pub struct LineNotifier {
    http_client: reqwest::Client,
    token: String,
    endpoint: String,
}

impl LineNotifier {
    pub fn new(token: impl Into<String>) -> Result<Self, NotifyError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http_client,
            token: token.into(),
            endpoint: LINE_BROADCAST_URL.into(),
        })
    }

    async fn post(&self, payload: &Value) -> Result<(), NotifyError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected { status, body })
    }
}

#[async_trait]
impl Notifier for LineNotifier {
    async fn send(&self, text: &str, image_url: Option<&str>) -> bool {
        let payload = broadcast_payload(text, image_url);
        match self.post(&payload).await {
            Ok(()) => {
                match image_url {
                    Some(url) => info!("LINE message sent with image {}: {}", url, text),
                    None => info!("LINE message sent: {}", text),
                }
                true
            }
            Err(e) => {
                error!("LINE message failed: {}", e);
                false
            }
        }
    }
}

/// Broadcast body: one text part plus an optional image part.
pub fn broadcast_payload(text: &str, image_url: Option<&str>) -> Value {
    let mut messages = vec![json!({ "type": "text", "text": text })];
    if let Some(url) = image_url {
        messages.push(json!({
            "type": "image",
            "originalContentUrl": url,
            "previewImageUrl": url,
        }));
    }
    json!({ "messages": messages })
}

pub fn status_message(reading: &Reading, now: DateTime<Local>) -> String {
    let clock = now.format("%H:%M");
    let p = reading.percentage;
    match Status::classify(p) {
        Status::Low => format!("🔴 Plant is thirsty ({clock})\n💧 Moisture: {p}%\n⚠️ Time to water!"),
        Status::Moderate => format!("🟡 Moisture is moderate ({clock})\n💧 Moisture: {p}%\n✅ Doing fine"),
        Status::Sufficient => format!("🟢 Moisture is plentiful ({clock})\n💧 Moisture: {p}%\n🎉 Perfect condition!"),
    }
}

pub fn periodic_message(reading: &Reading, now: DateTime<Local>, interval: Duration) -> String {
    let minutes = (interval.as_secs() / 60).max(1);
    format!(
        "📊 Periodic report\n{}\n\nNext report in {} minutes",
        status_message(reading, now),
        minutes
    )
}

pub const STARTUP_MESSAGE: &str =
    "🌱 Moisture monitor started\nYou will get updates on status changes and at regular intervals";

/// Decides whether a picture can go out with a notification. LINE only
/// fetches images over HTTPS, so a plain-HTTP base URL disables attachments.
#[derive(Debug, Clone)]
pub struct ImagePolicy {
    pub public_url: String,
    pub image_dir: PathBuf,
    pub image_name: String,
}

impl ImagePolicy {
    pub fn image_url(&self) -> Option<String> {
        let path = self.image_dir.join(&self.image_name);
        let exists = path.is_file();
        let secure = self.public_url.starts_with("https://");

        if !exists {
            warn!("Image file not found: {}", path.display());
        }
        if !secure {
            warn!("Image attachment needs an https public URL, got {}", self.public_url);
        }
        if !(exists && secure) {
            return None;
        }
        Some(format!(
            "{}/image/{}",
            self.public_url.trim_end_matches('/'),
            self.image_name
        ))
    }
}
