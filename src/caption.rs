//! Short "plant mood" lines shown on the status page.
//!
//! A remote text model is used when an API key is configured; otherwise, and
//! whenever the remote call fails, a line is drawn from a fixed table.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::models::Status;
use crate::utils::truncate_caption;

#[derive(Debug, Clone, Copy)]
pub struct CaptionContext {
    pub percentage: i64,
    pub status: Option<Status>,
}

#[async_trait]
pub trait CaptionGenerator: Send + Sync {
    async fn generate(&self, ctx: CaptionContext) -> String;
}

const SUFFICIENT_LINES: &[&str] = &[
    "Feeling fantastic!",
    "Best day ever!",
    "So fresh and plump!",
    "Tank is full!",
    "Sparkling today~",
    "Totally happy!",
    "Shiny leaves, see?",
];

const MODERATE_LINES: &[&str] = &[
    "Doing okay, I guess",
    "So-so today~",
    "Not bad at all",
    "Pretty average",
    "Could be worse!",
    "Just chilling",
];

const LOW_LINES: &[&str] = &[
    "I'm so thirsty...",
    "Water please!",
    "Bone dry here~",
    "Kinda tired...",
    "Need a drink!",
    "Drying out...",
];

const UNKNOWN_LINES: &[&str] = &[
    "How am I doing?",
    "Not sure yet~",
    "Checking in...",
    "Warming up!",
];

/// Random line from a fixed per-status table.
#[derive(Debug, Default, Clone, Copy)]
pub struct CannedCaptions;

impl CannedCaptions {
    pub fn table(status: Option<Status>) -> &'static [&'static str] {
        match status {
            Some(Status::Sufficient) => SUFFICIENT_LINES,
            Some(Status::Moderate) => MODERATE_LINES,
            Some(Status::Low) => LOW_LINES,
            None => UNKNOWN_LINES,
        }
    }

    pub fn pick(status: Option<Status>) -> String {
        Self::table(status)
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Hello!")
            .to_string()
    }
}

#[async_trait]
impl CaptionGenerator for CannedCaptions {
    async fn generate(&self, ctx: CaptionContext) -> String {
        Self::pick(ctx.status)
    }
}

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("response contained no text")]
    Empty,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

pub struct GeminiCaptions {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiCaptions {
    pub fn new(api_key: impl Into<String>) -> Result<Self, CaptionError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: "gemini-1.5-flash".into(),
        })
    }

    async fn request(&self, ctx: CaptionContext) -> Result<String, CaptionError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body = json!({ "contents": [{ "parts": [{ "text": prompt(ctx) }] }] });

        let response: GenerateResponse = self
            .http_client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(CaptionError::Empty)?;
        Ok(truncate_caption(&text))
    }
}

#[async_trait]
impl CaptionGenerator for GeminiCaptions {
    async fn generate(&self, ctx: CaptionContext) -> String {
        match self.request(ctx).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Caption generation failed, using canned line: {}", e);
                CannedCaptions::pick(ctx.status)
            }
        }
    }
}

fn prompt(ctx: CaptionContext) -> String {
    let status = ctx.status.map_or("unknown", Status::as_str);
    format!(
        "You are a cheerful, upbeat houseplant character.\n\
         Current soil moisture: {}%\n\
         Status: {}\n\
         Reply with one short line (at most 20 characters), casual and bubbly, \
         no emoji, expressing how you feel about your water level.\n\
         Return only the line.",
        ctx.percentage, status
    )
}

/// Remote generator when a key is present, canned table otherwise.
pub fn from_key(api_key: Option<&str>) -> Box<dyn CaptionGenerator> {
    match api_key.map(GeminiCaptions::new) {
        Some(Ok(gemini)) => Box::new(gemini),
        Some(Err(e)) => {
            warn!("Caption client unavailable, using canned lines: {}", e);
            Box::new(CannedCaptions)
        }
        None => Box::new(CannedCaptions),
    }
}
