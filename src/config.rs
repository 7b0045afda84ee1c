use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("{0} is not set")]
    Missing(&'static str),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(rename = "arduino_port")]
    pub serial_port: Option<String>,
    #[serde(rename = "channel_access_token")]
    pub line_token: Option<String>,
    #[serde(rename = "server_url", default = "default_public_url")]
    pub public_url: String,
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
    #[serde(default = "default_image_name")]
    pub image_name: String,
}

fn default_public_url() -> String { "http://localhost:5000".into() }
fn default_baud_rate() -> u32 { 9600 }
fn default_api_port() -> u16 { 5000 }
fn default_report_interval() -> u64 { 300 }
fn default_image_dir() -> PathBuf { PathBuf::from(".") }
fn default_image_name() -> String { "ohana.png".into() }

impl MonitorConfig {
    /// Reads an optional `config.json` and then the process environment,
    /// which wins on conflicts.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::new("config.json", FileFormat::Json).required(false))
            .add_source(Environment::default())
            .build()?;
        let mut parsed: MonitorConfig = config.try_deserialize()?;
        parsed.gemini_api_key = parsed.gemini_api_key.filter(|k| !k.trim().is_empty());
        Ok(parsed)
    }

    pub fn serial_port(&self) -> Result<&str, ConfigError> {
        non_empty(self.serial_port.as_deref()).ok_or(ConfigError::Missing("ARDUINO_PORT"))
    }

    pub fn line_token(&self) -> Result<&str, ConfigError> {
        non_empty(self.line_token.as_deref()).ok_or(ConfigError::Missing("CHANNEL_ACCESS_TOKEN"))
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
