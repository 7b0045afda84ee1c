use anyhow::{Context, Result};
use chrono::Local;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

mod api;
mod caption;
mod config;
mod engine;
mod models;
mod notifier;
mod parser;
mod reporter;
mod utils;

use crate::caption::CaptionContext;
use crate::config::MonitorConfig;
use crate::engine::Engine;
use crate::models::{shared_snapshot, StatusSnapshot};
use crate::notifier::{ImagePolicy, LineNotifier, Notifier, STARTUP_MESSAGE};
use crate::reporter::Reporter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::INFO.into()))
        .with_ansi(true)
        .init();

    let config = MonitorConfig::load().context("Failed to load configuration")?;
    let serial_port = config.serial_port()?.to_string();
    let token = config.line_token()?.to_string();

    info!("Serial port: {} @ {} baud", serial_port, config.baud_rate);
    info!("Public URL: {}", config.public_url);
    info!("Caption model: {}", if config.gemini_api_key.is_some() { "remote" } else { "canned" });

    let captions = caption::from_key(config.gemini_api_key.as_deref());
    let greeting = captions.generate(CaptionContext { percentage: 0, status: None }).await;
    info!("Initial caption: {}", greeting);
    let snapshot = shared_snapshot(StatusSnapshot::starting(greeting));

    let snapshot_for_api = snapshot.clone();
    let image_dir = config.image_dir.clone();
    let api_port = config.api_port;
    tokio::spawn(async move {
        if let Err(e) = api::start_server(api_port, snapshot_for_api, &image_dir).await {
            tracing::error!("Status server failed: {:#}", e);
        }
    });

    let notifier: Arc<dyn Notifier> =
        Arc::new(LineNotifier::new(token).context("Failed to build HTTP client")?);
    if notifier.send(STARTUP_MESSAGE, None).await {
        info!("LINE connection OK");
    } else {
        warn!("LINE connection test failed; continuing, but notifications may not arrive");
    }

    let stream = engine::open_serial(&serial_port, config.baud_rate).await?;

    let reporter = Reporter::new(
        Local::now(),
        config.report_interval(),
        snapshot,
        notifier,
        captions,
        ImagePolicy {
            public_url: config.public_url.clone(),
            image_dir: config.image_dir.clone(),
            image_name: config.image_name.clone(),
        },
    );
    info!("Notifying on status changes and every {}s", config.report_interval_secs);

    tokio::spawn(Engine::new(reporter).run(stream));

    signal::ctrl_c().await?;
    info!("Shutdown signal received. Stopping moisture monitor...");

    Ok(())
}
