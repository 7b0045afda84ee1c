use anyhow::{Context, Result};
use chrono::Local;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use crate::parser::parse_line;
use crate::reporter::Reporter;

const SETTLE_DELAY: Duration = Duration::from_secs(2);
const DECODE_PAUSE: Duration = Duration::from_millis(100);
const READ_ERROR_PAUSE: Duration = Duration::from_secs(1);

/// Opens the sensor port. Most boards reset when the port opens, so this
/// waits for the firmware to come back before returning.
pub async fn open_serial(port: &str, baud_rate: u32) -> Result<SerialStream> {
    let stream = tokio_serial::new(port, baud_rate)
        .open_native_async()
        .with_context(|| {
            format!("Failed to open serial port {} (check the port name and that no other serial monitor holds it)", port)
        })?;
    tokio::time::sleep(SETTLE_DELAY).await;
    info!("Serial port {} open at {} baud", port, baud_rate);
    Ok(stream)
}

pub struct Engine {
    reporter: Reporter,
}

impl Engine {
    pub fn new(reporter: Reporter) -> Self {
        Self { reporter }
    }

    /// Reads the sensor forever. The stream may hit end-of-file when the
    /// device re-enumerates; the loop keeps polling.
    pub async fn run(mut self, stream: SerialStream) {
        info!("Moisture monitoring active");
        let mut reader = BufReader::new(stream);
        loop {
            self.pump_lines(&mut reader).await;
            warn!("Serial stream ended, waiting for data...");
            tokio::time::sleep(READ_ERROR_PAUSE).await;
        }
    }

    /// Processes lines until the reader reports end-of-file. Returns the
    /// number of readings handed to the reporter.
    pub async fn pump_lines<R>(&mut self, reader: &mut R) -> usize
    where
        R: AsyncBufRead + Unpin,
    {
        let mut processed = 0;
        let mut buf = Vec::with_capacity(128);
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => return processed,
                Ok(_) => {}
                Err(e) => {
                    warn!("Serial read error: {}", e);
                    tokio::time::sleep(READ_ERROR_PAUSE).await;
                    continue;
                }
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(text) => text.trim(),
                Err(e) => {
                    warn!("Undecodable serial line skipped: {}", e);
                    tokio::time::sleep(DECODE_PAUSE).await;
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            debug!("Received: {}", line);

            if let Some(reading) = parse_line(line) {
                let outcome = self.reporter.process(reading, Local::now()).await;
                debug!(?reading, ?outcome, state = ?self.reporter.state(), "Processed reading");
                processed += 1;
            }
        }
    }

    #[cfg(test)]
    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }
}
