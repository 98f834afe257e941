//! # FlySky RX
//!
//! FlySky AFHDS receiver on an A7105 with DSM serial output.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging through a non-blocking writer
//!    - Load configuration (first argument, or `flysky-rx.toml` if present)
//!    - Open the DSM serial port and spawn its writer task
//!
//! 2. **Receive Loop** (blocking thread)
//!    - Open SPI and GPIO lines, initialise the A7105
//!    - Bind, or track the stored transmitter and emit DSM frames
//!
//! 3. **Shutdown**
//!    - Ctrl+C stops the loop
//!    - A completed bind ends the process; restart to track
//!
//! ```bash
//! RUST_LOG=debug flysky-rx /etc/flysky-rx.toml
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use flysky_rx::config::Config;
use flysky_rx::serial::{spawn_writer, DsmSerial};

/// Configuration file looked up when no path is given
const DEFAULT_CONFIG_PATH: &str = "flysky-rx.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Keep log I/O off the receive loop
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .init();

    info!("FlySky RX v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    let serial = DsmSerial::open_with_paths(&[config.output.port.as_str()])?;
    info!("DSM output on {}", serial.device_path());
    let (output, writer_task) = spawn_writer(serial.into_port());

    let shutdown = Arc::new(AtomicBool::new(false));
    let loop_shutdown = shutdown.clone();
    let mut receive_loop = tokio::task::spawn_blocking(move || run_receiver(&config, output, &loop_shutdown));

    info!("Press Ctrl+C to exit");

    let outcome = tokio::select! {
        joined = &mut receive_loop => joined,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            shutdown.store(true, Ordering::Relaxed);
            receive_loop.await
        }
    };

    match outcome.context("receive loop panicked")? {
        Ok(Some(identity)) => {
            info!("Bound to transmitter 0x{:08X}; restart to start tracking", identity.id());
        }
        Ok(None) => {}
        Err(e) => {
            error!("Receiver stopped: {}", e);
            return Err(e.into());
        }
    }

    // The loop dropped its output handle, so the writer drains and exits
    match writer_task.await {
        Ok(frames) => info!("Total DSM frames written: {}", frames),
        Err(e) => warn!("DSM writer task failed: {}", e),
    }

    Ok(())
}

fn load_config() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("loading {}", path)),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Config::load(DEFAULT_CONFIG_PATH).with_context(|| format!("loading {}", DEFAULT_CONFIG_PATH))
        }
        None => {
            info!("No configuration file, using defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(target_os = "linux")]
fn run_receiver(
    config: &Config,
    output: flysky_rx::serial::SerialOutput,
    shutdown: &AtomicBool,
) -> flysky_rx::error::Result<Option<flysky_rx::protocol::NetworkIdentity>> {
    flysky_rx::board::run(config, output, shutdown)
}

#[cfg(not(target_os = "linux"))]
fn run_receiver(
    _config: &Config,
    _output: flysky_rx::serial::SerialOutput,
    _shutdown: &AtomicBool,
) -> flysky_rx::error::Result<Option<flysky_rx::protocol::NetworkIdentity>> {
    Err(flysky_rx::error::RxError::Transport(
        "A7105 access needs Linux spidev and GPIO character devices".to_string(),
    ))
}
