//! # Tilt Bridge
//!
//! Turn a phone's motion sensors into a virtual game controller.
//!
//! This application listens for UDP commands from a phone-side sender and
//! drives a uinput virtual joystick with the conditioned values.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tilt_bridge::config::{Config, OutputBackend};
use tilt_bridge::dispatch::{DispatchStats, Dispatcher};
use tilt_bridge::net::{resolve_bind_addr, CommandSocket};
use tilt_bridge::output::uinput::VirtualController;
use tilt_bridge::output::{LogSink, OutputSink};

/// Number of datagrams between status log messages
const LOG_INTERVAL_DATAGRAMS: u64 = 1000;

/// File name prefix for daily log files
const LOG_FILE_PREFIX: &str = "tilt-bridge.log";

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "tilt-bridge", version, about = "Phone motion sensors to virtual game controller")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on ("auto" picks the outbound interface)
    #[arg(short, long)]
    bind: Option<String>,

    /// UDP port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log controller frames instead of creating a uinput device
    #[arg(long)]
    dry_run: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Cli {
    /// Loads the config file (or defaults) and applies command-line overrides.
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(bind) = &self.bind {
            config.network.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.dry_run {
            config.output.backend = OutputBackend::Log;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// Sets up console logging plus an optional daily log file.
///
/// `RUST_LOG` wins over the configured level when set. The returned guard
/// flushes the file writer and must live until exit.
fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let (file_layer, guard) = if config.logging.log_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.logging.log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Creates the configured output backend.
fn open_sink(config: &Config) -> Result<Box<dyn OutputSink>> {
    match config.output.backend {
        OutputBackend::Uinput => {
            let mut controller = VirtualController::new(&config.output.device_name)
                .context("Failed to create virtual controller (is /dev/uinput writable?)")?;
            if let Some(path) = controller.device_path() {
                info!("Virtual controller available at {}", path.display());
            }
            Ok(Box::new(controller))
        }
        OutputBackend::Log => {
            info!("Dry run: controller frames are logged at debug level");
            Ok(Box::new(LogSink::new()))
        }
    }
}

fn log_status(stats: &DispatchStats) {
    info!(
        "Received {} datagrams ({} applied, {} dropped, {} sink errors)",
        stats.received, stats.applied, stats.dropped, stats.sink_errors
    );
}

/// Main entry point for Tilt Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Parse arguments and load configuration
///    - Set up logging
///    - Create the virtual controller (or the logging sink for dry runs)
///    - Bind the UDP command socket
///
/// 2. **Main Loop**
///    - Receive one datagram, decode it and apply it to the controller
///    - Log status every 1000 datagrams
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Log datagram totals
///    - Drop the socket and the virtual device
///
/// # Errors
///
/// Returns error if:
/// - The configuration cannot be loaded or is invalid
/// - The virtual controller cannot be created
/// - The UDP socket cannot be bound
///
/// Per-datagram failures are logged and never end the loop.
///
/// # Examples
///
/// ```bash
/// cargo run --release -- --port 9876
/// ```
///
/// Expected output:
/// ```text
/// INFO tilt_bridge: Tilt Bridge v0.1.0 starting...
/// INFO tilt_bridge::output::uinput: Created virtual controller: Tilt Bridge Controller
/// INFO tilt_bridge::net: UDP server listening on 192.168.1.20:9876
/// INFO tilt_bridge::control::reference: Reference locked: R=3.10, P=-1.25
/// ```
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    let _log_guard = init_logging(&config);

    info!("Tilt Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut sink = open_sink(&config)?;
    let mut dispatcher = Dispatcher::from_config(&config);
    info!("Steering mode: {}", dispatcher.steering().mode());

    let addr = resolve_bind_addr(&config.network.bind_address, config.network.port)?;
    let mut socket = CommandSocket::bind(addr, config.network.max_datagram_size).await?;

    info!("Press Ctrl+C to exit");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut last_log_count: u64 = 0;

    loop {
        tokio::select! {
            received = socket.recv() => {
                let (payload, _peer) = match received {
                    Ok(datagram) => datagram,
                    Err(e) => {
                        warn!("Receive failed: {}", e);
                        continue;
                    }
                };

                if let Err(e) = dispatcher.handle_datagram(payload, sink.as_mut()) {
                    warn!("Controller update failed: {}", e);
                }

                let stats = dispatcher.stats();
                if stats.received - last_log_count >= LOG_INTERVAL_DATAGRAMS {
                    log_status(&stats);
                    last_log_count = stats.received;
                }
            }

            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                log_status(&dispatcher.stats());
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_log_interval_constant() {
        assert_eq!(LOG_INTERVAL_DATAGRAMS, 1000);
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults_to_default_config() {
        let cli = Cli::parse_from(["tilt-bridge"]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.network.port, tilt_bridge::net::DEFAULT_PORT);
        assert_eq!(config.output.backend, OutputBackend::Uinput);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "tilt-bridge",
            "--bind",
            "127.0.0.1",
            "--port",
            "5555",
            "--dry-run",
            "--log-level",
            "debug",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.network.bind_address, "127.0.0.1");
        assert_eq!(config.network.port, 5555);
        assert_eq!(config.output.backend, OutputBackend::Log);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_invalid_override_rejected() {
        let cli = Cli::parse_from(["tilt-bridge", "--bind", "nowhere"]);
        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn test_cli_loads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[network]\nport = 4242\n").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cli = Cli::parse_from(["tilt-bridge", "--config", path.as_str()]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.network.port, 4242);
    }
}
