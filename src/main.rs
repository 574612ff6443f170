//! uart-rpc-bridge - serial link to D-Bus bridge daemon.

use std::env;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use uart_rpc_bridge::core::DEFAULT_CONFIG_PATH;
use uart_rpc_bridge::link::SerialPortLink;
use uart_rpc_bridge::rpc::DbusClient;
use uart_rpc_bridge::{ActionRegistry, CodecRegistry, Config, Dispatcher, Error, Result};

/// Environment variable overriding the configuration file location
const CONFIG_ENV: &str = "UART_RPC_BRIDGE_CONFIG";

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "uart-rpc-bridge failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config_path = env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;
    let settings = config.serial_settings(env::args().nth(1))?;
    info!(
        version = uart_rpc_bridge::VERSION,
        config = %config_path,
        device = %settings.device,
        "starting uart-rpc-bridge"
    );

    let codecs = CodecRegistry::with_defaults();
    info!("reading possible actions");
    let registry = Arc::new(ActionRegistry::build(&config.actions, &codecs)?);

    let link = SerialPortLink::open(&settings)?;
    let rpc = DbusClient::connect(config.bus)?;
    let mut dispatcher = Dispatcher::new(link, rpc, registry);

    let shutdown = Arc::new(AtomicBool::new(false));
    let worker_shutdown = Arc::clone(&shutdown);
    let mut worker = tokio::task::spawn_blocking(move || dispatcher.run(&worker_shutdown));

    tokio::select! {
        joined = &mut worker => {
            joined.map_err(|e| Error::device(format!("Dispatcher task failed: {}", e)))?;
            return Ok(());
        }
        signal = shutdown_signal() => {
            if let Err(err) = signal {
                error!(error = %err, "failed to listen for shutdown signal");
            }
        }
    }

    info!("shutting down after the cycle in flight");
    shutdown.store(true, Ordering::SeqCst);
    worker
        .await
        .map_err(|e| Error::device(format!("Dispatcher task failed: {}", e)))?;

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
