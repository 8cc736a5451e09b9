use anyhow::Result;
use clap::Parser;
use tokio::signal;

use lib_dashsync::{Dispatcher, StreamStatus, SyncConfig, TransportAdapter};

mod client_logic;
use client_logic::{config, fallback, logger, render};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config(config::Config::parse());
    let log_path = logger::setup_logging(&config.log_dir(), config.log_level())?;
    log::info!("Logging to {}", log_path.display());

    let mut sync_config = config.to_sync_config();

    // `None` from the dispatcher means a shutdown signal was received.
    while let Some(status) = run_dispatcher(&sync_config).await? {
        match fallback::next_transport(&status, config.fallback_to_poll(), sync_config.transport)? {
            Some(transport) => sync_config.transport = transport,
            None => break,
        }
    }

    log::info!("Shutdown complete.");
    Ok(())
}

/// Runs one dispatcher until a shutdown signal (`None`) or a terminal stream status.
async fn run_dispatcher(sync_config: &SyncConfig) -> Result<Option<StreamStatus>> {
    let mut dispatcher = Dispatcher::from_config(sync_config);
    let mut views = dispatcher.views();
    let renderer = tokio::spawn(render::run(dispatcher.views()));

    dispatcher.start(TransportAdapter::from_config(sync_config)?)?;

    let status = tokio::select! {
        _ = shutdown_signal() => None,
        status = views.terminated() => Some(status),
    };

    dispatcher.stop().await?;
    let _ = renderer.await;
    Ok(status)
}

/// Waits for Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::warn!("Cannot listen for SIGTERM: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }
}
