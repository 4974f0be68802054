//! Ring Log Server - Binary Entry Point
//!
//! Serves the shared ring log over TCP (port 9000 by default) and writes
//! a timestamp record every ten seconds.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;

use ring_log::producer::LocalClock;
use ring_log::{ServerConfig, ServerDispatcher, SessionSettings, SharedLog};

/// Bounded shared record log served over TCP
#[derive(Parser, Debug)]
#[command(name = "ring-log-server", version)]
struct Args {
    /// Listen address, e.g. 0.0.0.0:9000
    #[arg(short, long)]
    addr: Option<String>,

    /// Number of records kept before the oldest is evicted
    #[arg(short, long)]
    capacity: Option<usize>,

    /// Seconds between timestamp records (0 disables them)
    #[arg(short, long)]
    timestamp_secs: Option<u64>,

    /// Mirror the live log content to this file
    #[arg(short, long)]
    file: Option<PathBuf>,
}

impl Args {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(addr) = self.addr {
            config.bind_addr = addr;
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(secs) = self.timestamp_secs {
            config.timestamp_interval_secs = secs;
        }
        if let Some(file) = self.file {
            config.backing_file = Some(file);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ring_log=info".parse()?),
        )
        .init();

    let mut config = ServerConfig::load().context("loading configuration")?;
    Args::parse().apply(&mut config);
    config.validate().context("invalid configuration")?;

    let log = match &config.backing_file {
        Some(path) => SharedLog::with_backing_file(config.capacity, path)?,
        None => SharedLog::new(config.capacity)?,
    };

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(
        addr = %config.bind_addr,
        capacity = config.capacity,
        "ring log server listening"
    );

    let mut dispatcher = ServerDispatcher::new(log, SessionSettings::from(&config));
    dispatcher.start(listener)?;
    if let Some(interval) = config.timestamp_interval() {
        dispatcher.spawn_producer(interval, LocalClock)?;
    }

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = dispatcher.stopped() => tracing::error!("dispatcher stopped unexpectedly"),
    }

    let stats = dispatcher.shutdown().await?;
    tracing::info!(
        sessions = stats.accepted,
        records = stats.records_committed,
        "server shut down gracefully"
    );
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
