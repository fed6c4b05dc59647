//! `framerelay` binary: run a relay or push frames to one.

mod cli;

use std::{error::Error, net::SocketAddr, process::ExitCode, time::Duration};

use clap::Parser;
use cli::{Cli, Command, RelayArgs, SendArgs};
use framerelay::{
    client::{ClientConfig, FrameClient},
    config::RelayConfig,
    emitter::EmitterConfig,
    relay::Relay,
    source::DirectorySource,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Some(addr) = cli.metrics_addr {
        install_metrics_exporter(addr);
    }

    let result = match cli.command {
        Command::Relay(args) => run_relay(&args).await,
        Command::Send(args) => run_send(args).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "framerelay failed");
            ExitCode::FAILURE
        }
    }
}

fn relay_config(args: &RelayArgs) -> RelayConfig {
    RelayConfig::default()
        .ingest_addr(args.ingest_addr)
        .http_addr(args.http_addr)
        .max_connections(args.max_connections)
        .max_frame_length(args.max_frame_length)
        .close_pause(Duration::from_millis(args.close_pause_ms))
        .emitter(EmitterConfig {
            cadence: Duration::from_millis(args.cadence_ms),
            idle_poll: Duration::from_millis(args.idle_poll_ms),
        })
}

async fn run_relay(args: &RelayArgs) -> Result<(), Box<dyn Error>> {
    let relay = Relay::bind(relay_config(args)).await?;
    info!(
        ingest_addr = ?relay.ingest_addr(),
        http_addr = ?relay.http_addr(),
        "relay started"
    );
    relay.run().await?;
    Ok(())
}

async fn run_send(args: SendArgs) -> Result<(), Box<dyn Error>> {
    let shutdown = CancellationToken::new();
    let on_ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        info!("shutdown requested");
        on_ctrl_c.cancel();
    });

    let config = ClientConfig::default()
        .reconnect_delay(Duration::from_millis(args.reconnect_delay_ms))
        .frame_interval(Duration::from_millis(args.frame_interval_ms))
        .max_frame_length(args.max_frame_length);
    let mut source = DirectorySource::new(args.frames_dir);
    FrameClient::new(args.relay)
        .config(config)
        .shutdown_token(shutdown)
        .run(&mut source)
        .await;
    Ok(())
}

#[cfg(feature = "metrics")]
fn install_metrics_exporter(addr: SocketAddr) {
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => info!(%addr, "prometheus exporter listening"),
        Err(e) => warn!(error = %e, %addr, "failed to start prometheus exporter"),
    }
}

#[cfg(not(feature = "metrics"))]
fn install_metrics_exporter(addr: SocketAddr) {
    warn!(%addr, "built without the metrics feature; --metrics-addr ignored");
}
