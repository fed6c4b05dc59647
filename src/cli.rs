//! Command line interface for the `framerelay` binary.
//!
//! Also compiled by `build.rs` to render the man page, so it may only depend
//! on `clap` and `std`.

use std::{net::SocketAddr, path::PathBuf};

use clap::{Args, Parser, Subcommand};

/// Command line arguments for the `framerelay` binary.
#[derive(Debug, Parser)]
#[command(
    name = "framerelay",
    version,
    about = "Relay a live JPEG feed from a TCP producer to HTTP viewers"
)]
pub struct Cli {
    /// Serve Prometheus metrics on this address.
    #[arg(long, env = "FRAMERELAY_METRICS_ADDR", global = true)]
    pub metrics_addr: Option<SocketAddr>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Accept producer frames and serve them as a multipart HTTP stream.
    Relay(RelayArgs),
    /// Push JPEG files from a directory to a relay.
    Send(SendArgs),
}

#[derive(Debug, Args)]
pub struct RelayArgs {
    /// Address producers connect to.
    #[arg(long, env = "FRAMERELAY_INGEST_ADDR", default_value = "0.0.0.0:9999")]
    pub ingest_addr: SocketAddr,

    /// Address the HTTP server listens on.
    #[arg(long, env = "FRAMERELAY_HTTP_ADDR", default_value = "0.0.0.0:5000")]
    pub http_addr: SocketAddr,

    /// Listen backlog and concurrent producer limit.
    #[arg(long, env = "FRAMERELAY_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Largest accepted frame in bytes.
    #[arg(long, env = "FRAMERELAY_MAX_FRAME_LENGTH", default_value_t = 16 * 1024 * 1024)]
    pub max_frame_length: usize,

    /// Pause after a producer disconnects, in milliseconds.
    #[arg(long, env = "FRAMERELAY_CLOSE_PAUSE_MS", default_value_t = 500)]
    pub close_pause_ms: u64,

    /// Interval between emitted stream parts, in milliseconds.
    #[arg(long, env = "FRAMERELAY_CADENCE_MS", default_value_t = 30)]
    pub cadence_ms: u64,

    /// Poll interval while no frame has arrived yet, in milliseconds.
    #[arg(long, env = "FRAMERELAY_IDLE_POLL_MS", default_value_t = 100)]
    pub idle_poll_ms: u64,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Relay ingest address (`host:port`).
    #[arg(long, env = "FRAMERELAY_RELAY_ADDR", default_value = "127.0.0.1:9999")]
    pub relay: String,

    /// Directory of `.jpg`/`.jpeg` files to cycle through.
    #[arg(long, env = "FRAMERELAY_FRAMES_DIR")]
    pub frames_dir: PathBuf,

    /// Delay between connection attempts, in milliseconds.
    #[arg(long, env = "FRAMERELAY_RECONNECT_DELAY_MS", default_value_t = 5000)]
    pub reconnect_delay_ms: u64,

    /// Pause between frames, in milliseconds.
    #[arg(long, env = "FRAMERELAY_FRAME_INTERVAL_MS", default_value_t = 30)]
    pub frame_interval_ms: u64,

    /// Largest frame to send in bytes.
    #[arg(long, env = "FRAMERELAY_MAX_FRAME_LENGTH", default_value_t = 16 * 1024 * 1024)]
    pub max_frame_length: usize,
}
