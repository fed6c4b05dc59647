//! Producer client for the frame relay.
//!
//! [`FrameClient`] pulls encoded frames from a
//! [`FrameSource`](crate::source::FrameSource) and pushes them to a relay's
//! ingest port using the length-prefixed wire format. It runs as an explicit
//! state machine:
//!
//! ```text
//! Disconnected -> Connecting -> Streaming -> (error) -> Disconnected
//! ```
//!
//! Connecting retries forever with a fixed delay. A failed send discards the
//! connection, releases the frame source, waits a cooldown, and starts over.
//! Only cancellation ends the cycle.

mod config;
mod error;
mod runtime;
mod state;

pub use config::{ClientConfig, DEFAULT_FRAME_INTERVAL, DEFAULT_RECONNECT_DELAY};
pub use error::ClientError;
pub use runtime::{FrameClient, FrameConnection};
pub use state::ClientState;
