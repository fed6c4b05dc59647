#![doc(html_root_url = "https://docs.rs/framerelay/latest")]
//! Public API for the `framerelay` library.
//!
//! A relay sits between one camera-side producer and any number of browser
//! viewers:
//!
//! ```text
//! FrameSource -> FrameClient -(u32 BE length + JPEG)-> FrameIngestor
//!     -> LatestFrameCache -> StreamEmitter -(multipart/x-mixed-replace)-> viewers
//! ```
//!
//! The cache holds only the newest frame, so the producer's push rate and
//! each viewer's pull rate are independent.

pub mod byte_order;
pub mod cache;
pub mod client;
pub mod codec;
pub mod config;
pub mod emitter;
pub mod frame;
pub mod http;
pub mod ingest;
pub mod metrics;
pub mod relay;
pub mod source;

pub use cache::LatestFrameCache;
pub use client::{ClientError, FrameClient};
pub use codec::{CodecError, FrameCodec};
pub use emitter::StreamEmitter;
pub use frame::Frame;
pub use ingest::{FrameIngestor, IngestError};
pub use relay::{Relay, RelayError};
