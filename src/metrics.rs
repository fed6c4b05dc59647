//! Metric helpers for `framerelay`.
//!
//! Metric names and thin wrappers around the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled every helper compiles to nothing.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Gauge of open producer connections.
pub const CONNECTIONS_ACTIVE: &str = "framerelay_connections_active";
/// Counter of frames decoded and published to the cache.
pub const FRAMES_INGESTED: &str = "framerelay_frames_ingested_total";
/// Counter of producer connections closed by a framing or EOF error.
pub const FRAMING_ERRORS: &str = "framerelay_framing_errors_total";
/// Gauge of HTTP consumers currently streaming.
pub const CONSUMERS_ACTIVE: &str = "framerelay_consumers_active";
/// Counter of multipart chunks handed to HTTP consumers.
pub const CHUNKS_EMITTED: &str = "framerelay_chunks_emitted_total";
/// Counter of producer reconnect cycles.
pub const CLIENT_RECONNECTS: &str = "framerelay_client_reconnects_total";

/// Increment the active producer connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the active producer connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a frame published to the cache.
pub fn inc_frames_ingested() {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_INGESTED).increment(1);
}

/// Record a connection dropped because of a decode failure.
///
/// `kind` is the [`CodecError::error_type`](crate::codec::CodecError::error_type)
/// label.
pub fn inc_framing_errors(kind: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(FRAMING_ERRORS, "kind" => kind).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}

/// Increment the active consumers gauge.
pub fn inc_consumers() {
    #[cfg(feature = "metrics")]
    gauge!(CONSUMERS_ACTIVE).increment(1.0);
}

/// Decrement the active consumers gauge.
pub fn dec_consumers() {
    #[cfg(feature = "metrics")]
    gauge!(CONSUMERS_ACTIVE).decrement(1.0);
}

/// Record a multipart chunk emitted to a consumer.
pub fn inc_chunks_emitted() {
    #[cfg(feature = "metrics")]
    counter!(CHUNKS_EMITTED).increment(1);
}

/// Record a producer reconnect cycle.
pub fn inc_client_reconnects() {
    #[cfg(feature = "metrics")]
    counter!(CLIENT_RECONNECTS).increment(1);
}
