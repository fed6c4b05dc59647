//! Timing configuration for [`FrameClient`](super::FrameClient).

use std::time::Duration;

use crate::codec::{DEFAULT_MAX_FRAME_LENGTH, clamp_frame_length};

/// Default delay between failed connection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default pause between transmitted frames (roughly 30 frames per second).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(30);

/// Retry and pacing parameters for a [`FrameClient`](super::FrameClient).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use framerelay::client::ClientConfig;
///
/// let config = ClientConfig::default().reconnect_delay(Duration::from_secs(2));
/// assert_eq!(config.cooldown(), Duration::from_secs(1));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    reconnect_delay: Duration,
    cooldown: Option<Duration>,
    frame_interval: Duration,
    max_frame_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            cooldown: None,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl ClientConfig {
    /// Fixed delay between connection attempts. Never grows.
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Override the wait after a failed send. Defaults to half the reconnect
    /// delay.
    #[must_use]
    pub fn cooldown_override(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    /// Pause after each transmitted frame.
    #[must_use]
    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Largest frame the client will put on the wire. Must not exceed the
    /// relay's own limit or the relay drops the connection.
    #[must_use]
    pub fn max_frame_length(mut self, bytes: usize) -> Self {
        self.max_frame_length = clamp_frame_length(bytes);
        self
    }

    #[must_use]
    pub const fn delay(&self) -> Duration { self.reconnect_delay }

    /// Wait after a failed send before reconnecting.
    #[must_use]
    pub fn cooldown(&self) -> Duration { self.cooldown.unwrap_or(self.reconnect_delay / 2) }

    #[must_use]
    pub const fn interval(&self) -> Duration { self.frame_interval }

    #[must_use]
    pub const fn frame_length_limit(&self) -> usize { self.max_frame_length }
}
