use std::fmt;

/// Connection state of a [`FrameClient`](super::FrameClient).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClientState {
    /// No connection; initial state and the state after any failure.
    #[default]
    Disconnected,
    /// Retrying the connection with a fixed delay.
    Connecting,
    /// Connected and transmitting frames.
    Streaming,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
        })
    }
}
