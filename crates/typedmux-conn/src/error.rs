use typedmux_frame::{Fingerprint, FrameError};
use typedmux_transport::TransportError;

/// Errors that can occur in connection operations.
#[derive(Debug, thiserror::Error)]
pub enum ConnError {
    /// The transport to the endpoint could not be established.
    #[error("failed to connect to {endpoint}: {source}")]
    ConnectFailure {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    /// The connection was closed, locally or by the remote end.
    #[error("connection closed")]
    ConnectionClosed,

    /// Transport-level error other than a close.
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// A value could not be encoded for sending.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A frame whose fingerprint matched the requested type failed to decode.
    ///
    /// Sender and receiver disagree on the type behind a descriptor, or two
    /// descriptors collided. Retrying cannot fix this.
    #[error("integrity fault: frame tagged {fingerprint} does not decode as {descriptor}: {source}")]
    IntegrityFault {
        fingerprint: Fingerprint,
        descriptor: String,
        #[source]
        source: FrameError,
    },

    /// The pending queue table hit its configured bound.
    #[error("pending queue full for {fingerprint} ({limit} frames)")]
    QueueFull { fingerprint: Fingerprint, limit: usize },
}

impl From<TransportError> for ConnError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ConnectionClosed => ConnError::ConnectionClosed,
            other => ConnError::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConnError>;
