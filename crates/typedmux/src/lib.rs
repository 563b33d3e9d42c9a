//! Typed dynamic multiplexing over a single frame connection.
//!
//! typedmux lets independent consumers share one message-oriented connection,
//! each receiving only the message type it asks for. Every tagged frame
//! carries a fingerprint of its payload type; frames that arrive before their
//! consumer asks are held in per-type FIFO queues.
//!
//! # Crate Structure
//!
//! - [`transport`]: Frame transports (Unix sockets, in-memory pairs)
//! - [`frame`]: Type fingerprints, tagged frame codec, payload codec
//! - [`conn`]: Connections, dispatch and pending queues (behind `conn` feature)

/// Re-export transport types.
pub mod transport {
    pub use typedmux_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use typedmux_frame::*;
}

/// Re-export connection types (requires `conn` feature).
#[cfg(feature = "conn")]
pub mod conn {
    pub use typedmux_conn::*;
}

pub use typedmux_frame::impl_message;
