//! Message-oriented frame transports.
//!
//! This is the lowest layer of typedmux. A transport moves discrete binary
//! frames; everything above it assumes one frame is one logical message.
//!
//! - [`UnixFrameTransport`] / [`UnixFrameListener`]: Unix domain sockets with a
//!   small length-prefixed delimiter (see [`wire`])
//! - [`MemoryTransport`]: connected in-process pair

pub mod error;
pub mod memory;
pub mod traits;
pub mod wire;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use traits::{FrameTransport, Shutdown, ShutdownHandle};
pub use wire::{TransportConfig, DEFAULT_MAX_FRAME};

#[cfg(unix)]
pub use uds::{UnixFrameListener, UnixFrameTransport};
