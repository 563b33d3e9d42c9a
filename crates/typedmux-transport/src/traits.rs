use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;

/// A full-duplex channel that moves discrete binary frames.
///
/// One `send_frame` call on one end produces exactly one frame from
/// `receive_frame` on the other end, byte-for-byte. Implementations own
/// their stream and are driven by a single reader at a time.
pub trait FrameTransport: Send {
    /// Send one frame. Atomic from the caller's point of view.
    fn send_frame(&mut self, frame: &[u8]) -> Result<()>;

    /// Block until the next complete frame arrives.
    ///
    /// Fails with [`TransportError::ConnectionClosed`](crate::TransportError::ConnectionClosed)
    /// once the remote end has gone away or the transport was closed locally.
    fn receive_frame(&mut self) -> Result<Bytes>;

    /// Close the transport. Later sends and receives fail with `ConnectionClosed`.
    fn close(&mut self) -> Result<()>;

    /// A handle that can force the transport closed from another thread.
    fn shutdown_handle(&self) -> Result<ShutdownHandle>;
}

/// Forced-close primitive behind a [`ShutdownHandle`].
pub trait Shutdown: Send + Sync {
    fn shutdown(&self) -> Result<()>;
}

/// Cloneable handle that closes a transport out from under its owner.
///
/// Any receive blocked on the transport returns `ConnectionClosed`.
#[derive(Clone)]
pub struct ShutdownHandle {
    inner: Arc<dyn Shutdown>,
}

impl ShutdownHandle {
    pub fn new(inner: impl Shutdown + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn shutdown(&self) -> Result<()> {
        self.inner.shutdown()
    }
}

impl fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHandle").finish_non_exhaustive()
    }
}
