use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;
use typedmux_transport::{UnixFrameListener, UnixFrameTransport};

use crate::connection::{Connection, ConnectionConfig, Mode};
use crate::error::Result;

/// Listens for and accepts connections on a Unix socket path.
pub struct ConnectionListener {
    socket: UnixFrameListener,
    mode: Mode,
    config: ConnectionConfig,
    next_peer_id: AtomicU64,
}

impl ConnectionListener {
    /// Bind to a Unix domain socket path.
    ///
    /// Every accepted connection uses `mode`.
    pub fn bind(path: impl AsRef<Path>, mode: Mode) -> Result<Self> {
        let socket = UnixFrameListener::bind(path)?;
        Ok(Self {
            socket,
            mode,
            config: ConnectionConfig::default(),
            next_peer_id: AtomicU64::new(1),
        })
    }

    /// Override connection config for accepted connections.
    pub fn with_config(mut self, config: ConnectionConfig) -> Self {
        self.socket = self.socket.with_config(config.transport.clone());
        self.config = config;
        self
    }

    /// Accept next connection and assign an auto-generated origin.
    pub fn accept(&self) -> Result<Connection<UnixFrameTransport>> {
        let id = self.next_peer_id.fetch_add(1, Ordering::Relaxed);
        self.accept_with_origin(&format!("peer-{id}"))
    }

    /// Accept next connection and use an explicit origin.
    pub fn accept_with_origin(&self, origin: &str) -> Result<Connection<UnixFrameTransport>> {
        let transport = self.socket.accept()?;
        debug!(path = ?self.socket.path(), %origin, "accepted connection");
        Ok(Connection::with_config(
            origin,
            transport,
            self.mode,
            &self.config,
        ))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        self.socket.path()
    }
}

impl std::fmt::Debug for ConnectionListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionListener")
            .field("path", &self.socket.path())
            .field("mode", &self.mode)
            .finish()
    }
}
