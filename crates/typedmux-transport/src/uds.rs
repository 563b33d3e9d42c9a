use std::fs;
use std::io::{self, ErrorKind, Read, Write};
use std::net::Shutdown as NetShutdown;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::{FrameTransport, Shutdown, ShutdownHandle};
use crate::wire::{decode_frame, encode_frame, TransportConfig};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Frame transport over a connected Unix domain socket.
///
/// Frames are delimited on the stream with the header from [`crate::wire`],
/// so partial reads never leak to callers.
pub struct UnixFrameTransport {
    stream: UnixStream,
    read_buf: BytesMut,
    write_buf: BytesMut,
    config: TransportConfig,
    closed: bool,
}

impl UnixFrameTransport {
    /// Connect to a listening socket with default configuration (blocking).
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(path, TransportConfig::default())
    }

    /// Connect with explicit configuration.
    pub fn connect_with_config(path: impl AsRef<Path>, config: TransportConfig) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "connected to unix domain socket");
        Self::from_stream(stream, config)
    }

    /// Wrap an already-connected stream and apply the configured timeouts.
    pub fn from_stream(stream: UnixStream, config: TransportConfig) -> Result<Self> {
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        Ok(Self {
            stream,
            read_buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            write_buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            closed: false,
        })
    }

    /// A connected pair of transports, useful for in-process wiring.
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = UnixStream::pair()?;
        Ok((
            Self::from_stream(left, TransportConfig::default())?,
            Self::from_stream(right, TransportConfig::default())?,
        ))
    }

    /// Update maximum frame size for subsequent sends and receives.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    /// Current transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(TransportError::ConnectionClosed);
        }
        Ok(())
    }
}

impl FrameTransport for UnixFrameTransport {
    fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if frame.len() > self.config.max_frame_size {
            return Err(TransportError::FrameTooLarge {
                size: frame.len(),
                max: self.config.max_frame_size,
            });
        }

        self.write_buf.clear();
        encode_frame(frame, &mut self.write_buf)?;
        self.stream.write_all(&self.write_buf).map_err(map_io_error)?;
        trace!(size = frame.len(), "sent frame");
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<Bytes> {
        self.ensure_open()?;
        let max = self.config.max_frame_size;
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let frame = loop {
            if let Some(frame) = decode_frame(&mut self.read_buf, max)? {
                break frame;
            }
            let read = read_some(&mut self.stream, &mut chunk)?;
            self.read_buf.extend_from_slice(&chunk[..read]);
        };
        trace!(size = frame.len(), buffered = self.read_buf.len(), "received frame");
        Ok(frame)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.read_buf.clear();
        shutdown_stream(&self.stream)?;
        debug!("closed unix frame transport");
        Ok(())
    }

    fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        let stream = self.stream.try_clone()?;
        Ok(ShutdownHandle::new(StreamShutdown(stream)))
    }
}

impl std::fmt::Debug for UnixFrameTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixFrameTransport")
            .field("buffered", &self.read_buf.len())
            .field("closed", &self.closed)
            .finish()
    }
}

struct StreamShutdown(UnixStream);

impl Shutdown for StreamShutdown {
    fn shutdown(&self) -> Result<()> {
        shutdown_stream(&self.0)
    }
}

fn shutdown_stream(stream: &UnixStream) -> Result<()> {
    match stream.shutdown(NetShutdown::Both) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
        Err(err) => Err(TransportError::Io(err)),
    }
}

/// One successful read of at least one byte. End of stream is
/// [`TransportError::ConnectionClosed`].
fn read_some(stream: &mut UnixStream, buf: &mut [u8]) -> Result<usize> {
    loop {
        match stream.read(buf) {
            Ok(0) => return Err(TransportError::ConnectionClosed),
            Ok(n) => return Ok(n),
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(map_io_error(err)),
        }
    }
}

fn map_io_error(err: io::Error) -> TransportError {
    match err.kind() {
        ErrorKind::WriteZero
        | ErrorKind::BrokenPipe
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::UnexpectedEof => TransportError::ConnectionClosed,
        _ => TransportError::Io(err),
    }
}

#[cfg(target_os = "linux")]
const MAX_SOCKET_PATH: usize = 108;
#[cfg(not(target_os = "linux"))]
const MAX_SOCKET_PATH: usize = 104;

/// Listening Unix domain socket that yields [`UnixFrameTransport`]s.
///
/// The listener owns its socket file and unlinks it on drop, unless the path
/// has since been replaced by something else.
pub struct UnixFrameListener {
    listener: UnixListener,
    path: PathBuf,
    identity: SocketIdentity,
    config: TransportConfig,
}

impl UnixFrameListener {
    /// Permission mode applied by [`UnixFrameListener::bind`].
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

    /// Bind with [`Self::DEFAULT_SOCKET_MODE`].
    ///
    /// A leftover socket at `path` is replaced. Any other kind of file there
    /// fails the bind and is left untouched.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_SOCKET_MODE)
    }

    /// Bind and chmod the socket file to `mode`.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref();
        let len = path.as_os_str().len();
        if len >= MAX_SOCKET_PATH {
            return Err(TransportError::PathTooLong {
                path: path.to_path_buf(),
                len,
                max: MAX_SOCKET_PATH,
            });
        }

        let (listener, identity) = bind_socket(path, mode).map_err(|source| TransportError::Bind {
            path: path.to_path_buf(),
            source,
        })?;
        info!(?path, mode = %format_args!("{mode:o}"), "listening");

        Ok(Self {
            listener,
            path: path.to_path_buf(),
            identity,
            config: TransportConfig::default(),
        })
    }

    /// Configuration applied to every accepted transport.
    pub fn with_config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<UnixFrameTransport> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = ?self.path, "accepted connection");
        UnixFrameTransport::from_stream(stream, self.config.clone())
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixFrameListener {
    fn drop(&mut self) {
        if SocketIdentity::of(&self.path) != Some(self.identity) {
            debug!(path = ?self.path, "socket path no longer ours, leaving it");
            return;
        }
        if let Err(err) = fs::remove_file(&self.path) {
            debug!(path = ?self.path, %err, "failed to unlink socket");
        }
    }
}

/// Device and inode of a socket file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SocketIdentity {
    dev: u64,
    ino: u64,
}

impl SocketIdentity {
    /// `None` unless `path` currently names a socket.
    fn of(path: &Path) -> Option<Self> {
        let meta = fs::symlink_metadata(path).ok()?;
        meta.file_type().is_socket().then(|| Self {
            dev: meta.dev(),
            ino: meta.ino(),
        })
    }
}

fn bind_socket(path: &Path, mode: u32) -> io::Result<(UnixListener, SocketIdentity)> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            debug!(?path, "replacing leftover socket");
            fs::remove_file(path)?;
        }
        Ok(_) => {
            return Err(io::Error::new(
                ErrorKind::AlreadyExists,
                "path exists and is not a socket",
            ))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    let listener = UnixListener::bind(path)?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    let identity = SocketIdentity::of(path)
        .ok_or_else(|| io::Error::new(ErrorKind::NotFound, "socket vanished after bind"))?;
    Ok((listener, identity))
}
