use tracing::warn;
use typedmux_transport::FrameTransport;

use crate::connection::Connection;
use crate::error::ConnError;

#[cfg(unix)]
pub use self::unix::{open_connection, open_connection_with_config, with_connection};

/// Run `f` against an open connection and close it afterwards.
///
/// The connection is closed on every exit path of `f`, unless `f` closed it
/// itself. An error from `f` takes precedence over an error from the close.
pub fn run_scoped<T, R, E, F>(mut conn: Connection<T>, f: F) -> std::result::Result<R, E>
where
    T: FrameTransport,
    E: From<ConnError>,
    F: FnOnce(&mut Connection<T>) -> std::result::Result<R, E>,
{
    let outcome = f(&mut conn);
    let closed = if conn.is_closed() {
        Ok(())
    } else {
        conn.close()
    };

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(origin = %conn.origin(), error = %close_err, "close after failed operation also failed");
            Err(err)
        }
    }
}

#[cfg(unix)]
mod unix {
    use std::path::Path;

    use tracing::debug;
    use typedmux_transport::UnixFrameTransport;

    use crate::connection::{Connection, ConnectionConfig, Mode};
    use crate::error::{ConnError, Result};

    /// Open a connection to a listening Unix socket.
    pub fn open_connection(
        path: impl AsRef<Path>,
        mode: Mode,
    ) -> Result<Connection<UnixFrameTransport>> {
        open_connection_with_config(path, mode, &ConnectionConfig::default())
    }

    /// Open a connection with explicit configuration.
    pub fn open_connection_with_config(
        path: impl AsRef<Path>,
        mode: Mode,
        config: &ConnectionConfig,
    ) -> Result<Connection<UnixFrameTransport>> {
        let path = path.as_ref();
        let endpoint = path.display().to_string();
        let transport = UnixFrameTransport::connect_with_config(path, config.transport.clone())
            .map_err(|source| ConnError::ConnectFailure {
                endpoint: endpoint.clone(),
                source,
            })?;
        debug!(%endpoint, ?mode, "connection established");
        Ok(Connection::with_config(endpoint, transport, mode, config))
    }

    /// Open a connection, run `f` against it, and close it on the way out.
    pub fn with_connection<R, E, F>(
        path: impl AsRef<Path>,
        mode: Mode,
        f: F,
    ) -> std::result::Result<R, E>
    where
        E: From<ConnError>,
        F: FnOnce(&mut Connection<UnixFrameTransport>) -> std::result::Result<R, E>,
    {
        let conn = open_connection(path, mode)?;
        super::run_scoped(conn, f)
    }
}
