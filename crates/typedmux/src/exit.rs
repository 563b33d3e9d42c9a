use std::fmt;
use std::io;

use typedmux_conn::ConnError;
use typedmux_frame::FrameError;
use typedmux_transport::TransportError;

// Exit codes follow sysexits-style semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::PathTooLong { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::FrameTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        TransportError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Encode(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn conn_error(context: &str, err: ConnError) -> CliError {
    match err {
        ConnError::ConnectFailure { source, .. } | ConnError::Transport(source) => {
            transport_error(context, source)
        }
        ConnError::Frame(err) => frame_error(context, err),
        ConnError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        ConnError::IntegrityFault { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ConnError::QueueFull { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use typedmux_frame::Fingerprint;

    use super::*;

    #[test]
    fn timeouts_map_to_timeout_code() {
        let err = conn_error(
            "receive failed",
            ConnError::Transport(TransportError::Io(io::Error::from(io::ErrorKind::WouldBlock))),
        );
        assert_eq!(err.code, TIMEOUT);
        assert!(err.message.starts_with("receive failed: "));
    }

    #[test]
    fn missing_socket_is_plain_failure() {
        let err = conn_error(
            "connect failed",
            ConnError::ConnectFailure {
                endpoint: "/tmp/nope.sock".to_string(),
                source: TransportError::Connect {
                    path: "/tmp/nope.sock".into(),
                    source: io::Error::from(io::ErrorKind::NotFound),
                },
            },
        );
        assert_eq!(err.code, FAILURE);
    }

    #[test]
    fn integrity_fault_is_invalid_data() {
        let decode_failure = typedmux_frame::payload::decode::<u32>(&[]).unwrap_err();
        let err = conn_error(
            "receive failed",
            ConnError::IntegrityFault {
                fingerprint: Fingerprint::of("u32"),
                descriptor: "u32".to_string(),
                source: decode_failure,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn oversized_frames_are_invalid_data() {
        let err = transport_error(
            "send failed",
            TransportError::FrameTooLarge { size: 10, max: 5 },
        );
        assert_eq!(err.code, DATA_INVALID);
    }
}
