use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use typedmux_conn::{ConnError, ConnectionListener, Mode};
use typedmux_frame::extract_fingerprint;

use crate::cmd::{install_ctrlc_handler, EchoArgs};
use crate::exit::{conn_error, CliError, CliResult, SUCCESS};
use crate::output::OutputFormat;

enum RecvErrorDisposition {
    Break,
    Fatal(CliError),
}

pub fn run(args: EchoArgs, _format: OutputFormat) -> CliResult<i32> {
    let listener = ConnectionListener::bind(&args.path, Mode::Untagged)
        .map_err(|err| conn_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        let mut conn = listener
            .accept()
            .map_err(|err| conn_error("accept failed", err))?;

        while running.load(Ordering::SeqCst) {
            let frame = match conn.expect_bytes() {
                Ok(frame) => frame,
                Err(err) => match classify_recv_error(err) {
                    RecvErrorDisposition::Break => break,
                    RecvErrorDisposition::Fatal(cli_err) => return Err(cli_err),
                },
            };

            match extract_fingerprint(&frame) {
                Some((fingerprint, payload)) => tracing::info!(
                    origin = conn.origin(),
                    %fingerprint,
                    size = payload.len(),
                    "echoing tagged frame"
                ),
                None => tracing::info!(
                    origin = conn.origin(),
                    size = frame.len(),
                    "echoing untagged frame"
                ),
            }

            conn.send_bytes(&frame)
                .map_err(|err| conn_error("echo send failed", err))?;
        }
    }

    Ok(SUCCESS)
}

fn classify_recv_error(err: ConnError) -> RecvErrorDisposition {
    if matches!(err, ConnError::ConnectionClosed) {
        return RecvErrorDisposition::Break;
    }
    RecvErrorDisposition::Fatal(conn_error("receive failed", err))
}

#[cfg(test)]
mod tests {
    use typedmux_transport::TransportError;

    use super::*;

    #[test]
    fn closed_connection_breaks_loop() {
        let disposition = classify_recv_error(ConnError::ConnectionClosed);
        assert!(matches!(disposition, RecvErrorDisposition::Break));
    }

    #[test]
    fn transport_error_is_fatal() {
        let disposition = classify_recv_error(ConnError::Transport(TransportError::InvalidMagic));
        match disposition {
            RecvErrorDisposition::Fatal(err) => {
                assert_eq!(err.code, crate::exit::TRANSPORT_ERROR);
            }
            RecvErrorDisposition::Break => panic!("expected fatal disposition"),
        }
    }
}
