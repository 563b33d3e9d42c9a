use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use typedmux_conn::{ConnError, ConnectionListener, Mode};

use crate::cmd::{install_ctrlc_handler, ListenArgs};
use crate::exit::{conn_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat, Received};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let listener = ConnectionListener::bind(&args.path, Mode::Untagged)
        .map_err(|err| conn_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let mut conn = listener
            .accept()
            .map_err(|err| conn_error("accept failed", err))?;

        while running.load(Ordering::SeqCst) {
            let frame = match conn.expect_bytes() {
                Ok(frame) => frame,
                Err(ConnError::ConnectionClosed) => break,
                Err(err) => return Err(conn_error("receive failed", err)),
            };

            print_frame(&Received::classify(frame), conn.origin(), format);
            printed = printed.saturating_add(1);

            if let Some(count) = args.count {
                if printed >= count {
                    return Ok(SUCCESS);
                }
            }
        }
    }

    Ok(SUCCESS)
}
