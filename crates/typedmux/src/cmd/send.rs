use std::fs;
use std::time::Duration;

use typedmux_conn::{open_connection_with_config, ConnectionConfig, Mode};
use typedmux_frame::{payload, Fingerprint, TaggedFrame};
use typedmux_transport::TransportConfig;

use crate::cmd::SendArgs;
use crate::exit::{conn_error, frame_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat, Received};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let frame = build_frame(&args)?;

    let config = ConnectionConfig::default()
        .with_transport(TransportConfig::default().with_read_timeout(Some(wait_timeout)));
    let mut conn = open_connection_with_config(&args.path, Mode::Tagged, &config)
        .map_err(|err| conn_error("connect failed", err))?;

    conn.send_bytes(&frame)
        .map_err(|err| conn_error("send failed", err))?;

    if args.wait {
        let reply = conn
            .expect_bytes()
            .map_err(|err| conn_error("receive failed", err))?;
        print_frame(&Received::classify(reply), conn.origin(), format);
    }

    conn.close()
        .map_err(|err| conn_error("close failed", err))?;
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Ok(Vec::new())
}

/// The exact bytes to put on the wire for these arguments.
fn build_frame(args: &SendArgs) -> CliResult<Vec<u8>> {
    let mut body = resolve_payload(args)?;

    if args.as_string {
        let text = String::from_utf8(body)
            .map_err(|_| CliError::new(USAGE, "--as-string payload is not valid UTF-8"))?;
        body = payload::encode(&text).map_err(|err| frame_error("encode failed", err))?;
    }

    match &args.tag {
        Some(descriptor) => {
            let frame = TaggedFrame::new(Fingerprint::of(descriptor), body)
                .encode()
                .map_err(|err| frame_error("encode failed", err))?;
            Ok(frame.to_vec())
        }
        None => Ok(body),
    }
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
