//! Two consumers share one connection, each pulling only its own type.
//!
//! Run with:
//!   cargo run --example typed-dispatch
//!
//! The server sends interleaved readings and alerts. The client handles all
//! alerts first; readings that arrive meanwhile wait in their queue.

use std::fs;
use std::thread;

use serde::{Deserialize, Serialize};
use typedmux::conn::{open_connection, ConnectionListener, Mode};
use typedmux::impl_message;

#[derive(Debug, Serialize, Deserialize)]
struct Reading {
    sensor: String,
    celsius: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Alert {
    level: u8,
    message: String,
}

impl_message!(Reading => "demo.Reading/v1", Alert => "demo.Alert/v1");

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("typedmux-dispatch-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("dispatch.sock");

    let listener = ConnectionListener::bind(&sock_path, Mode::Tagged)?;
    eprintln!("Listening on {}", sock_path.display());

    let server = thread::spawn(move || -> typedmux::conn::Result<()> {
        let mut conn = listener.accept()?;
        for i in 0..3 {
            conn.send_tagged(&Reading {
                sensor: format!("probe-{i}"),
                celsius: 20.0 + f64::from(i),
            })?;
            if i % 2 == 0 {
                conn.send_tagged(&Alert {
                    level: 2,
                    message: format!("probe-{i} drifting"),
                })?;
            }
        }
        conn.close()
    });

    let mut conn = open_connection(&sock_path, Mode::Tagged)?;

    for _ in 0..2 {
        let alert: Alert = conn.expect_tagged()?;
        eprintln!("alert level {}: {}", alert.level, alert.message);
    }
    eprintln!("{} readings queued while alerts were handled", conn.pending_for::<Reading>());

    for _ in 0..3 {
        let reading: Reading = conn.expect_tagged()?;
        eprintln!("{} reads {:.1}°C", reading.sensor, reading.celsius);
    }

    conn.close()?;
    server.join().map_err(|_| "server thread panicked")??;
    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}
