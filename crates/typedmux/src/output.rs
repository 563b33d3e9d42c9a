use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use typedmux_frame::{Fingerprint, TaggedFrame};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A received frame split into its tag (if any) and payload.
pub struct Received {
    pub fingerprint: Option<Fingerprint>,
    pub payload: Bytes,
    pub frame_size: usize,
}

impl Received {
    pub fn classify(frame: Bytes) -> Self {
        let frame_size = frame.len();
        match TaggedFrame::extract(&frame) {
            Some(tagged) => Self {
                fingerprint: Some(tagged.fingerprint),
                payload: tagged.payload,
                frame_size,
            },
            None => Self {
                fingerprint: None,
                payload: frame,
                frame_size,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        if self.fingerprint.is_some() {
            "tagged"
        } else {
            "untagged"
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    kind: &'static str,
    fingerprint: Option<String>,
    frame_size: usize,
    payload_size: usize,
    payload: String,
    origin: &'a str,
    timestamp: String,
}

pub fn print_frame(frame: &Received, origin: &str, format: OutputFormat) {
    let fingerprint = frame.fingerprint.map(|fp| fp.to_string());
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                kind: frame.kind(),
                fingerprint,
                frame_size: frame.frame_size,
                payload_size: frame.payload.len(),
                payload: payload_preview(frame.payload.as_ref()),
                origin,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "FINGERPRINT", "SIZE", "ORIGIN", "PAYLOAD"])
                .add_row(vec![
                    frame.kind().to_string(),
                    fingerprint.unwrap_or_else(|| "-".to_string()),
                    frame.payload.len().to_string(),
                    origin.to_string(),
                    payload_preview(frame.payload.as_ref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "kind={} fingerprint={} size={} origin={} payload={}",
                frame.kind(),
                fingerprint.as_deref().unwrap_or("-"),
                frame.payload.len(),
                origin,
                payload_preview(frame.payload.as_ref())
            );
        }
        OutputFormat::Raw => {
            print_raw(frame.payload.as_ref());
        }
    }
}

#[derive(Serialize)]
struct FingerprintOutput<'a> {
    descriptor: &'a str,
    fingerprint: String,
}

pub fn print_fingerprints(descriptors: &[String], format: OutputFormat) {
    let rows: Vec<FingerprintOutput<'_>> = descriptors
        .iter()
        .map(|descriptor| FingerprintOutput {
            descriptor,
            fingerprint: Fingerprint::of(descriptor).to_string(),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            for row in &rows {
                println!(
                    "{}",
                    serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DESCRIPTOR", "FINGERPRINT"]);
            for row in &rows {
                table.add_row(vec![row.descriptor.to_string(), row.fingerprint.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &rows {
                println!("{}  {}", row.fingerprint, row.descriptor);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
