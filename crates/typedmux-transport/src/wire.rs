use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, TransportError};

/// Stream delimiter header: magic (2) + length (4) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Magic bytes: "TM" (0x54 0x4D).
pub const MAGIC: [u8; 2] = [0x54, 0x4D];

/// Default maximum frame size: 16 MiB.
pub const DEFAULT_MAX_FRAME: usize = 16 * 1024 * 1024;

/// Delimit one frame for a byte-stream transport.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────┬──────────────────┐
/// │ Magic (2B)   │ Length    │ Frame            │
/// │ 0x54 0x4D    │ (4B LE)   │ (Length bytes)   │
/// │ "TM"         │           │                  │
/// └──────────────┴───────────┴──────────────────┘
/// ```
pub fn encode_frame(frame: &[u8], dst: &mut BytesMut) -> Result<()> {
    if frame.len() > u32::MAX as usize {
        return Err(TransportError::FrameTooLarge {
            size: frame.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + frame.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(frame.len() as u32);
    dst.put_slice(frame);
    Ok(())
}

/// Split one complete frame off the front of `src`.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_frame: usize) -> Result<Option<Bytes>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != MAGIC {
        return Err(TransportError::InvalidMagic);
    }

    let len = u32::from_le_bytes([src[2], src[3], src[4], src[5]]) as usize;
    if len > max_frame {
        return Err(TransportError::FrameTooLarge {
            size: len,
            max: max_frame,
        });
    }

    if src.len() < HEADER_SIZE + len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    Ok(Some(src.split_to(len).freeze()))
}

/// Configuration shared by the stream-backed transports.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum frame size in bytes. Default: 16 MiB.
    pub max_frame_size: usize,
    /// Read timeout for blocking receives. `None` blocks forever.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking sends.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl TransportConfig {
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }
}
