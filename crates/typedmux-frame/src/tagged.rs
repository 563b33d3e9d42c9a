use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::fingerprint::{Fingerprint, FINGERPRINT_LEN};

/// Magic bytes: "TF" (0x54 0x46).
pub const TAG_MAGIC: [u8; 2] = [0x54, 0x46];

/// Tagged frame header: magic (2) + fingerprint (16) + length (4) = 22 bytes.
pub const TAG_HEADER_SIZE: usize = 2 + FINGERPRINT_LEN + 4;

const LEN_OFFSET: usize = 2 + FINGERPRINT_LEN;

/// A payload together with the fingerprint of its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedFrame {
    /// Type of the payload.
    pub fingerprint: Fingerprint,
    /// Encoded payload bytes.
    pub payload: Bytes,
}

impl TaggedFrame {
    /// Create a new tagged frame.
    pub fn new(fingerprint: Fingerprint, payload: impl Into<Bytes>) -> Self {
        Self {
            fingerprint,
            payload: payload.into(),
        }
    }

    /// Parse a frame received from the transport.
    ///
    /// Returns `None` for anything that is not a well-formed tagged frame.
    /// The payload shares the frame's buffer.
    pub fn extract(frame: &Bytes) -> Option<Self> {
        let (fingerprint, _) = extract_fingerprint(frame)?;
        Some(Self {
            fingerprint,
            payload: frame.slice(TAG_HEADER_SIZE..),
        })
    }

    /// Encode into a single transport frame.
    pub fn encode(&self) -> Result<Bytes> {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        encode_tagged(self.fingerprint, &self.payload, &mut dst)?;
        Ok(dst.freeze())
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        TAG_HEADER_SIZE + self.payload.len()
    }
}

/// Prefix a payload with its fingerprint.
///
/// Wire format:
/// ```text
/// ┌────────────┬──────────────────┬───────────┬─────────────────┐
/// │ Magic (2B) │ Fingerprint      │ Length    │ Payload         │
/// │ 0x54 0x46  │ (16B)            │ (4B LE)   │ (Length bytes)  │
/// │ "TF"       │                  │           │                 │
/// └────────────┴──────────────────┴───────────┴─────────────────┘
/// ```
///
/// The length must equal the number of bytes that follow the header, which
/// lets [`extract_fingerprint`] reject most untagged frames that merely start
/// with the magic.
pub fn encode_tagged(fingerprint: Fingerprint, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(TAG_HEADER_SIZE + payload.len());
    dst.put_slice(&TAG_MAGIC);
    dst.put_slice(fingerprint.as_bytes());
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Read the fingerprint of a tagged frame without decoding its payload.
///
/// Returns the fingerprint and the payload bytes, or `None` if the frame is
/// too short, has the wrong magic, or its length field disagrees with the
/// frame size. Total on arbitrary input.
pub fn extract_fingerprint(frame: &[u8]) -> Option<(Fingerprint, &[u8])> {
    if frame.len() < TAG_HEADER_SIZE || frame[..2] != TAG_MAGIC {
        return None;
    }

    let fingerprint: [u8; FINGERPRINT_LEN] = frame[2..LEN_OFFSET].try_into().ok()?;
    let len_bytes: [u8; 4] = frame[LEN_OFFSET..TAG_HEADER_SIZE].try_into().ok()?;
    let declared = u32::from_le_bytes(len_bytes) as usize;

    let rest = &frame[TAG_HEADER_SIZE..];
    if declared != rest.len() {
        return None;
    }

    Some((Fingerprint::from_bytes(fingerprint), rest))
}
