//! Payload codecs: bincode for typed values, UTF-8 for text.

use bincode::config::{self, Config};
use bincode::serde::{decode_from_slice, encode_to_vec};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{FrameError, Result};

/// Upper bound on the bytes a single decode may claim. Matches the
/// transport's default frame limit.
pub const MAX_PAYLOAD: usize = 16 * 1024 * 1024;

fn codec_config() -> impl Config {
    config::standard().with_limit::<MAX_PAYLOAD>()
}

/// Encode a value with the standard bincode configuration.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(encode_to_vec(value, codec_config())?)
}

/// Decode a value, requiring the whole input to be consumed.
///
/// Declared lengths beyond [`MAX_PAYLOAD`] fail with a decode error.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (value, consumed) = decode_from_slice(bytes, codec_config())?;
    if consumed != bytes.len() {
        return Err(FrameError::TrailingBytes {
            consumed,
            len: bytes.len(),
        });
    }
    Ok(value)
}

/// Decode a value, mapping every failure to `None`.
pub fn try_decode<T: DeserializeOwned>(bytes: &[u8]) -> Option<T> {
    decode(bytes).ok()
}

/// UTF-8 encode text.
pub fn encode_text(text: &str) -> Bytes {
    Bytes::copy_from_slice(text.as_bytes())
}

/// UTF-8 decode text.
pub fn decode_text(bytes: &[u8]) -> Result<String> {
    Ok(std::str::from_utf8(bytes)?.to_owned())
}
