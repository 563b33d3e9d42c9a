/// Errors that can occur while encoding or decoding frame contents.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A value could not be serialized.
    #[error("payload encode failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// The payload bytes do not decode as the requested type.
    #[error("payload decode failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// The payload decoded but left bytes unconsumed.
    #[error("payload has trailing bytes (decoded {consumed} of {len})")]
    TrailingBytes { consumed: usize, len: usize },

    /// Text payload is not valid UTF-8.
    #[error("text payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The payload does not fit the tagged frame length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
