//! Type fingerprints and self-describing tagged frames.
//!
//! A tagged frame carries the [`Fingerprint`] of its payload type in a fixed
//! header, so a receiver can tell what a frame contains before it tries to
//! decode it:
//! - A 2-byte magic number ("TF")
//! - A 16-byte fingerprint of the payload type's descriptor
//! - A 4-byte little-endian payload length
//!
//! Payloads themselves are bincode-encoded serde values (see [`payload`]).

pub mod error;
pub mod fingerprint;
pub mod payload;
pub mod tagged;

pub use error::{FrameError, Result};
pub use fingerprint::{Fingerprint, Message, FINGERPRINT_LEN};
pub use payload::MAX_PAYLOAD;
pub use tagged::{encode_tagged, extract_fingerprint, TaggedFrame, TAG_HEADER_SIZE, TAG_MAGIC};
