//! Stable identifiers for payload types.
//!
//! A [`Fingerprint`] is the 128-bit XXH3 hash of a type's textual descriptor.
//! Descriptors are supplied explicitly through [`Message::descriptor`] so that
//! both ends of a connection agree on them regardless of compiler version or
//! module layout.
//!
//! # Collisions
//!
//! For `n` distinct descriptors in use on one connection the probability that
//! any two share a fingerprint is roughly `n² / 2¹²⁹`, which is negligible for
//! any realistic protocol. XXH3 is not a cryptographic hash: a hostile peer can
//! construct colliding descriptors. A collision shows up on the receiving side
//! as an integrity fault when the payload fails to decode, never as a silently
//! mistyped value.

use std::borrow::Cow;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use xxhash_rust::xxh3::xxh3_128;

/// Fingerprint width on the wire.
pub const FINGERPRINT_LEN: usize = 16;

/// Content-derived identifier of a payload type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Fingerprint of a type descriptor.
    pub fn of(descriptor: &str) -> Self {
        Self(xxh3_128(descriptor.as_bytes()).to_be_bytes())
    }

    /// Fingerprint of a [`Message`] type.
    pub fn of_message<M: Message>() -> Self {
        Self::of(&M::descriptor())
    }

    pub const fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

/// A payload type that can travel in a tagged frame.
///
/// The descriptor must be identical on sender and receiver and distinct from
/// every other message type exchanged on the same connection. Include a
/// version suffix when the shape of a type changes incompatibly.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use typedmux_frame::{impl_message, Fingerprint, Message};
///
/// #[derive(Serialize, Deserialize)]
/// struct Join {
///     room: String,
/// }
///
/// impl_message!(Join => "chat.Join/v1");
///
/// assert_eq!(Join::fingerprint(), Fingerprint::of("chat.Join/v1"));
/// ```
pub trait Message: Serialize + DeserializeOwned {
    /// Stable textual name of this type's wire shape.
    fn descriptor() -> Cow<'static, str>;

    /// Fingerprint derived from [`Message::descriptor`].
    fn fingerprint() -> Fingerprint {
        Fingerprint::of(&Self::descriptor())
    }
}

/// Declare fixed descriptors for one or more types.
#[macro_export]
macro_rules! impl_message {
    ($($ty:ty => $descriptor:expr),+ $(,)?) => {
        $(
            impl $crate::Message for $ty {
                fn descriptor() -> ::std::borrow::Cow<'static, str> {
                    ::std::borrow::Cow::Borrowed($descriptor)
                }
            }
        )+
    };
}

impl_message!(
    () => "()",
    bool => "bool",
    char => "char",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    u128 => "u128",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    i128 => "i128",
    f32 => "f32",
    f64 => "f64",
    String => "String",
);

impl<T: Message> Message for Vec<T> {
    fn descriptor() -> Cow<'static, str> {
        Cow::Owned(format!("Vec<{}>", T::descriptor()))
    }
}

impl<T: Message> Message for Option<T> {
    fn descriptor() -> Cow<'static, str> {
        Cow::Owned(format!("Option<{}>", T::descriptor()))
    }
}

impl<A: Message, B: Message> Message for (A, B) {
    fn descriptor() -> Cow<'static, str> {
        Cow::Owned(format!("({}, {})", A::descriptor(), B::descriptor()))
    }
}

impl<A: Message, B: Message, C: Message> Message for (A, B, C) {
    fn descriptor() -> Cow<'static, str> {
        Cow::Owned(format!(
            "({}, {}, {})",
            A::descriptor(),
            B::descriptor(),
            C::descriptor()
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(Fingerprint::of("chat.Post/v1"), Fingerprint::of("chat.Post/v1"));
        assert_eq!(i64::fingerprint(), Fingerprint::of("i64"));
        assert_eq!(Fingerprint::of_message::<String>(), String::fingerprint());
    }

    #[test]
    fn distinct_descriptors_give_distinct_fingerprints() {
        let descriptors = [
            i64::descriptor(),
            u64::descriptor(),
            String::descriptor(),
            Vec::<u8>::descriptor(),
            Vec::<i64>::descriptor(),
            Option::<String>::descriptor(),
            <(u32, String)>::descriptor(),
            <(String, u32)>::descriptor(),
        ];
        let prints: HashSet<Fingerprint> = descriptors.iter().map(|d| Fingerprint::of(d)).collect();
        assert_eq!(prints.len(), descriptors.len());
    }

    #[test]
    fn generic_descriptors_compose() {
        assert_eq!(Vec::<Option<u8>>::descriptor(), "Vec<Option<u8>>");
        assert_eq!(<(u8, bool, String)>::descriptor(), "(u8, bool, String)");
    }

    #[test]
    fn display_is_lowercase_hex() {
        let fp = Fingerprint::from_bytes([0xAB; FINGERPRINT_LEN]);
        assert_eq!(fp.to_string(), "ab".repeat(FINGERPRINT_LEN));
        assert_eq!(format!("{fp:?}"), format!("Fingerprint({})", "ab".repeat(16)));
    }

    #[test]
    fn bytes_accessors_agree() {
        let fp = Fingerprint::of("x");
        assert_eq!(Fingerprint::from_bytes(*fp.as_bytes()), fp);
    }
}
