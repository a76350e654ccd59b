//! CBOR embedded in a byte string.
//!
//! COSE protects its headers by signing their serialized form, so the header
//! map travels as a byte string holding its own CBOR encoding.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, Serializer};
use serde_bytes::ByteBuf;

/// Newtype name the codec recognises to switch to embedded framing.
pub(crate) const EMBEDDED_NAME: &str = "$__structured_cbor_embedded";

/// A value encoded as CBOR and carried inside a byte string.
///
/// On decode the exact bytes that were read are kept in
/// [`serialized`](Self::serialized) so signatures can be checked over them.
/// Encoding always re-encodes [`value`](Self::value) with the active
/// configuration. Equality only looks at the value.
#[derive(Debug, Clone, Default)]
pub struct ByteStringWrapper<T> {
    pub value: T,
    pub serialized: Vec<u8>,
}

impl<T> ByteStringWrapper<T> {
    pub fn new(value: T) -> Self {
        ByteStringWrapper {
            value,
            serialized: Vec::new(),
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> From<T> for ByteStringWrapper<T> {
    fn from(value: T) -> Self {
        ByteStringWrapper::new(value)
    }
}

impl<T: PartialEq> PartialEq for ByteStringWrapper<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for ByteStringWrapper<T> {}

impl<T: Serialize> Serialize for ByteStringWrapper<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(EMBEDDED_NAME, &self.value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ByteStringWrapper<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(EMBEDDED_NAME, WrapperVisitor(PhantomData))
    }
}

struct WrapperVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for WrapperVisitor<T> {
    type Value = ByteStringWrapper<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a byte string holding an encoded value")
    }

    // The CBOR decoder hands over the raw bytes, then the decoded value.
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let serialized: ByteBuf = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let value: T = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        Ok(ByteStringWrapper {
            value,
            serialized: serialized.into_vec(),
        })
    }

    // Other formats see a transparent newtype.
    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<Self::Value, D::Error> {
        T::deserialize(deserializer).map(ByteStringWrapper::new)
    }
}
