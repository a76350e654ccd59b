//! Codec configuration.

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::de::Decoder;
use crate::descriptor::{CborShape, Descriptor, Shape, StructureKind};
use crate::error::Result;
use crate::ser::Encoder;

/// An immutable set of codec options plus the registered shape descriptors.
///
/// Build one with [`Cbor::builder`], keep it around, and share it freely; every
/// encode or decode call borrows it read-only.
///
/// The defaults:
/// - do not encode values equal to their declared default
/// - do not ignore unknown keys
/// - write and verify key tags and value tags
/// - prefer numeric labels over names for map keys
/// - only use byte strings for fields marked as such
/// - write indefinite-length arrays and maps
#[derive(Debug, Clone)]
pub struct Cbor {
    encode_defaults: bool,
    ignore_unknown_keys: bool,
    write_key_tags: bool,
    write_value_tags: bool,
    verify_key_tags: bool,
    verify_value_tags: bool,
    prefer_labels_over_names: bool,
    always_use_byte_string: bool,
    write_definite_lengths: bool,
    shapes: HashMap<&'static str, &'static Descriptor>,
}

impl Default for Cbor {
    fn default() -> Self {
        Cbor {
            encode_defaults: false,
            ignore_unknown_keys: false,
            write_key_tags: true,
            write_value_tags: true,
            verify_key_tags: true,
            verify_value_tags: true,
            prefer_labels_over_names: true,
            always_use_byte_string: false,
            write_definite_lengths: false,
            shapes: HashMap::new(),
        }
    }
}

impl Cbor {
    pub fn builder() -> CborBuilder {
        CborBuilder {
            cbor: Cbor::default(),
        }
    }

    /// A builder starting from this configuration.
    pub fn to_builder(&self) -> CborBuilder {
        CborBuilder { cbor: self.clone() }
    }

    pub fn encode_defaults(&self) -> bool {
        self.encode_defaults
    }

    pub fn ignore_unknown_keys(&self) -> bool {
        self.ignore_unknown_keys
    }

    pub fn write_key_tags(&self) -> bool {
        self.write_key_tags
    }

    pub fn write_value_tags(&self) -> bool {
        self.write_value_tags
    }

    pub fn verify_key_tags(&self) -> bool {
        self.verify_key_tags
    }

    pub fn verify_value_tags(&self) -> bool {
        self.verify_value_tags
    }

    pub fn prefer_labels_over_names(&self) -> bool {
        self.prefer_labels_over_names
    }

    pub fn always_use_byte_string(&self) -> bool {
        self.always_use_byte_string
    }

    pub fn write_definite_lengths(&self) -> bool {
        self.write_definite_lengths
    }

    /// The shape for a serde type name, falling back to what serde itself
    /// reports when no descriptor is registered.
    pub fn shape(
        &self,
        name: &str,
        kind: StructureKind,
        fields: &'static [&'static str],
    ) -> Shape {
        match self.shapes.get(name) {
            Some(descriptor) => Shape::Described(descriptor),
            None => Shape::Plain { kind, fields },
        }
    }

    pub fn encode_to_vec<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let mut encoder = Encoder::new(self);
        value.serialize(&mut encoder)?;
        encoder.finish()
    }

    pub fn encode_to_writer<W: Write, T: Serialize + ?Sized>(
        &self,
        mut writer: W,
        value: &T,
    ) -> Result<()> {
        writer.write_all(&self.encode_to_vec(value)?)?;
        Ok(())
    }

    pub fn encode_to_hex_string<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        Ok(hex::encode(self.encode_to_vec(value)?))
    }

    /// Decodes exactly one value; trailing bytes are an error.
    pub fn decode_from_slice<'de, T: Deserialize<'de>>(&self, bytes: &'de [u8]) -> Result<T> {
        let mut decoder = Decoder::new(self, bytes);
        let value = T::deserialize(&mut decoder)?;
        decoder.end()?;
        Ok(value)
    }

    pub fn decode_from_reader<R: Read, T: for<'de> Deserialize<'de>>(
        &self,
        mut reader: R,
    ) -> Result<T> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.decode_from_slice(&bytes)
    }

    pub fn decode_from_hex_string<T: for<'de> Deserialize<'de>>(&self, hex: &str) -> Result<T> {
        let bytes = hex::decode(hex)?;
        self.decode_from_slice(&bytes)
    }
}

/// Builder for [`Cbor`].
#[derive(Debug, Clone)]
pub struct CborBuilder {
    cbor: Cbor,
}

impl CborBuilder {
    /// Write fields even when they equal their declared default.
    pub fn encode_defaults(mut self, value: bool) -> Self {
        self.cbor.encode_defaults = value;
        self
    }

    /// Skip map entries whose key matches no field instead of failing.
    pub fn ignore_unknown_keys(mut self, value: bool) -> Self {
        self.cbor.ignore_unknown_keys = value;
        self
    }

    pub fn write_key_tags(mut self, value: bool) -> Self {
        self.cbor.write_key_tags = value;
        self
    }

    pub fn write_value_tags(mut self, value: bool) -> Self {
        self.cbor.write_value_tags = value;
        self
    }

    /// Check tags preceding map keys against the declared key tags.
    pub fn verify_key_tags(mut self, value: bool) -> Self {
        self.cbor.verify_key_tags = value;
        self
    }

    /// Check tags preceding values against the declared value tags.
    pub fn verify_value_tags(mut self, value: bool) -> Self {
        self.cbor.verify_value_tags = value;
        self
    }

    pub fn prefer_labels_over_names(mut self, value: bool) -> Self {
        self.cbor.prefer_labels_over_names = value;
        self
    }

    /// Encode every byte array as a byte string.
    pub fn always_use_byte_string(mut self, value: bool) -> Self {
        self.cbor.always_use_byte_string = value;
        self
    }

    pub fn write_definite_lengths(mut self, value: bool) -> Self {
        self.cbor.write_definite_lengths = value;
        self
    }

    /// Registers the descriptor of `T`.
    pub fn shape<T: CborShape>(mut self) -> Self {
        let descriptor = T::descriptor();
        self.cbor.shapes.insert(descriptor.name, descriptor);
        self
    }

    pub fn descriptor(mut self, descriptor: &'static Descriptor) -> Self {
        self.cbor.shapes.insert(descriptor.name, descriptor);
        self
    }

    pub fn build(self) -> Cbor {
        self.cbor
    }
}

impl From<CborBuilder> for Cbor {
    fn from(builder: CborBuilder) -> Self {
        builder.build()
    }
}
