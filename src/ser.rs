//! Structural encoder.
//!
//! Encoding is two-pass per structure: [`Encoder::begin_structure`] pushes a
//! [`Frame`] that buffers the structure's body while its children are counted,
//! and [`Encoder::end_structure`] pops it, prepends the header (definite count
//! or indefinite marker plus break) and appends the result to the parent frame,
//! or to the root output once the stack is empty.

use serde::ser::{self, Impossible, Serialize};
use tracing::{debug, trace};

use crate::config::Cbor;
use crate::descriptor::{ElementDescriptor, Shape, StructureKind};
use crate::error::{CborError, Result};
use crate::primitive;
use crate::wrapper::EMBEDDED_NAME;

const LIST: Shape = Shape::plain(StructureKind::List);
const MAP: Shape = Shape::plain(StructureKind::Map);
const POLYMORPHIC: Shape = Shape::plain(StructureKind::Polymorphic);

/// One nesting level: the structure's body and the number of children written.
#[derive(Debug, Default)]
pub struct Frame {
    bytes: Vec<u8>,
    element_count: u64,
}

/// Markers that apply to exactly one field value.
#[derive(Debug, Default, Clone, Copy)]
struct FieldContext {
    byte_string: bool,
    object: bool,
}

impl From<&ElementDescriptor> for FieldContext {
    fn from(element: &ElementDescriptor) -> Self {
        FieldContext {
            byte_string: element.byte_string,
            object: element.object,
        }
    }
}

pub struct Encoder<'c> {
    cbor: &'c Cbor,
    output: Vec<u8>,
    stack: Vec<Frame>,
    field: FieldContext,
}

impl<'c> Encoder<'c> {
    pub fn new(cbor: &'c Cbor) -> Self {
        Encoder {
            cbor,
            output: Vec::new(),
            stack: Vec::new(),
            field: FieldContext::default(),
        }
    }

    /// The encoded document. Fails if a structure was left open.
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.stack.is_empty() {
            return Err(CborError::UnsupportedShape(format!(
                "{} structures left open",
                self.stack.len()
            )));
        }
        Ok(self.output)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Top frame's buffer, or the root output for a bare primitive.
    fn sink(&mut self) -> &mut Vec<u8> {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.bytes,
            None => &mut self.output,
        }
    }

    fn take_field(&mut self) -> FieldContext {
        std::mem::take(&mut self.field)
    }

    fn byte_string_mode(&mut self) -> bool {
        self.take_field().byte_string || self.cbor.always_use_byte_string()
    }

    pub fn begin_structure(&mut self) {
        self.stack.push(Frame::default());
    }

    /// Announces the next element of the current structure.
    ///
    /// Returns `false`, writing nothing, when the value equals its declared
    /// default and defaults are not encoded. Otherwise writes the key (for
    /// keyed classes) and any tags, counts the element and returns `true`.
    pub fn encode_element(
        &mut self,
        shape: &Shape,
        element: &ElementDescriptor,
        is_default: bool,
    ) -> bool {
        if is_default && !self.cbor.encode_defaults() {
            debug!("Eliding field '{}' equal to its default", element.name);
            return false;
        }
        let cbor = self.cbor;
        let sink = self.sink();
        if shape.has_keys() {
            if cbor.write_key_tags() {
                primitive::write_tags(sink, element.key_tags);
            }
            match element.label {
                Some(label) if cbor.prefer_labels_over_names() => {
                    primitive::write_signed(sink, label)
                }
                _ => primitive::write_text(sink, element.name),
            }
        }
        if cbor.write_value_tags() {
            primitive::write_tags(sink, element.value_tags);
        }
        if let Some(parent) = self.stack.last_mut() {
            parent.element_count += 1;
        }
        self.field = FieldContext::from(element);
        true
    }

    pub fn end_structure(&mut self, shape: &Shape) -> Result<()> {
        let mut completed = self.stack.pop().ok_or_else(|| {
            CborError::UnsupportedShape("structure ended without a beginning".to_string())
        })?;
        let definite = self.cbor.write_definite_lengths();
        if !definite {
            primitive::write_break(&mut completed.bytes);
        }
        let count = completed.element_count;
        trace!(
            "Closing {:?} structure with {count} elements at depth {}",
            shape.kind(),
            self.stack.len()
        );

        let accumulator = self.sink();
        match (shape.array_tags(), shape.kind()) {
            (Some(tags), _) => {
                primitive::write_tags(accumulator, tags);
                primitive::write_array_header(accumulator, definite.then_some(count));
            }
            (None, StructureKind::List | StructureKind::Polymorphic) => {
                primitive::write_array_header(accumulator, definite.then_some(count))
            }
            (None, StructureKind::Map) => {
                primitive::write_map_header(accumulator, definite.then_some(count / 2))
            }
            (None, StructureKind::Class) => {
                primitive::write_map_header(accumulator, definite.then_some(count))
            }
        }
        accumulator.extend_from_slice(&completed.bytes);
        Ok(())
    }

    /// Encodes one field of a class, leaving it out when it equals its
    /// declared default and defaults are not encoded.
    pub(crate) fn encode_field<T: ?Sized + Serialize>(
        &mut self,
        shape: &Shape,
        element: &ElementDescriptor,
        value: &T,
    ) -> Result<()> {
        match element.default {
            Some(default) if !self.cbor.encode_defaults() => {
                let encoded = self.encode_detached(element, value)?;
                let expected = default.encode(
                    element,
                    self.cbor.always_use_byte_string(),
                    self.cbor.write_definite_lengths(),
                );
                if self.encode_element(shape, element, encoded == expected) {
                    self.field = FieldContext::default();
                    self.sink().extend_from_slice(&encoded);
                }
            }
            _ => {
                if self.encode_element(shape, element, false) {
                    value.serialize(&mut *self)?;
                }
            }
        }
        Ok(())
    }

    /// Encodes a field value into a scratch frame without touching the parent.
    fn encode_detached<T: ?Sized + Serialize>(
        &mut self,
        element: &ElementDescriptor,
        value: &T,
    ) -> Result<Vec<u8>> {
        self.stack.push(Frame::default());
        self.field = FieldContext::from(element);
        value.serialize(&mut *self)?;
        self.field = FieldContext::default();
        let scratch = self.stack.pop().unwrap_or_default();
        Ok(scratch.bytes)
    }

    pub fn encode_bool(&mut self, value: bool) {
        self.take_field();
        primitive::write_bool(self.sink(), value)
    }

    pub fn encode_i64(&mut self, value: i64) {
        self.take_field();
        primitive::write_signed(self.sink(), value)
    }

    pub fn encode_u64(&mut self, value: u64) {
        self.take_field();
        primitive::write_unsigned(self.sink(), value)
    }

    pub fn encode_i128(&mut self, value: i128) -> Result<()> {
        self.take_field();
        primitive::write_wide(self.sink(), value)
    }

    pub fn encode_f32(&mut self, value: f32) {
        self.take_field();
        primitive::write_f32(self.sink(), value)
    }

    pub fn encode_f64(&mut self, value: f64) {
        self.take_field();
        primitive::write_f64(self.sink(), value)
    }

    pub fn encode_str(&mut self, value: &str) {
        self.take_field();
        primitive::write_text(self.sink(), value)
    }

    pub fn encode_byte_string(&mut self, value: &[u8]) {
        self.take_field();
        primitive::write_bytes(self.sink(), value)
    }

    /// Null, or the empty map when the field holds an object.
    pub fn encode_null(&mut self) {
        let field = self.take_field();
        let sink = self.sink();
        if field.object {
            primitive::write_empty_map(sink)
        } else {
            primitive::write_null(sink)
        }
    }

    /// Encodes `value` on its own with this configuration and embeds the
    /// result as a byte string.
    fn encode_embedded<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.take_field();
        let mut nested = Encoder::new(self.cbor);
        value.serialize(&mut nested)?;
        let bytes = nested.finish()?;
        primitive::write_bytes(self.sink(), &bytes);
        Ok(())
    }
}

impl<'a, 'c> ser::Serializer for &'a mut Encoder<'c> {
    type Ok = ();
    type Error = CborError;
    type SerializeSeq = SeqCompound<'a, 'c>;
    type SerializeTuple = SeqCompound<'a, 'c>;
    type SerializeTupleStruct = Compound<'a, 'c>;
    type SerializeTupleVariant = Compound<'a, 'c>;
    type SerializeMap = Compound<'a, 'c>;
    type SerializeStruct = Compound<'a, 'c>;
    type SerializeStructVariant = Compound<'a, 'c>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.encode_bool(v);
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.encode_i64(v);
        Ok(())
    }

    fn serialize_i128(self, v: i128) -> Result<()> {
        self.encode_i128(v)
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.encode_u64(v);
        Ok(())
    }

    fn serialize_u128(self, v: u128) -> Result<()> {
        let v = i128::try_from(v)
            .map_err(|_| CborError::UnsupportedShape(format!("integer {v} needs a bignum")))?;
        self.encode_i128(v)
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.encode_f32(v);
        Ok(())
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.encode_f64(v);
        Ok(())
    }

    // Characters travel as their code point.
    fn serialize_char(self, v: char) -> Result<()> {
        self.serialize_u64(v as u64)
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.encode_str(v);
        Ok(())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.encode_byte_string(v);
        Ok(())
    }

    fn serialize_none(self) -> Result<()> {
        self.encode_null();
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.serialize_none()
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<()> {
        if name == EMBEDDED_NAME {
            self.encode_embedded(value)
        } else {
            value.serialize(self)
        }
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()> {
        self.take_field();
        self.begin_structure();
        self.encode_element(&POLYMORPHIC, &ElementDescriptor::ANONYMOUS, false);
        self.encode_str(variant);
        self.encode_element(&POLYMORPHIC, &ElementDescriptor::ANONYMOUS, false);
        value.serialize(&mut *self)?;
        self.end_structure(&POLYMORPHIC)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        if self.byte_string_mode() {
            return Ok(SeqCompound {
                encoder: self,
                bytes: Some(Vec::with_capacity(len.unwrap_or(0))),
            });
        }
        self.begin_structure();
        Ok(SeqCompound {
            encoder: self,
            bytes: None,
        })
    }

    // Tuples and fixed-size arrays are always arrays; serde gives no way to
    // tell `[u8; 2]` from `(u8, u8)`.
    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        self.take_field();
        self.begin_structure();
        Ok(SeqCompound {
            encoder: self,
            bytes: None,
        })
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.take_field();
        self.begin_structure();
        Ok(Compound::new(self, LIST))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.open_variant(variant);
        self.begin_structure();
        Ok(Compound {
            encoder: self,
            shape: LIST,
            variant: true,
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        self.take_field();
        self.begin_structure();
        Ok(Compound::new(self, MAP))
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        self.take_field();
        let shape = self.cbor.shape(name, StructureKind::Class, &[]);
        self.begin_structure();
        Ok(Compound::new(self, shape))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.open_variant(variant);
        let shape = self.cbor.shape(variant, StructureKind::Class, &[]);
        self.begin_structure();
        Ok(Compound {
            encoder: self,
            shape,
            variant: true,
        })
    }
}

impl Encoder<'_> {
    /// Opens the `[variant, value]` pair and announces the value slot.
    fn open_variant(&mut self, variant: &'static str) {
        self.take_field();
        self.begin_structure();
        self.encode_element(&POLYMORPHIC, &ElementDescriptor::ANONYMOUS, false);
        self.encode_str(variant);
        self.encode_element(&POLYMORPHIC, &ElementDescriptor::ANONYMOUS, false);
    }
}

/// Serializer state for tuples, maps, structs and enum variants.
pub struct Compound<'a, 'c> {
    encoder: &'a mut Encoder<'c>,
    shape: Shape,
    /// Also close the enclosing `[variant, value]` pair.
    variant: bool,
}

impl<'a, 'c> Compound<'a, 'c> {
    fn new(encoder: &'a mut Encoder<'c>, shape: Shape) -> Self {
        Compound {
            encoder,
            shape,
            variant: false,
        }
    }

    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.encoder
            .encode_element(&self.shape, &ElementDescriptor::ANONYMOUS, false);
        value.serialize(&mut *self.encoder)
    }

    fn field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        let element = self.shape.element_named(key);
        self.encoder.encode_field(&self.shape, &element, value)
    }

    fn finish(self) -> Result<()> {
        self.encoder.end_structure(&self.shape)?;
        if self.variant {
            self.encoder.end_structure(&POLYMORPHIC)?;
        }
        Ok(())
    }
}

impl ser::SerializeTupleStruct for Compound<'_, '_> {
    type Ok = ();
    type Error = CborError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for Compound<'_, '_> {
    type Ok = ();
    type Error = CborError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeMap for Compound<'_, '_> {
    type Ok = ();
    type Error = CborError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        self.element(key)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeStruct for Compound<'_, '_> {
    type Ok = ();
    type Error = CborError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for Compound<'_, '_> {
    type Ok = ();
    type Error = CborError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

/// Serializer state for sequences.
///
/// In byte-string mode the elements are collected as raw bytes; the first
/// element that is not a `u8` switches back to an ordinary array.
pub struct SeqCompound<'a, 'c> {
    encoder: &'a mut Encoder<'c>,
    bytes: Option<Vec<u8>>,
}

impl ser::SerializeSeq for SeqCompound<'_, '_> {
    type Ok = ();
    type Error = CborError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        if let Some(bytes) = &mut self.bytes {
            if let Ok(byte) = value.serialize(ByteCollector) {
                bytes.push(byte);
                return Ok(());
            }
            let collected = self.bytes.take().unwrap_or_default();
            trace!("Sequence is not a byte array, writing {} bytes as integers", collected.len());
            self.encoder.begin_structure();
            for byte in collected {
                self.encoder
                    .encode_element(&LIST, &ElementDescriptor::ANONYMOUS, false);
                self.encoder.encode_u64(byte as u64);
            }
        }
        self.encoder
            .encode_element(&LIST, &ElementDescriptor::ANONYMOUS, false);
        value.serialize(&mut *self.encoder)
    }

    fn end(self) -> Result<()> {
        match self.bytes {
            Some(bytes) => {
                self.encoder.encode_byte_string(&bytes);
                Ok(())
            }
            None => self.encoder.end_structure(&LIST),
        }
    }
}

impl ser::SerializeTuple for SeqCompound<'_, '_> {
    type Ok = ();
    type Error = CborError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<()> {
        ser::SerializeSeq::end(self)
    }
}

/// Accepts a lone `u8` and rejects everything else.
struct ByteCollector;

#[derive(Debug)]
struct NotAByte;

impl std::fmt::Display for NotAByte {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("not a byte")
    }
}

impl std::error::Error for NotAByte {}

impl ser::Error for NotAByte {
    fn custom<T: std::fmt::Display>(_msg: T) -> Self {
        NotAByte
    }
}

macro_rules! not_a_byte {
    ($($method:ident($($ty:ty),*) -> $ret:ty;)*) => {
        $(
            fn $method(self, $(_: $ty),*) -> std::result::Result<$ret, NotAByte> {
                Err(NotAByte)
            }
        )*
    };
}

impl ser::Serializer for ByteCollector {
    type Ok = u8;
    type Error = NotAByte;
    type SerializeSeq = Impossible<u8, NotAByte>;
    type SerializeTuple = Impossible<u8, NotAByte>;
    type SerializeTupleStruct = Impossible<u8, NotAByte>;
    type SerializeTupleVariant = Impossible<u8, NotAByte>;
    type SerializeMap = Impossible<u8, NotAByte>;
    type SerializeStruct = Impossible<u8, NotAByte>;
    type SerializeStructVariant = Impossible<u8, NotAByte>;

    fn serialize_u8(self, v: u8) -> std::result::Result<u8, NotAByte> {
        Ok(v)
    }

    not_a_byte! {
        serialize_bool(bool) -> u8;
        serialize_i8(i8) -> u8;
        serialize_i16(i16) -> u8;
        serialize_i32(i32) -> u8;
        serialize_i64(i64) -> u8;
        serialize_u16(u16) -> u8;
        serialize_u32(u32) -> u8;
        serialize_u64(u64) -> u8;
        serialize_f32(f32) -> u8;
        serialize_f64(f64) -> u8;
        serialize_char(char) -> u8;
        serialize_str(&str) -> u8;
        serialize_bytes(&[u8]) -> u8;
        serialize_none() -> u8;
        serialize_unit() -> u8;
        serialize_unit_struct(&'static str) -> u8;
        serialize_unit_variant(&'static str, u32, &'static str) -> u8;
        serialize_seq(Option<usize>) -> Self::SerializeSeq;
        serialize_tuple(usize) -> Self::SerializeTuple;
        serialize_tuple_struct(&'static str, usize) -> Self::SerializeTupleStruct;
        serialize_tuple_variant(&'static str, u32, &'static str, usize) -> Self::SerializeTupleVariant;
        serialize_map(Option<usize>) -> Self::SerializeMap;
        serialize_struct(&'static str, usize) -> Self::SerializeStruct;
        serialize_struct_variant(&'static str, u32, &'static str, usize) -> Self::SerializeStructVariant;
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> std::result::Result<u8, NotAByte> {
        Err(NotAByte)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _value: &T,
    ) -> std::result::Result<u8, NotAByte> {
        Err(NotAByte)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> std::result::Result<u8, NotAByte> {
        Err(NotAByte)
    }
}
