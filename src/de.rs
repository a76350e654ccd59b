//! Structural decoder.
//!
//! The decoder mirrors [`Encoder`](crate::ser::Encoder): serde asks for a
//! structure, [`Decoder::begin_structure`] reads its header and returns a
//! [`StructureHandle`], [`Decoder::decode_element_index`] walks the elements
//! until the structure is exhausted, and [`Decoder::end_structure`] closes it.
//! Definite and indefinite framing are decided per structure from the input,
//! so both may be freely nested whatever the encoding configuration was.

use std::borrow::Cow;
use std::fmt;

use serde::de::value::{
    BorrowedBytesDeserializer, BorrowedStrDeserializer, SeqDeserializer, StrDeserializer,
    StringDeserializer,
};
use serde::de::{self, DeserializeSeed, IntoDeserializer, Visitor};
use tracing::{debug, trace};

use crate::config::Cbor;
use crate::descriptor::{ElementDescriptor, Shape, StructureKind};
use crate::error::{CborError, Result};
use crate::primitive::{
    self, Header, Reader, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_SIMPLE,
    MAJOR_TEXT, MAJOR_UNSIGNED, NULL_BYTE, UNDEFINED_BYTE,
};
use crate::wrapper::EMBEDDED_NAME;

const LIST: Shape = Shape::plain(StructureKind::List);
const MAP: Shape = Shape::plain(StructureKind::Map);
const POLYMORPHIC: Shape = Shape::plain(StructureKind::Polymorphic);

/// An open structure being read.
#[derive(Debug)]
pub struct StructureHandle {
    shape: Shape,
    /// Elements left (pairs for maps); `None` until the break byte.
    remaining: Option<u64>,
    index: usize,
}

impl StructureHandle {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn is_definite(&self) -> bool {
        self.remaining.is_some()
    }

    fn consume(&mut self) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
    }
}

/// A map key as read from the wire.
enum Key<'de> {
    Label(i128),
    Name(Cow<'de, str>),
}

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Key::Label(label) => write!(f, "{label}"),
            Key::Name(name) => write!(f, "\"{name}\""),
        }
    }
}

fn utf8(bytes: Cow<'_, [u8]>) -> Result<Cow<'_, str>> {
    match bytes {
        Cow::Borrowed(bytes) => std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|_| CborError::InvalidUtf8),
        Cow::Owned(bytes) => String::from_utf8(bytes)
            .map(Cow::Owned)
            .map_err(|_| CborError::InvalidUtf8),
    }
}

pub struct Decoder<'c, 'de> {
    cbor: &'c Cbor,
    reader: Reader<'de>,
    /// Context of the field whose value comes next.
    field: Option<ElementDescriptor>,
    /// Tags read ahead of the value they decorate.
    pending_tags: Vec<u64>,
}

impl<'c, 'de> Decoder<'c, 'de> {
    pub fn new(cbor: &'c Cbor, input: &'de [u8]) -> Self {
        Decoder {
            cbor,
            reader: Reader::new(input),
            field: None,
            pending_tags: Vec::new(),
        }
    }

    /// Fails unless the whole input was consumed.
    pub fn end(&self) -> Result<()> {
        match self.reader.remaining() {
            0 => Ok(()),
            remaining => Err(CborError::TrailingData(remaining)),
        }
    }

    /// Consumes the tags in front of a value and checks them against the
    /// current field's value tags. Returns the tags left after the declared
    /// prefix.
    fn take_value_tags(&mut self) -> Result<Vec<u64>> {
        self.reader.read_tags(&mut self.pending_tags)?;
        let mut found = std::mem::take(&mut self.pending_tags);
        let declared = self.field.take().map(|field| field.value_tags).unwrap_or(&[]);
        if self.cbor.verify_value_tags() && !declared.is_empty() {
            if !found.starts_with(declared) {
                return Err(CborError::TagMismatch {
                    expected: declared.to_vec(),
                    found,
                });
            }
            found = found.split_off(declared.len());
        }
        Ok(found)
    }

    fn structure_header(&mut self) -> Result<(Header, Vec<u64>)> {
        let tags = self.take_value_tags()?;
        let header = self.reader.read_header()?;
        Ok((header, tags))
    }

    /// Header of a primitive value; undeclared tags are dropped.
    fn next_header(&mut self) -> Result<Header> {
        let (header, tags) = self.structure_header()?;
        if !tags.is_empty() {
            trace!("Ignoring tags {tags:?} on {}", primitive::major_name(header.major));
        }
        Ok(header)
    }

    pub fn begin_structure(&mut self, shape: Shape) -> Result<StructureHandle> {
        let (header, tags) = self.structure_header()?;
        self.open(shape, &header, &tags)
    }

    fn open(&mut self, shape: Shape, header: &Header, tags: &[u64]) -> Result<StructureHandle> {
        if let Some(expected) = shape.array_tags() {
            if self.cbor.verify_value_tags() && !tags.ends_with(expected) {
                return Err(CborError::TagMismatch {
                    expected: expected.to_vec(),
                    found: tags.to_vec(),
                });
            }
        }
        let keyed = shape.kind() == StructureKind::Map || shape.has_keys();
        let (major, expected) = if keyed {
            (MAJOR_MAP, "map")
        } else {
            (MAJOR_ARRAY, "array")
        };
        if header.major != major {
            return Err(header.unexpected(expected));
        }
        trace!(
            "Opening {:?} structure, length {:?}",
            shape.kind(),
            header.length()
        );
        Ok(StructureHandle {
            shape,
            remaining: header.length(),
            index: 0,
        })
    }

    /// Index of the next element, or `None` once the structure is exhausted.
    ///
    /// For keyed classes the key is read and resolved to a field; the field's
    /// context then applies to the value that follows.
    pub fn decode_element_index(&mut self, handle: &mut StructureHandle) -> Result<Option<usize>> {
        loop {
            // a map value always follows its key
            let at_value = handle.shape.kind() == StructureKind::Map && handle.index % 2 == 1;
            let done = !at_value
                && match handle.remaining {
                    Some(remaining) => remaining == 0,
                    None => self.reader.peek()? == primitive::BREAK,
                };
            if done {
                self.field = None;
                return Ok(None);
            }

            let index = handle.index;
            handle.index += 1;
            if !handle.shape.has_keys() {
                if handle.shape.kind() != StructureKind::Map || index % 2 == 0 {
                    handle.consume();
                }
                self.field = handle
                    .shape
                    .is_array_framed()
                    .then(|| handle.shape.element(index));
                return Ok(Some(index));
            }

            handle.consume();
            let mut key_tags = Vec::new();
            self.reader.read_tags(&mut key_tags)?;
            let key = self.read_key()?;
            let resolved = match &key {
                Key::Label(label) => i64::try_from(*label)
                    .ok()
                    .and_then(|label| handle.shape.index_of_label(label)),
                Key::Name(name) => handle.shape.index_of_name(name),
            };
            match resolved {
                Some(index) => {
                    let element = handle.shape.element(index);
                    if self.cbor.verify_key_tags()
                        && !element.key_tags.is_empty()
                        && key_tags != element.key_tags
                    {
                        return Err(CborError::TagMismatch {
                            expected: element.key_tags.to_vec(),
                            found: key_tags,
                        });
                    }
                    self.field = Some(element);
                    return Ok(Some(index));
                }
                None if self.cbor.ignore_unknown_keys() => {
                    debug!("Skipping value of unknown key {key}");
                    self.reader.skip_item()?;
                }
                None => return Err(CborError::UnknownKey(key.to_string())),
            }
        }
    }

    fn read_key(&mut self) -> Result<Key<'de>> {
        let header = self.reader.read_header()?;
        match header.major {
            MAJOR_UNSIGNED | MAJOR_NEGATIVE => Ok(Key::Label(self.reader.integer(&header)?)),
            MAJOR_TEXT => Ok(Key::Name(utf8(self.reader.string_payload(&header)?)?)),
            _ => Err(header.unexpected("label or name")),
        }
    }

    pub fn end_structure(&mut self, handle: StructureHandle) -> Result<()> {
        self.field = None;
        match handle.remaining {
            None => {
                if self.reader.try_break()? {
                    Ok(())
                } else {
                    Err(CborError::UnexpectedMajorType {
                        expected: "break",
                        found: primitive::major_name(self.reader.peek_major()?),
                    })
                }
            }
            Some(0) => Ok(()),
            Some(remaining) => Err(CborError::LengthMismatch(remaining)),
        }
    }

    pub fn decode_integer(&mut self) -> Result<i128> {
        let header = self.next_header()?;
        self.reader.integer(&header)
    }

    pub fn decode_float(&mut self) -> Result<f64> {
        let header = self.next_header()?;
        self.reader.float(&header)
    }

    pub fn decode_bool(&mut self) -> Result<bool> {
        let header = self.next_header()?;
        self.reader.boolean(&header)
    }

    pub fn decode_text(&mut self) -> Result<Cow<'de, str>> {
        let header = self.next_header()?;
        if header.major != MAJOR_TEXT {
            return Err(header.unexpected("text string"));
        }
        utf8(self.reader.string_payload(&header)?)
    }

    /// A byte string, or the legacy framing as an array of small integers.
    pub fn decode_byte_string(&mut self) -> Result<Cow<'de, [u8]>> {
        let (header, tags) = self.structure_header()?;
        match header.major {
            MAJOR_BYTES => self.reader.string_payload(&header),
            MAJOR_ARRAY => {
                let mut handle = self.open(LIST, &header, &tags)?;
                let mut bytes = Vec::new();
                while self.decode_element_index(&mut handle)?.is_some() {
                    let byte = self.decode_integer()?;
                    bytes.push(u8::try_from(byte).map_err(|_| CborError::IntegerOverflow)?);
                }
                self.end_structure(handle)?;
                Ok(Cow::Owned(bytes))
            }
            _ => Err(header.unexpected("byte string")),
        }
    }

    /// Consumes a null if one is next. An empty map counts as null for
    /// fields holding an object. Tags in front of a null are verified like
    /// those of any other value.
    pub fn decode_null(&mut self) -> Result<bool> {
        self.reader.read_tags(&mut self.pending_tags)?;
        let object = self.field.is_some_and(|field| field.object);
        match self.reader.peek()? {
            NULL_BYTE | UNDEFINED_BYTE => {}
            primitive::EMPTY_MAP if object => {}
            _ => return Ok(false),
        }
        let undeclared = self.take_value_tags()?;
        if !undeclared.is_empty() {
            trace!("Ignoring tags {undeclared:?} on null");
        }
        self.reader.read_u8()?;
        Ok(true)
    }

    fn decode_sequence<V: Visitor<'de>>(&mut self, visitor: V) -> Result<V::Value> {
        let (header, tags) = self.structure_header()?;
        match header.major {
            MAJOR_BYTES => {
                let bytes = self.reader.string_payload(&header)?;
                let mut access = SeqDeserializer::<_, CborError>::new(bytes.iter().copied());
                let value = visitor.visit_seq(&mut access)?;
                access.end()?;
                Ok(value)
            }
            _ => {
                let mut handle = self.open(LIST, &header, &tags)?;
                let value = visitor.visit_seq(ListAccess {
                    de: &mut *self,
                    handle: &mut handle,
                })?;
                self.end_structure(handle)?;
                Ok(value)
            }
        }
    }

    fn decode_struct<V: Visitor<'de>>(
        &mut self,
        name: &str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let shape = self.cbor.shape(name, StructureKind::Class, fields);
        let mut handle = self.begin_structure(shape)?;
        let value = if shape.is_array_framed() {
            visitor.visit_seq(ListAccess {
                de: &mut *self,
                handle: &mut handle,
            })?
        } else {
            visitor.visit_map(ClassAccess {
                de: &mut *self,
                handle: &mut handle,
            })?
        };
        self.end_structure(handle)?;
        Ok(value)
    }

    /// Reads a byte string and hands the visitor both the raw bytes and the
    /// value decoded from them.
    fn decode_embedded<V: Visitor<'de>>(&mut self, visitor: V) -> Result<V::Value> {
        let header = self.next_header()?;
        if header.major != MAJOR_BYTES {
            return Err(header.unexpected("byte string"));
        }
        let len = header.length().ok_or_else(|| {
            CborError::UnsupportedShape("embedded CBOR in a chunked byte string".to_string())
        })?;
        let len = usize::try_from(len).map_err(|_| CborError::TruncatedInput)?;
        let bytes = self.reader.take(len)?;
        visitor.visit_seq(EmbeddedAccess {
            cbor: self.cbor,
            bytes,
            position: 0,
        })
    }
}

macro_rules! deserialize_integer {
    ($($method:ident => $visit:ident($ty:ty),)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                let value = self.decode_integer()?;
                visitor.$visit(<$ty>::try_from(value).map_err(|_| CborError::IntegerOverflow)?)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for &mut Decoder<'_, 'de> {
    type Error = CborError;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let (header, tags) = self.structure_header()?;
        match header.major {
            MAJOR_UNSIGNED => visitor.visit_u64(header.length().unwrap_or_default()),
            MAJOR_NEGATIVE => {
                let value = self.reader.integer(&header)?;
                match i64::try_from(value) {
                    Ok(value) => visitor.visit_i64(value),
                    Err(_) => visitor.visit_i128(value),
                }
            }
            MAJOR_BYTES => match self.reader.string_payload(&header)? {
                Cow::Borrowed(bytes) => visitor.visit_borrowed_bytes(bytes),
                Cow::Owned(bytes) => visitor.visit_byte_buf(bytes),
            },
            MAJOR_TEXT => match utf8(self.reader.string_payload(&header)?)? {
                Cow::Borrowed(text) => visitor.visit_borrowed_str(text),
                Cow::Owned(text) => visitor.visit_string(text),
            },
            MAJOR_ARRAY => {
                let mut handle = self.open(LIST, &header, &tags)?;
                let value = visitor.visit_seq(ListAccess {
                    de: &mut *self,
                    handle: &mut handle,
                })?;
                self.end_structure(handle)?;
                Ok(value)
            }
            MAJOR_MAP => {
                let mut handle = self.open(MAP, &header, &tags)?;
                let value = visitor.visit_map(MapAccess {
                    de: &mut *self,
                    handle: &mut handle,
                })?;
                self.end_structure(handle)?;
                Ok(value)
            }
            MAJOR_SIMPLE => match header.initial {
                NULL_BYTE | UNDEFINED_BYTE => visitor.visit_unit(),
                0xf4 | 0xf5 => visitor.visit_bool(self.reader.boolean(&header)?),
                0xf9..=0xfb => visitor.visit_f64(self.reader.float(&header)?),
                initial => Err(CborError::MalformedHeader(initial)),
            },
            _ => Err(CborError::MalformedHeader(header.initial)),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_bool(self.decode_bool()?)
    }

    deserialize_integer! {
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
        deserialize_u128 => visit_u128(u128),
    }

    fn deserialize_i128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i128(self.decode_integer()?)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f32(self.decode_float()? as f32)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f64(self.decode_float()?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let code_point = u32::try_from(self.decode_integer()?).map_err(|_| CborError::IntegerOverflow)?;
        let c = char::from_u32(code_point).ok_or_else(|| {
            CborError::UnsupportedShape(format!("{code_point:#x} is not a character"))
        })?;
        visitor.visit_char(c)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decode_text()? {
            Cow::Borrowed(text) => visitor.visit_borrowed_str(text),
            Cow::Owned(text) => visitor.visit_string(text),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decode_byte_string()? {
            Cow::Borrowed(bytes) => visitor.visit_borrowed_bytes(bytes),
            Cow::Owned(bytes) => visitor.visit_byte_buf(bytes),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.decode_null()? {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let header = self.next_header()?;
        match header.initial {
            NULL_BYTE | UNDEFINED_BYTE => visitor.visit_unit(),
            _ => Err(header.unexpected("null")),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        if name == EMBEDDED_NAME {
            self.decode_embedded(visitor)
        } else {
            visitor.visit_newtype_struct(self)
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.decode_sequence(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.decode_sequence(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.decode_sequence(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let mut handle = self.begin_structure(MAP)?;
        let value = visitor.visit_map(MapAccess {
            de: &mut *self,
            handle: &mut handle,
        })?;
        self.end_structure(handle)?;
        Ok(value)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.decode_struct(name, fields, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.reader.read_tags(&mut self.pending_tags)?;
        match self.reader.peek_major()? {
            MAJOR_TEXT => {
                let variant: StringDeserializer<CborError> =
                    self.decode_text()?.into_owned().into_deserializer();
                visitor.visit_enum(variant)
            }
            MAJOR_ARRAY => {
                let mut handle = self.begin_structure(POLYMORPHIC)?;
                if self.decode_element_index(&mut handle)?.is_none() {
                    return Err(CborError::UnsupportedShape(
                        "enum variant array without a name".to_string(),
                    ));
                }
                let variant = self.decode_text()?.into_owned();
                let value = visitor.visit_enum(PolymorphicAccess {
                    de: &mut *self,
                    handle: &mut handle,
                    variant,
                })?;
                self.end_structure(handle)?;
                Ok(value)
            }
            major => Err(CborError::UnexpectedMajorType {
                expected: "enum variant",
                found: primitive::major_name(major),
            }),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.pending_tags.clear();
        self.field = None;
        self.reader.skip_item()?;
        visitor.visit_unit()
    }
}

/// Elements of arrays: lists, tuples and array-framed classes.
struct ListAccess<'a, 'c, 'de> {
    de: &'a mut Decoder<'c, 'de>,
    handle: &'a mut StructureHandle,
}

impl<'de> de::SeqAccess<'de> for ListAccess<'_, '_, 'de> {
    type Error = CborError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.de.decode_element_index(self.handle)? {
            Some(_) => seed.deserialize(&mut *self.de).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        self.handle.remaining.and_then(|n| usize::try_from(n).ok())
    }
}

/// Entries of maps whose keys are data.
struct MapAccess<'a, 'c, 'de> {
    de: &'a mut Decoder<'c, 'de>,
    handle: &'a mut StructureHandle,
}

impl<'de> de::MapAccess<'de> for MapAccess<'_, '_, 'de> {
    type Error = CborError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        match self.de.decode_element_index(self.handle)? {
            Some(_) => seed.deserialize(&mut *self.de).map(Some),
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        match self.de.decode_element_index(self.handle)? {
            Some(_) => seed.deserialize(&mut *self.de),
            None => Err(CborError::MalformedHeader(primitive::BREAK)),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        self.handle.remaining.and_then(|n| usize::try_from(n).ok())
    }
}

/// Fields of a keyed class; keys are resolved to field names.
struct ClassAccess<'a, 'c, 'de> {
    de: &'a mut Decoder<'c, 'de>,
    handle: &'a mut StructureHandle,
}

impl<'de> de::MapAccess<'de> for ClassAccess<'_, '_, 'de> {
    type Error = CborError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        match self.de.decode_element_index(self.handle)? {
            Some(index) => {
                let name = self.handle.shape.element_name(index);
                seed.deserialize(BorrowedStrDeserializer::<CborError>::new(name))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        seed.deserialize(&mut *self.de)
    }
}

/// The `[variant, value]` pair of a data-carrying enum variant.
struct PolymorphicAccess<'a, 'c, 'de> {
    de: &'a mut Decoder<'c, 'de>,
    handle: &'a mut StructureHandle,
    variant: String,
}

impl PolymorphicAccess<'_, '_, '_> {
    fn value_slot(&mut self) -> Result<()> {
        match self.de.decode_element_index(self.handle)? {
            Some(_) => Ok(()),
            None => Err(CborError::UnsupportedShape(format!(
                "enum variant {} without a value",
                self.variant
            ))),
        }
    }
}

impl<'de> de::EnumAccess<'de> for PolymorphicAccess<'_, '_, 'de> {
    type Error = CborError;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self)> {
        let value = seed.deserialize(StrDeserializer::<CborError>::new(&self.variant))?;
        Ok((value, self))
    }
}

impl<'de> de::VariantAccess<'de> for PolymorphicAccess<'_, '_, 'de> {
    type Error = CborError;

    fn unit_variant(self) -> Result<()> {
        if self.de.decode_element_index(self.handle)?.is_some() {
            self.de.reader.skip_item()?;
        }
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(mut self, seed: T) -> Result<T::Value> {
        self.value_slot()?;
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(mut self, _len: usize, visitor: V) -> Result<V::Value> {
        self.value_slot()?;
        self.de.decode_sequence(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        mut self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.value_slot()?;
        self.de.decode_struct(&self.variant, fields, visitor)
    }
}

/// Yields the raw bytes of an embedded CBOR item, then the decoded item.
struct EmbeddedAccess<'c, 'de> {
    cbor: &'c Cbor,
    bytes: &'de [u8],
    position: u8,
}

impl<'de> de::SeqAccess<'de> for EmbeddedAccess<'_, 'de> {
    type Error = CborError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        self.position += 1;
        match self.position {
            1 => seed
                .deserialize(BorrowedBytesDeserializer::<CborError>::new(self.bytes))
                .map(Some),
            2 => {
                let mut nested = Decoder::new(self.cbor, self.bytes);
                let value = seed.deserialize(&mut nested)?;
                nested.end()?;
                Ok(Some(value))
            }
            _ => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(2usize.saturating_sub(self.position as usize))
    }
}
