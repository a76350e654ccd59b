//! Static shape descriptors.
//!
//! serde tells the codec *what* is being serialized (a struct named `X` with a
//! field `y`), but not how CBOR should frame it. A [`Descriptor`] carries the
//! CBOR-only metadata: numeric labels, key and value tags, array framing,
//! byte-string fields and declared defaults. Descriptors are plain `static`
//! tables handed out by [`CborShape`] and registered on the configuration.
//!
//! ```
//! use structured_cbor::{CborShape, Descriptor, ElementDescriptor, DefaultValue};
//!
//! #[derive(serde::Serialize, serde::Deserialize)]
//! struct CoseHeader {
//!     alg: Option<i32>,
//!     kid: Option<String>,
//! }
//!
//! impl CborShape for CoseHeader {
//!     fn descriptor() -> &'static Descriptor {
//!         static DESCRIPTOR: Descriptor = Descriptor::class(
//!             "CoseHeader",
//!             &[
//!                 ElementDescriptor::new("alg").label(1).default(DefaultValue::Null),
//!                 ElementDescriptor::new("kid").label(4).default(DefaultValue::Null),
//!             ],
//!         );
//!         &DESCRIPTOR
//!     }
//! }
//! ```

use crate::primitive;

/// How a structure is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureKind {
    /// A record with named (or labeled) fields; a map unless array-framed.
    Class,
    /// Sequences, tuples and tuple structs; always an array.
    List,
    /// Key/value collections whose keys are data.
    Map,
    /// Enum variants carrying data, framed as `[variant, value]`.
    Polymorphic,
}

/// A declared default value for a field.
///
/// When `encode_defaults` is off, a field whose encoding equals the encoding
/// of its declared default is left out entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float32(f32),
    Float64(f64),
    Text(&'static str),
    Bytes(&'static [u8]),
    EmptyArray,
    EmptyMap,
}

impl DefaultValue {
    /// Encodes the default the way the field itself would be encoded.
    pub(crate) fn encode(
        &self,
        element: &ElementDescriptor,
        byte_strings: bool,
        definite: bool,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        match *self {
            DefaultValue::Null if element.object => primitive::write_empty_map(&mut out),
            DefaultValue::Null => primitive::write_null(&mut out),
            DefaultValue::Bool(value) => primitive::write_bool(&mut out, value),
            DefaultValue::Integer(value) => primitive::write_signed(&mut out, value),
            DefaultValue::Float32(value) => primitive::write_f32(&mut out, value),
            DefaultValue::Float64(value) => primitive::write_f64(&mut out, value),
            DefaultValue::Text(value) => primitive::write_text(&mut out, value),
            DefaultValue::Bytes(value) if byte_strings || element.byte_string => {
                primitive::write_bytes(&mut out, value)
            }
            DefaultValue::Bytes(value) => {
                primitive::write_array_header(&mut out, definite.then_some(value.len() as u64));
                for &byte in value {
                    primitive::write_unsigned(&mut out, byte as u64);
                }
                if !definite {
                    primitive::write_break(&mut out);
                }
            }
            DefaultValue::EmptyArray => {
                primitive::write_array_header(&mut out, definite.then_some(0));
                if !definite {
                    primitive::write_break(&mut out);
                }
            }
            DefaultValue::EmptyMap => {
                primitive::write_map_header(&mut out, definite.then_some(0));
                if !definite {
                    primitive::write_break(&mut out);
                }
            }
        }
        out
    }
}

/// Per-field metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementDescriptor {
    pub name: &'static str,
    pub label: Option<i64>,
    pub key_tags: &'static [u64],
    pub value_tags: &'static [u64],
    /// Frame a byte array as a CBOR byte string instead of an integer array.
    pub byte_string: bool,
    /// The field's type is itself an object; a null there is written as `{}`.
    pub object: bool,
    pub default: Option<DefaultValue>,
}

impl ElementDescriptor {
    pub const fn new(name: &'static str) -> Self {
        ElementDescriptor {
            name,
            label: None,
            key_tags: &[],
            value_tags: &[],
            byte_string: false,
            object: false,
            default: None,
        }
    }

    /// Elements of lists and maps carry no schema information.
    pub(crate) const ANONYMOUS: ElementDescriptor = ElementDescriptor::new("");

    pub const fn label(self, label: i64) -> Self {
        ElementDescriptor {
            label: Some(label),
            ..self
        }
    }

    pub const fn key_tags(self, tags: &'static [u64]) -> Self {
        ElementDescriptor {
            key_tags: tags,
            ..self
        }
    }

    pub const fn value_tags(self, tags: &'static [u64]) -> Self {
        ElementDescriptor {
            value_tags: tags,
            ..self
        }
    }

    pub const fn byte_string(self) -> Self {
        ElementDescriptor {
            byte_string: true,
            ..self
        }
    }

    pub const fn object(self) -> Self {
        ElementDescriptor {
            object: true,
            ..self
        }
    }

    pub const fn default(self, value: DefaultValue) -> Self {
        ElementDescriptor {
            default: Some(value),
            ..self
        }
    }
}

/// Metadata for one serializable type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descriptor {
    /// Must equal the name serde reports for the type.
    pub name: &'static str,
    pub kind: StructureKind,
    /// `Some` frames a class as an array, preceded by the listed tags.
    pub array_tags: Option<&'static [u64]>,
    pub elements: &'static [ElementDescriptor],
}

impl Descriptor {
    pub const fn class(name: &'static str, elements: &'static [ElementDescriptor]) -> Self {
        Descriptor {
            name,
            kind: StructureKind::Class,
            array_tags: None,
            elements,
        }
    }

    /// A class written as a CBOR array of its field values, in order.
    pub const fn array(
        name: &'static str,
        tags: &'static [u64],
        elements: &'static [ElementDescriptor],
    ) -> Self {
        Descriptor {
            name,
            kind: StructureKind::Class,
            array_tags: Some(tags),
            elements,
        }
    }
}

/// Implemented once per type that needs CBOR metadata beyond what serde
/// provides. Register the type with [`CborBuilder::shape`](crate::CborBuilder::shape).
pub trait CborShape {
    fn descriptor() -> &'static Descriptor;
}

/// The shape of the structure currently being encoded or decoded.
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    /// A registered descriptor.
    Described(&'static Descriptor),
    /// Only what serde knows: the kind and, when decoding, the field names.
    Plain {
        kind: StructureKind,
        fields: &'static [&'static str],
    },
}

impl Shape {
    pub const fn plain(kind: StructureKind) -> Self {
        Shape::Plain { kind, fields: &[] }
    }

    pub fn kind(&self) -> StructureKind {
        match self {
            Shape::Described(descriptor) => descriptor.kind,
            Shape::Plain { kind, .. } => *kind,
        }
    }

    pub fn array_tags(&self) -> Option<&'static [u64]> {
        match self {
            Shape::Described(descriptor) => descriptor.array_tags,
            Shape::Plain { .. } => None,
        }
    }

    pub fn is_array_framed(&self) -> bool {
        self.array_tags().is_some()
    }

    /// Whether elements are introduced by a schema key (name or label).
    pub fn has_keys(&self) -> bool {
        self.kind() == StructureKind::Class && !self.is_array_framed()
    }

    pub fn len(&self) -> usize {
        match self {
            Shape::Described(descriptor) => descriptor.elements.len(),
            Shape::Plain { fields, .. } => fields.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element(&self, index: usize) -> ElementDescriptor {
        match self {
            Shape::Described(descriptor) => descriptor
                .elements
                .get(index)
                .copied()
                .unwrap_or(ElementDescriptor::ANONYMOUS),
            Shape::Plain { fields, .. } => fields
                .get(index)
                .map(|name| ElementDescriptor::new(name))
                .unwrap_or(ElementDescriptor::ANONYMOUS),
        }
    }

    /// Element for a serde field name; fields missing from the descriptor
    /// are written under their plain name.
    pub fn element_named(&self, name: &'static str) -> ElementDescriptor {
        self.index_of_name(name)
            .map(|index| self.element(index))
            .unwrap_or(ElementDescriptor::new(name))
    }

    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        match self {
            Shape::Described(descriptor) => {
                descriptor.elements.iter().position(|e| e.name == name)
            }
            Shape::Plain { fields, .. } => fields.iter().position(|f| *f == name),
        }
    }

    pub fn index_of_label(&self, label: i64) -> Option<usize> {
        match self {
            Shape::Described(descriptor) => descriptor
                .elements
                .iter()
                .position(|e| e.label == Some(label)),
            Shape::Plain { .. } => None,
        }
    }

    pub fn element_name(&self, index: usize) -> &'static str {
        match self {
            Shape::Described(descriptor) => descriptor
                .elements
                .get(index)
                .map(|e| e.name)
                .unwrap_or(""),
            Shape::Plain { fields, .. } => fields.get(index).copied().unwrap_or(""),
        }
    }
}
