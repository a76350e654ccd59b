//! # Structured CBOR
//!
//! A descriptor-driven CBOR (Concise Binary Object Representation, RFC 8949)
//! codec for serde.
//!
//! ## Features
//! - All CBOR major types 0-7, with definite and indefinite length framing
//!   - Output framing is chosen by configuration (indefinite by default)
//!   - Input framing is detected per structure, so both can be mixed freely
//! - Per-type metadata through static [`Descriptor`] tables:
//!   - Numeric labels instead of field names as map keys
//!   - Tags on keys and on values, verified when decoding
//!   - Classes framed as tagged arrays, e.g. COSE_Sign1 (tag 18)
//!   - Byte-string fields and declared default values
//! - Embedded CBOR in byte strings via [`ByteStringWrapper`]
//! - Configurable handling of unknown keys and default values
//!
//! ## Byte strings
//! `Vec<u8>` encodes as an array of integers unless its field is marked as a
//! byte string or [`CborBuilder::always_use_byte_string`] is set. Use
//! `serde_bytes::ByteBuf` or `#[serde(with = "serde_bytes")]` for values that
//! are always byte strings. Decoding accepts either framing.
//!
//! ## Example
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use structured_cbor::{Cbor, CborShape, DefaultValue, Descriptor, ElementDescriptor};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Header {
//!     alg: Option<i32>,
//!     kid: Option<String>,
//! }
//!
//! impl CborShape for Header {
//!     fn descriptor() -> &'static Descriptor {
//!         static DESCRIPTOR: Descriptor = Descriptor::class(
//!             "Header",
//!             &[
//!                 ElementDescriptor::new("alg").label(1).default(DefaultValue::Null),
//!                 ElementDescriptor::new("kid").label(4).default(DefaultValue::Null),
//!             ],
//!         );
//!         &DESCRIPTOR
//!     }
//! }
//!
//! let cbor = Cbor::builder()
//!     .write_definite_lengths(true)
//!     .shape::<Header>()
//!     .build();
//!
//! let header = Header { alg: Some(-7), kid: None };
//! let bytes = cbor.encode_to_vec(&header).unwrap();
//! assert_eq!(bytes, [0xa1, 0x01, 0x26]); // {1: -7}
//!
//! let decoded: Header = cbor.decode_from_slice(&bytes).unwrap();
//! assert_eq!(decoded, header);
//! ```

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

mod config;
pub mod de;
mod descriptor;
mod error;
pub mod primitive;
pub mod ser;
mod wrapper;

pub use config::{Cbor, CborBuilder};
pub use de::{Decoder, StructureHandle};
pub use descriptor::{CborShape, DefaultValue, Descriptor, ElementDescriptor, Shape, StructureKind};
pub use error::{CborError, Result};
pub use ser::Encoder;
pub use wrapper::ByteStringWrapper;

// Convenience functions using the default configuration
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Cbor::default().encode_to_vec(value)
}

pub fn to_writer<W: Write, T: Serialize + ?Sized>(writer: W, value: &T) -> Result<()> {
    Cbor::default().encode_to_writer(writer, value)
}

pub fn from_slice<'de, T: Deserialize<'de>>(slice: &'de [u8]) -> Result<T> {
    Cbor::default().decode_from_slice(slice)
}

pub fn from_reader<R: Read, T: DeserializeOwned>(reader: R) -> Result<T> {
    Cbor::default().decode_from_reader(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::{BEGIN_ARRAY, MAJOR_ARRAY, MAJOR_BYTES};
    use std::collections::HashMap;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Person {
        name: String,
        age: u32,
        emails: Vec<String>,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    enum Figure {
        Empty,
        Circle(f64),
        Point(i32, i32),
        Rect { w: u32, h: u32 },
    }

    #[test]
    fn test_basic_types() {
        assert_eq!(from_slice::<u32>(&to_vec(&42u32).unwrap()).unwrap(), 42);
        assert_eq!(from_slice::<i32>(&to_vec(&-42i32).unwrap()).unwrap(), -42);
        assert!(from_slice::<bool>(&to_vec(&true).unwrap()).unwrap());
        assert_eq!(from_slice::<char>(&to_vec(&'é').unwrap()).unwrap(), 'é');
        assert_eq!(
            from_slice::<String>(&to_vec(&"hello".to_string()).unwrap()).unwrap(),
            "hello"
        );
        assert_eq!(from_slice::<Option<u8>>(&[0xf6]).unwrap(), None);
    }

    #[test]
    fn test_struct() {
        let person = Person {
            name: "Alice".to_string(),
            age: 30,
            emails: vec!["alice@example.com".to_string()],
        };
        let encoded = to_vec(&person).unwrap();
        assert_eq!(encoded[0], primitive::BEGIN_MAP);
        let decoded: Person = from_slice(&encoded).unwrap();
        assert_eq!(person, decoded);
    }

    #[test]
    fn test_map() {
        let mut map = HashMap::new();
        map.insert("key1".to_string(), 100);
        map.insert("key2".to_string(), 200);
        let encoded = to_vec(&map).unwrap();
        let decoded: HashMap<String, i32> = from_slice(&encoded).unwrap();
        assert_eq!(map, decoded);

        let definite = Cbor::builder().write_definite_lengths(true).build();
        let encoded = definite.encode_to_vec(&map).unwrap();
        assert_eq!(encoded[0], 0xa2);
        let decoded: HashMap<String, i32> = definite.decode_from_slice(&encoded).unwrap();
        assert_eq!(map, decoded);
    }

    #[test]
    fn test_enum_variants() {
        let cbor = Cbor::builder().write_definite_lengths(true).build();
        assert_eq!(cbor.encode_to_vec(&Figure::Empty).unwrap(), b"\x65Empty");
        // ["Circle", 1.5]
        let circle = cbor.encode_to_vec(&Figure::Circle(1.5)).unwrap();
        assert_eq!(&circle[..8], b"\x82\x66Circle");

        for figure in [
            Figure::Empty,
            Figure::Circle(1.5),
            Figure::Point(-1, 2),
            Figure::Rect { w: 3, h: 4 },
        ] {
            for cbor in [Cbor::default(), cbor.clone()] {
                let encoded = cbor.encode_to_vec(&figure).unwrap();
                let decoded: Figure = cbor.decode_from_slice(&encoded).unwrap();
                assert_eq!(decoded, figure);
            }
        }
    }

    #[test]
    fn test_vec_u8_as_array() {
        // Without a byte-string marker, Vec<u8> serializes as an array
        let data: Vec<u8> = vec![1, 2, 3];
        let encoded = to_vec(&data).unwrap();
        assert_eq!(encoded, [BEGIN_ARRAY, 1, 2, 3, 0xff]);

        let definite = Cbor::builder().write_definite_lengths(true).build();
        let encoded = definite.encode_to_vec(&data).unwrap();
        assert_eq!(encoded[0], (MAJOR_ARRAY << 5) | 3);

        let decoded: Vec<u8> = from_slice(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_serde_bytes_always_byte_string() {
        use serde_bytes::ByteBuf;

        let data: Vec<u8> = vec![1, 2, 3, 4, 5];
        let encoded = to_vec(&ByteBuf::from(data.clone())).unwrap();
        assert_eq!(encoded.len(), 6);
        assert_eq!(encoded[0], (MAJOR_BYTES << 5) | 5);

        let decoded: ByteBuf = from_slice(&encoded).unwrap();
        assert_eq!(decoded.into_vec(), data);

        // the array framing is still accepted
        let decoded: ByteBuf = from_slice(&to_vec(&data).unwrap()).unwrap();
        assert_eq!(decoded.into_vec(), data);
    }

    #[test]
    fn test_borrowed_strings() {
        #[derive(Deserialize)]
        struct View<'a> {
            name: &'a str,
            raw: &'a [u8],
        }

        // {"name": "ab", "raw": h'01'}
        let data = [
            0xa2, 0x64, b'n', b'a', b'm', b'e', 0x62, b'a', b'b', 0x63, b'r', b'a', b'w', 0x41,
            0x01,
        ];
        let view: View = from_slice(&data).unwrap();
        assert_eq!(view.name, "ab");
        assert_eq!(view.raw, [1]);
    }

    #[test]
    fn test_writer_and_reader() {
        let person = Person {
            name: "Bob".to_string(),
            age: 7,
            emails: vec![],
        };
        let mut buf = Vec::new();
        to_writer(&mut buf, &person).unwrap();
        let decoded: Person = from_reader(buf.as_slice()).unwrap();
        assert_eq!(decoded, person);
    }

    #[test]
    fn test_hex_helpers() {
        let cbor = Cbor::builder().write_definite_lengths(true).build();
        assert_eq!(cbor.encode_to_hex_string(&vec![-7i8]).unwrap(), "8126");
        let decoded: Vec<i8> = cbor.decode_from_hex_string("8126").unwrap();
        assert_eq!(decoded, [-7]);
        assert!(matches!(
            cbor.decode_from_hex_string::<u8>("zz"),
            Err(CborError::Hex(_))
        ));
    }

    #[test]
    fn test_truncated_and_trailing_input() {
        assert!(matches!(from_slice::<String>(&[0x63, b'a']), Err(CborError::TruncatedInput)));
        assert!(matches!(from_slice::<u8>(&[0x01, 0x01]), Err(CborError::TrailingData(1))));
        assert!(matches!(from_slice::<u8>(&[0x19, 0x01, 0x00]), Err(CborError::IntegerOverflow)));
        assert!(matches!(from_slice::<String>(&[0x61, 0xff]), Err(CborError::InvalidUtf8)));
    }
}
