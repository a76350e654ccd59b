use std::io;
use thiserror::Error;

/// Everything that can go wrong while encoding or decoding.
///
/// All variants are fatal for the call that produced them; a failed decode
/// never yields a partial value.
#[derive(Error, Debug)]
pub enum CborError {
    #[error("Malformed CBOR header byte {0:#04x}")]
    MalformedHeader(u8),

    #[error("Expected {expected}, found {found}")]
    UnexpectedMajorType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Unknown key {0}")]
    UnknownKey(String),

    #[error("CBOR tags {found:?} do not match declared tags {expected:?}")]
    TagMismatch { expected: Vec<u64>, found: Vec<u64> },

    #[error("Not enough data for encoded value")]
    TruncatedInput,

    #[error("Unsupported shape: {0}")]
    UnsupportedShape(String),

    #[error("Invalid UTF-8 in text string")]
    InvalidUtf8,

    #[error("Integer does not fit the target type")]
    IntegerOverflow,

    #[error("Structure ended with {0} unread elements")]
    LengthMismatch(u64),

    #[error("{0} trailing bytes after the root value")]
    TrailingData(usize),

    #[error(transparent)]
    Hex(#[from] hex::FromHexError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serde error: {0}")]
    Message(String),
}

impl serde::ser::Error for CborError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        CborError::Message(msg.to_string())
    }
}

impl serde::de::Error for CborError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        CborError::Message(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CborError>;
