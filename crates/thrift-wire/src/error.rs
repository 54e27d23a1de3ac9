//! Error types for Thrift encoding/decoding, envelopes, lazy views and validation.

use thiserror::Error;

use crate::model::{EnvelopeKind, Type};

/// Error during binary decoding.
///
/// Every variant carries the byte offset at which the problem was found,
/// measured from the start of the source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input while reading {ttype} at offset {offset}")]
    UnexpectedEof { ttype: Type, offset: u64 },

    #[error("I/O error while reading {ttype} at offset {offset}: {message}")]
    Io {
        ttype: Type,
        offset: u64,
        message: String,
    },

    #[error("unknown type tag {tag} at offset {offset}")]
    UnknownType { tag: u8, offset: u64 },

    #[error("negative {ttype} length {len} at offset {offset}")]
    NegativeLength { ttype: Type, len: i32, offset: u64 },

    #[error("{ttype} length {len} exceeds maximum {max} at offset {offset}")]
    LengthExceedsLimit {
        ttype: Type,
        len: usize,
        max: usize,
        offset: u64,
    },

    #[error("invalid bool value {value} at offset {offset} (expected 0x00 or 0x01)")]
    InvalidBool { value: u8, offset: u64 },

    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: u64 },

    #[error("type mismatch at offset {offset}: expected {expected}, found {found}")]
    TypeMismatch {
        expected: Type,
        found: Type,
        offset: u64,
    },

    #[error("nesting depth exceeds maximum {max} at offset {offset}")]
    DepthExceeded { max: usize, offset: u64 },

    #[error("unsupported envelope version {version:#010x} at offset {offset}")]
    BadEnvelopeVersion { version: u32, offset: u64 },

    #[error("invalid envelope kind {kind} at offset {offset}")]
    InvalidEnvelopeKind { kind: u8, offset: u64 },
}

impl DecodeError {
    /// Returns the byte offset of the failure.
    pub fn offset(&self) -> u64 {
        match self {
            DecodeError::UnexpectedEof { offset, .. }
            | DecodeError::Io { offset, .. }
            | DecodeError::UnknownType { offset, .. }
            | DecodeError::NegativeLength { offset, .. }
            | DecodeError::LengthExceedsLimit { offset, .. }
            | DecodeError::InvalidBool { offset, .. }
            | DecodeError::InvalidUtf8 { offset }
            | DecodeError::TypeMismatch { offset, .. }
            | DecodeError::DepthExceeded { offset, .. }
            | DecodeError::BadEnvelopeVersion { offset, .. }
            | DecodeError::InvalidEnvelopeKind { offset, .. } => *offset,
        }
    }

    /// Returns the wire type being read, when one applies.
    pub fn ttype(&self) -> Option<Type> {
        match self {
            DecodeError::UnexpectedEof { ttype, .. }
            | DecodeError::Io { ttype, .. }
            | DecodeError::NegativeLength { ttype, .. }
            | DecodeError::LengthExceedsLimit { ttype, .. } => Some(*ttype),
            DecodeError::InvalidBool { .. } => Some(Type::Bool),
            DecodeError::InvalidUtf8 { .. } => Some(Type::Binary),
            DecodeError::TypeMismatch { found, .. } => Some(*found),
            _ => None,
        }
    }

    /// Returns true if the input ended before the value was complete.
    pub fn is_eof(&self) -> bool {
        matches!(self, DecodeError::UnexpectedEof { .. })
    }
}

/// Envelope framing did not match what the caller expected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("unexpected envelope kind {found:?}, expected one of {expected:?}")]
    UnexpectedEnvelopeKind {
        expected: Vec<EnvelopeKind>,
        found: EnvelopeKind,
    },

    #[error("envelope present but a bare body was expected")]
    UnexpectedEnvelope,

    #[error("expected an envelope, found a bare body")]
    MissingEnvelope,

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Misuse of a lazy collection view.
///
/// These indicate a defect in the calling code; retrying cannot succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("lazy view exhausted: all {count} elements already materialized")]
    Exhausted { count: usize },

    #[error("lazy view used after release")]
    Released,
}

/// Failure to materialize an element of a lazy container.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    View(#[from] ViewError),
}

/// Error during binary encoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("I/O error while writing: {0}")]
    Io(String),

    #[error("{ttype} length {len} exceeds maximum {max}")]
    LengthExceedsLimit { ttype: Type, len: usize, max: usize },

    #[error("container declares {expected} elements but holds a {found}")]
    TypeMismatch { expected: Type, found: Type },

    #[error("nesting depth exceeds maximum {max}")]
    DepthExceeded { max: usize },

    #[error("materializing lazy container: {0}")]
    Decode(#[from] DecodeError),

    #[error("materializing lazy container: {0}")]
    View(#[from] ViewError),
}

impl From<std::io::Error> for EncodeError {
    fn from(err: std::io::Error) -> Self {
        EncodeError::Io(err.to_string())
    }
}

/// Error raised by consumers checking decoded structs against their schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("field {name} is required")]
    RequiredFieldMissing { name: &'static str, id: i16 },
}

/// Any error produced by this crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<MaterializeError> for EncodeError {
    fn from(err: MaterializeError) -> Self {
        match err {
            MaterializeError::Decode(e) => EncodeError::Decode(e),
            MaterializeError::View(e) => EncodeError::View(e),
        }
    }
}

impl From<MaterializeError> for Error {
    fn from(err: MaterializeError) -> Self {
        match err {
            MaterializeError::Decode(e) => Error::Decode(e),
            MaterializeError::View(e) => Error::View(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_type_accessors() {
        let err = DecodeError::UnexpectedEof {
            ttype: Type::I32,
            offset: 17,
        };
        assert_eq!(err.offset(), 17);
        assert_eq!(err.ttype(), Some(Type::I32));
        assert!(err.is_eof());

        let err = DecodeError::UnknownType { tag: 99, offset: 3 };
        assert_eq!(err.offset(), 3);
        assert_eq!(err.ttype(), None);
    }

    #[test]
    fn test_required_field_message() {
        let err = ValidationError::RequiredFieldMissing { name: "name", id: 1 };
        assert_eq!(err.to_string(), "field name is required");
    }

    #[test]
    fn test_umbrella_conversion() {
        let err: Error = ViewError::Released.into();
        assert!(matches!(err, Error::View(ViewError::Released)));
    }

    #[test]
    fn test_materialize_error_keeps_its_kind() {
        let view = MaterializeError::View(ViewError::Exhausted { count: 3 });
        assert_eq!(
            EncodeError::from(view.clone()),
            EncodeError::View(ViewError::Exhausted { count: 3 })
        );
        assert_eq!(Error::from(view), Error::View(ViewError::Exhausted { count: 3 }));

        let eof = DecodeError::UnexpectedEof { ttype: Type::Bool, offset: 9 };
        assert_eq!(
            EncodeError::from(MaterializeError::Decode(eof.clone())),
            EncodeError::Decode(eof.clone())
        );
        assert_eq!(Error::from(MaterializeError::Decode(eof.clone())), Error::Decode(eof));
    }
}
