//! thrift-wire: a runtime codec for the Thrift Binary Protocol.
//!
//! This crate converts between raw bytes and a generic, type-tagged value
//! tree. Code generated from an IDL (or written by hand) builds and inspects
//! [`WireValue`]s; this crate handles the bytes.
//!
//! # Overview
//!
//! - **Schema-free**: values carry their wire type, so any message can be
//!   decoded, printed, skipped, or re-encoded without its IDL
//! - **Random access**: a [`Decoder`] decodes from any offset of a shared
//!   source without a shared cursor
//! - **Lazy containers**: in lazy mode, lists, sets, and maps are validated
//!   up front and decoded element by element on demand
//! - **RPC envelopes**: requests may be enveloped or bare, and responses
//!   mirror them
//!
//! # Quick Start
//!
//! ```rust
//! use thrift_wire::{decode_value, encode_value, StructBuilder, Type, WireValue};
//!
//! let user = StructBuilder::new()
//!     .i64(1, 42)
//!     .string(2, "Alice")
//!     .list(3, Type::Binary, |tags| tags.string("admin").string("ops"))
//!     .build();
//!
//! let bytes = encode_value(&WireValue::Struct(user.clone())).unwrap();
//! let decoded = decode_value(Type::Struct, &bytes).unwrap();
//! assert_eq!(decoded, WireValue::Struct(user));
//! ```
//!
//! Lazy decoding over a shared source:
//!
//! ```rust
//! use thrift_wire::{encode_value, Decoder, DecodeOptions, Type, WireValue};
//!
//! let list = WireValue::list(Type::I32, (0..100).map(WireValue::I32).collect());
//! let bytes = encode_value(&list).unwrap();
//!
//! let decoder = Decoder::new(bytes).with_options(DecodeOptions::lazy());
//! let (value, end) = decoder.decode_value_at(Type::List, 0).unwrap();
//! assert_eq!(end, 5 + 4 * 100);
//!
//! let WireValue::List(items) = value else { unreachable!() };
//! assert!(items.is_lazy());
//! let items = items.into_vec().unwrap();
//! assert_eq!(items[9], WireValue::I32(9));
//! ```
//!
//! # Modules
//!
//! - [`model`]: Wire types, values, envelope headers, and builders
//! - [`codec`]: Primitive, offset-addressable, lazy, and envelope codecs
//! - [`validate`]: Required-field checks for consumers
//! - [`error`]: Error types
//! - [`limits`]: Security limits and wire constants
//!
//! # Security
//!
//! The decoder is designed to safely handle untrusted input:
//! - Declared lengths are checked against limits before allocating
//! - Nesting depth is bounded for both decoding and skipping
//! - Invalid data is rejected with the offset where it was found
//!
//! # Wire Format
//!
//! Integers are big-endian two's complement; doubles are IEEE 754 bits,
//! big-endian. Binaries are an `i32` length followed by the bytes. A struct
//! is a sequence of `type:u8 id:i16 value` fields ended by a zero byte.
//! Maps are `key_type:u8 value_type:u8 count:i32` followed by the pairs;
//! sets and lists are `elem_type:u8 count:i32` followed by the elements.

pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod validate;

// Re-export commonly used types at crate root
pub use codec::{
    decode_envelope, decode_value, encode_envelope, encode_value, read_request, BinaryProtocol,
    DecodeMode, DecodeOptions, Decoder, EncodeOptions, Framing, LazyList, LazyMap, Protocol, ReadAt,
    Responder, StreamReader, StreamWriter,
};
pub use error::{
    DecodeError, EncodeError, Error, MaterializeError, ProtocolError, ValidationError, ViewError,
};
pub use model::{
    Envelope, EnvelopeHeader, EnvelopeKind, Field, MapItem, MapItems, Struct, StructBuilder, Type,
    ValueList, WireValue,
};
pub use validate::check_required;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
