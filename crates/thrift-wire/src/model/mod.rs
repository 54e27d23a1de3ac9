//! Data model types for Thrift wire values.
//!
//! This module contains the in-memory forms of protocol data:
//! - Wire type tags and values (primitives, structs, containers)
//! - Envelope headers for RPC framing
//! - Builders (ergonomic construction)

pub mod builder;
pub mod envelope;
pub mod value;

pub use builder::{ElementsBuilder, StructBuilder};
pub use envelope::{Envelope, EnvelopeHeader, EnvelopeKind};
pub use value::{Field, MapItem, MapItems, Struct, Type, ValueList, WireValue};
