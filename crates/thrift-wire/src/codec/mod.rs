//! Binary encoding/decoding for the Thrift Binary Protocol.
//!
//! Layers, bottom up: primitive stream reads and writes, offset-addressable
//! decoding over random-access sources, value orchestration (eager or lazy
//! containers), and envelope framing for RPC messages.

pub mod envelope;
pub mod lazy;
pub mod offset;
pub mod pool;
pub mod primitives;
pub mod protocol;
pub mod value;

pub use envelope::{
    begin_message, decode_envelope, encode_envelope, read_envelope, read_envelope_begin,
    read_request, write_envelope_begin, BodyWriter, Framing, Responder,
};
pub use lazy::{LazyList, LazyMap, ViewState};
pub use offset::{DecodeMode, DecodeOptions, Decoder, OffsetReader, ReadAt};
pub use pool::{list_pool_stats, map_pool_stats, PoolStats};
pub use primitives::{FieldHeader, ListHeader, MapHeader, StreamReader, StreamWriter};
pub use protocol::{BinaryProtocol, Protocol};
pub use value::{
    decode_value, encode_value, encode_value_with_options, read_struct, read_value, write_struct,
    write_value, write_value_with_options, EncodeOptions,
};
