//! Protocol seam.
//!
//! Callers that only need "bytes in, values out" go through [`Protocol`], so
//! another encoding can be added as a second implementation without touching
//! them. [`BinaryProtocol`] is the Thrift Binary Protocol.

use std::io::Read;
use std::sync::Arc;

use crate::codec::envelope::{read_request, Responder};
use crate::codec::offset::{DecodeOptions, Decoder, ReadAt};
use crate::codec::value::{encode_value_with_options, read_struct};
use crate::error::{DecodeError, EncodeError, ProtocolError};
use crate::model::{EnvelopeHeader, EnvelopeKind, Struct, Type, WireValue};

/// An encoding of wire values.
pub trait Protocol {
    /// Encodes a value to bytes.
    fn encode(&self, value: &WireValue) -> Result<Vec<u8>, EncodeError>;

    /// Decodes one value of the given type from the start of `input`.
    fn decode(&self, ttype: Type, input: &[u8]) -> Result<WireValue, DecodeError>;

    /// Decodes one value at `offset` in a random-access source.
    ///
    /// Returns the value and the offset just past it.
    fn decode_at(
        &self,
        source: Arc<dyn ReadAt + Send + Sync>,
        ttype: Type,
        offset: u64,
    ) -> Result<(WireValue, u64), DecodeError>;

    /// Reads a whole request: optional envelope plus struct body.
    fn read_request<R: Read>(
        &self,
        expected: &[EnvelopeKind],
        reader: R,
    ) -> Result<(EnvelopeHeader, Struct, Responder), ProtocolError>;
}

/// The Thrift Binary Protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryProtocol {
    pub options: DecodeOptions,
}

impl BinaryProtocol {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    fn decoder(&self, source: Arc<dyn ReadAt + Send + Sync>) -> Decoder {
        Decoder::from_shared(source).with_options(self.options)
    }
}

impl Protocol for BinaryProtocol {
    fn encode(&self, value: &WireValue) -> Result<Vec<u8>, EncodeError> {
        encode_value_with_options(value, self.options.into())
    }

    /// Lazy options copy `input` so that views can outlive it.
    fn decode(&self, ttype: Type, input: &[u8]) -> Result<WireValue, DecodeError> {
        let (value, _) = self
            .decoder(Arc::new(input.to_vec()))
            .decode_value_at(ttype, 0)?;
        Ok(value)
    }

    fn decode_at(
        &self,
        source: Arc<dyn ReadAt + Send + Sync>,
        ttype: Type,
        offset: u64,
    ) -> Result<(WireValue, u64), DecodeError> {
        self.decoder(source).decode_value_at(ttype, offset)
    }

    /// The body is always decoded eagerly.
    fn read_request<R: Read>(
        &self,
        expected: &[EnvelopeKind],
        reader: R,
    ) -> Result<(EnvelopeHeader, Struct, Responder), ProtocolError> {
        let (header, stream, responder) = read_request(expected, reader)?;
        let mut stream = stream.with_max_depth(self.options.max_depth);
        let body = read_struct(&mut stream)?;
        Ok((header, body, responder))
    }
}
