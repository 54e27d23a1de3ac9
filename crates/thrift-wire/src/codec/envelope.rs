//! Envelope framing for RPC messages.
//!
//! A message is either a bare struct or a struct preceded by an envelope
//! header carrying the method name, message kind, and sequence ID. The
//! strict header starts with the version word `0x8001_0000 | kind`; its high
//! bit lets a reader tell it apart from a bare struct by peeking one byte,
//! since the first byte of a bare struct is a field type tag or the stop byte.
//!
//! # Wire Format
//!
//! ```text
//! strict:     i32 (VERSION_1 | kind) ++ string name ++ i32 seq_id ++ body
//! non-strict: string name ++ u8 kind ++ i32 seq_id ++ body
//! bare:       body
//! ```
//!
//! Responses mirror the request: an enveloped request gets an enveloped
//! response with the same name and sequence ID, a bare request gets a bare
//! response.

use std::io::{Read, Write};
use std::mem;

use tracing::{debug, trace};

use crate::codec::offset::Decoder;
use crate::codec::primitives::{StreamReader, StreamWriter};
use crate::codec::value::{read_struct, write_struct, write_value};
use crate::error::{DecodeError, EncodeError, ProtocolError};
use crate::limits::{
    ENVELOPE_KIND_MASK, FRAME_HEADER_SIZE, MAX_METHOD_NAME_LEN, VERSION_1, VERSION_MASK,
};
use crate::model::{Envelope, EnvelopeHeader, EnvelopeKind, Struct, Type, WireValue};

/// Whether a written message carries a length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    #[default]
    Unframed,
    /// Prefixed with the message length as a 4-byte big-endian integer.
    Framed,
}

// =============================================================================
// READING
// =============================================================================

/// Reads an envelope header in either the strict or the non-strict form.
///
/// The stream must be positioned at an envelope; a bare struct would be
/// misread as a non-strict header. Use [`read_envelope`] when the message may
/// be bare.
pub fn read_envelope_begin<R: Read>(stream: &mut StreamReader<R>) -> Result<EnvelopeHeader, DecodeError> {
    let offset = stream.position();
    let word = stream.read_i32()?;
    if word < 0 {
        let word = word as u32;
        if word & VERSION_MASK != VERSION_1 {
            return Err(DecodeError::BadEnvelopeVersion {
                version: word & VERSION_MASK,
                offset,
            });
        }
        let kind = parse_kind((word & ENVELOPE_KIND_MASK) as u8, offset + 3)?;
        let name = read_method_name(stream)?;
        let seq_id = stream.read_i32()?;
        return Ok(EnvelopeHeader {
            name,
            kind: Some(kind),
            seq_id,
        });
    }

    // Non-strict: the word was the method name length.
    let len = word as usize;
    if len > MAX_METHOD_NAME_LEN {
        return Err(DecodeError::LengthExceedsLimit {
            ttype: Type::Binary,
            len,
            max: MAX_METHOD_NAME_LEN,
            offset,
        });
    }
    let bytes = stream.read_bytes(len, Type::Binary)?;
    let name = String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { offset })?;
    let kind_offset = stream.position();
    let kind = parse_kind(stream.read_u8(Type::I8)?, kind_offset)?;
    let seq_id = stream.read_i32()?;
    Ok(EnvelopeHeader {
        name,
        kind: Some(kind),
        seq_id,
    })
}

fn parse_kind(byte: u8, offset: u64) -> Result<EnvelopeKind, DecodeError> {
    EnvelopeKind::from_u8(byte).ok_or(DecodeError::InvalidEnvelopeKind { kind: byte, offset })
}

fn read_method_name<R: Read>(stream: &mut StreamReader<R>) -> Result<String, DecodeError> {
    let offset = stream.position();
    let len = stream.read_len(Type::Binary, MAX_METHOD_NAME_LEN)?;
    let bytes = stream.read_bytes(len, Type::Binary)?;
    String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { offset })
}

/// Returns true if the next byte starts a strict envelope.
fn peek_envelope<R: Read>(stream: &mut StreamReader<R>) -> Result<bool, DecodeError> {
    Ok(stream.peek_byte(Type::Struct)? & 0x80 != 0)
}

/// Reads a strict envelope header that must be present.
///
/// Fails with [`ProtocolError::MissingEnvelope`] on a bare body and with
/// [`ProtocolError::UnexpectedEnvelopeKind`] when the kind is not one of
/// `expected`.
pub fn read_envelope<R: Read>(
    expected: &[EnvelopeKind],
    stream: &mut StreamReader<R>,
) -> Result<EnvelopeHeader, ProtocolError> {
    if !peek_envelope(stream)? {
        return Err(ProtocolError::MissingEnvelope);
    }
    let header = read_envelope_begin(stream)?;
    check_kind(expected, &header)?;
    Ok(header)
}

fn check_kind(expected: &[EnvelopeKind], header: &EnvelopeHeader) -> Result<(), ProtocolError> {
    if expected.is_empty() {
        return Err(ProtocolError::UnexpectedEnvelope);
    }
    match header.kind {
        Some(kind) if expected.contains(&kind) => Ok(()),
        Some(found) => Err(ProtocolError::UnexpectedEnvelopeKind {
            expected: expected.to_vec(),
            found,
        }),
        None => Err(ProtocolError::MissingEnvelope),
    }
}

fn read_request_header<R: Read>(
    expected: &[EnvelopeKind],
    stream: &mut StreamReader<R>,
) -> Result<(EnvelopeHeader, Responder), ProtocolError> {
    if !peek_envelope(stream)? {
        trace!(offset = stream.position(), "bare request");
        return Ok((EnvelopeHeader::none(), Responder::Bare));
    }
    let header = read_envelope_begin(stream)?;
    check_kind(expected, &header)?;
    debug!(name = %header.name, kind = ?header.kind, seq_id = header.seq_id, "enveloped request");
    let responder = Responder::Enveloped {
        name: header.name.clone(),
        seq_id: header.seq_id,
    };
    Ok((header, responder))
}

/// Reads the start of a request that may or may not be enveloped.
///
/// Returns the envelope header (the "no envelope" sentinel for a bare
/// request), a stream positioned at the first byte of the body, and a
/// [`Responder`] for writing the matching response. An envelope whose kind
/// is not in `expected` is rejected; an empty `expected` rejects every
/// envelope.
pub fn read_request<R: Read>(
    expected: &[EnvelopeKind],
    reader: R,
) -> Result<(EnvelopeHeader, StreamReader<R>, Responder), ProtocolError> {
    let mut stream = StreamReader::new(reader);
    let (header, responder) = read_request_header(expected, &mut stream)?;
    Ok((header, stream, responder))
}

impl Decoder {
    /// Reads the start of a request at `offset` in the decoder's source.
    ///
    /// Like [`read_request`], but returns the offset of the body instead of a
    /// stream, so the body can be decoded with
    /// [`decode_value_at`](Decoder::decode_value_at).
    pub fn read_request_at(
        &self,
        expected: &[EnvelopeKind],
        offset: u64,
    ) -> Result<(EnvelopeHeader, u64, Responder), ProtocolError> {
        let mut stream = self.cursor(offset);
        let (header, responder) = read_request_header(expected, &mut stream)?;
        Ok((header, stream.position(), responder))
    }
}

// =============================================================================
// WRITING
// =============================================================================

/// Writes a strict envelope header.
///
/// The "no envelope" sentinel writes nothing.
pub fn write_envelope_begin<W: Write>(
    writer: &mut StreamWriter<W>,
    header: &EnvelopeHeader,
) -> Result<(), EncodeError> {
    let Some(kind) = header.kind else {
        return Ok(());
    };
    writer.write_i32((VERSION_1 | kind as u32) as i32)?;
    writer.write_string(&header.name)?;
    writer.write_i32(header.seq_id)
}

/// Writes the response side of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Responder {
    /// The request had no envelope; neither does the response.
    Bare,
    /// The request was enveloped; the response echoes its name and sequence ID.
    Enveloped { name: String, seq_id: i32 },
}

impl Responder {
    pub fn is_enveloped(&self) -> bool {
        matches!(self, Responder::Enveloped { .. })
    }

    /// Returns the header a response of the given kind will carry.
    pub fn response_header(&self, kind: EnvelopeKind) -> EnvelopeHeader {
        match self {
            Responder::Bare => EnvelopeHeader::none(),
            Responder::Enveloped { name, seq_id } => EnvelopeHeader::new(name.clone(), kind, *seq_id),
        }
    }

    /// Starts an unframed response of the given kind.
    ///
    /// The kind is ignored for bare responses.
    pub fn write_response<W: Write>(&self, kind: EnvelopeKind, sink: W) -> Result<BodyWriter<W>, EncodeError> {
        self.write_response_framed(kind, sink, Framing::Unframed)
    }

    /// Starts a response of the given kind with the given framing.
    pub fn write_response_framed<W: Write>(
        &self,
        kind: EnvelopeKind,
        sink: W,
        framing: Framing,
    ) -> Result<BodyWriter<W>, EncodeError> {
        begin_message(&self.response_header(kind), sink, framing)
    }
}

/// Starts a message with the given header, returning a writer for its body.
///
/// Pass the "no envelope" sentinel for a bare message.
pub fn begin_message<W: Write>(
    header: &EnvelopeHeader,
    sink: W,
    framing: Framing,
) -> Result<BodyWriter<W>, EncodeError> {
    let mut body = StreamWriter::with_capacity(64);
    write_envelope_begin(&mut body, header)?;
    Ok(BodyWriter {
        body,
        sink: Some(sink),
        framing,
    })
}

/// Writer for a message body.
///
/// The header and body are buffered and written to the sink, with a length
/// prefix when framed, by [`finish`](Self::finish). A writer dropped without
/// `finish` writes its message on drop and discards any error.
#[derive(Debug)]
pub struct BodyWriter<W: Write> {
    body: StreamWriter<Vec<u8>>,
    sink: Option<W>,
    framing: Framing,
}

impl<W: Write> BodyWriter<W> {
    /// Returns the primitive writer for the body.
    pub fn writer(&mut self) -> &mut StreamWriter<Vec<u8>> {
        &mut self.body
    }

    pub fn write_value(&mut self, value: &WireValue) -> Result<(), EncodeError> {
        write_value(&mut self.body, value)
    }

    pub fn write_struct(&mut self, s: &Struct) -> Result<(), EncodeError> {
        write_struct(&mut self.body, s)
    }

    /// Writes the message to the sink, flushes it, and returns it.
    pub fn finish(mut self) -> Result<W, EncodeError> {
        self.flush_to_sink()?
            .ok_or_else(|| EncodeError::Io("message already written".to_string()))
    }

    fn flush_to_sink(&mut self) -> Result<Option<W>, EncodeError> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(None);
        };
        let body = mem::replace(&mut self.body, StreamWriter::buffer()).into_inner();
        if self.framing == Framing::Framed {
            let max = i32::MAX as usize;
            if body.len() > max {
                return Err(EncodeError::LengthExceedsLimit {
                    ttype: Type::Struct,
                    len: body.len(),
                    max,
                });
            }
            let prefix: [u8; FRAME_HEADER_SIZE] = (body.len() as u32).to_be_bytes();
            sink.write_all(&prefix)?;
        }
        sink.write_all(&body)?;
        sink.flush()?;
        trace!(len = body.len(), framing = ?self.framing, "message written");
        Ok(Some(sink))
    }
}

impl<W: Write> Drop for BodyWriter<W> {
    fn drop(&mut self) {
        if self.sink.is_some() {
            let _ = self.flush_to_sink();
        }
    }
}

// =============================================================================
// ONE-SHOT
// =============================================================================

/// Encodes an enveloped message (strict header followed by the value).
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, EncodeError> {
    let mut writer = StreamWriter::with_capacity(64);
    write_envelope_begin(&mut writer, &envelope.header)?;
    write_value(&mut writer, &envelope.value)?;
    Ok(writer.into_inner())
}

/// Decodes an enveloped message whose body is a struct.
///
/// Accepts strict and non-strict headers. Bytes after the body are ignored.
pub fn decode_envelope(input: &[u8]) -> Result<Envelope, DecodeError> {
    let mut stream = StreamReader::new(input);
    let header = read_envelope_begin(&mut stream)?;
    let body = read_struct(&mut stream)?;
    Ok(Envelope {
        header,
        value: WireValue::Struct(body),
    })
}
