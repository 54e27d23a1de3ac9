//! Primitive encoding/decoding for the Thrift Binary Protocol.
//!
//! Implements fixed-width big-endian integers, doubles, length-prefixed
//! binaries, and the struct/field/container markers. Both halves are strictly
//! forward-only; the reader has a single byte of lookahead for envelope
//! detection.

use std::io::{self, Read, Write};

use crate::error::{DecodeError, EncodeError};
use crate::limits::{MAX_BINARY_LEN, MAX_CONTAINER_LEN, MAX_NESTING_DEPTH};
use crate::model::Type;

/// Header of a struct field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    pub id: i16,
    pub ttype: Type,
}

/// Header of a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    pub key_type: Type,
    pub value_type: Type,
    pub len: usize,
}

impl MapHeader {
    /// Checks the declared key and value types against what the caller expects.
    pub fn expect(&self, key_type: Type, value_type: Type, offset: u64) -> Result<(), DecodeError> {
        if self.len == 0 {
            return Ok(());
        }
        expect_type(key_type, self.key_type, offset)?;
        expect_type(value_type, self.value_type, offset)
    }
}

/// Header of a set or list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeader {
    pub value_type: Type,
    pub len: usize,
}

impl ListHeader {
    /// Checks the declared element type against what the caller expects.
    ///
    /// Empty containers match any element type.
    pub fn expect(&self, value_type: Type, offset: u64) -> Result<(), DecodeError> {
        if self.len == 0 {
            return Ok(());
        }
        expect_type(value_type, self.value_type, offset)
    }
}

fn expect_type(expected: Type, found: Type, offset: u64) -> Result<(), DecodeError> {
    if expected != found {
        return Err(DecodeError::TypeMismatch {
            expected,
            found,
            offset,
        });
    }
    Ok(())
}

// =============================================================================
// DECODING
// =============================================================================

/// Sequential reader for binary protocol primitives.
///
/// Wraps any [`Read`] and tracks the absolute offset of the next byte so that
/// errors can report where they happened.
#[derive(Debug)]
pub struct StreamReader<R> {
    inner: R,
    pos: u64,
    peeked: Option<u8>,
    max_depth: usize,
}

impl<R: Read> StreamReader<R> {
    /// Creates a reader whose first byte is at offset 0.
    pub fn new(inner: R) -> Self {
        Self::at(inner, 0)
    }

    /// Creates a reader whose first byte is at the given absolute offset.
    pub fn at(inner: R, offset: u64) -> Self {
        Self {
            inner,
            pos: offset,
            peeked: None,
            max_depth: MAX_NESTING_DEPTH,
        }
    }

    /// Sets the nesting limit used by [`skip`](Self::skip).
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Returns the absolute offset of the next unread byte.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Returns the underlying reader.
    ///
    /// A peeked byte that was not consumed is lost.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Returns the next byte without consuming it.
    pub fn peek_byte(&mut self, ttype: Type) -> Result<u8, DecodeError> {
        if let Some(b) = self.peeked {
            return Ok(b);
        }
        let mut buf = [0u8; 1];
        let pos = self.pos;
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| io_to_decode(e, ttype, pos))?;
        self.peeked = Some(buf[0]);
        Ok(buf[0])
    }

    #[inline]
    fn fill(&mut self, buf: &mut [u8], ttype: Type) -> Result<(), DecodeError> {
        if buf.is_empty() {
            return Ok(());
        }
        let mut start = 0;
        if let Some(b) = self.peeked.take() {
            buf[0] = b;
            start = 1;
        }
        let pos = self.pos + start as u64;
        self.inner
            .read_exact(&mut buf[start..])
            .map_err(|e| io_to_decode(e, ttype, pos))?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    #[inline]
    fn read_array<const N: usize>(&mut self, ttype: Type) -> Result<[u8; N], DecodeError> {
        let mut buf = [0u8; N];
        self.fill(&mut buf, ttype)?;
        Ok(buf)
    }

    /// Reads and discards `n` bytes.
    fn discard(&mut self, n: u64, ttype: Type) -> Result<(), DecodeError> {
        let mut remaining = n;
        if remaining > 0 && self.peeked.take().is_some() {
            self.pos += 1;
            remaining -= 1;
        }
        let pos = self.pos;
        let copied = io::copy(&mut (&mut self.inner).take(remaining), &mut io::sink())
            .map_err(|e| io_to_decode(e, ttype, pos))?;
        self.pos += copied;
        if copied < remaining {
            return Err(DecodeError::UnexpectedEof {
                ttype,
                offset: self.pos,
            });
        }
        Ok(())
    }

    fn read_type(&mut self, context: Type) -> Result<Type, DecodeError> {
        let offset = self.pos;
        let [tag] = self.read_array::<1>(context)?;
        Type::from_u8(tag).ok_or(DecodeError::UnknownType { tag, offset })
    }

    pub(crate) fn read_len(&mut self, ttype: Type, max: usize) -> Result<usize, DecodeError> {
        let offset = self.pos;
        let len = self.read_i32_as(ttype)?;
        if len < 0 {
            return Err(DecodeError::NegativeLength { ttype, len, offset });
        }
        let len = len as usize;
        if len > max {
            return Err(DecodeError::LengthExceedsLimit {
                ttype,
                len,
                max,
                offset,
            });
        }
        Ok(len)
    }

    fn read_i32_as(&mut self, ttype: Type) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_array(ttype)?))
    }

    /// Reads a bool (one byte, 0 or 1).
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        let offset = self.pos;
        let [byte] = self.read_array::<1>(Type::Bool)?;
        match byte {
            0x00 => Ok(false),
            0x01 => Ok(true),
            _ => Err(DecodeError::InvalidBool { value: byte, offset }),
        }
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(i8::from_be_bytes(self.read_array(Type::I8)?))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.read_array(Type::I16)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.read_i32_as(Type::I32)
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.read_array(Type::I64)?))
    }

    /// Reads a big-endian IEEE 754 double.
    pub fn read_double(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(u64::from_be_bytes(self.read_array(Type::Double)?)))
    }

    /// Reads a length-prefixed byte array.
    ///
    /// Allocation grows with the bytes actually read, so a bogus length on a
    /// short input fails without reserving the declared size.
    pub fn read_binary(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_len(Type::Binary, MAX_BINARY_LEN)?;
        self.read_bytes(len, Type::Binary)
    }

    /// Reads exactly `len` raw bytes.
    pub(crate) fn read_bytes(&mut self, len: usize, ttype: Type) -> Result<Vec<u8>, DecodeError> {
        let mut buf = Vec::with_capacity(len.min(4096));
        let mut remaining = len as u64;
        if remaining > 0 {
            if let Some(b) = self.peeked.take() {
                buf.push(b);
                remaining -= 1;
            }
        }
        let start = self.pos;
        (&mut self.inner)
            .take(remaining)
            .read_to_end(&mut buf)
            .map_err(|e| io_to_decode(e, ttype, start))?;
        self.pos += buf.len() as u64;
        if buf.len() < len {
            return Err(DecodeError::UnexpectedEof {
                ttype,
                offset: self.pos,
            });
        }
        Ok(buf)
    }

    /// Reads a single raw byte.
    pub(crate) fn read_u8(&mut self, ttype: Type) -> Result<u8, DecodeError> {
        let [byte] = self.read_array::<1>(ttype)?;
        Ok(byte)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let offset = self.pos;
        let bytes = self.read_binary()?;
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { offset })
    }

    pub fn read_struct_begin(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }

    pub fn read_struct_end(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }

    /// Reads a field header, or `None` at the struct-end stop byte.
    pub fn read_field_begin(&mut self) -> Result<Option<FieldHeader>, DecodeError> {
        let offset = self.pos;
        let [tag] = self.read_array::<1>(Type::Struct)?;
        if tag == 0 {
            return Ok(None);
        }
        let ttype = Type::from_u8(tag).ok_or(DecodeError::UnknownType { tag, offset })?;
        let id = i16::from_be_bytes(self.read_array(Type::Struct)?);
        Ok(Some(FieldHeader { id, ttype }))
    }

    pub fn read_field_end(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }

    pub fn read_map_begin(&mut self) -> Result<MapHeader, DecodeError> {
        let key_type = self.read_type(Type::Map)?;
        let value_type = self.read_type(Type::Map)?;
        let len = self.read_len(Type::Map, MAX_CONTAINER_LEN)?;
        Ok(MapHeader {
            key_type,
            value_type,
            len,
        })
    }

    pub fn read_map_end(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }

    pub fn read_set_begin(&mut self) -> Result<ListHeader, DecodeError> {
        self.read_elements_header(Type::Set)
    }

    pub fn read_set_end(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }

    pub fn read_list_begin(&mut self) -> Result<ListHeader, DecodeError> {
        self.read_elements_header(Type::List)
    }

    pub fn read_list_end(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }

    pub(crate) fn read_elements_header(&mut self, ttype: Type) -> Result<ListHeader, DecodeError> {
        let value_type = self.read_type(ttype)?;
        let len = self.read_len(ttype, MAX_CONTAINER_LEN)?;
        Ok(ListHeader { value_type, len })
    }

    /// Consumes one value of the given type without materializing it.
    ///
    /// Nested structs and containers are skipped through the same
    /// begin/skip/end protocol used to read them.
    pub fn skip(&mut self, ttype: Type) -> Result<(), DecodeError> {
        self.skip_at_depth(ttype, 0)
    }

    pub(crate) fn skip_at_depth(&mut self, ttype: Type, depth: usize) -> Result<(), DecodeError> {
        match ttype {
            Type::Bool | Type::I8 | Type::I16 | Type::I32 | Type::I64 | Type::Double => {
                let width = ttype.fixed_width().unwrap_or(0);
                self.discard(width as u64, ttype)
            }
            Type::Binary => {
                let len = self.read_len(Type::Binary, MAX_BINARY_LEN)?;
                self.discard(len as u64, Type::Binary)
            }
            Type::Struct => {
                self.check_depth(depth)?;
                self.read_struct_begin()?;
                while let Some(header) = self.read_field_begin()? {
                    self.skip_at_depth(header.ttype, depth + 1)?;
                    self.read_field_end()?;
                }
                self.read_struct_end()
            }
            Type::Map => {
                self.check_depth(depth)?;
                let header = self.read_map_begin()?;
                for _ in 0..header.len {
                    self.skip_at_depth(header.key_type, depth + 1)?;
                    self.skip_at_depth(header.value_type, depth + 1)?;
                }
                self.read_map_end()
            }
            Type::Set | Type::List => {
                self.check_depth(depth)?;
                let header = self.read_elements_header(ttype)?;
                for _ in 0..header.len {
                    self.skip_at_depth(header.value_type, depth + 1)?;
                }
                Ok(())
            }
        }
    }

    pub(crate) fn check_depth(&self, depth: usize) -> Result<(), DecodeError> {
        if depth >= self.max_depth {
            return Err(DecodeError::DepthExceeded {
                max: self.max_depth,
                offset: self.pos,
            });
        }
        Ok(())
    }
}

fn io_to_decode(err: io::Error, ttype: Type, offset: u64) -> DecodeError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        DecodeError::UnexpectedEof { ttype, offset }
    } else {
        DecodeError::Io {
            ttype,
            offset,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Sequential writer for binary protocol primitives.
#[derive(Debug, Clone, Default)]
pub struct StreamWriter<W> {
    inner: W,
    written: u64,
}

impl StreamWriter<Vec<u8>> {
    /// Creates a writer backed by a growable buffer.
    pub fn buffer() -> Self {
        Self::new(Vec::new())
    }

    /// Creates a writer backed by a buffer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(Vec::with_capacity(capacity))
    }

    /// Returns a reference to the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Returns the number of bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    #[inline]
    fn put(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn put_len(&mut self, ttype: Type, len: usize) -> Result<(), EncodeError> {
        let max = i32::MAX as usize;
        if len > max {
            return Err(EncodeError::LengthExceedsLimit { ttype, len, max });
        }
        self.put(&(len as i32).to_be_bytes())
    }

    pub fn write_bool(&mut self, v: bool) -> Result<(), EncodeError> {
        self.put(&[v as u8])
    }

    pub fn write_i8(&mut self, v: i8) -> Result<(), EncodeError> {
        self.put(&v.to_be_bytes())
    }

    pub fn write_i16(&mut self, v: i16) -> Result<(), EncodeError> {
        self.put(&v.to_be_bytes())
    }

    pub fn write_i32(&mut self, v: i32) -> Result<(), EncodeError> {
        self.put(&v.to_be_bytes())
    }

    pub fn write_i64(&mut self, v: i64) -> Result<(), EncodeError> {
        self.put(&v.to_be_bytes())
    }

    pub fn write_double(&mut self, v: f64) -> Result<(), EncodeError> {
        self.put(&v.to_bits().to_be_bytes())
    }

    /// Writes a length-prefixed byte array.
    pub fn write_binary(&mut self, v: &[u8]) -> Result<(), EncodeError> {
        self.put_len(Type::Binary, v.len())?;
        self.put(v)
    }

    pub fn write_string(&mut self, v: &str) -> Result<(), EncodeError> {
        self.write_binary(v.as_bytes())
    }

    pub fn write_struct_begin(&mut self) -> Result<(), EncodeError> {
        Ok(())
    }

    pub fn write_struct_end(&mut self) -> Result<(), EncodeError> {
        Ok(())
    }

    pub fn write_field_begin(&mut self, header: FieldHeader) -> Result<(), EncodeError> {
        self.put(&[header.ttype as u8])?;
        self.write_i16(header.id)
    }

    pub fn write_field_end(&mut self) -> Result<(), EncodeError> {
        Ok(())
    }

    /// Writes the stop byte terminating a struct's fields.
    pub fn write_field_stop(&mut self) -> Result<(), EncodeError> {
        self.put(&[0])
    }

    pub fn write_map_begin(&mut self, header: MapHeader) -> Result<(), EncodeError> {
        self.put(&[header.key_type as u8, header.value_type as u8])?;
        self.put_len(Type::Map, header.len)
    }

    pub fn write_map_end(&mut self) -> Result<(), EncodeError> {
        Ok(())
    }

    pub fn write_set_begin(&mut self, header: ListHeader) -> Result<(), EncodeError> {
        self.put(&[header.value_type as u8])?;
        self.put_len(Type::Set, header.len)
    }

    pub fn write_set_end(&mut self) -> Result<(), EncodeError> {
        Ok(())
    }

    pub fn write_list_begin(&mut self, header: ListHeader) -> Result<(), EncodeError> {
        self.put(&[header.value_type as u8])?;
        self.put_len(Type::List, header.len)
    }

    pub fn write_list_end(&mut self) -> Result<(), EncodeError> {
        Ok(())
    }

    /// Writes raw bytes with no framing.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.put(bytes)
    }

    pub fn flush(&mut self) -> Result<(), EncodeError> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> StreamWriter<Vec<u8>> {
        StreamWriter::buffer()
    }

    #[test]
    fn test_integers_are_big_endian() {
        let mut w = writer();
        w.write_i16(0x0102).unwrap();
        w.write_i32(-2).unwrap();
        w.write_i64(1).unwrap();
        assert_eq!(
            w.as_bytes(),
            &[0x01, 0x02, 0xff, 0xff, 0xff, 0xfe, 0, 0, 0, 0, 0, 0, 0, 1]
        );

        let mut r = StreamReader::new(w.as_bytes());
        assert_eq!(r.read_i16().unwrap(), 0x0102);
        assert_eq!(r.read_i32().unwrap(), -2);
        assert_eq!(r.read_i64().unwrap(), 1);
        assert_eq!(r.position(), 14);
    }

    #[test]
    fn test_double_bits() {
        let mut w = writer();
        w.write_double(1.0).unwrap();
        assert_eq!(w.as_bytes(), &[0x3f, 0xf0, 0, 0, 0, 0, 0, 0]);
        let mut r = StreamReader::new(w.as_bytes());
        assert_eq!(r.read_double().unwrap(), 1.0);
    }

    #[test]
    fn test_string_roundtrip() {
        for s in ["", "hello", "unicode: \u{1F600}"] {
            let mut w = writer();
            w.write_string(s).unwrap();
            let mut r = StreamReader::new(w.as_bytes());
            assert_eq!(r.read_string().unwrap(), s);
        }
    }

    #[test]
    fn test_invalid_bool() {
        let mut r = StreamReader::new(&[0x02u8][..]);
        assert_eq!(
            r.read_bool(),
            Err(DecodeError::InvalidBool { value: 2, offset: 0 })
        );
    }

    #[test]
    fn test_invalid_utf8() {
        let data = [0, 0, 0, 2, 0xc3, 0x28];
        let mut r = StreamReader::new(&data[..]);
        assert_eq!(r.read_string(), Err(DecodeError::InvalidUtf8 { offset: 0 }));
    }

    #[test]
    fn test_negative_binary_length() {
        let data = (-1i32).to_be_bytes();
        let mut r = StreamReader::new(&data[..]);
        assert!(matches!(
            r.read_binary(),
            Err(DecodeError::NegativeLength { ttype: Type::Binary, len: -1, offset: 0 })
        ));
    }

    #[test]
    fn test_truncated_binary_reports_offset() {
        let data = [0, 0, 0, 10, b'a', b'b'];
        let mut r = StreamReader::at(&data[..], 100);
        assert_eq!(
            r.read_binary(),
            Err(DecodeError::UnexpectedEof {
                ttype: Type::Binary,
                offset: 106
            })
        );
    }

    #[test]
    fn test_field_begin_and_stop() {
        let mut w = writer();
        w.write_field_begin(FieldHeader { id: 7, ttype: Type::I32 }).unwrap();
        w.write_i32(5).unwrap();
        w.write_field_stop().unwrap();

        let mut r = StreamReader::new(w.as_bytes());
        assert_eq!(
            r.read_field_begin().unwrap(),
            Some(FieldHeader { id: 7, ttype: Type::I32 })
        );
        assert_eq!(r.read_i32().unwrap(), 5);
        assert_eq!(r.read_field_begin().unwrap(), None);
    }

    #[test]
    fn test_unknown_field_type() {
        let data = [0x09, 0, 1];
        let mut r = StreamReader::new(&data[..]);
        assert_eq!(
            r.read_field_begin(),
            Err(DecodeError::UnknownType { tag: 9, offset: 0 })
        );
    }

    #[test]
    fn test_container_headers() {
        let mut w = writer();
        w.write_map_begin(MapHeader {
            key_type: Type::Binary,
            value_type: Type::I64,
            len: 3,
        })
        .unwrap();
        w.write_list_begin(ListHeader { value_type: Type::Struct, len: 2 }).unwrap();
        assert_eq!(w.as_bytes(), &[11, 10, 0, 0, 0, 3, 12, 0, 0, 0, 2]);

        let mut r = StreamReader::new(w.as_bytes());
        let map = r.read_map_begin().unwrap();
        assert_eq!(map.len, 3);
        assert!(map.expect(Type::Binary, Type::I64, 0).is_ok());
        assert!(matches!(
            map.expect(Type::Binary, Type::I32, 0),
            Err(DecodeError::TypeMismatch { expected: Type::I32, found: Type::I64, .. })
        ));
        let list = r.read_list_begin().unwrap();
        assert_eq!(list, ListHeader { value_type: Type::Struct, len: 2 });
    }

    #[test]
    fn test_empty_container_matches_any_type() {
        let header = ListHeader { value_type: Type::Bool, len: 0 };
        assert!(header.expect(Type::Binary, 0).is_ok());
    }

    #[test]
    fn test_skip_nested_lands_on_next_value() {
        let mut w = writer();
        // struct { 1: list<struct{1: binary}> [ {1: "ab"} ], 2: map<i8, i16>{1: 2} }
        w.write_field_begin(FieldHeader { id: 1, ttype: Type::List }).unwrap();
        w.write_list_begin(ListHeader { value_type: Type::Struct, len: 1 }).unwrap();
        w.write_field_begin(FieldHeader { id: 1, ttype: Type::Binary }).unwrap();
        w.write_binary(b"ab").unwrap();
        w.write_field_stop().unwrap();
        w.write_field_begin(FieldHeader { id: 2, ttype: Type::Map }).unwrap();
        w.write_map_begin(MapHeader {
            key_type: Type::I8,
            value_type: Type::I16,
            len: 1,
        })
        .unwrap();
        w.write_i8(1).unwrap();
        w.write_i16(2).unwrap();
        w.write_field_stop().unwrap();
        let end = w.bytes_written();
        w.write_i32(0x7777).unwrap();

        let mut r = StreamReader::new(w.as_bytes());
        r.skip(Type::Struct).unwrap();
        assert_eq!(r.position(), end);
        assert_eq!(r.read_i32().unwrap(), 0x7777);
    }

    #[test]
    fn test_skip_truncated() {
        let data = [0, 0, 0, 5, 1, 2];
        let mut r = StreamReader::new(&data[..]);
        assert!(r.skip(Type::Binary).unwrap_err().is_eof());
    }

    #[test]
    fn test_skip_depth_limit() {
        // 3 nested lists of lists
        let data = [15, 0, 0, 0, 1, 15, 0, 0, 0, 1, 15, 0, 0, 0, 0];
        let mut r = StreamReader::new(&data[..]).with_max_depth(2);
        assert!(matches!(
            r.skip(Type::List),
            Err(DecodeError::DepthExceeded { max: 2, .. })
        ));

        let mut r = StreamReader::new(&data[..]).with_max_depth(3);
        r.skip(Type::List).unwrap();
        assert_eq!(r.position(), data.len() as u64);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let data = [0x80, 0x01];
        let mut r = StreamReader::new(&data[..]);
        assert_eq!(r.peek_byte(Type::Struct).unwrap(), 0x80);
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_i16().unwrap(), i16::from_be_bytes([0x80, 0x01]));
        assert_eq!(r.position(), 2);
    }

    #[test]
    fn test_io_error_surfaces() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::TimedOut, "deadline"))
            }
        }
        let mut r = StreamReader::new(Failing);
        assert!(matches!(
            r.read_i64(),
            Err(DecodeError::Io { ttype: Type::I64, offset: 0, .. })
        ));
    }
}
