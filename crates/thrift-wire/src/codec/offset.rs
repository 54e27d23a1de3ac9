//! Offset-addressable decoding over random-access byte sources.
//!
//! A [`Decoder`] never keeps a cursor of its own. Every call builds a private
//! [`OffsetReader`] pinned to the requested offset, so decodes started from
//! different places (an outer struct decode and any number of lazy views
//! created by it) never move each other's position.

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use crate::codec::primitives::StreamReader;
use crate::codec::value::ValueReader;
use crate::error::DecodeError;
use crate::limits::MAX_NESTING_DEPTH;
use crate::model::{Type, WireValue};

/// A byte source that supports reads at arbitrary positions.
///
/// Reads past the end return `Ok(0)`. Implementations must not have a shared
/// cursor: concurrent `read_at` calls at different offsets are independent.
pub trait ReadAt {
    /// Reads up to `buf.len()` bytes starting at `offset`.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

impl ReadAt for [u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= self.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.as_slice().read_at(buf, offset)
    }
}

impl ReadAt for Box<[u8]> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

impl ReadAt for Arc<[u8]> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

#[cfg(unix)]
impl ReadAt for std::fs::File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }
}

/// Sequential [`Read`] view over a [`ReadAt`] source with its own offset.
pub struct OffsetReader<'a> {
    source: &'a (dyn ReadAt + Send + Sync),
    offset: u64,
}

impl<'a> OffsetReader<'a> {
    pub fn new(source: &'a (dyn ReadAt + Send + Sync), offset: u64) -> Self {
        Self { source, offset }
    }

    /// Returns the offset of the next byte this reader will return.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl Read for OffsetReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.source.read_at(buf, self.offset)?;
        self.offset += n as u64;
        Ok(n)
    }
}

/// Container materialization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Decode every container element up front.
    #[default]
    Eager,
    /// Validate container spans, then decode elements on demand.
    Lazy,
}

/// Options controlling decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    pub mode: DecodeMode,
    /// Maximum nesting of structs and containers.
    pub max_depth: usize,
}

impl DecodeOptions {
    /// Creates default (eager) decoding options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates lazy decoding options.
    pub fn lazy() -> Self {
        Self {
            mode: DecodeMode::Lazy,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            mode: DecodeMode::Eager,
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

/// Decoder for the binary protocol over a shared random-access source.
///
/// Cloning is cheap and shares the source. The source bytes must not change
/// while any decoded lazy view over them is alive.
#[derive(Clone)]
pub struct Decoder {
    source: Arc<dyn ReadAt + Send + Sync>,
    options: DecodeOptions,
}

impl Decoder {
    /// Creates an eager decoder over the given source.
    pub fn new<S>(source: S) -> Self
    where
        S: ReadAt + Send + Sync + 'static,
    {
        Self::from_shared(Arc::new(source))
    }

    /// Creates an eager decoder over an already shared source.
    pub fn from_shared(source: Arc<dyn ReadAt + Send + Sync>) -> Self {
        Self {
            source,
            options: DecodeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Switches container materialization to the given mode.
    pub fn with_mode(mut self, mode: DecodeMode) -> Self {
        self.options.mode = mode;
        self
    }

    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Returns true if both decoders read from the same source.
    pub fn shares_source(&self, other: &Decoder) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
    }

    /// Decodes one value of the given type starting at `offset`.
    ///
    /// Returns the value and the offset just past it.
    pub fn decode_value_at(&self, ttype: Type, offset: u64) -> Result<(WireValue, u64), DecodeError> {
        self.decode_at_depth(ttype, offset, 0)
    }

    /// Skips one value of the given type starting at `offset`.
    ///
    /// Returns the offset just past the value.
    pub fn skip_at(&self, ttype: Type, offset: u64) -> Result<u64, DecodeError> {
        let mut stream = self.cursor(offset);
        stream.skip(ttype)?;
        Ok(stream.position())
    }

    pub(crate) fn decode_at_depth(
        &self,
        ttype: Type,
        offset: u64,
        depth: usize,
    ) -> Result<(WireValue, u64), DecodeError> {
        let mut stream = self.cursor(offset);
        let value = {
            let mut reader = match self.options.mode {
                DecodeMode::Eager => ValueReader::eager(&mut stream),
                DecodeMode::Lazy => ValueReader::lazy(&mut stream, self),
            };
            reader.read_value(ttype, depth)?
        };
        Ok((value, stream.position()))
    }

    /// Returns a fresh primitive cursor positioned at `offset`.
    pub fn cursor(&self, offset: u64) -> StreamReader<OffsetReader<'_>> {
        StreamReader::at(OffsetReader::new(&*self.source, offset), offset)
            .with_max_depth(self.options.max_depth)
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::primitives::StreamWriter;

    #[test]
    fn test_slice_read_at() {
        let data = [1u8, 2, 3, 4, 5];
        let mut buf = [0u8; 3];
        assert_eq!(data[..].read_at(&mut buf, 3).unwrap(), 2);
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(data[..].read_at(&mut buf, 5).unwrap(), 0);
        assert_eq!(data[..].read_at(&mut buf, u64::MAX).unwrap(), 0);
    }

    #[test]
    fn test_cursors_are_independent() {
        let mut w = StreamWriter::buffer();
        for v in 0..4 {
            w.write_i32(v).unwrap();
        }
        let decoder = Decoder::new(w.into_inner());

        let mut a = decoder.cursor(0);
        let mut b = decoder.cursor(8);
        assert_eq!(a.read_i32().unwrap(), 0);
        assert_eq!(b.read_i32().unwrap(), 2);
        assert_eq!(a.read_i32().unwrap(), 1);
        assert_eq!(b.read_i32().unwrap(), 3);
        assert_eq!(a.position(), 8);
        assert_eq!(b.position(), 16);
    }

    #[test]
    fn test_decode_value_at_returns_next_offset() {
        let mut w = StreamWriter::buffer();
        w.write_i64(-5).unwrap();
        w.write_string("hi").unwrap();
        let decoder = Decoder::new(w.into_inner());

        let (v, off) = decoder.decode_value_at(Type::I64, 0).unwrap();
        assert_eq!(v, WireValue::I64(-5));
        assert_eq!(off, 8);
        let (v, off) = decoder.decode_value_at(Type::Binary, off).unwrap();
        assert_eq!(v.as_str(), Some("hi"));
        assert_eq!(off, 14);

        assert_eq!(decoder.skip_at(Type::I64, 0).unwrap(), 8);
    }

    #[test]
    fn test_decode_past_end() {
        let decoder = Decoder::new(vec![0u8; 2]);
        assert_eq!(
            decoder.decode_value_at(Type::I32, 0),
            Err(DecodeError::UnexpectedEof { ttype: Type::I32, offset: 0 })
        );
        assert!(decoder.decode_value_at(Type::Bool, 10).unwrap_err().is_eof());
    }

    #[test]
    fn test_decoder_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Decoder>();
        assert_send_sync::<WireValue>();
    }
}
