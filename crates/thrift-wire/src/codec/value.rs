//! Value encoding/decoding for the Thrift Binary Protocol.
//!
//! Structs are decoded field by field until the stop byte, dispatching on
//! each field's wire type. Containers are either materialized in place or,
//! when reading through a lazy [`Decoder`], skipped over and handed back as
//! lazy views. Both paths share the dispatch below.

use std::io::{Read, Write};

use crate::codec::lazy::{LazyList, LazyMap};
use crate::codec::offset::{DecodeOptions, Decoder};
use crate::codec::primitives::{FieldHeader, ListHeader, MapHeader, StreamReader, StreamWriter};
use crate::error::{DecodeError, EncodeError};
use crate::limits::{MAX_NESTING_DEPTH, MAX_PREALLOC_ELEMENTS};
use crate::model::{Field, MapItem, MapItems, Struct, Type, ValueList, WireValue};

// =============================================================================
// DECODING
// =============================================================================

/// Decodes values from a primitive stream.
///
/// With a decoder attached, containers are returned as lazy views anchored
/// at their offset in the decoder's source.
pub(crate) struct ValueReader<'s, 'd, R> {
    stream: &'s mut StreamReader<R>,
    lazy: Option<&'d Decoder>,
}

impl<'s, 'd, R: Read> ValueReader<'s, 'd, R> {
    pub(crate) fn eager(stream: &'s mut StreamReader<R>) -> Self {
        Self { stream, lazy: None }
    }

    pub(crate) fn lazy(stream: &'s mut StreamReader<R>, decoder: &'d Decoder) -> Self {
        Self {
            stream,
            lazy: Some(decoder),
        }
    }

    pub(crate) fn read_value(&mut self, ttype: Type, depth: usize) -> Result<WireValue, DecodeError> {
        match ttype {
            Type::Bool => self.stream.read_bool().map(WireValue::Bool),
            Type::I8 => self.stream.read_i8().map(WireValue::I8),
            Type::I16 => self.stream.read_i16().map(WireValue::I16),
            Type::I32 => self.stream.read_i32().map(WireValue::I32),
            Type::I64 => self.stream.read_i64().map(WireValue::I64),
            Type::Double => self.stream.read_double().map(WireValue::Double),
            Type::Binary => self.stream.read_binary().map(WireValue::Binary),
            Type::Struct => self.read_struct(depth).map(WireValue::Struct),
            Type::Map => self.read_map(depth).map(WireValue::Map),
            Type::Set => self.read_elements(Type::Set, depth).map(WireValue::Set),
            Type::List => self.read_elements(Type::List, depth).map(WireValue::List),
        }
    }

    pub(crate) fn read_struct(&mut self, depth: usize) -> Result<Struct, DecodeError> {
        self.stream.check_depth(depth)?;
        self.stream.read_struct_begin()?;
        let mut fields = Vec::new();
        while let Some(header) = self.stream.read_field_begin()? {
            let value = self.read_value(header.ttype, depth + 1)?;
            fields.push(Field {
                id: header.id,
                value,
            });
            self.stream.read_field_end()?;
        }
        self.stream.read_struct_end()?;
        Ok(Struct { fields })
    }

    fn read_map(&mut self, depth: usize) -> Result<MapItems, DecodeError> {
        self.stream.check_depth(depth)?;
        let header = self.stream.read_map_begin()?;

        let items = match self.lazy {
            Some(decoder) => {
                let start = self.stream.position();
                for _ in 0..header.len {
                    self.stream.skip_at_depth(header.key_type, depth + 1)?;
                    self.stream.skip_at_depth(header.value_type, depth + 1)?;
                }
                MapItems::Lazy(LazyMap::new(decoder.clone(), header, start, depth + 1))
            }
            None => {
                let mut items = Vec::with_capacity(header.len.min(MAX_PREALLOC_ELEMENTS));
                for _ in 0..header.len {
                    let key = self.read_value(header.key_type, depth + 1)?;
                    let value = self.read_value(header.value_type, depth + 1)?;
                    items.push(MapItem { key, value });
                }
                MapItems::Eager {
                    key_type: header.key_type,
                    value_type: header.value_type,
                    items,
                }
            }
        };

        self.stream.read_map_end()?;
        Ok(items)
    }

    fn read_elements(&mut self, ttype: Type, depth: usize) -> Result<ValueList, DecodeError> {
        self.stream.check_depth(depth)?;
        let header = match ttype {
            Type::Set => self.stream.read_set_begin()?,
            _ => self.stream.read_list_begin()?,
        };

        let list = match self.lazy {
            Some(decoder) => {
                let start = self.stream.position();
                for _ in 0..header.len {
                    self.stream.skip_at_depth(header.value_type, depth + 1)?;
                }
                ValueList::Lazy(LazyList::new(decoder.clone(), header, start, depth + 1))
            }
            None => {
                let mut items = Vec::with_capacity(header.len.min(MAX_PREALLOC_ELEMENTS));
                for _ in 0..header.len {
                    items.push(self.read_value(header.value_type, depth + 1)?);
                }
                ValueList::Eager {
                    value_type: header.value_type,
                    items,
                }
            }
        };

        match ttype {
            Type::Set => self.stream.read_set_end()?,
            _ => self.stream.read_list_end()?,
        }
        Ok(list)
    }
}

/// Reads one value of the given type from a primitive stream.
///
/// Containers are always materialized; lazy views need a random-access
/// [`Decoder`].
pub fn read_value<R: Read>(stream: &mut StreamReader<R>, ttype: Type) -> Result<WireValue, DecodeError> {
    ValueReader::eager(stream).read_value(ttype, 0)
}

/// Reads a struct from a primitive stream.
pub fn read_struct<R: Read>(stream: &mut StreamReader<R>) -> Result<Struct, DecodeError> {
    ValueReader::eager(stream).read_struct(0)
}

/// Decodes one value of the given type from the start of `input`.
///
/// Bytes after the value are ignored.
pub fn decode_value(ttype: Type, input: &[u8]) -> Result<WireValue, DecodeError> {
    let mut stream = StreamReader::new(input);
    read_value(&mut stream, ttype)
}

// =============================================================================
// ENCODING
// =============================================================================

/// Options controlling encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Maximum nesting of structs and containers.
    pub max_depth: usize,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the nesting limit. Match the decoder's limit to re-encode
    /// everything it accepts.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

impl From<DecodeOptions> for EncodeOptions {
    fn from(options: DecodeOptions) -> Self {
        Self {
            max_depth: options.max_depth,
        }
    }
}

/// Writes a value to a primitive stream.
///
/// Container elements must match the container's declared types. On error
/// the stream holds a partial value and should be discarded.
pub fn write_value<W: Write>(writer: &mut StreamWriter<W>, value: &WireValue) -> Result<(), EncodeError> {
    write_value_with_options(writer, value, EncodeOptions::default())
}

/// Writes a value with the given options.
pub fn write_value_with_options<W: Write>(
    writer: &mut StreamWriter<W>,
    value: &WireValue,
    options: EncodeOptions,
) -> Result<(), EncodeError> {
    ValueWriter::new(writer, options).write_value(value, 0)
}

/// Writes a struct's fields, in order, followed by the stop byte.
pub fn write_struct<W: Write>(writer: &mut StreamWriter<W>, s: &Struct) -> Result<(), EncodeError> {
    ValueWriter::new(writer, EncodeOptions::default()).write_struct(s, 0)
}

/// Encodes a value to bytes.
pub fn encode_value(value: &WireValue) -> Result<Vec<u8>, EncodeError> {
    encode_value_with_options(value, EncodeOptions::default())
}

/// Encodes a value to bytes with the given options.
pub fn encode_value_with_options(value: &WireValue, options: EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let mut writer = StreamWriter::with_capacity(64);
    write_value_with_options(&mut writer, value, options)?;
    Ok(writer.into_inner())
}

fn check_element(expected: Type, value: &WireValue) -> Result<(), EncodeError> {
    let found = value.ttype();
    if found != expected {
        return Err(EncodeError::TypeMismatch { expected, found });
    }
    Ok(())
}

/// Encodes values to a primitive stream, bounding nesting depth.
struct ValueWriter<'w, W> {
    writer: &'w mut StreamWriter<W>,
    max_depth: usize,
}

impl<'w, W: Write> ValueWriter<'w, W> {
    fn new(writer: &'w mut StreamWriter<W>, options: EncodeOptions) -> Self {
        Self {
            writer,
            max_depth: options.max_depth,
        }
    }

    fn check_depth(&self, depth: usize) -> Result<(), EncodeError> {
        if depth >= self.max_depth {
            return Err(EncodeError::DepthExceeded { max: self.max_depth });
        }
        Ok(())
    }

    fn write_value(&mut self, value: &WireValue, depth: usize) -> Result<(), EncodeError> {
        match value {
            WireValue::Bool(v) => self.writer.write_bool(*v),
            WireValue::I8(v) => self.writer.write_i8(*v),
            WireValue::I16(v) => self.writer.write_i16(*v),
            WireValue::I32(v) => self.writer.write_i32(*v),
            WireValue::I64(v) => self.writer.write_i64(*v),
            WireValue::Double(v) => self.writer.write_double(*v),
            WireValue::Binary(v) => self.writer.write_binary(v),
            WireValue::Struct(s) => self.write_struct(s, depth),
            WireValue::Map(m) => self.write_map(m, depth),
            WireValue::Set(l) => self.write_elements(Type::Set, l, depth),
            WireValue::List(l) => self.write_elements(Type::List, l, depth),
        }
    }

    fn write_struct(&mut self, s: &Struct, depth: usize) -> Result<(), EncodeError> {
        self.check_depth(depth)?;
        self.writer.write_struct_begin()?;
        for field in &s.fields {
            self.writer.write_field_begin(FieldHeader {
                id: field.id,
                ttype: field.value.ttype(),
            })?;
            self.write_value(&field.value, depth + 1)?;
            self.writer.write_field_end()?;
        }
        self.writer.write_field_stop()?;
        self.writer.write_struct_end()
    }

    fn write_map(&mut self, map: &MapItems, depth: usize) -> Result<(), EncodeError> {
        self.check_depth(depth)?;
        let key_type = map.key_type();
        let value_type = map.value_type();
        let lazy_items;
        let items = match map {
            MapItems::Eager { items, .. } => items,
            MapItems::Lazy(view) => {
                lazy_items = view.to_vec()?;
                &lazy_items
            }
        };

        self.writer.write_map_begin(MapHeader {
            key_type,
            value_type,
            len: items.len(),
        })?;
        for item in items {
            check_element(key_type, &item.key)?;
            check_element(value_type, &item.value)?;
            self.write_value(&item.key, depth + 1)?;
            self.write_value(&item.value, depth + 1)?;
        }
        self.writer.write_map_end()
    }

    fn write_elements(&mut self, ttype: Type, list: &ValueList, depth: usize) -> Result<(), EncodeError> {
        self.check_depth(depth)?;
        let value_type = list.value_type();
        let lazy_items;
        let items = match list {
            ValueList::Eager { items, .. } => items,
            ValueList::Lazy(view) => {
                lazy_items = view.to_vec()?;
                &lazy_items
            }
        };

        let header = ListHeader {
            value_type,
            len: items.len(),
        };
        match ttype {
            Type::Set => self.writer.write_set_begin(header)?,
            _ => self.writer.write_list_begin(header)?,
        }
        for item in items {
            check_element(value_type, item)?;
            self.write_value(item, depth + 1)?;
        }
        match ttype {
            Type::Set => self.writer.write_set_end(),
            _ => self.writer.write_list_end(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::offset::DecodeOptions;
    use crate::model::StructBuilder;

    fn sample() -> Struct {
        StructBuilder::new()
            .bool(1, true)
            .i8(2, -1)
            .i16(3, 300)
            .i32(4, -70000)
            .i64(5, 1 << 40)
            .double(6, 2.5)
            .string(7, "hello")
            .binary(8, vec![0u8, 1, 2])
            .structure(9, |s| s.i32(1, 1).structure(2, |s| s.string(1, "deep")))
            .list(10, Type::Struct, |l| {
                l.structure(StructBuilder::new().i32(1, 10).build())
                    .structure(StructBuilder::new().i32(1, 20).build())
            })
            .set(11, Type::Binary, |l| l.string("b").string("a"))
            .map(
                12,
                Type::Binary,
                Type::List,
                [
                    (WireValue::string("x"), WireValue::list(Type::I64, vec![WireValue::i64(1)])),
                    (WireValue::string("y"), WireValue::list(Type::I64, vec![])),
                ],
            )
            .build()
    }

    #[test]
    fn test_hello_struct_bytes() {
        let s = StructBuilder::new().string(1, "hello").build();
        let bytes = encode_value(&WireValue::Struct(s.clone())).unwrap();
        assert_eq!(
            bytes,
            vec![11, 0, 1, 0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o', 0]
        );

        let decoded = decode_value(Type::Struct, &bytes).unwrap();
        let decoded = decoded.as_struct().unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded.fields[0].id, 1);
        assert_eq!(decoded.fields[0].value, WireValue::string("hello"));
        assert_eq!(decoded, &s);
    }

    #[test]
    fn test_zero_bytes_is_an_error() {
        let err = decode_value(Type::Struct, &[]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedEof {
                ttype: Type::Struct,
                offset: 0
            }
        );
    }

    #[test]
    fn test_empty_struct() {
        let bytes = encode_value(&WireValue::Struct(Struct::new())).unwrap();
        assert_eq!(bytes, vec![0]);
        assert_eq!(
            decode_value(Type::Struct, &bytes).unwrap(),
            WireValue::Struct(Struct::new())
        );
    }

    #[test]
    fn test_roundtrip_preserves_order() {
        let value = WireValue::Struct(sample());
        let bytes = encode_value(&value).unwrap();
        let decoded = decode_value(Type::Struct, &bytes).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(encode_value(&decoded).unwrap(), bytes);
    }

    #[test]
    fn test_lazy_decode_equals_eager() {
        let value = WireValue::Struct(sample());
        let bytes = encode_value(&value).unwrap();
        let decoder = Decoder::new(bytes.clone()).with_options(DecodeOptions::lazy());

        let (lazy, end) = decoder.decode_value_at(Type::Struct, 0).unwrap();
        assert_eq!(end, bytes.len() as u64);
        let s = lazy.as_struct().unwrap();
        assert!(s.get(10).and_then(|v| v.as_list()).unwrap().is_lazy());
        assert!(s.get(12).and_then(|v| v.as_map()).unwrap().is_lazy());
        assert_eq!(lazy, value);
        assert_eq!(encode_value(&lazy).unwrap(), bytes);
    }

    #[test]
    fn test_encode_rejects_mismatched_elements() {
        let value = WireValue::list(Type::I32, vec![WireValue::i32(1), WireValue::i64(2)]);
        assert_eq!(
            encode_value(&value),
            Err(EncodeError::TypeMismatch {
                expected: Type::I32,
                found: Type::I64
            })
        );

        let map = WireValue::map(
            Type::Binary,
            Type::Bool,
            vec![MapItem::new(WireValue::string("k"), WireValue::i8(1))],
        );
        assert!(matches!(
            encode_value(&map),
            Err(EncodeError::TypeMismatch { expected: Type::Bool, found: Type::I8 })
        ));
    }

    #[test]
    fn test_unknown_field_type_reports_offset() {
        // field 1: i32 = 7, then a field with tag 0x05
        let bytes = [8, 0, 1, 0, 0, 0, 7, 5, 0, 2];
        assert_eq!(
            decode_value(Type::Struct, &bytes),
            Err(DecodeError::UnknownType { tag: 5, offset: 7 })
        );
    }

    #[test]
    fn test_depth_guard() {
        // list<list<list<...>>> nested 100 deep
        let mut bytes = Vec::new();
        for _ in 0..100 {
            bytes.extend_from_slice(&[15, 0, 0, 0, 1]);
        }
        bytes.extend_from_slice(&[15, 0, 0, 0, 0]);
        assert!(matches!(
            decode_value(Type::List, &bytes),
            Err(DecodeError::DepthExceeded { max: MAX_NESTING_DEPTH, .. })
        ));

        let decoder = Decoder::new(bytes).with_options(DecodeOptions::lazy());
        assert!(matches!(
            decoder.decode_value_at(Type::List, 0),
            Err(DecodeError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn test_huge_declared_length_fails_without_allocating() {
        // list<i64> claiming 16M elements with no payload
        let bytes = [10, 0, 0xff, 0xff, 0xff];
        assert!(decode_value(Type::List, &bytes).unwrap_err().is_eof());
    }

    #[test]
    fn test_encode_depth_guard() {
        let mut value = WireValue::Struct(Struct::new());
        for _ in 0..MAX_NESTING_DEPTH {
            let mut s = Struct::new();
            s.push(1, value);
            value = WireValue::Struct(s);
        }
        assert_eq!(
            encode_value(&value),
            Err(EncodeError::DepthExceeded {
                max: MAX_NESTING_DEPTH
            })
        );
    }

    fn nested_structs(levels: usize) -> WireValue {
        let mut value = WireValue::Struct(StructBuilder::new().i32(1, 7).build());
        for _ in 0..levels {
            let mut s = Struct::new();
            s.push(1, value);
            value = WireValue::Struct(s);
        }
        value
    }

    #[test]
    fn test_encode_honors_decode_depth_limit() {
        let value = nested_structs(70);
        assert_eq!(
            encode_value(&value),
            Err(EncodeError::DepthExceeded {
                max: MAX_NESTING_DEPTH
            })
        );

        let options = EncodeOptions::new().with_max_depth(128);
        let bytes = encode_value_with_options(&value, options).unwrap();

        let decoder = Decoder::new(bytes.clone()).with_options(DecodeOptions::new().with_max_depth(128));
        let (decoded, end) = decoder.decode_value_at(Type::Struct, 0).unwrap();
        assert_eq!(end, bytes.len() as u64);
        assert_eq!(decoded, value);

        let decode_options = DecodeOptions::new().with_max_depth(128);
        let reencoded = encode_value_with_options(&decoded, decode_options.into()).unwrap();
        assert_eq!(reencoded, bytes);
    }

    #[test]
    fn test_write_value_with_lower_limit() {
        let value = nested_structs(3);
        let mut writer = StreamWriter::new(Vec::new());
        assert_eq!(
            write_value_with_options(&mut writer, &value, EncodeOptions::new().with_max_depth(3)),
            Err(EncodeError::DepthExceeded { max: 3 })
        );

        let mut writer = StreamWriter::new(Vec::new());
        write_value_with_options(&mut writer, &value, EncodeOptions::new().with_max_depth(4)).unwrap();
        assert_eq!(writer.into_inner(), encode_value(&value).unwrap());
    }
}
