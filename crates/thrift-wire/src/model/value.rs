//! Wire value types for the Thrift Binary Protocol.
//!
//! A [`WireValue`] is the decoded, type-tagged form of any protocol datum.
//! Containers come in two representations that share one read contract:
//! eagerly materialized vectors and lazy views over the source bytes.

use std::fmt;

use crate::codec::lazy::{LazyList, LazyMap};
use crate::error::MaterializeError;

/// Wire type tags (one byte on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Type {
    Bool = 2,
    I8 = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    Binary = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
}

impl Type {
    /// Creates a Type from its wire representation.
    ///
    /// Returns `None` for unknown tags, including the stop byte `0`.
    pub fn from_u8(v: u8) -> Option<Type> {
        match v {
            2 => Some(Type::Bool),
            3 => Some(Type::I8),
            4 => Some(Type::Double),
            6 => Some(Type::I16),
            8 => Some(Type::I32),
            10 => Some(Type::I64),
            11 => Some(Type::Binary),
            12 => Some(Type::Struct),
            13 => Some(Type::Map),
            14 => Some(Type::Set),
            15 => Some(Type::List),
            _ => None,
        }
    }

    /// Returns the encoded width for fixed-size types.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Type::Bool | Type::I8 => Some(1),
            Type::I16 => Some(2),
            Type::I32 => Some(4),
            Type::I64 | Type::Double => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Bool => "bool",
            Type::I8 => "i8",
            Type::Double => "double",
            Type::I16 => "i16",
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::Binary => "binary",
            Type::Struct => "struct",
            Type::Map => "map",
            Type::Set => "set",
            Type::List => "list",
        };
        f.write_str(name)
    }
}

/// A decoded (or about-to-be-encoded) protocol value.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    /// Raw bytes. Strings are binary values holding UTF-8.
    Binary(Vec<u8>),
    Struct(Struct),
    Map(MapItems),
    Set(ValueList),
    List(ValueList),
}

impl WireValue {
    pub fn bool(v: bool) -> Self {
        WireValue::Bool(v)
    }

    pub fn i8(v: i8) -> Self {
        WireValue::I8(v)
    }

    pub fn i16(v: i16) -> Self {
        WireValue::I16(v)
    }

    pub fn i32(v: i32) -> Self {
        WireValue::I32(v)
    }

    pub fn i64(v: i64) -> Self {
        WireValue::I64(v)
    }

    pub fn double(v: f64) -> Self {
        WireValue::Double(v)
    }

    pub fn binary(v: impl Into<Vec<u8>>) -> Self {
        WireValue::Binary(v.into())
    }

    /// Creates a binary value from a string.
    pub fn string(v: impl Into<String>) -> Self {
        WireValue::Binary(v.into().into_bytes())
    }

    pub fn structure(s: Struct) -> Self {
        WireValue::Struct(s)
    }

    /// Creates an eager list value.
    pub fn list(value_type: Type, items: Vec<WireValue>) -> Self {
        WireValue::List(ValueList::new(value_type, items))
    }

    /// Creates an eager set value. Element order is kept as given.
    pub fn set(value_type: Type, items: Vec<WireValue>) -> Self {
        WireValue::Set(ValueList::new(value_type, items))
    }

    /// Creates an eager map value. Entry order is kept as given.
    pub fn map(key_type: Type, value_type: Type, items: Vec<MapItem>) -> Self {
        WireValue::Map(MapItems::new(key_type, value_type, items))
    }

    /// Returns the wire type of this value.
    pub fn ttype(&self) -> Type {
        match self {
            WireValue::Bool(_) => Type::Bool,
            WireValue::I8(_) => Type::I8,
            WireValue::I16(_) => Type::I16,
            WireValue::I32(_) => Type::I32,
            WireValue::I64(_) => Type::I64,
            WireValue::Double(_) => Type::Double,
            WireValue::Binary(_) => Type::Binary,
            WireValue::Struct(_) => Type::Struct,
            WireValue::Map(_) => Type::Map,
            WireValue::Set(_) => Type::Set,
            WireValue::List(_) => Type::List,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            WireValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<i8> {
        match self {
            WireValue::I8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            WireValue::I16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            WireValue::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            WireValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            WireValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            WireValue::Binary(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the binary payload as UTF-8, if it is valid.
    pub fn as_str(&self) -> Option<&str> {
        self.as_binary().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            WireValue::Struct(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapItems> {
        match self {
            WireValue::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&ValueList> {
        match self {
            WireValue::Set(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ValueList> {
        match self {
            WireValue::List(v) => Some(v),
            _ => None,
        }
    }
}

/// A single struct field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field identifier. Opaque; duplicates are allowed at this layer.
    pub id: i16,
    pub value: WireValue,
}

impl Field {
    pub fn new(id: i16, value: WireValue) -> Self {
        Self { id, value }
    }
}

/// An ordered list of fields, in wire order.
///
/// Equality is positional: two structs with the same fields in a different
/// order are not equal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Struct {
    pub fields: Vec<Field>,
}

impl Struct {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Appends a field.
    pub fn push(&mut self, id: i16, value: WireValue) {
        self.fields.push(Field { id, value });
    }

    /// Returns the first field with the given ID.
    pub fn get(&self, id: i16) -> Option<&WireValue> {
        self.fields.iter().find(|f| f.id == id).map(|f| &f.value)
    }

    /// Returns the IDs of all fields present, in wire order.
    pub fn field_ids(&self) -> impl Iterator<Item = i16> + '_ {
        self.fields.iter().map(|f| f.id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A key/value entry of a map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapItem {
    pub key: WireValue,
    pub value: WireValue,
}

impl MapItem {
    pub fn new(key: WireValue, value: WireValue) -> Self {
        Self { key, value }
    }
}

/// Elements of a list or set.
#[derive(Debug, Clone)]
pub enum ValueList {
    /// Fully materialized elements.
    Eager { value_type: Type, items: Vec<WireValue> },
    /// Elements decoded on demand from the source bytes.
    Lazy(LazyList),
}

impl ValueList {
    pub fn new(value_type: Type, items: Vec<WireValue>) -> Self {
        ValueList::Eager { value_type, items }
    }

    /// Declared element type.
    pub fn value_type(&self) -> Type {
        match self {
            ValueList::Eager { value_type, .. } => *value_type,
            ValueList::Lazy(view) => view.value_type(),
        }
    }

    /// Declared element count.
    pub fn len(&self) -> usize {
        match self {
            ValueList::Eager { items, .. } => items.len(),
            ValueList::Lazy(view) => view.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, ValueList::Lazy(_))
    }

    /// Visits elements in order.
    ///
    /// A lazy list is drained from its current position and left exhausted.
    pub fn for_each<E, F>(&mut self, mut f: F) -> Result<(), E>
    where
        E: From<MaterializeError>,
        F: FnMut(&WireValue) -> Result<(), E>,
    {
        match self {
            ValueList::Eager { items, .. } => items.iter().try_for_each(f),
            ValueList::Lazy(view) => {
                while !view.is_exhausted() {
                    let value = view.next_value()?;
                    f(&value)?;
                }
                Ok(())
            }
        }
    }

    /// Returns all elements without changing the state of a lazy view.
    pub fn to_vec(&self) -> Result<Vec<WireValue>, MaterializeError> {
        match self {
            ValueList::Eager { items, .. } => Ok(items.clone()),
            ValueList::Lazy(view) => view.to_vec(),
        }
    }

    /// Materializes all elements, releasing a lazy view.
    pub fn into_vec(self) -> Result<Vec<WireValue>, MaterializeError> {
        match self {
            ValueList::Eager { items, .. } => Ok(items),
            ValueList::Lazy(mut view) => {
                let items = view.to_vec();
                view.close();
                items
            }
        }
    }

    /// Converts a lazy list into its eager form.
    pub fn materialize(self) -> Result<ValueList, MaterializeError> {
        let value_type = self.value_type();
        Ok(ValueList::Eager {
            value_type,
            items: self.into_vec()?,
        })
    }

    /// Releases a lazy view. No-op for eager lists.
    pub fn close(&mut self) {
        if let ValueList::Lazy(view) = self {
            view.close();
        }
    }
}

impl PartialEq for ValueList {
    fn eq(&self, other: &Self) -> bool {
        if self.value_type() != other.value_type() || self.len() != other.len() {
            return false;
        }
        match (self, other) {
            (ValueList::Eager { items: a, .. }, ValueList::Eager { items: b, .. }) => a == b,
            _ => match (self.to_vec(), other.to_vec()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
        }
    }
}

/// Entries of a map.
#[derive(Debug, Clone)]
pub enum MapItems {
    Eager {
        key_type: Type,
        value_type: Type,
        items: Vec<MapItem>,
    },
    Lazy(LazyMap),
}

impl MapItems {
    pub fn new(key_type: Type, value_type: Type, items: Vec<MapItem>) -> Self {
        MapItems::Eager {
            key_type,
            value_type,
            items,
        }
    }

    pub fn key_type(&self) -> Type {
        match self {
            MapItems::Eager { key_type, .. } => *key_type,
            MapItems::Lazy(view) => view.key_type(),
        }
    }

    pub fn value_type(&self) -> Type {
        match self {
            MapItems::Eager { value_type, .. } => *value_type,
            MapItems::Lazy(view) => view.value_type(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MapItems::Eager { items, .. } => items.len(),
            MapItems::Lazy(view) => view.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, MapItems::Lazy(_))
    }

    /// Visits entries in order. A lazy map is drained from its current position.
    pub fn for_each<E, F>(&mut self, mut f: F) -> Result<(), E>
    where
        E: From<MaterializeError>,
        F: FnMut(&MapItem) -> Result<(), E>,
    {
        match self {
            MapItems::Eager { items, .. } => items.iter().try_for_each(f),
            MapItems::Lazy(view) => {
                while !view.is_exhausted() {
                    let item = view.next_item()?;
                    f(&item)?;
                }
                Ok(())
            }
        }
    }

    pub fn to_vec(&self) -> Result<Vec<MapItem>, MaterializeError> {
        match self {
            MapItems::Eager { items, .. } => Ok(items.clone()),
            MapItems::Lazy(view) => view.to_vec(),
        }
    }

    pub fn into_vec(self) -> Result<Vec<MapItem>, MaterializeError> {
        match self {
            MapItems::Eager { items, .. } => Ok(items),
            MapItems::Lazy(mut view) => {
                let items = view.to_vec();
                view.close();
                items
            }
        }
    }

    pub fn materialize(self) -> Result<MapItems, MaterializeError> {
        let key_type = self.key_type();
        let value_type = self.value_type();
        Ok(MapItems::Eager {
            key_type,
            value_type,
            items: self.into_vec()?,
        })
    }

    pub fn close(&mut self) {
        if let MapItems::Lazy(view) = self {
            view.close();
        }
    }
}

impl PartialEq for MapItems {
    fn eq(&self, other: &Self) -> bool {
        if self.key_type() != other.key_type()
            || self.value_type() != other.value_type()
            || self.len() != other.len()
        {
            return false;
        }
        match (self, other) {
            (MapItems::Eager { items: a, .. }, MapItems::Eager { items: b, .. }) => a == b,
            _ => match (self.to_vec(), other.to_vec()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
        }
    }
}

// =============================================================================
// DISPLAY
// =============================================================================

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::Bool(v) => write!(f, "{}", v),
            WireValue::I8(v) => write!(f, "{}i8", v),
            WireValue::I16(v) => write!(f, "{}i16", v),
            WireValue::I32(v) => write!(f, "{}i32", v),
            WireValue::I64(v) => write!(f, "{}i64", v),
            WireValue::Double(v) => write!(f, "{:?}", v),
            WireValue::Binary(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => write!(f, "{:?}", s),
                Err(_) => {
                    f.write_str("0x")?;
                    for b in bytes {
                        write!(f, "{:02x}", b)?;
                    }
                    Ok(())
                }
            },
            WireValue::Struct(s) => write!(f, "{}", s),
            WireValue::Map(m) => write!(f, "{}", m),
            WireValue::Set(l) => {
                write!(f, "set<{}>", l.value_type())?;
                fmt_elements(f, l)
            }
            WireValue::List(l) => {
                write!(f, "list<{}>", l.value_type())?;
                fmt_elements(f, l)
            }
        }
    }
}

fn fmt_elements(f: &mut fmt::Formatter<'_>, list: &ValueList) -> fmt::Result {
    match list {
        ValueList::Eager { items, .. } => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", item)?;
            }
            f.write_str("]")
        }
        ValueList::Lazy(view) => write!(f, "(lazy, len={})", view.len()),
    }
}

impl fmt::Display for Struct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", field.id, field.value)?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for MapItems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map<{}, {}>", self.key_type(), self.value_type())?;
        match self {
            MapItems::Eager { items, .. } => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", item.key, item.value)?;
                }
                f.write_str("}")
            }
            MapItems::Lazy(view) => write!(f, "(lazy, len={})", view.len()),
        }
    }
}
