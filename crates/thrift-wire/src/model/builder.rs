//! Builder API for ergonomic Struct construction.
//!
//! # Example
//!
//! ```rust
//! use thrift_wire::model::builder::StructBuilder;
//! use thrift_wire::Type;
//!
//! let point = StructBuilder::new()
//!     .double(1, 1.5)
//!     .double(2, -3.0)
//!     .build();
//!
//! let request = StructBuilder::new()
//!     .string(1, "draw")
//!     .structure(2, |s| s.double(1, 0.0).double(2, 0.0))
//!     .list(3, Type::Struct, |l| l.structure(point.clone()))
//!     .build();
//!
//! assert_eq!(request.len(), 3);
//! ```

use crate::model::{Field, MapItem, Struct, Type, WireValue};

/// Builder for constructing a Struct field by field, in wire order.
#[derive(Debug, Clone, Default)]
pub struct StructBuilder {
    fields: Vec<Field>,
}

impl StructBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field with an arbitrary value.
    pub fn field(mut self, id: i16, value: WireValue) -> Self {
        self.fields.push(Field { id, value });
        self
    }

    pub fn bool(self, id: i16, v: bool) -> Self {
        self.field(id, WireValue::Bool(v))
    }

    pub fn i8(self, id: i16, v: i8) -> Self {
        self.field(id, WireValue::I8(v))
    }

    pub fn i16(self, id: i16, v: i16) -> Self {
        self.field(id, WireValue::I16(v))
    }

    pub fn i32(self, id: i16, v: i32) -> Self {
        self.field(id, WireValue::I32(v))
    }

    pub fn i64(self, id: i16, v: i64) -> Self {
        self.field(id, WireValue::I64(v))
    }

    pub fn double(self, id: i16, v: f64) -> Self {
        self.field(id, WireValue::Double(v))
    }

    pub fn binary(self, id: i16, v: impl Into<Vec<u8>>) -> Self {
        self.field(id, WireValue::binary(v))
    }

    pub fn string(self, id: i16, v: impl Into<String>) -> Self {
        self.field(id, WireValue::string(v))
    }

    /// Adds a nested struct field using a builder function.
    pub fn structure<F>(self, id: i16, f: F) -> Self
    where
        F: FnOnce(StructBuilder) -> StructBuilder,
    {
        let nested = f(StructBuilder::new()).build();
        self.field(id, WireValue::Struct(nested))
    }

    /// Adds a list field using a builder function.
    pub fn list<F>(self, id: i16, value_type: Type, f: F) -> Self
    where
        F: FnOnce(ElementsBuilder) -> ElementsBuilder,
    {
        let items = f(ElementsBuilder::default()).items;
        self.field(id, WireValue::list(value_type, items))
    }

    /// Adds a set field using a builder function.
    pub fn set<F>(self, id: i16, value_type: Type, f: F) -> Self
    where
        F: FnOnce(ElementsBuilder) -> ElementsBuilder,
    {
        let items = f(ElementsBuilder::default()).items;
        self.field(id, WireValue::set(value_type, items))
    }

    /// Adds a map field from key/value pairs.
    pub fn map(
        self,
        id: i16,
        key_type: Type,
        value_type: Type,
        entries: impl IntoIterator<Item = (WireValue, WireValue)>,
    ) -> Self {
        let items = entries
            .into_iter()
            .map(|(key, value)| MapItem { key, value })
            .collect();
        self.field(id, WireValue::map(key_type, value_type, items))
    }

    pub fn build(self) -> Struct {
        Struct {
            fields: self.fields,
        }
    }
}

/// Builder for list and set elements.
#[derive(Debug, Clone, Default)]
pub struct ElementsBuilder {
    items: Vec<WireValue>,
}

impl ElementsBuilder {
    pub fn value(mut self, v: WireValue) -> Self {
        self.items.push(v);
        self
    }

    pub fn values(mut self, vs: impl IntoIterator<Item = WireValue>) -> Self {
        self.items.extend(vs);
        self
    }

    pub fn i32(self, v: i32) -> Self {
        self.value(WireValue::I32(v))
    }

    pub fn i64(self, v: i64) -> Self {
        self.value(WireValue::I64(v))
    }

    pub fn string(self, v: impl Into<String>) -> Self {
        self.value(WireValue::string(v))
    }

    pub fn structure(self, s: Struct) -> Self {
        self.value(WireValue::Struct(s))
    }
}
