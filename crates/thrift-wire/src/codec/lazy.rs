//! Lazy collection views.
//!
//! A lazy view records where a container's elements start in the source and
//! how many there are, then decodes them one at a time, in order, when asked.
//! Views are single-consumer: materialization takes `&mut self`.
//!
//! ```text
//! Created --next--> Draining --next--> Exhausted
//!    |                 |                   |
//!    +-----------------+---- close/drop ---+--> Released
//! ```
//!
//! Materializing past `Exhausted`, or touching a `Released` view, fails with
//! a [`ViewError`]. As iterators, views yield at most one error and then end.

use std::fmt;

use crate::codec::offset::Decoder;
use crate::codec::pool::{ViewPool, ViewSlot, LIST_VIEWS, MAP_VIEWS};
use crate::codec::primitives::{ListHeader, MapHeader};
use crate::error::{MaterializeError, ViewError};
use crate::model::{MapItem, Type, WireValue};

/// Lifecycle state of a lazy view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// No element materialized yet.
    Created,
    /// Some, but not all, elements materialized.
    Draining,
    /// Every element materialized.
    Exhausted,
    /// Storage returned to the pool.
    Released,
}

/// Slot ownership shared by list and map views.
struct Handle {
    pool: &'static ViewPool,
    slot: Option<Box<ViewSlot>>,
    count: usize,
    /// Set once iteration has yielded an error.
    failed: bool,
}

impl Handle {
    fn acquire(pool: &'static ViewPool, decoder: Decoder, count: usize, start: u64, depth: usize) -> Self {
        let mut slot = pool.acquire();
        slot.count = count;
        slot.start = start;
        slot.next = start;
        slot.depth = depth;
        slot.decoder = Some(decoder);
        Self {
            pool,
            slot: Some(slot),
            count,
            failed: false,
        }
    }

    fn state(&self) -> ViewState {
        match &self.slot {
            None => ViewState::Released,
            Some(slot) if slot.consumed >= slot.count => ViewState::Exhausted,
            Some(slot) if slot.consumed == 0 => ViewState::Created,
            Some(_) => ViewState::Draining,
        }
    }

    fn consumed(&self) -> usize {
        self.slot.as_ref().map_or(0, |s| s.consumed)
    }

    fn start(&self) -> Option<u64> {
        self.slot.as_ref().map(|s| s.start)
    }

    /// Elements an iterator may still yield, errors included.
    fn remaining(&self) -> usize {
        match self.state() {
            _ if self.failed => 0,
            ViewState::Released => 1,
            _ => self.count.saturating_sub(self.consumed()),
        }
    }

    /// Passes an iteration result through, ending iteration after an error.
    fn fuse<T>(&mut self, result: Result<T, MaterializeError>) -> Option<Result<T, MaterializeError>> {
        if self.failed {
            return None;
        }
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }

    /// Returns the slot of a view that still has elements left.
    fn live_slot(&mut self) -> Result<&mut ViewSlot, ViewError> {
        let slot = self.slot.as_deref_mut().ok_or(ViewError::Released)?;
        if slot.consumed >= slot.count {
            return Err(ViewError::Exhausted { count: slot.count });
        }
        Ok(slot)
    }

    fn decoder(&self) -> Result<(&Decoder, u64, usize), ViewError> {
        let slot = self.slot.as_deref().ok_or(ViewError::Released)?;
        let decoder = slot.decoder.as_ref().ok_or(ViewError::Released)?;
        Ok((decoder, slot.start, slot.depth))
    }

    /// Acquires a fresh slot with the same shape, positioned at the start.
    fn duplicate(&self) -> Self {
        match self.slot.as_deref() {
            Some(ViewSlot {
                decoder: Some(decoder),
                start,
                depth,
                ..
            }) => Handle::acquire(self.pool, decoder.clone(), self.count, *start, *depth),
            _ => Self {
                pool: self.pool,
                slot: None,
                count: self.count,
                failed: false,
            },
        }
    }

    fn release(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.pool.release(slot);
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.release();
    }
}

// =============================================================================
// LIST / SET VIEW
// =============================================================================

/// Lazily decoded elements of a list or set.
pub struct LazyList {
    handle: Handle,
    value_type: Type,
}

impl LazyList {
    pub(crate) fn new(decoder: Decoder, header: ListHeader, start: u64, depth: usize) -> Self {
        Self {
            handle: Handle::acquire(&*LIST_VIEWS, decoder, header.len, start, depth),
            value_type: header.value_type,
        }
    }

    pub fn value_type(&self) -> Type {
        self.value_type
    }

    pub fn len(&self) -> usize {
        self.handle.count
    }

    pub fn is_empty(&self) -> bool {
        self.handle.count == 0
    }

    pub fn state(&self) -> ViewState {
        self.handle.state()
    }

    /// Number of elements materialized so far.
    pub fn consumed(&self) -> usize {
        self.handle.consumed()
    }

    pub fn is_exhausted(&self) -> bool {
        self.state() == ViewState::Exhausted
    }

    /// Offset of the first element in the source, until released.
    pub fn start_offset(&self) -> Option<u64> {
        self.handle.start()
    }

    /// Materializes the next element.
    ///
    /// A decode error leaves the view in place, so calling again reports
    /// the same error.
    pub fn next_value(&mut self) -> Result<WireValue, MaterializeError> {
        let value_type = self.value_type;
        let slot = self.handle.live_slot()?;
        let decoder = slot.decoder.as_ref().ok_or(ViewError::Released)?;
        let (value, next) = decoder.decode_at_depth(value_type, slot.next, slot.depth)?;
        slot.next = next;
        slot.consumed += 1;
        Ok(value)
    }

    /// Decodes every element from the start with a fresh cursor.
    ///
    /// Does not change the view's state.
    pub fn to_vec(&self) -> Result<Vec<WireValue>, MaterializeError> {
        let (decoder, mut offset, depth) = self.handle.decoder()?;
        let mut items = Vec::with_capacity(self.len());
        for _ in 0..self.len() {
            let (value, next) = decoder.decode_at_depth(self.value_type, offset, depth)?;
            items.push(value);
            offset = next;
        }
        Ok(items)
    }

    /// Returns the view's storage to the pool. Later use fails with
    /// [`ViewError::Released`].
    pub fn close(&mut self) {
        self.handle.release();
    }
}

impl Iterator for LazyList {
    type Item = Result<WireValue, MaterializeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_exhausted() || self.handle.failed {
            return None;
        }
        let result = self.next_value();
        self.handle.fuse(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.handle.remaining()))
    }
}

impl Clone for LazyList {
    /// Creates an independent view over the same elements, in the `Created` state.
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.duplicate(),
            value_type: self.value_type,
        }
    }
}

impl fmt::Debug for LazyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyList")
            .field("value_type", &self.value_type)
            .field("len", &self.len())
            .field("state", &self.state())
            .field("start", &self.start_offset())
            .finish()
    }
}

// =============================================================================
// MAP VIEW
// =============================================================================

/// Lazily decoded entries of a map.
pub struct LazyMap {
    handle: Handle,
    key_type: Type,
    value_type: Type,
}

impl LazyMap {
    pub(crate) fn new(decoder: Decoder, header: MapHeader, start: u64, depth: usize) -> Self {
        Self {
            handle: Handle::acquire(&*MAP_VIEWS, decoder, header.len, start, depth),
            key_type: header.key_type,
            value_type: header.value_type,
        }
    }

    pub fn key_type(&self) -> Type {
        self.key_type
    }

    pub fn value_type(&self) -> Type {
        self.value_type
    }

    pub fn len(&self) -> usize {
        self.handle.count
    }

    pub fn is_empty(&self) -> bool {
        self.handle.count == 0
    }

    pub fn state(&self) -> ViewState {
        self.handle.state()
    }

    pub fn consumed(&self) -> usize {
        self.handle.consumed()
    }

    pub fn is_exhausted(&self) -> bool {
        self.state() == ViewState::Exhausted
    }

    pub fn start_offset(&self) -> Option<u64> {
        self.handle.start()
    }

    /// Materializes the next entry.
    pub fn next_item(&mut self) -> Result<MapItem, MaterializeError> {
        let (key_type, value_type) = (self.key_type, self.value_type);
        let slot = self.handle.live_slot()?;
        let decoder = slot.decoder.as_ref().ok_or(ViewError::Released)?;
        let (key, offset) = decoder.decode_at_depth(key_type, slot.next, slot.depth)?;
        let (value, next) = decoder.decode_at_depth(value_type, offset, slot.depth)?;
        slot.next = next;
        slot.consumed += 1;
        Ok(MapItem { key, value })
    }

    /// Decodes every entry from the start without changing the view's state.
    pub fn to_vec(&self) -> Result<Vec<MapItem>, MaterializeError> {
        let (decoder, mut offset, depth) = self.handle.decoder()?;
        let mut items = Vec::with_capacity(self.len());
        for _ in 0..self.len() {
            let (key, after_key) = decoder.decode_at_depth(self.key_type, offset, depth)?;
            let (value, next) = decoder.decode_at_depth(self.value_type, after_key, depth)?;
            items.push(MapItem { key, value });
            offset = next;
        }
        Ok(items)
    }

    pub fn close(&mut self) {
        self.handle.release();
    }
}

impl Iterator for LazyMap {
    type Item = Result<MapItem, MaterializeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_exhausted() || self.handle.failed {
            return None;
        }
        let result = self.next_item();
        self.handle.fuse(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.handle.remaining()))
    }
}

impl Clone for LazyMap {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.duplicate(),
            key_type: self.key_type,
            value_type: self.value_type,
        }
    }
}

impl fmt::Debug for LazyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyMap")
            .field("key_type", &self.key_type)
            .field("value_type", &self.value_type)
            .field("len", &self.len())
            .field("state", &self.state())
            .field("start", &self.start_offset())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::codec::offset::DecodeOptions;
    use crate::error::DecodeError;
    use crate::codec::primitives::StreamWriter;
    use crate::codec::value::encode_value;
    use crate::model::{MapItems, StructBuilder, ValueList};

    fn lazy_decoder(bytes: Vec<u8>) -> Decoder {
        Decoder::new(bytes).with_options(DecodeOptions::lazy())
    }

    fn lazy_list(bytes: Vec<u8>) -> LazyList {
        match lazy_decoder(bytes).decode_value_at(Type::List, 0).unwrap().0 {
            WireValue::List(ValueList::Lazy(view)) => view,
            other => panic!("expected lazy list, got {:?}", other),
        }
    }

    fn ints(values: &[i32]) -> Vec<u8> {
        let items = values.iter().map(|v| WireValue::i32(*v)).collect();
        encode_value(&WireValue::list(Type::I32, items)).unwrap()
    }

    #[test]
    fn test_state_machine() {
        let mut view = lazy_list(ints(&[1, 2]));
        assert_eq!(view.state(), ViewState::Created);
        assert_eq!(view.start_offset(), Some(5));

        assert_eq!(view.next_value().unwrap(), WireValue::i32(1));
        assert_eq!(view.state(), ViewState::Draining);
        assert_eq!(view.next_value().unwrap(), WireValue::i32(2));
        assert_eq!(view.state(), ViewState::Exhausted);

        assert_eq!(
            view.next_value(),
            Err(MaterializeError::View(ViewError::Exhausted { count: 2 }))
        );

        view.close();
        assert_eq!(view.state(), ViewState::Released);
        assert_eq!(view.next_value(), Err(MaterializeError::View(ViewError::Released)));
        assert_eq!(view.to_vec(), Err(MaterializeError::View(ViewError::Released)));
        // Shape survives release.
        assert_eq!(view.len(), 2);
        assert_eq!(view.value_type(), Type::I32);
    }

    #[test]
    fn test_empty_view_is_exhausted() {
        let mut view = lazy_list(ints(&[]));
        assert_eq!(view.state(), ViewState::Exhausted);
        assert!(view.next().is_none());
    }

    #[test]
    fn test_iterator_drains_in_order() {
        let view = lazy_list(ints(&[5, 6, 7]));
        let values: Result<Vec<_>, _> = view.collect();
        assert_eq!(
            values.unwrap(),
            vec![WireValue::i32(5), WireValue::i32(6), WireValue::i32(7)]
        );
    }

    #[test]
    fn test_to_vec_does_not_advance() {
        let mut view = lazy_list(ints(&[1, 2, 3]));
        view.next_value().unwrap();
        assert_eq!(view.to_vec().unwrap().len(), 3);
        assert_eq!(view.consumed(), 1);
        assert_eq!(view.next_value().unwrap(), WireValue::i32(2));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut view = lazy_list(ints(&[1, 2]));
        view.next_value().unwrap();
        let mut copy = view.clone();
        assert_eq!(copy.state(), ViewState::Created);
        assert_eq!(copy.next_value().unwrap(), WireValue::i32(1));
        assert_eq!(view.next_value().unwrap(), WireValue::i32(2));
        view.close();
        assert_eq!(copy.next_value().unwrap(), WireValue::i32(2));
    }

    #[test]
    fn test_views_coexist_with_outer_decode() {
        let s = StructBuilder::new()
            .list(1, Type::Binary, |l| l.string("a").string("b"))
            .list(2, Type::I64, |l| l.i64(10).i64(20))
            .i32(3, 99)
            .build();
        let bytes = encode_value(&WireValue::Struct(s)).unwrap();
        let decoder = lazy_decoder(bytes);

        let (value, _) = decoder.decode_value_at(Type::Struct, 0).unwrap();
        let WireValue::Struct(mut s) = value else {
            panic!("expected struct");
        };
        let mut second = match s.fields.remove(1).value {
            WireValue::List(ValueList::Lazy(view)) => view,
            other => panic!("unexpected {:?}", other),
        };
        let mut first = match s.fields.remove(0).value {
            WireValue::List(ValueList::Lazy(view)) => view,
            other => panic!("unexpected {:?}", other),
        };

        // Interleave draining of two views over the same source.
        assert_eq!(second.next_value().unwrap(), WireValue::i64(10));
        assert_eq!(first.next_value().unwrap(), WireValue::string("a"));
        assert_eq!(second.next_value().unwrap(), WireValue::i64(20));
        assert_eq!(first.next_value().unwrap(), WireValue::string("b"));
        assert_eq!(s.get(3), Some(&WireValue::i32(99)));
    }

    #[test]
    fn test_lazy_map_entries() {
        let value = WireValue::map(
            Type::Binary,
            Type::Struct,
            vec![
                MapItem::new(
                    WireValue::string("a"),
                    WireValue::Struct(StructBuilder::new().i32(1, 1).build()),
                ),
                MapItem::new(
                    WireValue::string("b"),
                    WireValue::Struct(StructBuilder::new().i32(1, 2).build()),
                ),
            ],
        );
        let bytes = encode_value(&value).unwrap();
        let (decoded, end) = lazy_decoder(bytes.clone()).decode_value_at(Type::Map, 0).unwrap();
        assert_eq!(end, bytes.len() as u64);

        let WireValue::Map(MapItems::Lazy(mut view)) = decoded else {
            panic!("expected lazy map");
        };
        assert_eq!(view.key_type(), Type::Binary);
        let first = view.next_item().unwrap();
        assert_eq!(first.key, WireValue::string("a"));
        let second = view.next_item().unwrap();
        assert_eq!(second.value.as_struct().and_then(|s| s.get(1)), Some(&WireValue::i32(2)));
        assert!(view.next_item().is_err());
    }

    #[test]
    fn test_content_errors_surface_at_materialization() {
        // list<bool> [true, 0x07]: structurally valid, second element invalid
        let bytes = vec![2, 0, 0, 0, 2, 1, 7];
        let mut view = lazy_list(bytes.clone());
        assert_eq!(view.next_value().unwrap(), WireValue::Bool(true));
        assert!(matches!(
            view.next_value(),
            Err(MaterializeError::Decode(DecodeError::InvalidBool { value: 7, offset: 6 }))
        ));

        // The eager path rejects the same bytes up front.
        assert!(crate::codec::value::decode_value(Type::List, &bytes).is_err());
    }

    #[test]
    fn test_iteration_stops_after_error() {
        let bytes = vec![2, 0, 0, 0, 2, 1, 7];
        let view = lazy_list(bytes.clone());
        assert!(view.take(10).count() <= 2);

        let mut view = lazy_list(bytes);
        assert_eq!(view.next(), Some(Ok(WireValue::Bool(true))));
        assert!(matches!(
            view.next(),
            Some(Err(MaterializeError::Decode(DecodeError::InvalidBool { .. })))
        ));
        assert_eq!(view.next(), None);
        assert_eq!(view.next(), None);
        assert_eq!(view.size_hint(), (0, Some(0)));
        // Direct materialization still reports the failure.
        assert!(view.next_value().is_err());
        assert_eq!(view.consumed(), 1);
    }

    #[test]
    fn test_map_iteration_stops_after_error() {
        // map<i8, bool> {1: true, 2: 0x09}
        let bytes = vec![3, 2, 0, 0, 0, 2, 1, 1, 2, 9];
        let (decoded, _) = lazy_decoder(bytes).decode_value_at(Type::Map, 0).unwrap();
        let WireValue::Map(MapItems::Lazy(view)) = decoded else {
            panic!("expected lazy map");
        };
        let results: Vec<_> = view.take(10).collect();
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0],
            Ok(MapItem::new(WireValue::I8(1), WireValue::Bool(true)))
        );
        assert!(matches!(
            results[1],
            Err(MaterializeError::Decode(DecodeError::InvalidBool { value: 9, offset: 9 }))
        ));
    }

    #[test]
    fn test_released_view_iterates_once() {
        let mut view = lazy_list(ints(&[1, 2, 3]));
        view.close();
        assert_eq!(view.size_hint(), (0, Some(1)));
        assert_eq!(
            view.next(),
            Some(Err(MaterializeError::View(ViewError::Released)))
        );
        assert_eq!(view.next(), None);
    }

    #[test]
    fn test_structural_errors_fail_at_scan() {
        // list<binary> claiming 2 elements but holding one
        let mut w = StreamWriter::buffer();
        w.write_list_begin(ListHeader { value_type: Type::Binary, len: 2 }).unwrap();
        w.write_binary(b"only").unwrap();
        let decoder = lazy_decoder(w.into_inner());
        assert!(decoder.decode_value_at(Type::List, 0).unwrap_err().is_eof());
    }

    #[test]
    fn test_release_drops_source_reference() {
        let bytes: Arc<[u8]> = ints(&[1, 2, 3]).into();
        let shared: Arc<dyn crate::codec::offset::ReadAt + Send + Sync> = Arc::new(bytes);
        let decoder = Decoder::from_shared(shared.clone()).with_options(DecodeOptions::lazy());
        let baseline = Arc::strong_count(&shared);

        let (value, _) = decoder.decode_value_at(Type::List, 0).unwrap();
        assert!(Arc::strong_count(&shared) > baseline);
        drop(value);
        assert_eq!(Arc::strong_count(&shared), baseline);
    }
}
