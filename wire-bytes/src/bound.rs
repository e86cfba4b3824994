use std::sync::Arc;

use wire_core::{BoundRef, FixedWidth};

use crate::error::BytesResult;
use crate::store::ByteStore;

/// The dereferenceable counterpart to a [`BoundRef`]: a `BoundRef` plus the store and document
/// base it was produced against. `volatileGet`/`orderedSet`/`compareAndSet`/`getAndAdd` delegate
/// straight to the store's atomic primitives, width-dispatched once here so callers don't have to.
#[derive(Clone)]
pub struct BoundHandle {
    store: Arc<dyn ByteStore>,
    absolute_offset: u64,
    width: FixedWidth,
    array_len: Option<u32>,
}

impl BoundHandle {
    /// `document_base` is the absolute offset of the document body this `BoundRef` was captured
    /// relative to.
    pub fn new(store: Arc<dyn ByteStore>, document_base: u64, bound: BoundRef) -> Self {
        Self {
            store,
            absolute_offset: document_base + bound.offset,
            width: bound.width,
            array_len: bound.array_len,
        }
    }

    pub fn width(&self) -> FixedWidth {
        self.width
    }

    pub fn array_len(&self) -> Option<u32> {
        self.array_len
    }

    pub fn volatile_get(&self) -> BytesResult<i64> {
        self.element(0).volatile_get_raw()
    }

    pub fn ordered_set(&self, value: i64) -> BytesResult<()> {
        self.element(0).ordered_set_raw(value)
    }

    pub fn compare_and_set(&self, expected: i64, new: i64) -> BytesResult<bool> {
        self.element(0).compare_and_set_raw(expected, new)
    }

    pub fn get_and_add(&self, delta: i64) -> BytesResult<i64> {
        self.element(0).get_and_add_raw(delta)
    }

    /// Narrow this handle to element `index` of an array bound reference. Panics if `index` is
    /// out of the declared `array_len` — this is a programming error, not a data error.
    pub fn element(&self, index: u32) -> BoundElement<'_> {
        if let Some(len) = self.array_len {
            assert!(index < len, "bound array index {index} out of range {len}");
        } else {
            assert_eq!(index, 0, "scalar bound reference has no element {index}");
        }
        let offset = self.absolute_offset + (index as u64) * (self.width.byte_len() as u64);
        BoundElement {
            store: &self.store,
            offset,
            width: self.width,
        }
    }
}

/// A single fixed-width slot within a (possibly array) `BoundHandle`.
pub struct BoundElement<'a> {
    store: &'a Arc<dyn ByteStore>,
    offset: u64,
    width: FixedWidth,
}

impl BoundElement<'_> {
    fn volatile_get_raw(&self) -> BytesResult<i64> {
        match self.width {
            FixedWidth::Word32 => self.store.read_volatile_i32(self.offset).map(i64::from),
            FixedWidth::Word64 => self.store.read_volatile_i64(self.offset),
        }
    }

    fn ordered_set_raw(&self, value: i64) -> BytesResult<()> {
        match self.width {
            FixedWidth::Word32 => self.store.write_ordered_i32(self.offset, value as i32),
            FixedWidth::Word64 => self.store.write_ordered_i64(self.offset, value),
        }
    }

    fn compare_and_set_raw(&self, expected: i64, new: i64) -> BytesResult<bool> {
        match self.width {
            FixedWidth::Word32 => {
                self.store
                    .compare_and_swap_i32(self.offset, expected as i32, new as i32)
            }
            FixedWidth::Word64 => self.store.compare_and_swap_i64(self.offset, expected, new),
        }
    }

    fn get_and_add_raw(&self, delta: i64) -> BytesResult<i64> {
        match self.width {
            FixedWidth::Word32 => self
                .store
                .get_and_add_i32(self.offset, delta as i32)
                .map(i64::from),
            FixedWidth::Word64 => self.store.get_and_add_i64(self.offset, delta),
        }
    }

    pub fn volatile_get(&self) -> BytesResult<i64> {
        self.volatile_get_raw()
    }

    pub fn ordered_set(&self, value: i64) -> BytesResult<()> {
        self.ordered_set_raw(value)
    }

    pub fn compare_and_set(&self, expected: i64, new: i64) -> BytesResult<bool> {
        self.compare_and_set_raw(expected, new)
    }

    pub fn get_and_add(&self, delta: i64) -> BytesResult<i64> {
        self.get_and_add_raw(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapByteStore;

    #[test]
    fn scalar_get_and_add_is_consistent() {
        let store: Arc<dyn ByteStore> = Arc::new(HeapByteStore::new(64));
        let bound = BoundRef::scalar(8, FixedWidth::Word64);
        let handle = BoundHandle::new(store, 0, bound);
        handle.ordered_set(0).unwrap();
        assert_eq!(handle.get_and_add(1).unwrap(), 0);
        assert_eq!(handle.get_and_add(1).unwrap(), 1);
        assert_eq!(handle.volatile_get().unwrap(), 2);
    }

    #[test]
    fn array_elements_are_independently_addressable() {
        let store: Arc<dyn ByteStore> = Arc::new(HeapByteStore::new(64));
        let bound = BoundRef::array(0, FixedWidth::Word32, 4);
        let handle = BoundHandle::new(store, 0, bound);
        handle.element(0).ordered_set(10).unwrap();
        handle.element(1).ordered_set(20).unwrap();
        assert_eq!(handle.element(0).volatile_get().unwrap(), 10);
        assert_eq!(handle.element(1).volatile_get().unwrap(), 20);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_element_panics() {
        let store: Arc<dyn ByteStore> = Arc::new(HeapByteStore::new(64));
        let bound = BoundRef::array(0, FixedWidth::Word32, 2);
        let handle = BoundHandle::new(store, 0, bound);
        let _ = handle.element(5);
    }

    #[test]
    fn compare_and_set_reports_success() {
        let store: Arc<dyn ByteStore> = Arc::new(HeapByteStore::new(64));
        let bound = BoundRef::scalar(0, FixedWidth::Word32);
        let handle = BoundHandle::new(store, 0, bound);
        handle.ordered_set(5).unwrap();
        assert!(handle.compare_and_set(5, 6).unwrap());
        assert!(!handle.compare_and_set(5, 7).unwrap());
    }
}
