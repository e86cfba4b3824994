use std::sync::Mutex;

use crate::error::BytesResult;
use crate::store::ByteStore;

/// Process-local `ByteStore` backed by a fixed-size heap buffer behind a single mutex.
///
/// There is no cross-process sharing to protect here, so unlike [`MmapByteStore`](crate::mmap::MmapByteStore)
/// this backend does not need lock-free atomics — every operation takes the same short-lived
/// lock, which keeps the implementation trivially correct and is more than fast enough for the
/// single-process tests and examples it exists for.
#[derive(Debug)]
pub struct HeapByteStore {
    buf: Mutex<Vec<u8>>,
    capacity: u64,
}

impl HeapByteStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Mutex::new(vec![0u8; capacity]),
            capacity: capacity as u64,
        }
    }

    fn with_i32<R>(&self, offset: u64, f: impl FnOnce(&mut [u8; 4]) -> R) -> BytesResult<R> {
        self.check_bounds(offset, 4)?;
        let mut guard = self.buf.lock().unwrap_or_else(|e| e.into_inner());
        let start = offset as usize;
        let mut bytes: [u8; 4] = guard[start..start + 4].try_into().expect("checked len");
        let result = f(&mut bytes);
        guard[start..start + 4].copy_from_slice(&bytes);
        Ok(result)
    }

    fn with_i64<R>(&self, offset: u64, f: impl FnOnce(&mut [u8; 8]) -> R) -> BytesResult<R> {
        self.check_bounds(offset, 8)?;
        let mut guard = self.buf.lock().unwrap_or_else(|e| e.into_inner());
        let start = offset as usize;
        let mut bytes: [u8; 8] = guard[start..start + 8].try_into().expect("checked len");
        let result = f(&mut bytes);
        guard[start..start + 8].copy_from_slice(&bytes);
        Ok(result)
    }
}

impl ByteStore for HeapByteStore {
    fn real_capacity(&self) -> u64 {
        self.capacity
    }

    fn shared_memory(&self) -> bool {
        false
    }

    fn read_volatile_i32(&self, offset: u64) -> BytesResult<i32> {
        self.with_i32(offset, |b| i32::from_le_bytes(*b))
    }

    fn write_volatile_i32(&self, offset: u64, value: i32) -> BytesResult<()> {
        self.with_i32(offset, |b| *b = value.to_le_bytes())
    }

    fn write_ordered_i32(&self, offset: u64, value: i32) -> BytesResult<()> {
        self.write_volatile_i32(offset, value)
    }

    fn compare_and_swap_i32(&self, offset: u64, current: i32, new: i32) -> BytesResult<bool> {
        self.with_i32(offset, |b| {
            if i32::from_le_bytes(*b) == current {
                *b = new.to_le_bytes();
                true
            } else {
                false
            }
        })
    }

    fn get_and_add_i32(&self, offset: u64, delta: i32) -> BytesResult<i32> {
        self.with_i32(offset, |b| {
            let old = i32::from_le_bytes(*b);
            *b = old.wrapping_add(delta).to_le_bytes();
            old
        })
    }

    fn read_volatile_i64(&self, offset: u64) -> BytesResult<i64> {
        self.with_i64(offset, |b| i64::from_le_bytes(*b))
    }

    fn write_volatile_i64(&self, offset: u64, value: i64) -> BytesResult<()> {
        self.with_i64(offset, |b| *b = value.to_le_bytes())
    }

    fn write_ordered_i64(&self, offset: u64, value: i64) -> BytesResult<()> {
        self.write_volatile_i64(offset, value)
    }

    fn compare_and_swap_i64(&self, offset: u64, current: i64, new: i64) -> BytesResult<bool> {
        self.with_i64(offset, |b| {
            if i64::from_le_bytes(*b) == current {
                *b = new.to_le_bytes();
                true
            } else {
                false
            }
        })
    }

    fn get_and_add_i64(&self, offset: u64, delta: i64) -> BytesResult<i64> {
        self.with_i64(offset, |b| {
            let old = i64::from_le_bytes(*b);
            *b = old.wrapping_add(delta).to_le_bytes();
            old
        })
    }

    fn read_bytes(&self, offset: u64, out: &mut [u8]) -> BytesResult<()> {
        self.check_bounds(offset, out.len() as u64)?;
        let guard = self.buf.lock().unwrap_or_else(|e| e.into_inner());
        let start = offset as usize;
        out.copy_from_slice(&guard[start..start + out.len()]);
        Ok(())
    }

    fn write_bytes(&self, offset: u64, data: &[u8]) -> BytesResult<()> {
        self.check_bounds(offset, data.len() as u64)?;
        let mut guard = self.buf.lock().unwrap_or_else(|e| e.into_inner());
        let start = offset as usize;
        guard[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn zero(&self, offset: u64, len: u64) -> BytesResult<()> {
        self.check_bounds(offset, len)?;
        let mut guard = self.buf.lock().unwrap_or_else(|e| e.into_inner());
        let start = offset as usize;
        guard[start..start + len as usize].fill(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volatile_round_trip() {
        let store = HeapByteStore::new(64);
        store.write_volatile_i32(0, 42).unwrap();
        assert_eq!(store.read_volatile_i32(0).unwrap(), 42);
    }

    #[test]
    fn cas_succeeds_on_match_and_fails_otherwise() {
        let store = HeapByteStore::new(64);
        store.write_volatile_i32(0, 1).unwrap();
        assert!(store.compare_and_swap_i32(0, 1, 2).unwrap());
        assert!(!store.compare_and_swap_i32(0, 1, 3).unwrap());
        assert_eq!(store.read_volatile_i32(0).unwrap(), 2);
    }

    #[test]
    fn get_and_add_returns_previous_value() {
        let store = HeapByteStore::new(64);
        store.write_volatile_i64(8, 10).unwrap();
        assert_eq!(store.get_and_add_i64(8, 5).unwrap(), 10);
        assert_eq!(store.read_volatile_i64(8).unwrap(), 15);
    }

    #[test]
    fn out_of_bounds_access_errors() {
        let store = HeapByteStore::new(4);
        assert!(store.read_volatile_i64(0).is_err());
    }

    #[test]
    fn bulk_write_then_read() {
        let store = HeapByteStore::new(16);
        store.write_bytes(2, b"hello").unwrap();
        let mut out = [0u8; 5];
        store.read_bytes(2, &mut out).unwrap();
        assert_eq!(&out, b"hello");
    }
}
