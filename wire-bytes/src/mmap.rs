use std::cell::UnsafeCell;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

use memmap2::MmapMut;

use crate::error::BytesResult;
use crate::store::ByteStore;

/// `ByteStore` backed by a memory-mapped file: true cross-process shared memory with the
/// volatile/CAS semantics the framing layer and `BoundRef` atomics need.
///
/// Reads use `Acquire`, the explicit "ordered" publish uses `Release`, and plain volatile
/// writes/CAS/fetch-add use `SeqCst` — the same ordering discipline as the ring buffer header
/// this backend is modeled on: a volatile write must be immediately visible to any other process
/// mapping the same file, not just synchronized with a matching acquire.
///
/// Capacity is fixed at creation; there is no in-place growth (the spec treats elastic
/// reallocation as out of scope). A caller that needs a bigger store creates a new, larger one.
pub struct MmapByteStore {
    mmap: UnsafeCell<MmapMut>,
    capacity: u64,
    path: PathBuf,
}

// SAFETY: all mutation goes through atomic operations or through `read_bytes`/`write_bytes`,
// whose exclusivity is guaranteed by the framing layer's reservation protocol (a document's body
// is either owned by exactly one in-flight writer or is read-only post-commit). The `UnsafeCell`
// only exists to get a `*mut u8` out of `MmapMut` without requiring `&mut self` on every method.
unsafe impl Send for MmapByteStore {}
unsafe impl Sync for MmapByteStore {}

impl std::fmt::Debug for MmapByteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapByteStore")
            .field("path", &self.path)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl MmapByteStore {
    /// Create a new backing file of exactly `capacity` bytes, zero-filled, and map it.
    pub fn create(path: impl AsRef<Path>, capacity: u64) -> BytesResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(capacity)?;
        // SAFETY: `file` outlives the mapping (owned by the caller via its own handle, and we
        // hold our own copy open through `MmapMut`); no other process is expected to truncate the
        // file out from under us during the mapping's lifetime.
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        tracing::debug!(path = %path.display(), capacity, "created mmap byte store");
        Ok(Self {
            mmap: UnsafeCell::new(mmap),
            capacity,
            path,
        })
    }

    /// Re-open an existing backing file, sized from its current length on disk.
    pub fn open(path: impl AsRef<Path>) -> BytesResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let capacity = file.metadata()?.len();
        // SAFETY: see `create`.
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self {
            mmap: UnsafeCell::new(mmap),
            capacity,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn data_ptr(&self) -> *mut u8 {
        // SAFETY: `UnsafeCell::get` is always valid to call; the returned pointer is only
        // dereferenced through bounds-checked offsets below.
        unsafe { (*self.mmap.get()).as_mut_ptr() }
    }

    fn atomic32(&self, offset: u64) -> BytesResult<&AtomicI32> {
        self.check_bounds(offset, 4)?;
        // SAFETY: offset was bounds-checked against the mapping length; `AtomicI32` has the same
        // size and (on every platform this crate targets) alignment as the 4 raw bytes it
        // overlays, and the framing layer only ever issues 4-aligned header offsets.
        unsafe { Ok(&*(self.data_ptr().add(offset as usize) as *const AtomicI32)) }
    }

    fn atomic64(&self, offset: u64) -> BytesResult<&AtomicI64> {
        self.check_bounds(offset, 8)?;
        // SAFETY: see `atomic32`; `BoundRef` callers are responsible for 8-aligned offsets when
        // requesting a `Word64` scalar.
        unsafe { Ok(&*(self.data_ptr().add(offset as usize) as *const AtomicI64)) }
    }
}

impl ByteStore for MmapByteStore {
    fn real_capacity(&self) -> u64 {
        self.capacity
    }

    fn shared_memory(&self) -> bool {
        true
    }

    fn read_volatile_i32(&self, offset: u64) -> BytesResult<i32> {
        Ok(self.atomic32(offset)?.load(Ordering::Acquire))
    }

    fn write_volatile_i32(&self, offset: u64, value: i32) -> BytesResult<()> {
        self.atomic32(offset)?.store(value, Ordering::SeqCst);
        Ok(())
    }

    fn write_ordered_i32(&self, offset: u64, value: i32) -> BytesResult<()> {
        self.atomic32(offset)?.store(value, Ordering::Release);
        Ok(())
    }

    fn compare_and_swap_i32(&self, offset: u64, current: i32, new: i32) -> BytesResult<bool> {
        Ok(self
            .atomic32(offset)?
            .compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok())
    }

    fn get_and_add_i32(&self, offset: u64, delta: i32) -> BytesResult<i32> {
        Ok(self.atomic32(offset)?.fetch_add(delta, Ordering::SeqCst))
    }

    fn read_volatile_i64(&self, offset: u64) -> BytesResult<i64> {
        Ok(self.atomic64(offset)?.load(Ordering::Acquire))
    }

    fn write_volatile_i64(&self, offset: u64, value: i64) -> BytesResult<()> {
        self.atomic64(offset)?.store(value, Ordering::SeqCst);
        Ok(())
    }

    fn write_ordered_i64(&self, offset: u64, value: i64) -> BytesResult<()> {
        self.atomic64(offset)?.store(value, Ordering::Release);
        Ok(())
    }

    fn compare_and_swap_i64(&self, offset: u64, current: i64, new: i64) -> BytesResult<bool> {
        Ok(self
            .atomic64(offset)?
            .compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok())
    }

    fn get_and_add_i64(&self, offset: u64, delta: i64) -> BytesResult<i64> {
        Ok(self.atomic64(offset)?.fetch_add(delta, Ordering::SeqCst))
    }

    fn read_bytes(&self, offset: u64, out: &mut [u8]) -> BytesResult<()> {
        self.check_bounds(offset, out.len() as u64)?;
        // SAFETY: bounds-checked above; non-overlapping with `out` since `out` is caller-owned.
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.data_ptr().add(offset as usize),
                out.as_mut_ptr(),
                out.len(),
            );
        }
        Ok(())
    }

    fn write_bytes(&self, offset: u64, data: &[u8]) -> BytesResult<()> {
        self.check_bounds(offset, data.len() as u64)?;
        // SAFETY: bounds-checked above; the framing reservation protocol ensures no other writer
        // holds this range concurrently.
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                self.data_ptr().add(offset as usize),
                data.len(),
            );
        }
        Ok(())
    }

    fn zero(&self, offset: u64, len: u64) -> BytesResult<()> {
        self.check_bounds(offset, len)?;
        // SAFETY: bounds-checked above.
        unsafe {
            std::ptr::write_bytes(self.data_ptr().add(offset as usize), 0, len as usize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(capacity: u64) -> (MmapByteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");
        (MmapByteStore::create(&path, capacity).unwrap(), dir)
    }

    #[test]
    fn create_then_open_sees_same_bytes() {
        let (store, dir) = temp_store(64);
        store.write_volatile_i32(0, 7).unwrap();
        drop(store);
        let reopened = MmapByteStore::open(dir.path().join("store.bin")).unwrap();
        assert_eq!(reopened.read_volatile_i32(0).unwrap(), 7);
    }

    #[test]
    fn cas_on_shared_memory_is_single_winner() {
        let (store, _dir) = temp_store(64);
        assert!(store.compare_and_swap_i32(0, 0, 1).unwrap());
        assert!(!store.compare_and_swap_i32(0, 0, 2).unwrap());
    }

    #[test]
    fn ordered_write_is_observed_by_acquire_read() {
        let (store, _dir) = temp_store(64);
        store.write_ordered_i32(0, 99).unwrap();
        assert_eq!(store.read_volatile_i32(0).unwrap(), 99);
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let (store, _dir) = temp_store(8);
        assert!(store.write_volatile_i64(4, 1).is_err());
    }

    #[test]
    fn shared_memory_flag_is_true() {
        let (store, _dir) = temp_store(8);
        assert!(store.shared_memory());
    }
}
