use crate::error::BytesResult;

/// A random-access, bounded byte buffer with volatile and CAS access to 32-bit and 64-bit
/// locations. This is the external collaborator the framing layer and `BoundRef` atomics are
/// built on; the engine never allocates against it beyond the cursor it hands back from its own
/// bounds-checked bulk operations.
///
/// `Send + Sync` because the whole point of the type is that independent `Wire` instances on
/// independent threads (or independent processes, for the memory-mapped backend) share one store
/// concurrently.
pub trait ByteStore: Send + Sync + std::fmt::Debug {
    /// Total addressable length. Fixed for the lifetime of the store — growing a store means
    /// creating a new, larger one and migrating, not reallocating in place.
    fn real_capacity(&self) -> u64;

    /// Whether this store is backed by memory visible to other processes (a memory-mapped file)
    /// as opposed to process-local heap memory.
    fn shared_memory(&self) -> bool;

    fn read_volatile_i32(&self, offset: u64) -> BytesResult<i32>;
    fn write_volatile_i32(&self, offset: u64, value: i32) -> BytesResult<()>;
    /// Release-ordered publish: writes prior to this call (to any offset) become visible to any
    /// reader that subsequently observes this value via `read_volatile_i32` (acquire).
    fn write_ordered_i32(&self, offset: u64, value: i32) -> BytesResult<()>;
    fn compare_and_swap_i32(&self, offset: u64, current: i32, new: i32) -> BytesResult<bool>;
    fn get_and_add_i32(&self, offset: u64, delta: i32) -> BytesResult<i32>;

    fn read_volatile_i64(&self, offset: u64) -> BytesResult<i64>;
    fn write_volatile_i64(&self, offset: u64, value: i64) -> BytesResult<()>;
    fn write_ordered_i64(&self, offset: u64, value: i64) -> BytesResult<()>;
    fn compare_and_swap_i64(&self, offset: u64, current: i64, new: i64) -> BytesResult<bool>;
    fn get_and_add_i64(&self, offset: u64, delta: i64) -> BytesResult<i64>;

    /// Plain (non-atomic) bulk read. Callers are responsible for ensuring no concurrent writer
    /// touches the same range — this is what the framing layer's reservation protocol guarantees
    /// for document bodies.
    fn read_bytes(&self, offset: u64, buf: &mut [u8]) -> BytesResult<()>;

    /// Plain (non-atomic) bulk write.
    fn write_bytes(&self, offset: u64, data: &[u8]) -> BytesResult<()>;

    fn zero(&self, offset: u64, len: u64) -> BytesResult<()>;

    fn check_bounds(&self, offset: u64, len: u64) -> BytesResult<()> {
        let capacity = self.real_capacity();
        match offset.checked_add(len) {
            Some(end) if end <= capacity => Ok(()),
            _ => Err(crate::error::BytesError::OutOfBounds {
                offset,
                len,
                capacity,
            }),
        }
    }
}
