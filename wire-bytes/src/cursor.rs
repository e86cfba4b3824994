use std::sync::Arc;

use crate::error::{BytesError, BytesResult};
use crate::store::ByteStore;

/// A bounds-checked cursor over a `[start, limit)` window of a `ByteStore`.
///
/// This is the "bulk read/write with bounds-checked cursor" the store interface promises: the
/// framing layer narrows a cursor to a document's reserved body before handing it to the codec,
/// so a format implementation can never read or write outside the document it was given no matter
/// what the underlying store's total capacity is.
#[derive(Clone)]
pub struct Cursor {
    store: Arc<dyn ByteStore>,
    pos: u64,
    limit: u64,
}

impl Cursor {
    pub fn new(store: Arc<dyn ByteStore>, start: u64, limit: u64) -> Self {
        Self {
            store,
            pos: start,
            limit,
        }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn write_remaining(&self) -> u64 {
        self.limit.saturating_sub(self.pos)
    }

    pub fn read_remaining(&self) -> u64 {
        self.write_remaining()
    }

    pub fn seek(&mut self, pos: u64) {
        self.pos = pos;
    }

    pub fn store(&self) -> &Arc<dyn ByteStore> {
        &self.store
    }

    pub fn write(&mut self, data: &[u8]) -> BytesResult<()> {
        let len = data.len() as u64;
        if len > self.write_remaining() {
            return Err(BytesError::WindowExhausted {
                remaining: self.write_remaining(),
                requested: len,
            });
        }
        self.store.write_bytes(self.pos, data)?;
        self.pos += len;
        Ok(())
    }

    pub fn write_u8(&mut self, byte: u8) -> BytesResult<()> {
        self.write(&[byte])
    }

    pub fn read(&mut self, out: &mut [u8]) -> BytesResult<()> {
        let len = out.len() as u64;
        if len > self.read_remaining() {
            return Err(BytesError::WindowExhausted {
                remaining: self.read_remaining(),
                requested: len,
            });
        }
        self.store.read_bytes(self.pos, out)?;
        self.pos += len;
        Ok(())
    }

    pub fn read_u8(&mut self) -> BytesResult<u8> {
        let mut b = [0u8; 1];
        self.read(&mut b)?;
        Ok(b[0])
    }

    /// Peek without advancing the cursor; used by formats that need to branch on a tag byte
    /// before deciding how much to consume.
    pub fn peek_u8(&self) -> BytesResult<u8> {
        if self.read_remaining() < 1 {
            return Err(BytesError::WindowExhausted {
                remaining: 0,
                requested: 1,
            });
        }
        let mut b = [0u8; 1];
        self.store.read_bytes(self.pos, &mut b)?;
        Ok(b[0])
    }
}
