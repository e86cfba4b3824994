// TODO: Fix doc comment generic types to use backticks
#![allow(rustdoc::invalid_html_tags)]
#![allow(rustdoc::broken_intra_doc_links)]

pub mod bound;
pub mod cursor;
pub mod error;
pub mod heap;
pub mod mmap;
pub mod store;

pub use bound::{BoundElement, BoundHandle};
pub use cursor::Cursor;
pub use error::{BytesError, BytesResult};
pub use heap::HeapByteStore;
pub use mmap::MmapByteStore;
pub use store::ByteStore;
