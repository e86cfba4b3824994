use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{FramingError, FramingResult};

fn current_thread_tag() -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    // Never collide with the sentinel "unowned" value.
    hasher.finish() | 1
}

/// Enforces the single-writer-per-`Wire` contract: a `Wire` is not safe for concurrent use, so
/// `start_use`/`end_use` capture the owning thread and reject a foreign thread with `InUse`
/// rather than silently racing. This is a misuse guard, not a lock — correct callers never
/// contend on it, so a relaxed tag comparison is enough.
#[derive(Debug, Default)]
pub struct ScopeGuard {
    owner: AtomicU64,
}

impl ScopeGuard {
    const UNOWNED: u64 = 0;

    pub fn new() -> Self {
        Self {
            owner: AtomicU64::new(Self::UNOWNED),
        }
    }

    pub fn start_use(&self) -> FramingResult<ScopeTicket<'_>> {
        let caller = current_thread_tag();
        let previous = self
            .owner
            .compare_exchange(Self::UNOWNED, caller, Ordering::SeqCst, Ordering::SeqCst);
        match previous {
            Ok(_) => Ok(ScopeTicket { guard: self }),
            Err(existing) if existing == caller => Ok(ScopeTicket { guard: self }),
            Err(existing) => Err(FramingError::InUse {
                owner: format!("thread-tag-{existing}"),
                caller: format!("thread-tag-{caller}"),
            }),
        }
    }
}

/// RAII scope ticket; releases ownership on drop regardless of how the scope ends (return, `?`,
/// or panic-unwind).
pub struct ScopeTicket<'a> {
    guard: &'a ScopeGuard,
}

impl Drop for ScopeTicket<'_> {
    fn drop(&mut self) {
        self.guard.owner.store(ScopeGuard::UNOWNED, Ordering::SeqCst);
    }
}
