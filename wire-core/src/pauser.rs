use std::time::{Duration, Instant};

use crate::error::{CoreError, CoreResult};

/// An adaptive waiting strategy used between CAS retries in the framing layer.
///
/// Mirrors the retry loop in [`RingBuffer::read_snapshot`]-style code: spin first, then yield,
/// then actually sleep, rather than parking on the very first contended attempt. A `Wire` owns
/// one `Pauser` and calls `pause()`/`pause_timeout()` each time it has to retry a CAS or wait for
/// a header to become ready; `reset()` is called once the awaited condition is observed so the
/// next wait starts its back-off from zero again.
///
/// Implementations are driven by a single owning thread (the `Wire`'s `startUse` scope already
/// enforces that), so `pause` takes `&mut self`.
pub trait Pauser: std::fmt::Debug {
    /// Wait one step with no overall budget. May busy-spin briefly before returning.
    fn pause(&mut self);

    /// Wait one step, failing once the cumulative wait since the last `reset()` exceeds
    /// `timeout`.
    fn pause_timeout(&mut self, timeout: Duration) -> CoreResult<()>;

    /// Clear accumulated back-off state; called once the condition being waited on is observed.
    fn reset(&mut self);
}

/// Pure busy-wait strategy: every step is a spin-loop hint. Appropriate for short, latency
/// sensitive waits (a handful of CAS retries) where the expected contention window is a few
/// instructions.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusyPauser {
    waited_since_reset: Duration,
    started: Option<Instant>,
}

impl Pauser for BusyPauser {
    fn pause(&mut self) {
        std::hint::spin_loop();
    }

    fn pause_timeout(&mut self, timeout: Duration) -> CoreResult<()> {
        let started = *self.started.get_or_insert_with(Instant::now);
        self.waited_since_reset = started.elapsed();
        if self.waited_since_reset > timeout {
            return Err(CoreError::Timeout {
                budget_millis: timeout.as_millis() as u64,
            });
        }
        std::hint::spin_loop();
        Ok(())
    }

    fn reset(&mut self) {
        self.waited_since_reset = Duration::ZERO;
        self.started = None;
    }
}

/// Escalating strategy: busy-spin for `spin_threshold` iterations, then `std::thread::yield_now`
/// for `yield_threshold` further iterations, then park the thread with a back-off that doubles up
/// to `park_ceiling`. Matches the shape of the retry loop seen throughout the storage layer
/// (spin a bounded number of times, then yield, then actually sleep) rather than parking
/// immediately on first contention.
#[derive(Debug, Clone)]
pub struct LongPauser {
    spin_threshold: u32,
    yield_threshold: u32,
    park_ceiling: Duration,
    iteration: u32,
    current_park: Duration,
    started: Option<Instant>,
}

impl LongPauser {
    pub const DEFAULT_SPIN_THRESHOLD: u32 = 10;
    pub const DEFAULT_YIELD_THRESHOLD: u32 = 100;
    pub const DEFAULT_PARK_FLOOR: Duration = Duration::from_micros(50);
    pub const DEFAULT_PARK_CEILING: Duration = Duration::from_millis(10);

    pub fn new(spin_threshold: u32, yield_threshold: u32, park_ceiling: Duration) -> Self {
        Self {
            spin_threshold,
            yield_threshold,
            park_ceiling,
            iteration: 0,
            current_park: Self::DEFAULT_PARK_FLOOR,
            started: None,
        }
    }
}

impl Default for LongPauser {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_SPIN_THRESHOLD,
            Self::DEFAULT_YIELD_THRESHOLD,
            Self::DEFAULT_PARK_CEILING,
        )
    }
}

impl Pauser for LongPauser {
    fn pause(&mut self) {
        if self.iteration < self.spin_threshold {
            std::hint::spin_loop();
        } else if self.iteration < self.yield_threshold {
            std::thread::yield_now();
        } else {
            std::thread::sleep(self.current_park);
            self.current_park = (self.current_park * 2).min(self.park_ceiling);
            tracing::trace!(park_micros = ?self.current_park.as_micros(), "pauser escalated to park");
        }
        self.iteration += 1;
    }

    fn pause_timeout(&mut self, timeout: Duration) -> CoreResult<()> {
        let started = *self.started.get_or_insert_with(Instant::now);
        if started.elapsed() > timeout {
            return Err(CoreError::Timeout {
                budget_millis: timeout.as_millis() as u64,
            });
        }
        self.pause();
        Ok(())
    }

    fn reset(&mut self) {
        self.iteration = 0;
        self.current_park = Self::DEFAULT_PARK_FLOOR;
        self.started = None;
    }
}
