//! Scheduler boundary
//!
//! The console consumes sleep/wakeup rather than implementing it. A
//! [`WaitChannel`] is a generation counter: a waiter samples the
//! generation while still holding the console lock, releases the lock,
//! and parks until the generation moves. Because the producer bumps the
//! generation under the same lock before the waiter parks, a wakeup
//! issued between the sample and the park is never lost.

use core::sync::atomic::{AtomicU64, Ordering};

/// An address-identified rendezvous point for sleeping readers.
pub struct WaitChannel {
    generation: AtomicU64,
}

impl WaitChannel {
    pub const fn new() -> Self {
        WaitChannel {
            generation: AtomicU64::new(0),
        }
    }

    /// Sample the current generation. Must be called with the lock that
    /// guards the awaited condition still held.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Advance the generation, releasing every parked waiter.
    pub fn wake(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }
}

impl Default for WaitChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduler primitives consumed by the blocking read path.
pub trait SchedHooks {
    /// Suspend until `chan`'s generation differs from `observed`. May
    /// return spuriously (in particular when the caller is killed); the
    /// waiter re-checks its condition under the lock after every return.
    fn park(&self, chan: &WaitChannel, observed: u64);

    /// Nudge waiters on `chan`. The generation has already been advanced
    /// when this is called; implementations that poll need do nothing.
    fn unpark(&self, _chan: &WaitChannel) {}

    /// Whether the calling process has been marked for termination.
    fn current_killed(&self) -> bool;
}
