//! Bounded input ring
//!
//! Raw bytes from the keyboard land here before a reader consumes them.
//! Three monotonically increasing counters index the ring: `r` is the next
//! byte a reader will take, `w` is the boundary of the last completed line,
//! and `e` is the slot the line discipline writes next. The physical slot
//! for logical position `i` is `i % INPUT_BUF`.
//!
//! Invariant, checked on every mutation in debug builds:
//! `r <= w <= e` and `e - r <= INPUT_BUF`.

/// Capacity of the input ring.
pub const INPUT_BUF: usize = 128;

pub struct InputBuffer {
    buf: [u8; INPUT_BUF],
    r: usize,
    w: usize,
    e: usize,
}

impl InputBuffer {
    pub const fn new() -> Self {
        InputBuffer {
            buf: [0; INPUT_BUF],
            r: 0,
            w: 0,
            e: 0,
        }
    }

    fn check(&self) {
        debug_assert!(self.r <= self.w);
        debug_assert!(self.w <= self.e);
        debug_assert!(self.e - self.r <= INPUT_BUF);
    }

    /// True once the edit cursor has run a full capacity ahead of the
    /// read cursor; no further bytes are accepted until a commit drains.
    pub fn is_full(&self) -> bool {
        self.e - self.r >= INPUT_BUF
    }

    /// Append one byte at the edit cursor. Returns `false` (dropping the
    /// byte) when the ring is full.
    pub fn push(&mut self, b: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.buf[self.e % INPUT_BUF] = b;
        self.e += 1;
        self.check();
        true
    }

    /// Retreat the edit cursor over one uncommitted byte.
    pub fn erase(&mut self) -> bool {
        if self.e == self.w {
            return false;
        }
        self.e -= 1;
        self.check();
        true
    }

    /// The byte most recently written and not yet committed, if any.
    pub fn last_uncommitted(&self) -> Option<u8> {
        if self.e == self.w {
            None
        } else {
            Some(self.buf[(self.e - 1) % INPUT_BUF])
        }
    }

    /// Copy the uncommitted span (between the commit and edit cursors)
    /// into `out`, returning how many bytes were copied.
    pub fn uncommitted(&self, out: &mut [u8]) -> usize {
        let n = (self.e - self.w).min(out.len());
        for (k, slot) in out[..n].iter_mut().enumerate() {
            *slot = self.buf[(self.w + k) % INPUT_BUF];
        }
        n
    }

    /// Advance the commit cursor to the edit cursor, making everything
    /// written so far visible to readers.
    pub fn commit(&mut self) {
        self.w = self.e;
        self.check();
    }

    /// True when committed bytes are available to a reader.
    pub fn has_committed(&self) -> bool {
        self.r != self.w
    }

    /// Consume one committed byte.
    pub fn take(&mut self) -> Option<u8> {
        if self.r == self.w {
            return None;
        }
        let b = self.buf[self.r % INPUT_BUF];
        self.r += 1;
        self.check();
        Some(b)
    }

    /// Undo the most recent [`take`](Self::take), leaving the byte for the
    /// next reader.
    pub fn put_back(&mut self) {
        debug_assert!(self.r > 0);
        self.r -= 1;
        self.check();
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new()
    }
}
