//! Command history ring
//!
//! The most recent submitted command lines, oldest first. Slots are fixed
//! 128-byte NUL-terminated buffers so the history syscall can hand a whole
//! slot to userspace in one copy. When all 16 slots are occupied a new
//! line evicts the oldest by shifting every entry one slot toward index 0.

use ember_common::history::{SLOTS, SLOT_SIZE};

/// Number of retained lines.
pub const MAX_HISTORY: usize = SLOTS;
/// Slot size in bytes, including the NUL terminator.
pub const MAX_BUFFER: usize = SLOT_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    /// No line has been recorded under this id yet.
    NotFound,
    /// The id is outside `0..MAX_HISTORY`.
    BadIndex,
}

pub struct HistoryRing {
    entries: [[u8; MAX_BUFFER]; MAX_HISTORY],
    count: usize,
    current: usize,
}

impl HistoryRing {
    pub const fn new() -> Self {
        HistoryRing {
            entries: [[0; MAX_BUFFER]; MAX_HISTORY],
            count: 0,
            current: 0,
        }
    }

    /// Record a submitted line. Empty lines are not recorded. Lines that
    /// do not fit a slot are clamped to 126 bytes, keeping one byte for
    /// the terminator.
    pub fn record(&mut self, line: &[u8]) {
        if line.is_empty() {
            return;
        }
        let len = if line.len() < MAX_BUFFER {
            line.len()
        } else {
            MAX_BUFFER - 2
        };

        if self.count < MAX_HISTORY {
            self.count += 1;
        } else {
            // evict the oldest entry
            self.entries.copy_within(1..MAX_HISTORY, 0);
        }

        let slot = &mut self.entries[self.count - 1];
        *slot = [0; MAX_BUFFER];
        slot[..len].copy_from_slice(&line[..len]);
        self.current = self.count - 1;
    }

    /// Retrieve a slot by age, index 0 being the oldest retained line.
    pub fn get(&self, id: usize) -> Result<&[u8; MAX_BUFFER], HistoryError> {
        if id >= MAX_HISTORY {
            Err(HistoryError::BadIndex)
        } else if id >= self.count {
            Err(HistoryError::NotFound)
        } else {
            Ok(&self.entries[id])
        }
    }

    /// Entries recorded so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Slot index of the most recently recorded line.
    pub fn current_id(&self) -> usize {
        self.current
    }
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::new()
    }
}
