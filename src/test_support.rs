//! In-memory doubles for the hardware seams, shared by unit tests.

use crate::cpu::Cpu;
use crate::sched::{SchedHooks, WaitChannel};
use crate::serial::SerialSink;
use crate::vga_buffer::{CursorPort, TextCells, BUFFER_HEIGHT, BUFFER_WIDTH};

const CELLS: usize = BUFFER_HEIGHT * BUFFER_WIDTH;

/// A plain array standing in for the CGA grid.
pub struct MemCells {
    cells: [u16; CELLS],
}

impl MemCells {
    pub fn new() -> Self {
        MemCells { cells: [0; CELLS] }
    }

    pub fn at(&self, i: usize) -> u16 {
        self.cells[i]
    }
}

impl TextCells for MemCells {
    fn read(&self, at: usize) -> u16 {
        self.cells[at]
    }

    fn write(&mut self, at: usize, cell: u16) {
        self.cells[at] = cell;
    }
}

/// A cursor held in memory instead of CRT registers.
pub struct MemCursor {
    at: usize,
}

impl MemCursor {
    pub fn new(at: usize) -> Self {
        MemCursor { at }
    }

    pub fn get(&self) -> usize {
        self.at
    }
}

impl CursorPort for MemCursor {
    fn position(&mut self) -> usize {
        self.at
    }

    fn set_position(&mut self, at: usize) {
        self.at = at;
    }
}

/// Captures the serial byte stream.
pub struct TestSerial {
    pub bytes: Vec<u8>,
}

impl TestSerial {
    pub fn new() -> Self {
        TestSerial { bytes: Vec::new() }
    }
}

impl SerialSink for TestSerial {
    fn put(&mut self, b: u8) {
        self.bytes.push(b);
    }
}

/// A CPU whose terminal freeze unwinds instead of spinning, so tests can
/// observe it.
pub struct TestCpu;

impl Cpu for TestCpu {
    fn unit_id(&self) -> u32 {
        0
    }

    fn interrupts_off(&self) {}

    fn freeze(&self) -> ! {
        panic!("cpu frozen");
    }

    fn call_stack(&self, pcs: &mut [usize]) {
        for (i, slot) in pcs.iter_mut().enumerate() {
            *slot = 0x8010_0000 + i;
        }
    }
}

/// For tests that must never block: parking is a bug.
pub struct NopSched;

impl SchedHooks for NopSched {
    fn park(&self, _chan: &WaitChannel, _observed: u64) {
        panic!("unexpected park");
    }

    fn current_killed(&self) -> bool {
        false
    }
}
