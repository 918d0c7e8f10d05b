//! VGA text-mode display
//!
//! Renders characters into the 80x25 CGA text grid at `0xb8000` and keeps
//! the hardware cursor in sync through the CRT controller register pair.
//! The cursor is never cached in memory: it is read back from the
//! controller before every update, so the hardware registers stay the
//! single source of truth.
//!
//! The grid and the cursor are abstracted behind [`TextCells`] and
//! [`CursorPort`] so [`Writer`] can be driven against in-memory doubles
//! in tests.

use volatile::Volatile;
use x86_64::instructions::port::Port;

/// Visible rows of the text grid.
pub const BUFFER_HEIGHT: usize = 25;
/// Columns of the text grid.
pub const BUFFER_WIDTH: usize = 80;

const CELLS: usize = BUFFER_HEIGHT * BUFFER_WIDTH;

/// Display attribute applied to every character: light grey on black.
const ATTR: u16 = 0x0700;

/// CRT controller index/data register pair.
const CRT_INDEX: u16 = 0x3D4;
const CRT_DATA: u16 = 0x3D5;

/// In-band control byte that moves the cursor one column left.
pub const BS: u8 = 0x08;

/// Raw cell storage of the text grid, linear offsets `0..25*80`.
pub trait TextCells {
    fn read(&self, at: usize) -> u16;
    fn write(&mut self, at: usize, cell: u16);
}

/// Hardware cursor access. Reading and writing the position each take two
/// port operations (index then data); callers must hold the console lock
/// so the pair is never interleaved.
pub trait CursorPort {
    fn position(&mut self) -> usize;
    fn set_position(&mut self, at: usize);
}

/// A cursor position outside the valid range. Fatal: the console escalates
/// this to a kernel panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorFault {
    pub at: usize,
}

#[repr(transparent)]
struct Buffer {
    cells: [Volatile<u16>; CELLS],
}

/// The memory-mapped CGA grid.
pub struct VgaCells {
    buffer: &'static mut Buffer,
}

impl VgaCells {
    /// # Safety
    ///
    /// The CGA text buffer must be identity-mapped at `0xb8000` and this
    /// must be the only live handle to it.
    pub unsafe fn new() -> Self {
        VgaCells {
            buffer: &mut *(0xb8000 as *mut Buffer),
        }
    }
}

impl TextCells for VgaCells {
    fn read(&self, at: usize) -> u16 {
        self.buffer.cells[at].read()
    }

    fn write(&mut self, at: usize, cell: u16) {
        self.buffer.cells[at].write(cell);
    }
}

/// The CRT controller's cursor location registers (14: high, 15: low).
pub struct CrtPorts {
    index: Port<u8>,
    data: Port<u8>,
}

impl CrtPorts {
    pub fn new() -> Self {
        CrtPorts {
            index: Port::new(CRT_INDEX),
            data: Port::new(CRT_DATA),
        }
    }
}

impl Default for CrtPorts {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorPort for CrtPorts {
    fn position(&mut self) -> usize {
        unsafe {
            self.index.write(14u8);
            let hi = self.data.read() as usize;
            self.index.write(15u8);
            let lo = self.data.read() as usize;
            (hi << 8) | lo
        }
    }

    fn set_position(&mut self, at: usize) {
        unsafe {
            self.index.write(14u8);
            self.data.write((at >> 8) as u8);
            self.index.write(15u8);
            self.data.write(at as u8);
        }
    }
}

/// Display half of the console output sink.
pub trait Screen {
    fn put(&mut self, b: u8) -> Result<(), CursorFault>;
}

impl<T: TextCells, P: CursorPort> Screen for Writer<T, P> {
    fn put(&mut self, b: u8) -> Result<(), CursorFault> {
        Writer::put(self, b)
    }
}

/// Character renderer over a cell grid and a cursor.
pub struct Writer<T: TextCells, P: CursorPort> {
    cells: T,
    cursor: P,
}

impl<T: TextCells, P: CursorPort> Writer<T, P> {
    pub fn new(cells: T, cursor: P) -> Self {
        Writer { cells, cursor }
    }

    /// Render one byte at the hardware cursor.
    ///
    /// `\n` advances to column 0 of the next row. [`BS`] moves one column
    /// left, stopping at column 0 of the current row. Anything else is
    /// written with the fixed attribute and advances the cursor by one.
    /// When the cursor ends up on the second-to-last visible row or past
    /// it, the grid scrolls up by one row and the exposed tail is cleared.
    /// A blank cell is always left under the final cursor position, which
    /// also rubs out the character a backspace stepped over.
    pub fn put(&mut self, b: u8) -> Result<(), CursorFault> {
        let mut at = self.cursor.position();
        if at > CELLS {
            return Err(CursorFault { at });
        }

        match b {
            b'\n' => at += BUFFER_WIDTH - at % BUFFER_WIDTH,
            BS => {
                if at % BUFFER_WIDTH > 0 {
                    at -= 1;
                }
            }
            _ => {
                if at >= CELLS {
                    return Err(CursorFault { at });
                }
                self.cells.write(at, u16::from(b) | ATTR);
                at += 1;
            }
        }

        if at > CELLS {
            return Err(CursorFault { at });
        }

        if at / BUFFER_WIDTH >= BUFFER_HEIGHT - 1 {
            // Scroll up: rows 1..=H-2 move into 0..=H-3, cursor follows,
            // and the tail of the new bottom row is blanked.
            for i in 0..(BUFFER_HEIGHT - 2) * BUFFER_WIDTH {
                let v = self.cells.read(i + BUFFER_WIDTH);
                self.cells.write(i, v);
            }
            at -= BUFFER_WIDTH;
            for i in at..(BUFFER_HEIGHT - 1) * BUFFER_WIDTH {
                self.cells.write(i, u16::from(b' ') | ATTR);
            }
        }

        self.cursor.set_position(at);
        self.cells.write(at, u16::from(b' ') | ATTR);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemCells, MemCursor};

    fn writer() -> Writer<MemCells, MemCursor> {
        Writer::new(MemCells::new(), MemCursor::new(0))
    }

    fn cell(b: u8) -> u16 {
        u16::from(b) | ATTR
    }

    #[test]
    fn plain_bytes_advance_cursor() {
        let mut w = writer();
        w.put(b'h').unwrap();
        w.put(b'i').unwrap();
        assert_eq!(w.cells.at(0), cell(b'h'));
        assert_eq!(w.cells.at(1), cell(b'i'));
        assert_eq!(w.cursor.get(), 2);
        // blank rubbed in under the cursor
        assert_eq!(w.cells.at(2), cell(b' '));
    }

    #[test]
    fn newline_moves_to_next_row_column_zero() {
        let mut w = writer();
        w.put(b'a').unwrap();
        w.put(b'\n').unwrap();
        assert_eq!(w.cursor.get(), BUFFER_WIDTH);
    }

    #[test]
    fn backspace_floors_at_column_zero() {
        let mut w = writer();
        w.put(b'a').unwrap();
        w.put(BS).unwrap();
        assert_eq!(w.cursor.get(), 0);
        assert_eq!(w.cells.at(0), cell(b' '));
        // at column 0 a backspace must not wrap to the previous row
        w.put(BS).unwrap();
        assert_eq!(w.cursor.get(), 0);

        let mut w = Writer::new(MemCells::new(), MemCursor::new(BUFFER_WIDTH));
        w.put(BS).unwrap();
        assert_eq!(w.cursor.get(), BUFFER_WIDTH);
    }

    #[test]
    fn scroll_shifts_rows_up_and_clears_bottom() {
        let mut w = writer();
        w.put(b'x').unwrap();
        // newlines down to the row that triggers scrolling
        for _ in 0..BUFFER_HEIGHT - 1 {
            w.put(b'\n').unwrap();
        }
        // 'x' scrolled off the top, cursor on column 0 of the bottom row
        assert_ne!(w.cells.at(0), cell(b'x'));
        assert_eq!(w.cursor.get(), (BUFFER_HEIGHT - 2) * BUFFER_WIDTH);
        for col in 0..BUFFER_WIDTH {
            assert_eq!(
                w.cells.at((BUFFER_HEIGHT - 2) * BUFFER_WIDTH + col),
                cell(b' ')
            );
        }
    }

    #[test]
    fn scroll_moves_rows_by_exactly_one() {
        let mut w = writer();
        w.put(b'a').unwrap();
        w.put(b'\n').unwrap();
        w.put(b'b').unwrap();
        for _ in 0..BUFFER_HEIGHT - 2 {
            w.put(b'\n').unwrap();
        }
        // one scroll so far: 'a' now gone, 'b' moved from row 1 to row 0
        assert_eq!(w.cells.at(0), cell(b'b'));
        assert_ne!(w.cells.at(BUFFER_WIDTH), cell(b'b'));
    }

    #[test]
    fn out_of_range_cursor_is_a_fault() {
        let mut w = Writer::new(MemCells::new(), MemCursor::new(CELLS + 1));
        assert_eq!(w.put(b'a'), Err(CursorFault { at: CELLS + 1 }));
        let mut w = Writer::new(MemCells::new(), MemCursor::new(CELLS));
        assert_eq!(w.put(b'a'), Err(CursorFault { at: CELLS }));
    }
}
