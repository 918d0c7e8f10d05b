#![cfg_attr(not(test), no_std)]

//! Console subsystem for the Ember kernel
//!
//! Turns raw keyboard interrupts into line-buffered text available to
//! processes, echoes that text (and kernel diagnostic output) to the VGA
//! text display and the serial port, and retains recently submitted
//! command lines.
//!
//! Three actors coordinate through a single lock and a sleep/wakeup
//! channel: the keyboard interrupt handler (must not block), a blocked
//! reading process (must be cancellable on kill), and the output path
//! (must keep working during a kernel panic, when locking is bypassed).
//!
//! Hardware access sits behind narrow traits ([`vga_buffer::TextCells`],
//! [`vga_buffer::CursorPort`], [`serial::SerialSink`], [`cpu::Cpu`]) so
//! the whole subsystem runs under hosted tests with in-memory doubles.

pub mod console;
pub mod cpu;
pub mod device;
pub mod history;
pub mod input;
pub mod keyboard;
pub mod printf;
pub mod proc;
pub mod sched;
pub mod serial;
pub mod syscall;
pub mod vga_buffer;

#[cfg(test)]
pub(crate) mod test_support;

pub use console::{Console, IntrAction, ReadError};
pub use printf::{FmtArg, FmtError};

/// Initialize the console subsystem on real hardware: bring up the serial
/// port, register the console in the device switch table, and unmask the
/// keyboard interrupt line.
pub fn init() {
    console::init();
}
