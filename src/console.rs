//! Console core
//!
//! One lock guards everything: the input ring the keyboard interrupt
//! fills, the history ring, and both output sinks. The keyboard interrupt
//! appends and edits under the lock and never blocks; readers block on a
//! wait channel until a completed line exists; diagnostic output takes the
//! lock for a whole `printf` call unless a panic has disabled locking, in
//! which case the lock is taken over rather than acquired.
//!
//! Special input bytes:
//!
//! * `newline` -- end of line (carriage return is normalized to it)
//! * `control-h` / `delete` -- backspace
//! * `control-u` -- kill line
//! * `control-d` -- end of input
//! * `control-p` -- request a process listing (run after the lock drops)

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use conquer_once::spin::OnceCell;
use spin::{Mutex, MutexGuard};

use crate::cpu::{Cpu, X86Cpu, TRACE_DEPTH};
use crate::device::{self, Device};
use crate::history::{HistoryError, HistoryRing, MAX_BUFFER};
use crate::input::InputBuffer;
use crate::keyboard;
use crate::printf::{self, FmtArg, FmtError};
use crate::proc;
use crate::sched::{SchedHooks, WaitChannel};
use crate::serial::{SerialSink, Uart};
use crate::vga_buffer::{CrtPorts, CursorFault, Screen, VgaCells, Writer, BS};

const fn ctrl(b: u8) -> u8 {
    b - b'@'
}

pub const CTRL_P: u8 = ctrl(b'P');
pub const CTRL_U: u8 = ctrl(b'U');
pub const CTRL_H: u8 = ctrl(b'H');
pub const CTRL_D: u8 = ctrl(b'D');
pub const DEL: u8 = 0x7f;

/// Lifecycle of the console. `Halted` is terminal: every subsequent
/// output call freezes the calling execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Running = 0,
    Panicking = 1,
    Halted = 2,
}

/// Work the interrupt handler wants done once the console lock is
/// released, so cross-subsystem calls never re-enter the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrAction {
    None,
    ProcessDump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// The calling process was marked for termination while waiting.
    Killed,
}

struct ConsoleInner<V, S> {
    screen: V,
    serial: S,
    input: InputBuffer,
    history: HistoryRing,
}

/// The console subsystem. One instance exists per machine, created at
/// boot and handed out through the device switch table.
pub struct Console<V: Screen, S: SerialSink, C: Cpu> {
    inner: Mutex<ConsoleInner<V, S>>,
    locking: AtomicBool,
    state: AtomicU8,
    chan: WaitChannel,
    cpu: C,
}

impl<V: Screen, S: SerialSink, C: Cpu> Console<V, S, C> {
    pub fn new(screen: V, serial: S, cpu: C) -> Self {
        Console {
            inner: Mutex::new(ConsoleInner {
                screen,
                serial,
                input: InputBuffer::new(),
                history: HistoryRing::new(),
            }),
            locking: AtomicBool::new(true),
            state: AtomicU8::new(RunState::Running as u8),
            chan: WaitChannel::new(),
            cpu,
        }
    }

    pub fn state(&self) -> RunState {
        match self.state.load(Ordering::Acquire) {
            0 => RunState::Running,
            1 => RunState::Panicking,
            _ => RunState::Halted,
        }
    }

    /// A halted console emits nothing ever again; the caller freezes.
    fn check_halted(&self) {
        if self.state() == RunState::Halted {
            self.cpu.interrupts_off();
            self.cpu.freeze();
        }
    }

    /// Take the console lock, or take it over when a panic has disabled
    /// locking (the faulting context may hold it and will never release).
    fn grab(&self) -> MutexGuard<'_, ConsoleInner<V, S>> {
        if self.locking.load(Ordering::Acquire) {
            self.inner.lock()
        } else {
            unsafe { self.inner.force_unlock() };
            self.inner.lock()
        }
    }

    /// Mirror one byte to the serial line and render it on the screen.
    /// Backspace is sent to the serial peer as erase-rubout-erase.
    fn emit(inner: &mut ConsoleInner<V, S>, b: u8) -> Result<(), CursorFault> {
        if b == BS {
            inner.serial.put(BS);
            inner.serial.put(b' ');
            inner.serial.put(BS);
        } else {
            inner.serial.put(b);
        }
        inner.screen.put(b)
    }

    fn put_or_panic<'a>(
        &'a self,
        mut inner: MutexGuard<'a, ConsoleInner<V, S>>,
        b: u8,
    ) -> MutexGuard<'a, ConsoleInner<V, S>> {
        self.check_halted();
        if let Err(fault) = Self::emit(&mut inner, b) {
            drop(inner);
            self.cursor_fault(fault);
        }
        inner
    }

    fn cursor_fault(&self, _fault: CursorFault) -> ! {
        self.panic("console position out of range")
    }

    /// Render `fmt` against `args` through both output sinks.
    ///
    /// Takes the console lock for the full call while locking is enabled.
    /// A cursor fault escalates to a kernel panic unless one is already in
    /// progress, in which case output stays best-effort on the serial side.
    pub fn printf(&self, fmt: &str, args: &[FmtArg]) -> Result<(), FmtError> {
        let mut inner = self.grab();
        let mut fault = None;
        let res = {
            let inner = &mut *inner;
            printf::render(fmt, args, |b| {
                self.check_halted();
                if let Err(f) = Self::emit(inner, b) {
                    fault = Some(f);
                }
            })
        };
        if let Some(f) = fault {
            if self.state() == RunState::Running {
                drop(inner);
                self.cursor_fault(f);
            }
        }
        res
    }

    /// Write raw bytes to the console. The device-switch write entry.
    pub fn write(&self, buf: &[u8]) -> usize {
        let mut inner = self.inner.lock();
        for &b in buf {
            inner = self.put_or_panic(inner, b);
        }
        drop(inner);
        buf.len()
    }

    /// Keystroke processor, driven by the keyboard interrupt path.
    ///
    /// `getc` yields one decoded byte per call, `None` once the source is
    /// exhausted. Editing and echoing happen under the console lock; a
    /// completed line (newline, end-of-input, or the ring filling up) is
    /// recorded in the history ring, committed for readers, and the wait
    /// channel woken. The returned action must be performed by the caller
    /// after this function returns.
    pub fn interrupt(
        &self,
        mut getc: impl FnMut() -> Option<u8>,
        sched: &impl SchedHooks,
    ) -> IntrAction {
        let mut action = IntrAction::None;
        let mut inner = self.inner.lock();
        while let Some(c) = getc() {
            match c {
                CTRL_P => {
                    // the dump locks the console for its own output;
                    // run it only after this handler releases the lock
                    action = IntrAction::ProcessDump;
                }
                CTRL_U => {
                    while inner.input.last_uncommitted().is_some_and(|b| b != b'\n') {
                        inner.input.erase();
                        inner = self.put_or_panic(inner, BS);
                    }
                }
                CTRL_H | DEL => {
                    if inner.input.erase() {
                        inner = self.put_or_panic(inner, BS);
                    }
                }
                _ => {
                    if c == 0 || inner.input.is_full() {
                        continue;
                    }
                    let c = if c == b'\r' { b'\n' } else { c };
                    inner.input.push(c);
                    inner = self.put_or_panic(inner, c);
                    if c == b'\n' || c == CTRL_D || inner.input.is_full() {
                        let mut line = [0u8; MAX_BUFFER];
                        let mut len = inner.input.uncommitted(&mut line);
                        if c == b'\n' || c == CTRL_D {
                            // the terminator is not part of the command
                            len -= 1;
                        }
                        inner.history.record(&line[..len]);
                        inner.input.commit();
                        self.chan.wake();
                        sched.unpark(&self.chan);
                    }
                }
            }
        }
        drop(inner);
        action
    }

    /// Blocking read. The device-switch read entry.
    ///
    /// Sleeps until at least one committed byte exists, returning
    /// [`ReadError::Killed`] without consuming anything if the process is
    /// terminated while waiting. Stops after a newline is consumed. An
    /// end-of-input marker stops the read; if bytes were already produced
    /// the marker is saved so the next read reports 0, making end of
    /// input visible exactly once.
    pub fn read(
        &self,
        dst: &mut [u8],
        sched: &impl SchedHooks,
    ) -> Result<usize, ReadError> {
        let mut n = 0usize;
        let mut inner = self.inner.lock();
        while n < dst.len() {
            while !inner.input.has_committed() {
                if sched.current_killed() {
                    return Err(ReadError::Killed);
                }
                let observed = self.chan.generation();
                drop(inner);
                sched.park(&self.chan, observed);
                inner = self.inner.lock();
            }
            let Some(c) = inner.input.take() else { break };
            if c == CTRL_D {
                if n > 0 {
                    inner.input.put_back();
                }
                break;
            }
            dst[n] = c;
            n += 1;
            if c == b'\n' {
                break;
            }
        }
        Ok(n)
    }

    /// Copy the history slot for `id` (0 = oldest retained line).
    pub fn history_entry(&self, id: usize, out: &mut [u8]) -> Result<(), HistoryError> {
        let inner = self.inner.lock();
        let slot = inner.history.get(id)?;
        let n = out.len().min(MAX_BUFFER);
        out[..n].copy_from_slice(&slot[..n]);
        Ok(())
    }

    /// Lines recorded in the history ring so far.
    pub fn history_len(&self) -> usize {
        self.inner.lock().history.len()
    }

    #[cfg(test)]
    pub(crate) fn with_serial<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.lock().serial)
    }

    /// Terminal diagnostic path.
    ///
    /// Masks interrupts, disables console locking so its own output never
    /// deadlocks on a lock held by the faulting context, renders the tag,
    /// the message and a caller trace, then halts this execution unit
    /// forever. Other units freeze at their next emit.
    pub fn panic(&self, msg: &str) -> ! {
        self.cpu.interrupts_off();
        self.locking.store(false, Ordering::Release);
        self.state
            .store(RunState::Panicking as u8, Ordering::Release);
        let _ = self.printf(
            "lapicid %d: panic: %s\n",
            &[
                FmtArg::Int(self.cpu.unit_id() as i32),
                FmtArg::Str(Some(msg)),
            ],
        );
        let mut pcs = [0usize; TRACE_DEPTH];
        self.cpu.call_stack(&mut pcs);
        for &pc in &pcs {
            let _ = self.printf(" %p", &[FmtArg::Ptr(pc)]);
        }
        self.state.store(RunState::Halted as u8, Ordering::Release);
        self.cpu.freeze()
    }
}

/// The hardware console: VGA grid, CRT cursor, COM1 mirror.
pub type KernelConsole = Console<Writer<VgaCells, CrtPorts>, Uart, X86Cpu>;

static CONSOLE: OnceCell<KernelConsole> = OnceCell::uninit();

/// The one console instance of this machine.
pub fn console() -> &'static KernelConsole {
    CONSOLE.get_or_init(|| {
        let screen = Writer::new(unsafe { VgaCells::new() }, CrtPorts::new());
        Console::new(screen, Uart::new(), X86Cpu)
    })
}

/// Bring the console up: serial line settings, device-switch entries,
/// keyboard interrupt line.
pub fn init() {
    let cons = console();
    cons.inner.lock().serial.init();
    device::register(
        device::CONSOLE,
        Device {
            read: console_read,
            write: console_write,
        },
    );
    keyboard::enable_keyboard_line();
}

fn console_read(dst: &mut [u8]) -> Result<usize, ReadError> {
    console().read(dst, &proc::KernelSched)
}

fn console_write(buf: &[u8]) -> usize {
    console().write(buf)
}
