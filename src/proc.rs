//! Process table boundary
//!
//! The console needs three things from process management: a kill flag to
//! cancel blocked reads, a wakeup target for completed lines, and a table
//! snapshot for the `^P` listing and the ptable syscall. This module keeps
//! a minimal table sufficient for those, plus the [`SchedHooks`]
//! implementation the kernel read path runs on.

use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

use ember_common::uproc::{state_label, ProcRecord, NAME_LEN, RECORD_SIZE};

use crate::console::Console;
use crate::cpu::Cpu;
use crate::printf::FmtArg;
use crate::sched::{SchedHooks, WaitChannel};
use crate::serial::SerialSink;
use crate::vga_buffer::Screen;

/// Size of the process table.
pub const NPROC: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ProcState {
    Unused = 0,
    Embryo = 1,
    Sleeping = 2,
    Runnable = 3,
    Running = 4,
    Zombie = 5,
}

#[derive(Clone, Copy)]
pub struct Proc {
    pub state: ProcState,
    pub pid: i32,
    pub ppid: i32,
    pub killed: bool,
    pub name: [u8; NAME_LEN],
}

const UNUSED: Proc = Proc {
    state: ProcState::Unused,
    pid: 0,
    ppid: 0,
    killed: false,
    name: [0; NAME_LEN],
};

static PTABLE: Mutex<[Proc; NPROC]> = Mutex::new([UNUSED; NPROC]);

/// Table slot of the process running on this cpu.
static CURRENT: AtomicUsize = AtomicUsize::new(0);

/// Fill the first free slot with a process entry; returns its slot index.
pub fn install(state: ProcState, pid: i32, ppid: i32, name: &str) -> Option<usize> {
    let mut table = PTABLE.lock();
    let slot = table.iter().position(|p| p.state == ProcState::Unused)?;
    let mut entry = Proc {
        state,
        pid,
        ppid,
        killed: false,
        name: [0; NAME_LEN],
    };
    let n = name.len().min(NAME_LEN - 1);
    entry.name[..n].copy_from_slice(&name.as_bytes()[..n]);
    table[slot] = entry;
    Some(slot)
}

pub fn set_current(slot: usize) {
    CURRENT.store(slot, Ordering::Release);
}

/// Mark the process in `slot` for termination.
pub fn kill(slot: usize) {
    let mut table = PTABLE.lock();
    if slot < NPROC {
        table[slot].killed = true;
    }
}

/// Whether the process running on this cpu has been marked for
/// termination.
pub fn current_killed() -> bool {
    let table = PTABLE.lock();
    table[CURRENT.load(Ordering::Acquire)].killed
}

/// Serialize occupied table slots into `dst` as fixed-size records,
/// stopping at the first unused slot or when `dst` runs out of room.
/// Returns the number of bytes written.
pub fn snapshot(dst: &mut [u8]) -> usize {
    let table = PTABLE.lock();
    let mut written = 0;
    for p in table.iter() {
        if p.state == ProcState::Unused {
            break;
        }
        if dst.len() - written < RECORD_SIZE {
            break;
        }
        let record = ProcRecord {
            state: p.state as u32,
            pid: p.pid,
            ppid: p.ppid,
            name: p.name,
        };
        match record.encode(&mut dst[written..]) {
            Some(n) => written += n,
            None => break,
        }
    }
    written
}

/// Print one line per occupied slot: pid, state label, name. The `^P`
/// listing, run by the keyboard path after the console lock drops.
pub fn dump<V: Screen, S: SerialSink, C: Cpu>(cons: &Console<V, S, C>) {
    let table = PTABLE.lock();
    let _ = cons.printf("\n", &[]);
    for p in table.iter() {
        if p.state == ProcState::Unused {
            continue;
        }
        let name = core::str::from_utf8(&p.name)
            .unwrap_or("???")
            .trim_end_matches('\0');
        let _ = cons.printf(
            "%d %s %s\n",
            &[
                FmtArg::Int(p.pid),
                FmtArg::Str(Some(state_label(p.state as u32))),
                FmtArg::Str(Some(name)),
            ],
        );
    }
}

/// Scheduler hooks for kernel execution. Parking busy-waits on the
/// channel generation; the kill flag doubles as a wakeup condition so a
/// killed process leaves its read promptly.
pub struct KernelSched;

impl SchedHooks for KernelSched {
    fn park(&self, chan: &WaitChannel, observed: u64) {
        while chan.generation() == observed && !current_killed() {
            core::hint::spin_loop();
        }
    }

    fn current_killed(&self) -> bool {
        current_killed()
    }
}

#[cfg(test)]
pub(crate) fn reset() {
    *PTABLE.lock() = [UNUSED; NPROC];
    CURRENT.store(0, Ordering::Release);
}

// The table and current-slot globals are shared across the test binary;
// every test that touches them takes this guard, which also clears them.
#[cfg(test)]
pub(crate) fn lock_table_for_test() -> std::sync::MutexGuard<'static, ()> {
    static GUARD: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let guard = GUARD.lock().unwrap_or_else(|e| e.into_inner());
    reset();
    guard
}
