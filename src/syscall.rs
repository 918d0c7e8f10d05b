//! Syscall surface
//!
//! Number-indexed dispatch into the console subsystem. Handlers validate
//! raw user arguments before touching any subsystem state and report
//! failures as small negative return values; anything else is the
//! non-negative result.

use core::fmt;

use ember_common::uproc::RECORD_SIZE;

use crate::console::{self, ReadError};
use crate::device;
use crate::history::{HistoryError, MAX_BUFFER, MAX_HISTORY};
use crate::proc;

/// Largest transfer a single read or write syscall will attempt.
pub const MAX_IO: usize = 4096;

/// Syscall numbers.
pub mod nr {
    pub const READ: usize = 0;
    pub const WRITE: usize = 1;
    pub const HISTORY: usize = 2;
    pub const GETPTABLE: usize = 3;
}

/// Failures reported to userspace. Each variant maps to a distinct
/// negative return value so callers can tell a malformed request from an
/// id that is merely out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysError {
    /// Bad argument, unknown device or number, missing data, or a caller
    /// killed mid-call.
    Invalid,
    /// A structurally valid id outside the supported range.
    OutOfRange,
}

impl SysError {
    pub fn to_return_value(self) -> i64 {
        match self {
            SysError::Invalid => -1,
            SysError::OutOfRange => -2,
        }
    }
}

impl fmt::Display for SysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SysError::Invalid => f.write_str("invalid argument"),
            SysError::OutOfRange => f.write_str("out of range"),
        }
    }
}

/// Raw argument registers as delivered by the trap frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyscallArgs {
    pub a: [u64; 6],
}

type Handler = fn(&SyscallArgs) -> Result<i64, SysError>;

static SYSCALL_TABLE: [Handler; 4] = [sys_read, sys_write, sys_history, sys_getptable];

/// Route a trap to its handler and fold the result into one return
/// register. Unknown numbers fail like any other bad argument.
pub fn dispatch(num: usize, args: &SyscallArgs) -> i64 {
    match SYSCALL_TABLE.get(num) {
        Some(handler) => match handler(args) {
            Ok(v) => v,
            Err(e) => e.to_return_value(),
        },
        None => SysError::Invalid.to_return_value(),
    }
}

fn user_slice_mut(ptr: u64, len: usize) -> Result<&'static mut [u8], SysError> {
    if ptr == 0 || len == 0 || len > MAX_IO {
        return Err(SysError::Invalid);
    }
    // Pointer validity is the trap layer's problem; by the time a syscall
    // reaches dispatch the range has been checked against the user page
    // table.
    Ok(unsafe { core::slice::from_raw_parts_mut(ptr as *mut u8, len) })
}

fn user_slice(ptr: u64, len: usize) -> Result<&'static [u8], SysError> {
    if ptr == 0 || len == 0 || len > MAX_IO {
        return Err(SysError::Invalid);
    }
    Ok(unsafe { core::slice::from_raw_parts(ptr as *const u8, len) })
}

/// `read(dev, buf, n)`: block until the device produces bytes.
fn sys_read(args: &SyscallArgs) -> Result<i64, SysError> {
    let num = args.a[0] as usize;
    let dst = user_slice_mut(args.a[1], args.a[2] as usize)?;
    let dev = device::get(num).ok_or(SysError::Invalid)?;
    match (dev.read)(dst) {
        Ok(n) => Ok(n as i64),
        Err(ReadError::Killed) => Err(SysError::Invalid),
    }
}

/// `write(dev, buf, n)`: push bytes through the device.
fn sys_write(args: &SyscallArgs) -> Result<i64, SysError> {
    let num = args.a[0] as usize;
    let src = user_slice(args.a[1], args.a[2] as usize)?;
    let dev = device::get(num).ok_or(SysError::Invalid)?;
    Ok((dev.write)(src) as i64)
}

/// `history(buf, id)`: copy one retained command line into a 128-byte
/// user buffer. The id range is checked before the console is consulted,
/// so an out-of-range id is distinguishable from an empty slot.
fn sys_history(args: &SyscallArgs) -> Result<i64, SysError> {
    let id = args.a[1] as usize;
    if args.a[0] == 0 {
        return Err(SysError::Invalid);
    }
    if id >= MAX_HISTORY {
        return Err(SysError::OutOfRange);
    }
    let dst = user_slice_mut(args.a[0], MAX_BUFFER)?;
    match console::console().history_entry(id, dst) {
        Ok(()) => Ok(0),
        Err(HistoryError::NotFound) => Err(SysError::Invalid),
        Err(HistoryError::BadIndex) => Err(SysError::OutOfRange),
    }
}

/// `getptable(n, buf)`: serialize the process table into a user buffer of
/// `n` bytes. The tail of the buffer is zeroed, so the first record with
/// an unused state code marks the end of the listing.
fn sys_getptable(args: &SyscallArgs) -> Result<i64, SysError> {
    let size = (args.a[0] as usize).min(proc::NPROC * RECORD_SIZE);
    if size < RECORD_SIZE {
        return Err(SysError::Invalid);
    }
    let ptr = args.a[1];
    if ptr == 0 {
        return Err(SysError::Invalid);
    }
    let dst = unsafe { core::slice::from_raw_parts_mut(ptr as *mut u8, size) };
    let written = proc::snapshot(dst);
    dst[written..].fill(0);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proc::ProcState;
    use ember_common::uproc::ProcRecord;

    fn args(a0: u64, a1: u64, a2: u64) -> SyscallArgs {
        SyscallArgs {
            a: [a0, a1, a2, 0, 0, 0],
        }
    }

    fn stub_read(dst: &mut [u8]) -> Result<usize, ReadError> {
        let n = dst.len().min(3);
        dst[..n].copy_from_slice(&b"xyz"[..n]);
        Ok(n)
    }

    fn stub_write(buf: &[u8]) -> usize {
        buf.len()
    }

    fn register_stub(num: usize) {
        device::register(
            num,
            device::Device {
                read: stub_read,
                write: stub_write,
            },
        );
    }

    #[test]
    fn unknown_syscall_number_is_invalid() {
        assert_eq!(dispatch(99, &args(0, 0, 0)), -1);
    }

    #[test]
    fn read_rejects_bad_arguments_before_touching_devices() {
        let mut buf = [0u8; 8];
        let ptr = buf.as_mut_ptr() as u64;
        // null pointer
        assert_eq!(dispatch(nr::READ, &args(5, 0, 8)), -1);
        // zero and oversized lengths
        assert_eq!(dispatch(nr::READ, &args(5, ptr, 0)), -1);
        assert_eq!(dispatch(nr::READ, &args(5, ptr, MAX_IO as u64 + 1)), -1);
        // unregistered device
        assert_eq!(dispatch(nr::READ, &args(5, ptr, 8)), -1);
    }

    #[test]
    fn read_and_write_go_through_the_device_switch() {
        register_stub(6);
        let mut buf = [0u8; 8];
        let n = dispatch(nr::READ, &args(6, buf.as_mut_ptr() as u64, 8));
        assert_eq!(n, 3);
        assert_eq!(&buf[..3], b"xyz");

        let msg = b"hello";
        assert_eq!(
            dispatch(nr::WRITE, &args(6, msg.as_ptr() as u64, msg.len() as u64)),
            5
        );
    }

    #[test]
    fn write_rejects_bad_arguments() {
        assert_eq!(dispatch(nr::WRITE, &args(6, 0, 4)), -1);
        let msg = b"hi";
        assert_eq!(dispatch(nr::WRITE, &args(9, msg.as_ptr() as u64, 2)), -1);
    }

    #[test]
    fn history_range_errors_are_distinct_from_invalid() {
        let mut slot = [0u8; MAX_BUFFER];
        let ptr = slot.as_mut_ptr() as u64;
        assert_eq!(dispatch(nr::HISTORY, &args(0, 3, 0)), -1);
        // range check fires before any console state is consulted
        assert_eq!(
            dispatch(nr::HISTORY, &args(ptr, MAX_HISTORY as u64, 0)),
            -2
        );
    }

    #[test]
    fn getptable_serializes_the_process_table() {
        let _g = proc::lock_table_for_test();
        proc::install(ProcState::Running, 1, 1, "init").unwrap();
        proc::install(ProcState::Sleeping, 2, 1, "sh").unwrap();

        let mut buf = [0xAAu8; RECORD_SIZE * 4];
        let ret = dispatch(
            nr::GETPTABLE,
            &args(buf.len() as u64, buf.as_mut_ptr() as u64, 0),
        );
        assert_eq!(ret, 0);
        let rec = ProcRecord::decode(&buf[RECORD_SIZE..2 * RECORD_SIZE]).unwrap();
        assert_eq!(rec.pid, 2);
        assert_eq!(rec.name_str(), "sh");
        // the slot after the last live process decodes as unused
        let end = ProcRecord::decode(&buf[2 * RECORD_SIZE..3 * RECORD_SIZE]).unwrap();
        assert_eq!(end.state, ember_common::uproc::state::UNUSED);
    }

    #[test]
    fn getptable_rejects_undersized_or_null_destinations() {
        let mut buf = [0u8; RECORD_SIZE];
        assert_eq!(
            dispatch(nr::GETPTABLE, &args(RECORD_SIZE as u64 - 1, buf.as_mut_ptr() as u64, 0)),
            -1
        );
        assert_eq!(dispatch(nr::GETPTABLE, &args(RECORD_SIZE as u64, 0, 0)), -1);
    }
}
