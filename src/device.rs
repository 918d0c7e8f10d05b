//! Device switch table
//!
//! Maps small device numbers to read/write entry points so the syscall
//! layer never names a driver directly. Slots are registered once at boot;
//! lookups copy the entry out so no lock is held across a device call.

use spin::Mutex;

use crate::console::ReadError;

/// Size of the device switch table.
pub const NDEV: usize = 10;

/// Device number of the console.
pub const CONSOLE: usize = 1;

/// One switch entry: the read side may block and can fail when the caller
/// is killed, the write side always completes.
#[derive(Clone, Copy)]
pub struct Device {
    pub read: fn(&mut [u8]) -> Result<usize, ReadError>,
    pub write: fn(&[u8]) -> usize,
}

static DEVSW: Mutex<[Option<Device>; NDEV]> = Mutex::new([None; NDEV]);

/// Install `dev` under `num`. Out-of-range numbers are ignored.
pub fn register(num: usize, dev: Device) {
    if num < NDEV {
        DEVSW.lock()[num] = Some(dev);
    }
}

/// Look up the switch entry for `num`, if one is registered.
pub fn get(num: usize) -> Option<Device> {
    if num < NDEV {
        DEVSW.lock()[num]
    } else {
        None
    }
}
