//! Serial port mirror
//!
//! Every character the console renders is also pushed out over COM1 so a
//! host attached to the serial line sees the same stream as the VGA
//! display. The UART sits behind [`SerialSink`] so tests can capture the
//! byte stream instead.

use uart_16550::SerialPort;

const COM1: u16 = 0x3F8;

/// One-way byte sink for the serial mirror.
pub trait SerialSink {
    fn put(&mut self, b: u8);
}

/// The 16550 UART on COM1.
pub struct Uart {
    port: SerialPort,
}

impl Uart {
    pub fn new() -> Self {
        Uart {
            port: unsafe { SerialPort::new(COM1) },
        }
    }

    /// Program line settings and enable the port. Must run once before the
    /// first byte is sent on real hardware.
    pub fn init(&mut self) {
        self.port.init();
    }
}

impl Default for Uart {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialSink for Uart {
    fn put(&mut self, b: u8) {
        self.port.send(b);
    }
}
