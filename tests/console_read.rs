//! Cross-thread behavior of the blocking read path: a reader parked on
//! the wait channel is released by a line submitted from the interrupt
//! side, and a kill cancels a parked reader without handing it any bytes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use ember_console::console::ReadError;
use ember_console::cpu::Cpu;
use ember_console::sched::{SchedHooks, WaitChannel};
use ember_console::serial::SerialSink;
use ember_console::vga_buffer::{CursorFault, Screen};
use ember_console::Console;

struct NullScreen;

impl Screen for NullScreen {
    fn put(&mut self, _b: u8) -> Result<(), CursorFault> {
        Ok(())
    }
}

struct NullSerial;

impl SerialSink for NullSerial {
    fn put(&mut self, _b: u8) {}
}

struct HostCpu;

impl Cpu for HostCpu {
    fn unit_id(&self) -> u32 {
        0
    }

    fn interrupts_off(&self) {}

    fn freeze(&self) -> ! {
        panic!("cpu frozen");
    }

    fn call_stack(&self, pcs: &mut [usize]) {
        pcs.fill(0);
    }
}

/// Parks by yielding until the channel generation moves or the kill flag
/// is raised, the same exit conditions a kernel sleep has.
struct ThreadSched {
    killed: AtomicBool,
}

impl ThreadSched {
    fn new() -> Self {
        ThreadSched {
            killed: AtomicBool::new(false),
        }
    }
}

impl SchedHooks for ThreadSched {
    fn park(&self, chan: &WaitChannel, observed: u64) {
        while chan.generation() == observed && !self.killed.load(Ordering::SeqCst) {
            thread::yield_now();
        }
    }

    fn current_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }
}

fn host_console() -> Console<NullScreen, NullSerial, HostCpu> {
    Console::new(NullScreen, NullSerial, HostCpu)
}

#[test]
fn parked_reader_is_released_by_a_submitted_line() {
    let cons = host_console();
    let sched = ThreadSched::new();

    thread::scope(|s| {
        let reader = s.spawn(|| {
            let mut buf = [0u8; 32];
            let n = cons.read(&mut buf, &sched)?;
            Ok::<_, ReadError>(buf[..n].to_vec())
        });

        // give the reader time to park before the line arrives
        thread::sleep(Duration::from_millis(50));
        let mut bytes = b"hello\n".iter().copied();
        cons.interrupt(|| bytes.next(), &sched);

        let line = reader.join().unwrap().unwrap();
        assert_eq!(line, b"hello\n");
    });
}

#[test]
fn line_submitted_before_the_read_is_returned_without_parking() {
    let cons = host_console();
    let sched = ThreadSched::new();

    let mut bytes = b"early\n".iter().copied();
    cons.interrupt(|| bytes.next(), &sched);

    let mut buf = [0u8; 32];
    let n = cons.read(&mut buf, &sched).unwrap();
    assert_eq!(&buf[..n], b"early\n");
}

#[test]
fn killing_a_parked_reader_fails_the_read() {
    let cons = host_console();
    let sched = ThreadSched::new();

    thread::scope(|s| {
        let reader = s.spawn(|| {
            let mut buf = [0u8; 32];
            cons.read(&mut buf, &sched)
        });

        thread::sleep(Duration::from_millis(50));
        sched.killed.store(true, Ordering::SeqCst);

        assert_eq!(reader.join().unwrap(), Err(ReadError::Killed));
    });
}

#[test]
fn reader_consumes_lines_one_at_a_time() {
    let cons = host_console();
    let sched = ThreadSched::new();

    let mut bytes = b"one\ntwo\n".iter().copied();
    cons.interrupt(|| bytes.next(), &sched);

    let mut buf = [0u8; 32];
    let n = cons.read(&mut buf, &sched).unwrap();
    assert_eq!(&buf[..n], b"one\n");
    let n = cons.read(&mut buf, &sched).unwrap();
    assert_eq!(&buf[..n], b"two\n");
}
