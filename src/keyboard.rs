//! Keyboard interrupt path
//!
//! The raw interrupt handler pushes scancodes into a fixed lock-free queue
//! and acknowledges the PIC; decoding and line-discipline work happen in
//! [`interrupt`], which drains the queue through the PS/2 state machine
//! and feeds decoded ASCII bytes to the console. Control keys come through
//! as their control codes so the line discipline sees `^P`, `^U`, `^H`
//! and `^D` directly.

use conquer_once::spin::OnceCell;
use crossbeam_queue::ArrayQueue;
use lazy_static::lazy_static;
use pc_keyboard::{layouts, DecodedKey, HandleControl, Keyboard, ScancodeSet1};
use pic8259::ChainedPics;
use spin::Mutex;
use x86_64::instructions::port::Port;

use crate::console::{self, IntrAction};
use crate::proc;

pub const PIC_1_OFFSET: u8 = 32;
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

/// Interrupt vector of the keyboard line (IRQ 1).
pub const KEYBOARD_VECTOR: u8 = PIC_1_OFFSET + 1;

const PS2_DATA_PORT: u16 = 0x60;

pub static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

static SCANCODE_QUEUE: OnceCell<ArrayQueue<u8>> = OnceCell::uninit();

lazy_static! {
    static ref KEYBOARD: Mutex<Keyboard<layouts::Us104Key, ScancodeSet1>> =
        Mutex::new(Keyboard::new(
            ScancodeSet1::new(),
            layouts::Us104Key,
            HandleControl::MapLettersToUnicode,
        ));
}

fn scancode_queue() -> &'static ArrayQueue<u8> {
    SCANCODE_QUEUE.get_or_init(|| ArrayQueue::new(256))
}

/// Bit of the keyboard line (IRQ 1) in the primary PIC mask register.
const KEYBOARD_IRQ_BIT: u8 = 1 << 1;

/// Clear the keyboard bit in a primary mask, leaving every other line
/// as it was.
fn unmask_keyboard(primary: u8) -> u8 {
    primary & !KEYBOARD_IRQ_BIT
}

/// Unmask IRQ 1 on the primary PIC.
pub fn enable_keyboard_line() {
    let mut pics = PICS.lock();
    unsafe {
        let [primary, secondary] = pics.read_masks();
        pics.write_masks(unmask_keyboard(primary), secondary);
    }
}

/// Read one scancode from the controller and queue it.
///
/// Called from the raw interrupt stub; must not take the console lock.
/// Scancodes arriving while the queue is full are dropped.
pub fn add_scancode() {
    let mut port = Port::new(PS2_DATA_PORT);
    let scancode: u8 = unsafe { port.read() };
    let _ = scancode_queue().push(scancode);
}

/// Signal completion of the keyboard interrupt to the PIC.
pub fn end_of_interrupt() {
    unsafe {
        PICS.lock().notify_end_of_interrupt(KEYBOARD_VECTOR);
    }
}

/// Decode one queued scancode to an ASCII byte, if it produces one.
fn next_byte(queue: &ArrayQueue<u8>) -> Option<u8> {
    let mut keyboard = KEYBOARD.lock();
    while let Some(scancode) = queue.pop() {
        let Ok(Some(key_event)) = keyboard.add_byte(scancode) else {
            continue;
        };
        if let Some(DecodedKey::Unicode(c)) = keyboard.process_keyevent(key_event) {
            if c.is_ascii() {
                return Some(c as u8);
            }
        }
    }
    None
}

/// Drain queued scancodes into the console line discipline, then carry out
/// whatever the console deferred past its lock.
pub fn interrupt() {
    let queue = scancode_queue();
    let cons = console::console();
    let action = cons.interrupt(|| next_byte(queue), &proc::KernelSched);
    match action {
        IntrAction::None => {}
        IntrAction::ProcessDump => proc::dump(cons),
    }
}
