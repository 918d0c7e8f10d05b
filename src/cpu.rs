//! CPU control used by the panic path
//!
//! The panic path needs four things from the processor: its APIC id for
//! the diagnostic tag, a way to mask interrupts, a frame-pointer walk for
//! the caller trace, and a terminal freeze that never returns. They live
//! behind [`Cpu`] so the console can be panicked in hosted tests without
//! executing privileged instructions.

use x86_64::instructions::interrupts;

/// Depth of the caller trace rendered on panic.
pub const TRACE_DEPTH: usize = 10;

pub trait Cpu {
    /// Identifier of the executing unit, as printed in the panic tag.
    fn unit_id(&self) -> u32;

    /// Mask maskable interrupts on this unit.
    fn interrupts_off(&self);

    /// Terminal state: never returns, never resumes normal operation.
    fn freeze(&self) -> !;

    /// Fill `pcs` with caller return addresses, oldest frames last,
    /// zero-filled once the frame chain ends.
    fn call_stack(&self, pcs: &mut [usize]);
}

/// The real processor.
pub struct X86Cpu;

impl Cpu for X86Cpu {
    fn unit_id(&self) -> u32 {
        #[cfg(target_arch = "x86_64")]
        {
            // Initial APIC id lives in the top byte of EBX for leaf 1.
            let leaf = core::arch::x86_64::__cpuid(1);
            leaf.ebx >> 24
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            0
        }
    }

    fn interrupts_off(&self) {
        interrupts::disable();
    }

    fn freeze(&self) -> ! {
        interrupts::disable();
        loop {
            core::hint::spin_loop();
        }
    }

    #[cfg(target_arch = "x86_64")]
    fn call_stack(&self, pcs: &mut [usize]) {
        let mut rbp: usize;
        unsafe {
            core::arch::asm!("mov {}, rbp", out(reg) rbp, options(nomem, nostack));
        }
        for slot in pcs.iter_mut() {
            // Saved frame layout: [rbp] = caller rbp, [rbp+8] = return pc.
            if rbp == 0 || rbp % core::mem::align_of::<usize>() != 0 {
                *slot = 0;
                continue;
            }
            unsafe {
                *slot = *((rbp + 8) as *const usize);
                rbp = *(rbp as *const usize);
            }
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn call_stack(&self, pcs: &mut [usize]) {
        for slot in pcs.iter_mut() {
            *slot = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_id_is_one_byte() {
        // the id comes from the top byte of a register
        assert!(X86Cpu.unit_id() < 256);
    }
}
