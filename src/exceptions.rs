//! CPU exception policy.
//!
//! Mirrors the teacher's `interrupts.rs` breakpoint/double-fault handlers,
//! generalized to all 20 reserved x86 exception vectors per spec.md
//! §4.2/§4.12: a breakpoint just logs and resumes, a fault raised while
//! running a user process terminates that process (never the kernel), and
//! anything raised in ring 0 is fatal and panics.

use crate::idt::InterruptFrame;
use crate::{println, process};

const NAMES: [&str; 20] = [
    "Divide Error",
    "Debug",
    "Non-Maskable Interrupt",
    "Breakpoint",
    "Overflow",
    "Bound Range Exceeded",
    "Invalid Opcode",
    "Device Not Available",
    "Double Fault",
    "Coprocessor Segment Overrun",
    "Invalid TSS",
    "Segment Not Present",
    "Stack-Segment Fault",
    "General Protection Fault",
    "Page Fault",
    "Reserved",
    "x87 Floating-Point Exception",
    "Alignment Check",
    "Machine Check",
    "SIMD Floating-Point Exception",
];

const BREAKPOINT: u32 = 3;
const DOUBLE_FAULT: u32 = 8;

/// Ring present in `frame.cs`'s low two bits (the CPL at the time the
/// exception was raised).
fn privilege_level(frame: &InterruptFrame) -> u8 {
    (frame.cs & 0b11) as u8
}

/// Dispatches a CPU exception. Called from [`crate::idt::interrupt_dispatch`]
/// for vectors 0-19.
pub fn handle(frame: &mut InterruptFrame) {
    let name = NAMES
        .get(frame.vector as usize)
        .copied()
        .unwrap_or("Unknown Exception");

    if frame.vector == BREAKPOINT {
        println!("EXCEPTION: {name} at {:#x}", { frame.eip });
        return;
    }

    if frame.vector == DOUBLE_FAULT {
        panic!("EXCEPTION: {name}, error_code={:#x}", { frame.error_code });
    }

    if privilege_level(frame) == 3 {
        println!(
            "EXCEPTION: {name} in user process (error_code={:#x}), terminating process",
            { frame.error_code }
        );
        process::terminate_current(frame);
        return;
    }

    panic!(
        "EXCEPTION: {name} in kernel context, error_code={:#x}, eip={:#x}",
        { frame.error_code },
        { frame.eip }
    );
}

#[cfg(test)]
mod tests {
    use crate::idt;

    #[test_case]
    fn test_breakpoint_exception() {
        idt::int3();
    }
}
