//! Software-interrupt syscall gate (spec.md §4.8).
//!
//! Vector `0x80`, DPL 3 so `int 0x80` is callable from ring 3 (wired in
//! [`crate::idt::init`]). Register ABI: `eax` = syscall number, `ebx`/`ecx`
//! = args 1/2, return value written back into `eax`. Kernel and user share
//! one flat address space (no per-process page tables, spec.md §1
//! Non-goals), so `write`'s user pointer is dereferenced directly with no
//! bounds check — matching the teacher's userspace/syscall.rs trust model,
//! generalized from its SysV `rdi`/`rsi` convention to this register ABI.

use crate::drivers::keyboard;
use crate::idt::InterruptFrame;
use crate::{print, process};

/// Terminates the calling process. No arguments.
pub const SYS_EXIT: u32 = 0;
/// Writes `ecx` bytes from the buffer at `ebx` to the terminal.
pub const SYS_WRITE: u32 = 1;
/// Returns the next buffered key as a byte in `eax`, or `0` if none.
pub const SYS_GETKEY: u32 = 2;
/// Voluntarily yields the remainder of the calling process's quantum.
pub const SYS_YIELD: u32 = 3;

/// Dispatches one `int 0x80` trap. Called from
/// [`crate::idt::interrupt_dispatch`].
pub fn handle(frame: &mut InterruptFrame) {
    match frame.eax {
        SYS_EXIT => {
            process::terminate_current(frame);
        }
        SYS_WRITE => {
            let ptr = frame.ebx as *const u8;
            let len = frame.ecx as usize;
            // SAFETY: kernel and user processes share one flat address
            // space; the spec explicitly leaves this pointer unchecked
            // (§4.8) rather than adding per-process isolation.
            let bytes = unsafe { core::slice::from_raw_parts(ptr, len) };
            if let Ok(text) = core::str::from_utf8(bytes) {
                print!("{text}");
            }
            frame.eax = len as u32;
        }
        SYS_GETKEY => {
            frame.eax = u32::from(keyboard::pop_char().unwrap_or(0));
        }
        SYS_YIELD => {
            process::schedule();
        }
        _ => {
            frame.eax = u32::from_ne_bytes((-1i32).to_ne_bytes());
        }
    }
}
