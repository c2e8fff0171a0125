//! Device drivers: PS/2 keyboard and mouse, ATA PIO disk. Each owns its
//! port I/O directly via [`crate::arch::io`], replacing the teacher's
//! `pc_keyboard` crate (a scancode-decoding crate that is a fine
//! idiomatic choice, but the spec's §4.9 calls for the exact two-table
//! decode and mouse FSM described there, including its
//! one-IRQ-reads-up-to-three-bytes quirk — see `mouse.rs`). VGA text-mode
//! fallback rendering stays in [`crate::vga_buffer`], kept from the
//! teacher largely as-is (spec.md §6).

pub mod ata;
pub mod keyboard;
pub mod mouse;
