//! 8253/8254 Programmable Interval Timer, channel 0.
//!
//! Programs channel 0 for periodic mode at [`crate::config::TIMER_HZ`] and
//! keeps a monotonic tick counter the scheduler and `wm` redraw timer read.
//! Grounded on the same "own the hardware directly" approach as [`crate::pic`];
//! the teacher had no PIT at all (its timer ticks came from the `x86_64`
//! crate's APIC-free polling loop), so this module's shape follows the PIC's.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::arch::io::outb;
use crate::config::TIMER_HZ;

const PIT_CHANNEL0: u16 = 0x40;
const PIT_COMMAND: u16 = 0x43;
const PIT_FREQUENCY: u32 = 1_193_182;

const MODE_CHANNEL0: u8 = 0b00 << 6;
const MODE_ACCESS_LOHI: u8 = 0b11 << 4;
const MODE_RATE_GENERATOR: u8 = 0b010 << 1;

static TICKS: AtomicU64 = AtomicU64::new(0);

/// Programs PIT channel 0 for a periodic interrupt at `TIMER_HZ`.
///
/// # Safety
/// Must run once during boot, before unmasking IRQ0.
pub unsafe fn init() {
    let divisor = (PIT_FREQUENCY / TIMER_HZ) as u16;
    // SAFETY: fixed ISA ports, standard command-then-two-data-bytes sequence.
    unsafe {
        outb(PIT_COMMAND, MODE_CHANNEL0 | MODE_ACCESS_LOHI | MODE_RATE_GENERATOR);
        outb(PIT_CHANNEL0, (divisor & 0xff) as u8);
        outb(PIT_CHANNEL0, (divisor >> 8) as u8);
    }
}

/// Called from the IRQ0 handler on every timer tick.
pub fn tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

/// Ticks elapsed since boot.
#[must_use]
pub fn ticks() -> u64 {
    TICKS.load(Ordering::Relaxed)
}
