//! PS/2 mouse: init sequence and 3-byte packet FSM (spec.md §4.9).
//!
//! The IRQ12 handler reads PS/2 status port `0x64` bit 5 before each byte
//! and keeps consuming bytes from the controller while that bit is set,
//! rather than reading exactly one byte per interrupt. Real PS/2
//! controllers can coalesce more than one mouse byte behind a single
//! interrupt, so a handler that reads only one byte per IRQ can desync the
//! packet framing over time; spec.md §9 asks this quirk be preserved
//! rather than silently hardened, since the reference implementation
//! relied on it.

use spin::Mutex;

use crate::arch::io::{inb, io_wait, outb};
use crate::events;

const DATA_PORT: u16 = 0x60;
const STATUS_PORT: u16 = 0x64;
const COMMAND_PORT: u16 = 0x64;

const STATUS_OUTPUT_FULL: u8 = 1 << 0;
const STATUS_AUX_DATA: u8 = 1 << 5;

/// Bit 3 of the first byte of every PS/2 mouse packet is wired high by the
/// device; a packet whose byte 0 doesn't have it set means the FSM has
/// drifted out of sync with the 3-byte framing and cycle 0 must be
/// re-armed rather than advanced (spec.md §3, §8).
const PACKET_ALWAYS_ONE: u8 = 1 << 3;

struct Fsm {
    packet: [u8; 3],
    index: usize,
}

impl Fsm {
    /// Feeds one raw byte into the 3-byte packet FSM. Returns the decoded
    /// (dx, dy, button-bits) once a full packet completes, applying the
    /// byte-0 resync check first (spec.md §3, §4.9, §8).
    fn feed(&mut self, byte: u8) -> Option<(i32, i32, u8)> {
        if self.index == 0 && byte & PACKET_ALWAYS_ONE == 0 {
            return None; // desynced: discard until a valid byte 0 shows up
        }

        self.packet[self.index] = byte;
        self.index += 1;
        if self.index < 3 {
            return None;
        }
        self.index = 0;
        let flags = self.packet[0];
        let dx = sign_extend(self.packet[1], flags & 0x10 != 0);
        let dy = sign_extend(self.packet[2], flags & 0x20 != 0);
        Some((dx, -dy, flags & 0b111))
    }
}

static FSM: Mutex<Fsm> = Mutex::new(Fsm {
    packet: [0; 3],
    index: 0,
});

fn wait_write_ready() {
    // SAFETY: status port read-only poll, no side effect beyond the read.
    unsafe {
        for _ in 0..10_000 {
            if inb(STATUS_PORT) & (1 << 1) == 0 {
                return;
            }
        }
    }
}

fn write_aux_command(byte: u8) {
    wait_write_ready();
    // SAFETY: 0xD4 tells the controller the next data byte targets the aux
    // (mouse) port rather than the keyboard port.
    unsafe {
        outb(COMMAND_PORT, 0xD4);
        wait_write_ready();
        outb(DATA_PORT, byte);
    }
}

fn read_compaq_status() -> u8 {
    wait_write_ready();
    // SAFETY: 0x20 ("read command byte") is a standard PS/2 controller
    // command; the response is read back from the data port.
    unsafe {
        outb(COMMAND_PORT, 0x20);
        inb(DATA_PORT)
    }
}

fn write_compaq_status(value: u8) {
    wait_write_ready();
    // SAFETY: 0x60 ("write command byte") is a standard PS/2 controller
    // command, followed by the new status byte on the data port.
    unsafe {
        outb(COMMAND_PORT, 0x60);
        wait_write_ready();
        outb(DATA_PORT, value);
    }
}

/// Runs the PS/2 mouse enable sequence (spec.md §4.9): enable the aux
/// device, flip the controller's command byte to unmask IRQ12 and enable
/// the aux clock, then RESET, SET-DEFAULTS and ENABLE the mouse itself.
///
/// # Safety
/// Must run once during boot, after the PIC is remapped and before IRQ12
/// is unmasked.
pub unsafe fn init() {
    const STATUS_ENABLE_IRQ12: u8 = 1 << 1;
    const STATUS_DISABLE_AUX_CLOCK: u8 = 1 << 5;

    // SAFETY: standard PS/2 controller command sequence on fixed ports.
    unsafe {
        outb(COMMAND_PORT, 0xA8); // enable aux device
        io_wait();

        let status = read_compaq_status();
        let status = (status | STATUS_ENABLE_IRQ12) & !STATUS_DISABLE_AUX_CLOCK;
        write_compaq_status(status);

        write_aux_command(0xFF); // reset
        let _ = inb(DATA_PORT); // ack
        let _ = inb(DATA_PORT); // self-test result (0xAA)
        let _ = inb(DATA_PORT); // device id

        write_aux_command(0xF6); // set defaults
        let _ = inb(DATA_PORT); // ack
        write_aux_command(0xF4); // enable data reporting
        let _ = inb(DATA_PORT); // ack
    }
}

/// Called from the IRQ12 handler. Per spec.md §9, a single call may drain
/// more than one waiting byte if the controller has them buffered.
pub fn on_irq() {
    let mut fsm = FSM.lock();
    loop {
        // SAFETY: status port read has no side effect.
        let status = unsafe { inb(STATUS_PORT) };
        if status & STATUS_OUTPUT_FULL == 0 || status & STATUS_AUX_DATA == 0 {
            break;
        }
        // SAFETY: data port read consumes exactly one buffered byte.
        let byte = unsafe { inb(DATA_PORT) };

        if let Some((dx, dy, buttons)) = fsm.feed(byte) {
            if dx != 0 || dy != 0 {
                events::push(events::Event::MouseMove { dx, dy });
            }
            if buttons != 0 {
                events::push(events::Event::MouseButton(buttons));
            }
        }
    }
}

fn sign_extend(byte: u8, negative: bool) -> i32 {
    if negative {
        i32::from(byte) - 256
    } else {
        i32::from(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::Fsm;

    #[test_case]
    fn completes_packet_on_three_valid_bytes() {
        let mut fsm = Fsm { packet: [0; 3], index: 0 };
        assert!(fsm.feed(0b0000_1001).is_none()); // bit3 set, left button
        assert!(fsm.feed(5).is_none());
        let (dx, dy, buttons) = fsm.feed(3).unwrap();
        assert_eq!((dx, dy, buttons), (5, -3, 1));
    }

    #[test_case]
    fn discards_byte0_missing_always_one_bit() {
        let mut fsm = Fsm { packet: [0; 3], index: 0 };
        assert!(fsm.feed(0b0000_0000).is_none()); // bit3 clear: discarded
        assert_eq!(fsm.index, 0);
        assert!(fsm.feed(0b0000_1000).is_none()); // now valid byte 0
        assert_eq!(fsm.index, 1);
    }
}
