//! PS/2 keyboard scancode decoder (Set 1), spec.md §4.9.
//!
//! Two 128-entry lookup tables (unshifted/shifted) cover the printable US
//! layout; Shift and Caps Lock are tracked as decoder state. Decoded
//! characters and raw events are pushed onto a fixed-capacity ring buffer
//! that both [`crate::syscall::SYS_GETKEY`] and the window manager drain
//! from, generalizing the teacher's `task::keyboard` async scancode queue
//! (a `crossbeam_queue::ArrayQueue` woken via a `Waker`) into a plain
//! interrupt-filled ring, since this kernel has no executor to wake.

use spin::Mutex;

use crate::arch::io::inb;
use crate::config::KEYBOARD_RING_CAPACITY;
use crate::events;

const DATA_PORT: u16 = 0x60;

const SCANCODE_LEFT_SHIFT: u8 = 0x2A;
const SCANCODE_RIGHT_SHIFT: u8 = 0x36;
const SCANCODE_LEFT_SHIFT_RELEASE: u8 = SCANCODE_LEFT_SHIFT | 0x80;
const SCANCODE_RIGHT_SHIFT_RELEASE: u8 = SCANCODE_RIGHT_SHIFT | 0x80;
const SCANCODE_CAPS_LOCK: u8 = 0x3A;
const RELEASE_BIT: u8 = 0x80;

/// Scancode (Set 1) index -> (unshifted, shifted) ASCII. Anything not
/// listed here decodes to NUL (non-printable / unmapped).
const PRINTABLE: &[(u8, u8, u8)] = &[
    (0x01, 27, 27),
    (0x02, b'1', b'!'),
    (0x03, b'2', b'@'),
    (0x04, b'3', b'#'),
    (0x05, b'4', b'$'),
    (0x06, b'5', b'%'),
    (0x07, b'6', b'^'),
    (0x08, b'7', b'&'),
    (0x09, b'8', b'*'),
    (0x0A, b'9', b'('),
    (0x0B, b'0', b')'),
    (0x0C, b'-', b'_'),
    (0x0D, b'=', b'+'),
    (0x0E, 8, 8),
    (0x0F, b'\t', b'\t'),
    (0x10, b'q', b'Q'),
    (0x11, b'w', b'W'),
    (0x12, b'e', b'E'),
    (0x13, b'r', b'R'),
    (0x14, b't', b'T'),
    (0x15, b'y', b'Y'),
    (0x16, b'u', b'U'),
    (0x17, b'i', b'I'),
    (0x18, b'o', b'O'),
    (0x19, b'p', b'P'),
    (0x1A, b'[', b'{'),
    (0x1B, b']', b'}'),
    (0x1C, b'\n', b'\n'),
    (0x1E, b'a', b'A'),
    (0x1F, b's', b'S'),
    (0x20, b'd', b'D'),
    (0x21, b'f', b'F'),
    (0x22, b'g', b'G'),
    (0x23, b'h', b'H'),
    (0x24, b'j', b'J'),
    (0x25, b'k', b'K'),
    (0x26, b'l', b'L'),
    (0x27, b';', b':'),
    (0x28, b'\'', b'"'),
    (0x29, b'`', b'~'),
    (0x2B, b'\\', b'|'),
    (0x2C, b'z', b'Z'),
    (0x2D, b'x', b'X'),
    (0x2E, b'c', b'C'),
    (0x2F, b'v', b'V'),
    (0x30, b'b', b'B'),
    (0x31, b'n', b'N'),
    (0x32, b'm', b'M'),
    (0x33, b',', b'<'),
    (0x34, b'.', b'>'),
    (0x35, b'/', b'?'),
    (0x37, b'*', b'*'),
    (0x39, b' ', b' '),
    (0x4A, b'-', b'-'),
    (0x4E, b'+', b'+'),
];

const fn build_table(shifted: bool) -> [u8; 128] {
    let mut table = [0u8; 128];
    let mut i = 0;
    while i < PRINTABLE.len() {
        let (scancode, lo, hi) = PRINTABLE[i];
        table[scancode as usize] = if shifted { hi } else { lo };
        i += 1;
    }
    table
}

const UNSHIFTED: [u8; 128] = build_table(false);
const SHIFTED: [u8; 128] = build_table(true);

struct State {
    shift: bool,
    caps_lock: bool,
}

struct Ring {
    buf: [u8; KEYBOARD_RING_CAPACITY],
    head: usize,
    tail: usize,
}

impl Ring {
    const fn new() -> Self {
        Self {
            buf: [0; KEYBOARD_RING_CAPACITY],
            head: 0,
            tail: 0,
        }
    }

    fn push(&mut self, byte: u8) {
        let next = (self.tail + 1) % KEYBOARD_RING_CAPACITY;
        if next == self.head {
            return; // full: drop newest
        }
        self.buf[self.tail] = byte;
        self.tail = next;
    }

    fn pop(&mut self) -> Option<u8> {
        if self.head == self.tail {
            return None;
        }
        let byte = self.buf[self.head];
        self.head = (self.head + 1) % KEYBOARD_RING_CAPACITY;
        Some(byte)
    }
}

static STATE: Mutex<State> = Mutex::new(State {
    shift: false,
    caps_lock: false,
});
static RING: Mutex<Ring> = Mutex::new(Ring::new());

/// Called from the IRQ1 handler. Reads one scancode, updates shift/caps
/// state, and either pushes a decoded character or records a key event.
pub fn on_irq() {
    // SAFETY: port 0x60 is the PS/2 keyboard data port, safe to read
    // whenever IRQ1 fires.
    let scancode = unsafe { inb(DATA_PORT) };

    let mut state = STATE.lock();
    match scancode {
        SCANCODE_LEFT_SHIFT | SCANCODE_RIGHT_SHIFT => {
            state.shift = true;
            return;
        }
        SCANCODE_LEFT_SHIFT_RELEASE | SCANCODE_RIGHT_SHIFT_RELEASE => {
            state.shift = false;
            return;
        }
        SCANCODE_CAPS_LOCK => {
            state.caps_lock = !state.caps_lock;
            return;
        }
        _ => {}
    }

    if scancode & RELEASE_BIT != 0 {
        return;
    }

    let index = (scancode & 0x7f) as usize;
    let mut shifted = state.shift;
    if state.caps_lock && UNSHIFTED[index].is_ascii_alphabetic() {
        shifted = !shifted;
    }
    let ch = if shifted { SHIFTED[index] } else { UNSHIFTED[index] };
    drop(state);

    if ch != 0 {
        RING.lock().push(ch);
        events::push(events::Event::Key(ch));
    }
}

/// Pops the oldest buffered character, if any.
pub fn pop_char() -> Option<u8> {
    RING.lock().pop()
}
