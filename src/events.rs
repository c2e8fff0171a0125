//! Fixed-capacity single-producer/single-consumer event queue (spec.md
//! §4.10). Drivers (`keyboard`, `mouse`, the timer ISR) are the producer
//! side; the window manager's main loop is the consumer. On overflow the
//! newest event is dropped and the queue otherwise left untouched, the
//! same backpressure policy as [`crate::drivers::keyboard`]'s ring buffer.

use spin::Mutex;

use crate::config::EVENT_QUEUE_CAPACITY;

/// A single input or timer event.
#[derive(Debug, Clone, Copy)]
pub enum Event {
    /// A decoded, printable key press.
    Key(u8),
    /// Relative mouse motion since the last packet.
    MouseMove { dx: i32, dy: i32 },
    /// Mouse button state byte (bit 0 left, bit 1 right, bit 2 middle).
    MouseButton(u8),
    /// One PIT tick elapsed.
    Timer,
}

struct Queue {
    buf: [Option<Event>; EVENT_QUEUE_CAPACITY],
    head: usize,
    tail: usize,
}

static QUEUE: Mutex<Queue> = Mutex::new(Queue {
    buf: [None; EVENT_QUEUE_CAPACITY],
    head: 0,
    tail: 0,
});

/// Pushes an event onto the queue. Drops the event (keeping the queue's
/// existing contents) if the queue is full.
pub fn push(event: Event) {
    let mut queue = QUEUE.lock();
    let next = (queue.tail + 1) % EVENT_QUEUE_CAPACITY;
    if next == queue.head {
        return;
    }
    queue.buf[queue.tail] = Some(event);
    queue.tail = next;
}

/// Pops the oldest event, if any.
pub fn poll() -> Option<Event> {
    let mut queue = QUEUE.lock();
    if queue.head == queue.tail {
        return None;
    }
    let event = queue.buf[queue.head].take();
    queue.head = (queue.head + 1) % EVENT_QUEUE_CAPACITY;
    event
}
