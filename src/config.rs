//! Kernel-wide tunables.
//!
//! Centralizes the fixed capacities and frequencies spec'd across the
//! kernel, the way the teacher centralized stack sizes in `gdt.rs` and
//! `HEAP_SIZE`/`HEART_START` in `allocator.rs`.

/// Physical address where the bootloader deposits the `bootinfo` record.
pub const BOOTINFO_ADDR: usize = 0x500;

/// Start of the physical memory region managed by the page bitmap allocator.
pub const PHYS_MEM_START: usize = 0x10_0000;

/// Upper bound (exclusive) of the physical memory region managed by the
/// page bitmap allocator. 128 MiB is generous for a QEMU `-m` default and
/// keeps the bitmap small (4 KiB for 128 MiB of pages).
pub const PHYS_MEM_LIMIT: usize = 128 * 1024 * 1024;

/// Size of one physical page / page-table entry span.
pub const PAGE_SIZE: usize = 4096;

/// Start address of the kernel heap (chosen to sit above the identity-mapped
/// low 16 MiB and the framebuffer mapping window).
pub const HEAP_START: usize = 0x0140_0000;

/// Size of the kernel heap in bytes.
pub const HEAP_SIZE: usize = 4 * 1024 * 1024;

/// Number of initial identity-mapped page tables (each covering 4 MiB),
/// giving an initial identity range of `[0, 16 MiB)`.
pub const IDENTITY_PAGE_TABLES: usize = 4;

/// Number of spare page tables reserved for `map_region`'s bump pool.
pub const EXTRA_PAGE_TABLES: usize = 8;

/// Maximum number of process descriptors.
pub const MAX_PROCESSES: usize = 8;

/// Size of a kernel thread's stack, in bytes.
pub const KERNEL_STACK_SIZE: usize = 16 * 1024;

/// Size of a user process's ring-3 stack, in bytes.
pub const USER_STACK_SIZE: usize = 16 * 1024;

/// Size of a user process's ring-0 (kernel-side) stack, in bytes.
pub const USER_KERNEL_STACK_SIZE: usize = 4 * 1024;

/// Timer frequency, in Hz, programmed into PIT channel 0.
pub const TIMER_HZ: u32 = 100;

/// Capacity of the keyboard scancode-to-char ring buffer. Must be a power
/// of two so the index math in `drivers::keyboard` can use a bitmask.
pub const KEYBOARD_RING_CAPACITY: usize = 256;

/// Capacity of the event queue.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Maximum number of simultaneously open windows.
pub const MAX_WINDOWS: usize = 16;

/// Height, in pixels, of a window's title bar.
pub const TITLE_BAR_HEIGHT: usize = 24;

/// Width, in pixels, of a window's border.
pub const WINDOW_BORDER: usize = 2;

/// Height, in pixels, of the taskbar.
pub const TASKBAR_HEIGHT: usize = 32;

/// Ticks between "System Info" window redraws (~0.5s at [`TIMER_HZ`]=100).
pub const SYSINFO_REDRAW_TICKS: u32 = 50;
