//! Global Descriptor Table and Task State Segment.
//!
//! Populates the five flat segment descriptors (null, kernel code/data,
//! user code/data) plus one TSS descriptor, then loads the GDTR and task
//! register. The TSS's `esp0`/`ss0` are the ring-0 stack the CPU switches
//! to on a ring-3-to-ring-0 transition (interrupt, exception, or `int
//! 0x80`); [`set_kernel_stack`] is how the scheduler keeps that pointer
//! in sync with whichever user process is about to run (spec.md §3, §4.1).

use core::mem::size_of;

use crate::arch::regs;

/// Selector for the kernel code segment (index 1, RPL 0).
pub const KERNEL_CODE_SELECTOR: u16 = 1 << 3;
/// Selector for the kernel data segment (index 2, RPL 0).
pub const KERNEL_DATA_SELECTOR: u16 = 2 << 3;
/// Selector for the user code segment (index 3, RPL 3).
pub const USER_CODE_SELECTOR: u16 = (3 << 3) | 3;
/// Selector for the user data segment (index 4, RPL 3).
pub const USER_DATA_SELECTOR: u16 = (4 << 3) | 3;
/// Selector for the TSS descriptor (index 5, RPL 0).
pub const TSS_SELECTOR: u16 = 5 << 3;

const ACCESS_PRESENT: u8 = 1 << 7;
const ACCESS_RING3: u8 = 3 << 5;
const ACCESS_SYSTEM: u8 = 1 << 4;
const ACCESS_EXECUTABLE: u8 = 1 << 3;
const ACCESS_RW: u8 = 1 << 1;
const FLAGS_GRANULARITY_4K: u8 = 1 << 7;
const FLAGS_SIZE_32: u8 = 1 << 6;
const TSS_ACCESS_PRESENT_RING0_32BIT: u8 = 0x89;

/// A raw x86 segment descriptor.
#[repr(C, packed)]
#[derive(Clone, Copy)]
struct SegmentDescriptor {
    limit_low: u16,
    base_low: u16,
    base_mid: u8,
    access: u8,
    flags_limit_high: u8,
    base_high: u8,
}

impl SegmentDescriptor {
    const fn new(base: u32, limit: u32, access: u8, flags: u8) -> Self {
        Self {
            limit_low: (limit & 0xffff) as u16,
            base_low: (base & 0xffff) as u16,
            base_mid: ((base >> 16) & 0xff) as u8,
            access,
            flags_limit_high: (flags & 0xf0) | (((limit >> 16) & 0x0f) as u8),
            base_high: ((base >> 24) & 0xff) as u8,
        }
    }

    const fn null() -> Self {
        Self::new(0, 0, 0, 0)
    }

    const fn flat(access: u8) -> Self {
        Self::new(0, 0x000f_ffff, access, FLAGS_GRANULARITY_4K | FLAGS_SIZE_32)
    }

    const fn tss(base: u32, limit: u32) -> Self {
        Self::new(base, limit, TSS_ACCESS_PRESENT_RING0_32BIT, 0)
    }
}

/// The Task State Segment. Only `ss0`/`esp0` (used on privilege-level
/// transitions) are meaningful here; the other fields are left zero
/// because this kernel does not use hardware task switching.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct TaskStateSegment {
    link: u32,
    pub esp0: u32,
    pub ss0: u32,
    esp1: u32,
    ss1: u32,
    esp2: u32,
    ss2: u32,
    cr3: u32,
    eip: u32,
    eflags: u32,
    eax: u32,
    ecx: u32,
    edx: u32,
    ebx: u32,
    esp: u32,
    ebp: u32,
    esi: u32,
    edi: u32,
    es: u32,
    cs: u32,
    ss: u32,
    ds: u32,
    fs: u32,
    gs: u32,
    ldt: u32,
    trap: u16,
    iomap_base: u16,
}

impl TaskStateSegment {
    const fn new() -> Self {
        Self {
            link: 0,
            esp0: 0,
            ss0: KERNEL_DATA_SELECTOR as u32,
            esp1: 0,
            ss1: 0,
            esp2: 0,
            ss2: 0,
            cr3: 0,
            eip: 0,
            eflags: 0,
            eax: 0,
            ecx: 0,
            edx: 0,
            ebx: 0,
            esp: 0,
            ebp: 0,
            esi: 0,
            edi: 0,
            es: 0,
            cs: 0,
            ss: 0,
            ds: 0,
            fs: 0,
            gs: 0,
            ldt: 0,
            trap: 0,
            iomap_base: size_of::<TaskStateSegment>() as u16,
        }
    }
}

static mut TSS: TaskStateSegment = TaskStateSegment::new();

static mut GDT: [SegmentDescriptor; 6] = [
    SegmentDescriptor::null(),
    SegmentDescriptor::flat(ACCESS_PRESENT | ACCESS_SYSTEM | ACCESS_EXECUTABLE | ACCESS_RW),
    SegmentDescriptor::flat(ACCESS_PRESENT | ACCESS_SYSTEM | ACCESS_RW),
    SegmentDescriptor::flat(
        ACCESS_PRESENT | ACCESS_RING3 | ACCESS_SYSTEM | ACCESS_EXECUTABLE | ACCESS_RW,
    ),
    SegmentDescriptor::flat(ACCESS_PRESENT | ACCESS_RING3 | ACCESS_SYSTEM | ACCESS_RW),
    SegmentDescriptor::null(),
];

/// Bootstrap stack used by the TSS until the first process is dispatched.
static mut BOOTSTRAP_STACK: [u8; 4096] = [0; 4096];

/// Builds the GDT and TSS, loads the GDTR, reloads segment registers and
/// loads the task register.
///
/// # Safety
/// Must be called exactly once, early in boot, before interrupts are
/// enabled or any ring-3 process is dispatched.
pub unsafe fn init() {
    // SAFETY: single-threaded boot context; no other code touches TSS/GDT yet.
    unsafe {
        let stack_top = core::ptr::addr_of!(BOOTSTRAP_STACK[4096 - 1]) as u32 + 1;
        TSS.esp0 = stack_top;
        TSS.ss0 = KERNEL_DATA_SELECTOR as u32;

        let tss_base = core::ptr::addr_of!(TSS) as u32;
        let tss_limit = (size_of::<TaskStateSegment>() - 1) as u32;
        GDT[5] = SegmentDescriptor::tss(tss_base, tss_limit);

        let gdt_base = core::ptr::addr_of!(GDT) as u32;
        let gdt_limit = (size_of::<[SegmentDescriptor; 6]>() - 1) as u16;
        regs::lgdt(gdt_base, gdt_limit);
        regs::reload_segments(KERNEL_CODE_SELECTOR, KERNEL_DATA_SELECTOR);
        regs::ltr(TSS_SELECTOR);
    }
}

/// Sets the ring-0 stack pointer the CPU will load on the next privilege
/// transition into this kernel. Called by the scheduler before dispatching
/// any `user` process (spec.md §4.1, invariant in §3).
///
/// # Safety
/// `esp0` must point to the top of a valid, currently-unused kernel stack
/// for the process about to run.
pub unsafe fn set_kernel_stack(esp0: u32) {
    // SAFETY: caller guarantees `esp0` is a valid ring-0 stack top.
    unsafe {
        TSS.esp0 = esp0;
    }
}
