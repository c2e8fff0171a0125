//! Control-register and flag primitives.

use core::arch::asm;

/// Disables maskable interrupts.
#[inline]
pub fn cli() {
    // SAFETY: `cli` has no memory effects visible to the optimizer.
    unsafe {
        asm!("cli", options(nomem, nostack, preserves_flags));
    }
}

/// Enables maskable interrupts.
#[inline]
pub fn sti() {
    // SAFETY: `sti` has no memory effects visible to the optimizer.
    unsafe {
        asm!("sti", options(nomem, nostack, preserves_flags));
    }
}

/// Halts the CPU until the next interrupt.
#[inline]
pub fn hlt() {
    // SAFETY: `hlt` is always safe to execute; it just stops fetching.
    unsafe {
        asm!("hlt", options(nomem, nostack, preserves_flags));
    }
}

/// Reads the interrupt flag out of `EFLAGS`.
#[inline]
#[must_use]
pub fn interrupts_enabled() -> bool {
    let flags: u32;
    // SAFETY: `pushfd`/`pop` only reads the flags register.
    unsafe {
        asm!("pushfd", "pop {0}", out(reg) flags, options(nomem, preserves_flags));
    }
    flags & (1 << 9) != 0
}

/// Runs `f` with interrupts disabled, restoring the prior interrupt-enable
/// state afterwards. Mirrors the `x86_64` crate's
/// `instructions::interrupts::without_interrupts`, which the teacher used
/// around VGA buffer writes to keep a timer tick from interleaving output.
pub fn without_interrupts<T>(f: impl FnOnce() -> T) -> T {
    let was_enabled = interrupts_enabled();
    if was_enabled {
        cli();
    }
    let result = f();
    if was_enabled {
        sti();
    }
    result
}

/// Loads the Global Descriptor Table Register from `base`/`limit`.
///
/// # Safety
/// `base` must point to a valid, live `GlobalDescriptorTable` for as long
/// as the CPU keeps running with this GDT loaded.
#[inline]
pub unsafe fn lgdt(base: u32, limit: u16) {
    #[repr(C, packed)]
    struct Pointer {
        limit: u16,
        base: u32,
    }
    let ptr = Pointer { limit, base };
    // SAFETY: `ptr` is a valid descriptor-table pointer for the duration of the instruction.
    unsafe {
        asm!("lgdt [{}]", in(reg) &ptr, options(readonly, nostack, preserves_flags));
    }
}

/// Loads the Interrupt Descriptor Table Register from `base`/`limit`.
///
/// # Safety
/// `base` must point to a valid, live `InterruptDescriptorTable` for as
/// long as interrupts are enabled.
#[inline]
pub unsafe fn lidt(base: u32, limit: u16) {
    #[repr(C, packed)]
    struct Pointer {
        limit: u16,
        base: u32,
    }
    let ptr = Pointer { limit, base };
    // SAFETY: `ptr` is a valid descriptor-table pointer for the duration of the instruction.
    unsafe {
        asm!("lidt [{}]", in(reg) &ptr, options(readonly, nostack, preserves_flags));
    }
}

/// Loads the task register with selector `sel`.
///
/// # Safety
/// `sel` must select a valid, available TSS descriptor in the GDT.
#[inline]
pub unsafe fn ltr(sel: u16) {
    // SAFETY: caller guarantees `sel` selects a valid TSS descriptor.
    unsafe {
        asm!("ltr ax", in("ax") sel, options(nomem, nostack, preserves_flags));
    }
}

/// Reloads all data segment registers with `sel`, and `CS` via a far jump
/// to `code_sel`.
///
/// # Safety
/// `sel` and `code_sel` must select valid, present, ring-0 descriptors.
#[inline]
pub unsafe fn reload_segments(code_sel: u16, data_sel: u16) {
    // SAFETY: caller guarantees the selectors are valid kernel segments.
    unsafe {
        asm!(
            "mov ds, {data:x}",
            "mov es, {data:x}",
            "mov fs, {data:x}",
            "mov gs, {data:x}",
            "mov ss, {data:x}",
            "push {code}",
            "lea eax, [2f]",
            "push eax",
            "retf",
            "2:",
            data = in(reg) data_sel as u32,
            code = in(reg) code_sel as u32,
            out("eax") _,
            options(nostack),
        );
    }
}

/// Writes CR3 (page directory base register).
///
/// # Safety
/// `phys_addr` must be the physical address of a valid page directory.
#[inline]
pub unsafe fn write_cr3(phys_addr: u32) {
    // SAFETY: caller guarantees `phys_addr` is a valid page directory.
    unsafe {
        asm!("mov cr3, {0}", in(reg) phys_addr, options(nomem, nostack, preserves_flags));
    }
}

/// Reads CR3.
#[inline]
#[must_use]
pub fn read_cr3() -> u32 {
    let value: u32;
    // SAFETY: reading CR3 has no side effects.
    unsafe {
        asm!("mov {0}, cr3", out(reg) value, options(nomem, nostack, preserves_flags));
    }
    value
}

/// Sets the paging-enable bit (bit 31) in CR0.
///
/// # Safety
/// A valid page directory mapping the currently executing code must
/// already be loaded into CR3.
#[inline]
pub unsafe fn enable_paging() {
    // SAFETY: caller guarantees CR3 holds a valid page directory that maps this code.
    unsafe {
        asm!(
            "mov {tmp}, cr0",
            "or {tmp}, 0x80000000",
            "mov cr0, {tmp}",
            tmp = out(reg) _,
            options(nostack, preserves_flags),
        );
    }
}

/// Flushes the TLB by reloading CR3 with its current value.
#[inline]
pub fn flush_tlb() {
    // SAFETY: reloading CR3 with its own value is always well-defined.
    unsafe {
        write_cr3(read_cr3());
    }
}
