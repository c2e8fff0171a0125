//! Physical memory, paging and heap management.
//!
//! Supersedes the teacher's `memory.rs`/`allocator.rs`, which delegated to
//! the `x86_64`/`bootloader`/`linked_list_allocator` crates and their
//! long-mode `OffsetPageTable` abstraction. This kernel owns its page
//! directory directly (spec.md §4.4-§4.6): a bitmap physical allocator, a
//! hand-rolled 32-bit two-level page table, and a first-fit coalescing
//! heap sitting on top of both.

pub mod heap;
pub mod paging;
pub mod pmm;

use crate::error::KernelResult;

/// Brings up the physical allocator, identity-maps low memory, enables
/// paging and initializes the kernel heap, in that order. Called once from
/// `kernel_main` before anything else touches dynamic memory.
///
/// # Safety
/// Must run exactly once, early in boot, with interrupts disabled.
pub unsafe fn init() -> KernelResult<()> {
    // SAFETY: single-threaded boot context; no concurrent access to the
    // bitmap, page tables or heap yet.
    unsafe {
        pmm::init();
        paging::init();
        heap::init()?;
    }
    Ok(())
}
