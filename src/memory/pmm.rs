//! Bitmap physical page-frame allocator.
//!
//! One bit per 4 KiB page over `[PHYS_MEM_START, PHYS_MEM_LIMIT)` (spec.md
//! §4.4). Allocation is a linear first-fit scan from bit 0 each time —
//! simple and adequate at this scale (at most a few thousand pages), the
//! same trade-off the teacher made picking `linked_list_allocator` over a
//! buddy allocator for the heap.

use spin::Mutex;

use crate::config::{PAGE_SIZE, PHYS_MEM_LIMIT, PHYS_MEM_START};
use crate::error::{KernelError, KernelResult};

const TOTAL_PAGES: usize = (PHYS_MEM_LIMIT - PHYS_MEM_START) / PAGE_SIZE;
const BITMAP_WORDS: usize = TOTAL_PAGES.div_ceil(32);

struct Bitmap {
    words: [u32; BITMAP_WORDS],
}

impl Bitmap {
    const fn new() -> Self {
        Self {
            words: [0; BITMAP_WORDS],
        }
    }

    fn is_set(&self, index: usize) -> bool {
        self.words[index / 32] & (1 << (index % 32)) != 0
    }

    fn set(&mut self, index: usize) {
        self.words[index / 32] |= 1 << (index % 32);
    }

    fn clear(&mut self, index: usize) {
        self.words[index / 32] &= !(1 << (index % 32));
    }
}

static BITMAP: Mutex<Bitmap> = Mutex::new(Bitmap::new());

/// Resets the bitmap to all-free. The first MiB (below `PHYS_MEM_START`)
/// is never tracked here; it holds the bootinfo record and low-memory BIOS
/// structures and is treated as permanently reserved.
///
/// # Safety
/// Must run once, before any page is allocated.
pub unsafe fn init() {
    let mut bitmap = BITMAP.lock();
    bitmap.words = [0; BITMAP_WORDS];
}

/// Allocates one physical page, returning its physical address.
pub fn alloc_page() -> KernelResult<usize> {
    let mut bitmap = BITMAP.lock();
    for index in 0..TOTAL_PAGES {
        if !bitmap.is_set(index) {
            bitmap.set(index);
            return Ok(PHYS_MEM_START + index * PAGE_SIZE);
        }
    }
    Err(KernelError::OutOfPhysicalMemory)
}

/// Total number of pages tracked by the allocator.
pub fn total_pages() -> usize {
    TOTAL_PAGES
}

/// Number of pages not currently allocated.
pub fn free_pages() -> usize {
    let bitmap = BITMAP.lock();
    (0..TOTAL_PAGES).filter(|&index| !bitmap.is_set(index)).count()
}

/// Frees a physical page previously returned by [`alloc_page`].
///
/// # Safety
/// `addr` must be a page-aligned address previously returned by
/// [`alloc_page`] and not currently referenced by any live mapping.
pub unsafe fn free_page(addr: usize) {
    if addr < PHYS_MEM_START || addr >= PHYS_MEM_LIMIT {
        return;
    }
    let index = (addr - PHYS_MEM_START) / PAGE_SIZE;
    BITMAP.lock().clear(index);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn alloc_then_free_reuses_page() {
        let a = alloc_page().unwrap();
        // SAFETY: `a` was just allocated and nothing else references it.
        unsafe { free_page(a) };
        let b = alloc_page().unwrap();
        assert_eq!(a, b);
    }
}
