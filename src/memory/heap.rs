//! First-fit coalescing heap allocator (spec.md §4.6), replacing the
//! teacher's delegation to `linked_list_allocator::LockedHeap`.
//!
//! Free blocks form a singly linked list threaded through the heap itself,
//! kept in ascending address order. `alloc` walks the list for the first
//! block big enough, splitting off the remainder when it's large enough to
//! host another header (at least `size_of::<BlockHeader>() + 16` bytes
//! free, spec.md §4.6). `dealloc` locates the freed block's position in
//! that order and coalesces it with whichever of its predecessor and
//! successor are adjacent in memory, so no two free blocks are ever left
//! adjacent (spec.md §4.6, §8).

use core::alloc::{GlobalAlloc, Layout};
use core::mem::size_of;
use core::ptr::NonNull;

use spin::Mutex;

use crate::config::{HEAP_SIZE, HEAP_START, PAGE_SIZE};
use crate::error::KernelResult;
use crate::memory::paging::{self, PageFlags};

const MIN_SPLIT_REMAINDER: usize = size_of::<BlockHeader>() + 16;
const ALIGNMENT: usize = 8;

#[repr(C)]
struct BlockHeader {
    size: usize,
    next: Option<NonNull<BlockHeader>>,
}

struct Heap {
    head: Option<NonNull<BlockHeader>>,
    used: usize,
}

// SAFETY: all access to `Heap` goes through `HEAP`'s `Mutex`.
unsafe impl Send for Heap {}

impl Heap {
    const fn empty() -> Self {
        Self {
            head: None,
            used: 0,
        }
    }

    unsafe fn init(&mut self, start: usize, size: usize) {
        let header = start as *mut BlockHeader;
        // SAFETY: `start` is a freshly mapped, exclusively-owned region at
        // least `size_of::<BlockHeader>()` bytes long.
        unsafe {
            header.write(BlockHeader { size, next: None });
        }
        self.head = NonNull::new(header);
        self.used = 0;
    }

    unsafe fn alloc(&mut self, layout: Layout) -> *mut u8 {
        let requested = align_up(layout.size().max(size_of::<BlockHeader>()), ALIGNMENT);

        let mut prev: Option<NonNull<BlockHeader>> = None;
        let mut current = self.head;

        while let Some(block) = current {
            // SAFETY: every node in the free list is a live `BlockHeader`.
            let block_size = unsafe { (*block.as_ptr()).size };
            let next = unsafe { (*block.as_ptr()).next };

            if block_size >= requested {
                if block_size >= requested + MIN_SPLIT_REMAINDER {
                    // SAFETY: splitting inside a block we exclusively hold.
                    unsafe {
                        let remainder_addr = (block.as_ptr() as usize) + requested;
                        let remainder = remainder_addr as *mut BlockHeader;
                        remainder.write(BlockHeader {
                            size: block_size - requested,
                            next,
                        });
                        (*block.as_ptr()).size = requested;
                        self.link_out(prev, NonNull::new(remainder));
                    }
                } else {
                    self.link_out(prev, next);
                }
                self.used += requested;
                // SAFETY: the allocation's payload starts right after the
                // header, inside the block we just detached from the free list.
                return unsafe {
                    (block.as_ptr() as *mut u8).add(size_of::<BlockHeader>())
                };
            }

            prev = current;
            current = next;
        }

        core::ptr::null_mut()
    }

    fn link_out(&mut self, prev: Option<NonNull<BlockHeader>>, next: Option<NonNull<BlockHeader>>) {
        match prev {
            // SAFETY: `prev` is a live list node.
            Some(prev) => unsafe { (*prev.as_ptr()).next = next },
            None => self.head = next,
        }
    }

    unsafe fn dealloc(&mut self, ptr: *mut u8, _layout: Layout) {
        // SAFETY: `ptr` was returned by `alloc`, so its header sits right
        // before it.
        let header_ptr = unsafe { ptr.sub(size_of::<BlockHeader>()) } as *mut BlockHeader;
        // SAFETY: `header_ptr` points at the header written by `alloc`.
        let size = unsafe { (*header_ptr).size };
        self.used = self.used.saturating_sub(size);

        let mut current = self.head;
        let mut prev: Option<NonNull<BlockHeader>> = None;
        let header_addr = header_ptr as usize;

        while let Some(block) = current {
            let block_addr = block.as_ptr() as usize;
            if block_addr > header_addr {
                break;
            }
            prev = current;
            current = unsafe { (*block.as_ptr()).next };
        }

        // Coalesce with the block immediately after us, if adjacent.
        let mut merged_size = size;
        let mut merged_next = current;
        if let Some(next_block) = current {
            let next_addr = next_block.as_ptr() as usize;
            if header_addr + size == next_addr {
                // SAFETY: `next_block` is a live free-list node adjacent to us.
                let next_size = unsafe { (*next_block.as_ptr()).size };
                let next_next = unsafe { (*next_block.as_ptr()).next };
                merged_size += next_size;
                merged_next = next_next;
            }
        }

        // Coalesce with the block immediately before us, if adjacent. The
        // list is address-sorted, so `prev` (if any) is the only other
        // node that could be adjacent; folding the freed span (already
        // forward-merged, if applicable) into it keeps the list's "no two
        // adjacent free blocks" invariant without a second pass.
        if let Some(prev_block) = prev {
            let prev_addr = prev_block.as_ptr() as usize;
            // SAFETY: `prev_block` is a live free-list node.
            let prev_size = unsafe { (*prev_block.as_ptr()).size };
            if prev_addr + prev_size == header_addr {
                // SAFETY: `prev_block` is a live free-list node directly
                // preceding the freed span; `prev_block.next` already
                // pointed at `current`, so replacing it with `merged_next`
                // correctly splices out whatever forward merge absorbed.
                unsafe {
                    (*prev_block.as_ptr()).size = prev_size + merged_size;
                    (*prev_block.as_ptr()).next = merged_next;
                }
                return;
            }
        }

        // SAFETY: `header_ptr` is the block being freed; writing its header
        // reclaims it as a free-list node.
        unsafe {
            header_ptr.write(BlockHeader {
                size: merged_size,
                next: merged_next,
            });
        }
        self.link_out(prev, NonNull::new(header_ptr));
    }
}

fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

static HEAP: Mutex<Heap> = Mutex::new(Heap::empty());

struct KernelAllocator;

// SAFETY: `alloc`/`dealloc` only ever touch memory inside the heap region
// mapped by `init`, guarded by `HEAP`'s lock.
unsafe impl GlobalAlloc for KernelAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: delegated to `Heap::alloc`'s contract.
        unsafe { HEAP.lock().alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: caller guarantees `ptr`/`layout` match a prior `alloc` call.
        unsafe { HEAP.lock().dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOCATOR: KernelAllocator = KernelAllocator;

/// Maps and initializes the kernel heap at [`HEAP_START`].
///
/// # Safety
/// Must run once, after [`super::paging::init`].
pub unsafe fn init() -> KernelResult<()> {
    // SAFETY: `HEAP_START`/`HEAP_SIZE` are reserved exclusively for the
    // heap and not used by any other mapping.
    unsafe {
        for offset in (0..HEAP_SIZE).step_by(PAGE_SIZE) {
            let phys = crate::memory::pmm::alloc_page()?;
            paging::map_region(HEAP_START + offset, phys, PAGE_SIZE, PageFlags::WRITABLE)?;
        }
        HEAP.lock().init(HEAP_START, HEAP_SIZE);
    }
    Ok(())
}

/// Bytes currently allocated out of the heap (not counting headers of free
/// blocks), used by `meminfo` in the shell.
#[must_use]
pub fn used_bytes() -> usize {
    HEAP.lock().used
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::vec::Vec;

    /// Freeing three adjacent blocks out of address order (B, then A, then
    /// C) must leave a single coalesced free span, not two adjacent free
    /// blocks sitting unmerged next to each other. A subsequent allocation
    /// sized to span all three originals only succeeds if the coalesce
    /// reached both neighbors.
    #[test_case]
    fn dealloc_coalesces_with_both_neighbors() {
        let a = Box::new([0u8; 64]);
        let b = Box::new([0u8; 64]);
        let c = Box::new([0u8; 64]);

        drop(b);
        drop(a);
        drop(c);

        let merged = Box::new([0u8; 200]);
        assert_eq!(merged.len(), 200);
    }

    #[test_case]
    fn simple_allocation() {
        let a = Box::new(41);
        let b = Box::new(13);
        assert_eq!(*a, 41);
        assert_eq!(*b, 13);
    }

    #[test_case]
    fn many_boxes() {
        for i in 0..1000 {
            let x = Box::new(i);
            assert_eq!(*x, i);
        }
    }

    #[test_case]
    fn vec_grows_and_frees() {
        let mut v = Vec::new();
        for i in 0..500 {
            v.push(i);
        }
        assert_eq!(v.iter().sum::<u64>(), (0..500).sum());
    }
}
