//! 32-bit two-level paging: a page directory of 1024 entries, each
//! pointing at a page table of 1024 entries, each mapping one 4 KiB page
//! (spec.md §4.5). Identity-maps the low [`crate::config::IDENTITY_PAGE_TABLES`]
//! `*` 4 MiB range so the kernel's own code/data stay mapped once paging
//! is enabled, then exposes [`map_region`] for everything mapped
//! afterwards (framebuffer, heap, user stacks).

use spin::Mutex;

use crate::arch::regs;
use crate::config::{EXTRA_PAGE_TABLES, IDENTITY_PAGE_TABLES, PAGE_SIZE};
use crate::error::{KernelError, KernelResult};

const ENTRIES_PER_TABLE: usize = 1024;

const FLAG_PRESENT: u32 = 1 << 0;
const FLAG_WRITABLE: u32 = 1 << 1;
const FLAG_USER: u32 = 1 << 2;

bitflags::bitflags! {
    /// Page mapping permissions, passed to [`map_region`].
    pub struct PageFlags: u32 {
        /// Page is writable (otherwise read-only).
        const WRITABLE = FLAG_WRITABLE;
        /// Page is accessible from ring 3 (otherwise ring 0 only).
        const USER = FLAG_USER;
    }
}

#[repr(align(4096))]
struct PageTable {
    entries: [u32; ENTRIES_PER_TABLE],
}

impl PageTable {
    const fn empty() -> Self {
        Self {
            entries: [0; ENTRIES_PER_TABLE],
        }
    }
}

#[repr(align(4096))]
struct PageDirectory {
    entries: [u32; ENTRIES_PER_TABLE],
}

impl PageDirectory {
    const fn empty() -> Self {
        Self {
            entries: [0; ENTRIES_PER_TABLE],
        }
    }
}

static mut PAGE_DIRECTORY: PageDirectory = PageDirectory::empty();
static mut IDENTITY_TABLES: [PageTable; IDENTITY_PAGE_TABLES] =
    [const { PageTable::empty() }; IDENTITY_PAGE_TABLES];
static mut EXTRA_TABLES: [PageTable; EXTRA_PAGE_TABLES] =
    [const { PageTable::empty() }; EXTRA_PAGE_TABLES];

/// Index of the next unused slot in `EXTRA_TABLES`. `map_region` hands
/// tables out of this bump pool and never returns them; spec.md's
/// Non-goals exclude address-space teardown, so there is nothing to free.
static NEXT_EXTRA_TABLE: Mutex<usize> = Mutex::new(0);

/// Identity-maps the low `IDENTITY_PAGE_TABLES * 4 MiB` range, loads CR3,
/// and enables paging (CR0 bit 31).
///
/// # Safety
/// Must run once, after [`super::pmm::init`], before any code relies on
/// virtual-equals-physical addressing being anything but identity.
pub unsafe fn init() {
    // SAFETY: single-threaded boot context; no concurrent page-table access.
    unsafe {
        // `FLAG_USER` is required here, not just on later `map_region`
        // calls: ring-3 processes share this identity-mapped range for
        // their own code and stacks (spec.md §1 Non-goals: no per-process
        // address space), so without it every user-mode fetch or stack
        // access would fault as a supervisor-only access violation.
        for table_index in 0..IDENTITY_PAGE_TABLES {
            let table = &mut IDENTITY_TABLES[table_index];
            for entry_index in 0..ENTRIES_PER_TABLE {
                let phys = (table_index * ENTRIES_PER_TABLE + entry_index) * PAGE_SIZE;
                table.entries[entry_index] =
                    (phys as u32) | FLAG_PRESENT | FLAG_WRITABLE | FLAG_USER;
            }
            PAGE_DIRECTORY.entries[table_index] =
                (core::ptr::addr_of!(*table) as u32) | FLAG_PRESENT | FLAG_WRITABLE | FLAG_USER;
        }

        let pd_addr = core::ptr::addr_of!(PAGE_DIRECTORY) as u32;
        regs::write_cr3(pd_addr);
        regs::enable_paging();
    }
}

/// Maps `size` bytes (rounded up to a page) of virtual address `virt` to
/// physical address `phys`, allocating page tables from the extra-table
/// bump pool as needed.
///
/// # Safety
/// `virt`/`phys` must be page-aligned, and the caller must not already
/// have a conflicting mapping live over the same virtual range.
pub unsafe fn map_region(virt: usize, phys: usize, size: usize, flags: PageFlags) -> KernelResult<()> {
    let pages = size.div_ceil(PAGE_SIZE);
    for page in 0..pages {
        let v = virt + page * PAGE_SIZE;
        let p = phys + page * PAGE_SIZE;
        // SAFETY: caller guarantees `v`/`p` are page-aligned and unmapped.
        unsafe { map_page(v, p, flags)? };
    }
    regs::flush_tlb();
    Ok(())
}

/// # Safety
/// Same contract as [`map_region`], for a single page.
unsafe fn map_page(virt: usize, phys: usize, flags: PageFlags) -> KernelResult<()> {
    let dir_index = (virt >> 22) & 0x3ff;
    let table_index = (virt >> 12) & 0x3ff;

    // SAFETY: `PAGE_DIRECTORY`/`EXTRA_TABLES` are only touched here and in
    // `init`, both single-threaded boot-adjacent contexts protected by the
    // `NEXT_EXTRA_TABLE` lock for table allocation.
    unsafe {
        let dir_entry = PAGE_DIRECTORY.entries[dir_index];
        let table_ptr: *mut PageTable = if dir_entry & FLAG_PRESENT != 0 {
            (dir_entry & 0xffff_f000) as *mut PageTable
        } else {
            let mut next = NEXT_EXTRA_TABLE.lock();
            if *next >= EXTRA_PAGE_TABLES {
                return Err(KernelError::PageTablePoolExhausted);
            }
            let table = &mut EXTRA_TABLES[*next];
            *next += 1;
            *table = PageTable::empty();
            let table_addr = core::ptr::addr_of!(*table) as u32;
            PAGE_DIRECTORY.entries[dir_index] =
                table_addr | FLAG_PRESENT | FLAG_WRITABLE | FLAG_USER;
            table as *mut PageTable
        };

        let entry_flags = FLAG_PRESENT | flags.bits();
        (*table_ptr).entries[table_index] = (phys as u32) | entry_flags;
    }
    Ok(())
}
