//! Bootinfo record parsing (spec.md §6, supplemented from
//! `original_source/kernel/bootinfo.c`/`include/bootinfo.h`).
//!
//! The bootloader deposits a small packed record at physical
//! [`crate::config::BOOTINFO_ADDR`] describing the framebuffer, if one was
//! set up, before handing off to `_start`. When the magic is absent (no
//! bootloader support, or booted by a loader that never wrote the record)
//! the kernel falls back to VGA text mode.

const MAGIC: u32 = 0x4F59_4D42; // "BMYO" read little-endian

#[repr(C, packed)]
struct RawBootInfo {
    magic: u32,
    framebuffer_addr: u32,
    framebuffer_width: u32,
    framebuffer_height: u32,
    framebuffer_pitch: u32,
    framebuffer_bpp: u8,
    vesa_mode: u8,
}

/// Parsed, validated boot handoff information.
#[derive(Debug, Clone, Copy)]
pub struct BootInfo {
    pub framebuffer_addr: u32,
    pub framebuffer_width: u32,
    pub framebuffer_height: u32,
    pub framebuffer_pitch: u32,
    pub framebuffer_bpp: u8,
}

/// Reads and validates the bootinfo record. Returns `None` (VGA text-mode
/// fallback) if the magic is missing or `vesa_mode` says text mode.
///
/// # Safety
/// Must run before the identity-mapped low-memory region containing
/// [`crate::config::BOOTINFO_ADDR`] is reused for anything else.
pub unsafe fn read() -> Option<BootInfo> {
    // SAFETY: `BOOTINFO_ADDR` is identity-mapped low memory reserved for
    // exactly this record by the boot handoff contract.
    let raw = unsafe { &*(crate::config::BOOTINFO_ADDR as *const RawBootInfo) };
    if raw.magic != MAGIC || raw.vesa_mode == 0 {
        return None;
    }
    Some(BootInfo {
        framebuffer_addr: raw.framebuffer_addr,
        framebuffer_width: raw.framebuffer_width,
        framebuffer_height: raw.framebuffer_height,
        framebuffer_pitch: raw.framebuffer_pitch,
        framebuffer_bpp: raw.framebuffer_bpp,
    })
}
