//! ATA PIO disk driver: primary/secondary bus, LBA28 IDENTIFY and READ
//! SECTORS (spec.md §6). Probes in the order primary slave, secondary
//! master, secondary slave, skipping primary master (conventionally the
//! boot/system disk the kernel image itself was loaded from).

use crate::arch::io::{inb, inw, outb};
use crate::error::{KernelError, KernelResult};

const SECTOR_SIZE: usize = 512;

struct BusPorts {
    data: u16,
    error: u16,
    sector_count: u16,
    lba_low: u16,
    lba_mid: u16,
    lba_high: u16,
    drive_head: u16,
    status_command: u16,
}

const PRIMARY: BusPorts = BusPorts {
    data: 0x1F0,
    error: 0x1F1,
    sector_count: 0x1F2,
    lba_low: 0x1F3,
    lba_mid: 0x1F4,
    lba_high: 0x1F5,
    drive_head: 0x1F6,
    status_command: 0x1F7,
};

const SECONDARY: BusPorts = BusPorts {
    data: 0x170,
    error: 0x171,
    sector_count: 0x172,
    lba_low: 0x173,
    lba_mid: 0x174,
    lba_high: 0x175,
    drive_head: 0x176,
    status_command: 0x177,
};

const CMD_IDENTIFY: u8 = 0xEC;
const CMD_READ_SECTORS: u8 = 0x20;

const STATUS_ERR: u8 = 1 << 0;
const STATUS_DRQ: u8 = 1 << 3;
const STATUS_BSY: u8 = 1 << 7;

/// A located ATA drive: which bus/slave bit to use for subsequent I/O.
#[derive(Debug, Clone, Copy)]
pub struct Drive {
    bus: &'static BusPorts,
    slave: bool,
}

fn wait_not_busy(bus: &BusPorts) {
    // SAFETY: status port poll, read-only.
    unsafe {
        while inb(bus.status_command) & STATUS_BSY != 0 {}
    }
}

fn wait_drq(bus: &BusPorts) -> KernelResult<()> {
    // SAFETY: status port poll, read-only.
    unsafe {
        loop {
            let status = inb(bus.status_command);
            if status & STATUS_ERR != 0 {
                return Err(KernelError::DiskError);
            }
            if status & STATUS_DRQ != 0 {
                return Ok(());
            }
        }
    }
}

fn identify(bus: &'static BusPorts, slave: bool) -> Option<Drive> {
    // SAFETY: IDENTIFY is the standard ATA probe sequence; reading a
    // nonexistent drive's status port returns 0 and is well defined.
    unsafe {
        outb(bus.drive_head, if slave { 0xB0 } else { 0xA0 });
        outb(bus.sector_count, 0);
        outb(bus.lba_low, 0);
        outb(bus.lba_mid, 0);
        outb(bus.lba_high, 0);
        outb(bus.status_command, CMD_IDENTIFY);

        let status = inb(bus.status_command);
        if status == 0 {
            return None;
        }
        wait_not_busy(bus);
        if inb(bus.lba_mid) != 0 || inb(bus.lba_high) != 0 {
            return None; // not an ATA device (likely ATAPI)
        }
        if wait_drq(bus).is_err() {
            return None;
        }
        for _ in 0..256 {
            let _ = inw(bus.data);
        }
    }
    Some(Drive { bus, slave })
}

/// Probes primary slave, secondary master, secondary slave in order and
/// returns the first drive found.
pub fn probe() -> Option<Drive> {
    identify(&PRIMARY, true)
        .or_else(|| identify(&SECONDARY, false))
        .or_else(|| identify(&SECONDARY, true))
}

impl Drive {
    /// Reads `count` consecutive 512-byte sectors starting at LBA `lba`
    /// into `out`, which must be at least `count * 512` bytes.
    pub fn read_sectors(&self, lba: u32, count: u8, out: &mut [u8]) -> KernelResult<()> {
        if out.len() < usize::from(count) * SECTOR_SIZE {
            return Err(KernelError::BufferTooSmall);
        }
        let bus = self.bus;
        // SAFETY: standard ATA PIO LBA28 read command sequence.
        unsafe {
            let drive_select = 0xE0 | (u8::from(self.slave) << 4) | ((lba >> 24) & 0x0F) as u8;
            outb(bus.drive_head, drive_select);
            outb(bus.sector_count, count);
            outb(bus.lba_low, (lba & 0xFF) as u8);
            outb(bus.lba_mid, ((lba >> 8) & 0xFF) as u8);
            outb(bus.lba_high, ((lba >> 16) & 0xFF) as u8);
            outb(bus.status_command, CMD_READ_SECTORS);

            for sector in 0..usize::from(count) {
                wait_drq(bus)?;
                for word in 0..256 {
                    let value = inw(bus.data);
                    let offset = sector * SECTOR_SIZE + word * 2;
                    out[offset] = (value & 0xFF) as u8;
                    out[offset + 1] = (value >> 8) as u8;
                }
            }
        }
        Ok(())
    }
}
