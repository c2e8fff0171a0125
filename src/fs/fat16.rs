//! FAT16 reader: BIOS Parameter Block, root directory, and cluster-chain
//! file reads (spec.md §6). Field offsets follow the standard FAT16 BPB
//! layout also used by `original_source/kernel/fat.c`; 8.3 names only,
//! long-file-name entries (`attr & 0x0F == 0x0F`) are skipped.

use alloc::vec::Vec;

use crate::drivers::ata::Drive;
use crate::error::{KernelError, KernelResult};

const SECTOR_SIZE: usize = 512;
const DIR_ENTRY_SIZE: usize = 32;
const ATTR_LONG_NAME: u8 = 0x0F;
const ATTR_DIRECTORY: u8 = 0x10;
const FAT16_EOC_MIN: u16 = 0xFFF8;

struct Bpb {
    bytes_per_sector: u16,
    sectors_per_cluster: u8,
    reserved_sectors: u16,
    fat_count: u8,
    root_entry_count: u16,
    sectors_per_fat: u16,
    hidden_sectors: u32,
}

impl Bpb {
    fn parse(sector0: &[u8; SECTOR_SIZE]) -> Self {
        Self {
            bytes_per_sector: u16::from_le_bytes([sector0[11], sector0[12]]),
            sectors_per_cluster: sector0[13],
            reserved_sectors: u16::from_le_bytes([sector0[14], sector0[15]]),
            fat_count: sector0[16],
            root_entry_count: u16::from_le_bytes([sector0[17], sector0[18]]),
            sectors_per_fat: u16::from_le_bytes([sector0[22], sector0[23]]),
            hidden_sectors: u32::from_le_bytes([sector0[28], sector0[29], sector0[30], sector0[31]]),
        }
    }

    fn root_dir_sectors(&self) -> u32 {
        let root_bytes = u32::from(self.root_entry_count) * DIR_ENTRY_SIZE as u32;
        root_bytes.div_ceil(u32::from(self.bytes_per_sector))
    }

    fn first_root_dir_sector(&self) -> u32 {
        self.hidden_sectors
            + u32::from(self.reserved_sectors)
            + u32::from(self.fat_count) * u32::from(self.sectors_per_fat)
    }

    fn first_data_sector(&self) -> u32 {
        self.first_root_dir_sector() + self.root_dir_sectors()
    }

    fn first_fat_sector(&self) -> u32 {
        self.hidden_sectors + u32::from(self.reserved_sectors)
    }

    fn cluster_to_sector(&self, cluster: u16) -> u32 {
        self.first_data_sector() + (u32::from(cluster) - 2) * u32::from(self.sectors_per_cluster)
    }
}

/// A mounted, read-only FAT16 volume.
pub struct Fat16 {
    drive: Drive,
    bpb: Bpb,
}

/// One directory entry: an 8.3 name and the info needed to read its data.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: [u8; 11],
    pub is_directory: bool,
    pub first_cluster: u16,
    pub size: u32,
}

impl DirEntry {
    /// Renders the 8.3 name as `NAME.EXT`, trimming trailing spaces.
    #[must_use]
    pub fn display_name(&self) -> alloc::string::String {
        let base = trim_spaces(&self.name[0..8]);
        let ext = trim_spaces(&self.name[8..11]);
        if ext.is_empty() {
            base
        } else {
            alloc::format!("{base}.{ext}")
        }
    }
}

fn trim_spaces(bytes: &[u8]) -> alloc::string::String {
    let trimmed = bytes
        .iter()
        .rev()
        .skip_while(|&&b| b == b' ')
        .collect::<Vec<_>>();
    trimmed.iter().rev().map(|&&b| b as char).collect()
}

impl Fat16 {
    /// Mounts the FAT16 volume on `drive` by reading and validating its BPB.
    pub fn mount(drive: Drive) -> KernelResult<Self> {
        let mut sector0 = [0u8; SECTOR_SIZE];
        drive.read_sectors(0, 1, &mut sector0)?;
        if sector0[510] != 0x55 || sector0[511] != 0xAA {
            return Err(KernelError::FilesystemUnavailable);
        }
        Ok(Self {
            drive,
            bpb: Bpb::parse(&sector0),
        })
    }

    /// Lists every non-LFN entry in the root directory.
    pub fn read_root_dir(&self) -> KernelResult<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let sector_count = self.bpb.root_dir_sectors();
        let mut buf = alloc::vec![0u8; SECTOR_SIZE];

        for sector_offset in 0..sector_count {
            self.drive
                .read_sectors(self.bpb.first_root_dir_sector() + sector_offset, 1, &mut buf)?;
            for chunk in buf.chunks_exact(DIR_ENTRY_SIZE) {
                if chunk[0] == 0x00 {
                    return Ok(entries); // no more entries
                }
                if chunk[0] == 0xE5 {
                    continue; // deleted
                }
                let attr = chunk[11];
                if attr == ATTR_LONG_NAME {
                    continue;
                }
                let mut name = [0u8; 11];
                name.copy_from_slice(&chunk[0..11]);
                entries.push(DirEntry {
                    name,
                    is_directory: attr & ATTR_DIRECTORY != 0,
                    first_cluster: u16::from_le_bytes([chunk[26], chunk[27]]),
                    size: u32::from_le_bytes([chunk[28], chunk[29], chunk[30], chunk[31]]),
                });
            }
        }
        Ok(entries)
    }

    /// Finds a root-directory entry by its case-sensitive 8.3 display name.
    pub fn find(&self, name: &str) -> KernelResult<DirEntry> {
        self.read_root_dir()?
            .into_iter()
            .find(|entry| entry.display_name().eq_ignore_ascii_case(name))
            .ok_or(KernelError::FileNotFound)
    }

    /// Reads up to `out.len()` bytes of `entry`'s contents, following its
    /// cluster chain, and returns the number of bytes actually read.
    pub fn read_file(&self, entry: &DirEntry, out: &mut [u8]) -> KernelResult<usize> {
        let mut cluster = entry.first_cluster;
        let mut written = 0usize;
        let remaining_total = out.len().min(entry.size as usize);
        let cluster_bytes =
            usize::from(self.bpb.sectors_per_cluster) * usize::from(self.bpb.bytes_per_sector);

        while cluster < FAT16_EOC_MIN && written < remaining_total {
            let sector = self.bpb.cluster_to_sector(cluster);
            let mut cluster_buf = alloc::vec![0u8; cluster_bytes];
            self.drive
                .read_sectors(sector, self.bpb.sectors_per_cluster, &mut cluster_buf)?;

            let to_copy = cluster_bytes.min(remaining_total - written);
            out[written..written + to_copy].copy_from_slice(&cluster_buf[..to_copy]);
            written += to_copy;

            cluster = self.next_cluster(cluster)?;
        }
        Ok(written)
    }

    fn next_cluster(&self, cluster: u16) -> KernelResult<u16> {
        let fat_offset = usize::from(cluster) * 2;
        let sector = self.bpb.first_fat_sector() + (fat_offset / SECTOR_SIZE) as u32;
        let mut buf = [0u8; SECTOR_SIZE];
        self.drive.read_sectors(sector, 1, &mut buf)?;
        let within = fat_offset % SECTOR_SIZE;
        Ok(u16::from_le_bytes([buf[within], buf[within + 1]]))
    }
}
