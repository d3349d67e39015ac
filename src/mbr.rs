// sfpd-align/src/mbr.rs

use std::io::{self, Read, Seek, SeekFrom};

use crate::constants::MBR_BOOT_SIGNATURE;

// MBR constants
const MBR_SIZE: usize = 512;
const PARTITION_TABLE_OFFSET: usize = 446;
const PARTITION_ENTRY_SIZE: usize = 16;
const BOOT_SIGNATURE_OFFSET: usize = 510;

/// Partition type marking a protective MBR in front of a GPT.
pub const GPT_PROTECTIVE_TYPE: u8 = 0xEE;

// Partition entry structure (16 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionEntry {
    /// Status of the partition (e.g., 0x80 for active)
    pub status: u8,
    /// Partition type (e.g., 0x07 for HPFS/NTFS/exFAT, 0x0C for FAT32 LBA)
    pub partition_type: u8,
    /// Starting LBA of the partition (32-bit)
    pub start_lba: u32,
    /// Number of sectors in the partition (32-bit)
    pub sector_count: u32,
}

impl PartitionEntry {
    fn from_bytes(bytes: &[u8]) -> Self {
        PartitionEntry {
            status: bytes[0],
            partition_type: bytes[4],
            start_lba: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            sector_count: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; PARTITION_ENTRY_SIZE] {
        let mut bytes = [0u8; PARTITION_ENTRY_SIZE];
        bytes[0] = self.status;
        bytes[4] = self.partition_type;
        bytes[8..12].copy_from_slice(&self.start_lba.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.sector_count.to_le_bytes());
        bytes
    }

    pub fn is_used(&self) -> bool {
        self.partition_type != 0 && self.sector_count != 0
    }

    pub fn is_bootable(&self) -> bool {
        self.status == 0x80
    }
}

/// The partition table of a Master Boot Record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mbr {
    pub disk_signature: u32,
    pub partition_table: [PartitionEntry; 4],
}

impl Mbr {
    /// Parses LBA 0. Returns `None` when the boot signature is absent.
    pub fn from_sector(sector: &[u8; MBR_SIZE]) -> Option<Self> {
        if sector[BOOT_SIGNATURE_OFFSET..MBR_SIZE] != MBR_BOOT_SIGNATURE {
            return None;
        }

        let mut partition_table = [PartitionEntry::default(); 4];
        for (i, entry) in partition_table.iter_mut().enumerate() {
            let start = PARTITION_TABLE_OFFSET + i * PARTITION_ENTRY_SIZE;
            *entry = PartitionEntry::from_bytes(&sector[start..start + PARTITION_ENTRY_SIZE]);
        }

        Some(Mbr {
            disk_signature: u32::from_le_bytes([sector[440], sector[441], sector[442], sector[443]]),
            partition_table,
        })
    }

    pub fn read_from<R: Read + Seek>(reader: &mut R) -> io::Result<Option<Self>> {
        reader.seek(SeekFrom::Start(0))?;
        let mut sector = [0u8; MBR_SIZE];
        reader.read_exact(&mut sector)?;
        Ok(Mbr::from_sector(&sector))
    }

    /// True for the single 0xEE entry written in front of a GPT.
    pub fn is_protective(&self) -> bool {
        self.partition_table
            .iter()
            .any(|entry| entry.partition_type == GPT_PROTECTIVE_TYPE)
    }

    pub fn to_sector(&self) -> [u8; MBR_SIZE] {
        let mut sector = [0u8; MBR_SIZE];
        sector[440..444].copy_from_slice(&self.disk_signature.to_le_bytes());
        for (i, entry) in self.partition_table.iter().enumerate() {
            let start = PARTITION_TABLE_OFFSET + i * PARTITION_ENTRY_SIZE;
            sector[start..start + PARTITION_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
        }
        sector[BOOT_SIGNATURE_OFFSET..MBR_SIZE].copy_from_slice(&MBR_BOOT_SIGNATURE);
        sector
    }

    /// Protective MBR covering a GPT disk of `total_lbas` sectors.
    pub fn protective(total_lbas: u64) -> Self {
        let mut mbr = Mbr::default();
        mbr.partition_table[0] = PartitionEntry {
            status: 0x00,
            partition_type: GPT_PROTECTIVE_TYPE,
            start_lba: 1, // Starts after MBR itself
            sector_count: u32::try_from(total_lbas - 1).unwrap_or(u32::MAX),
        };
        mbr
    }
}
