use std::io::{self, Read, Seek, SeekFrom};

use crc32fast::Hasher;
use uuid::Uuid;

use crate::constants::{
    GPT_HEADER_CRC_SIZE, GPT_HEADER_LBA, GPT_PARTITION_ENTRY_SIZE, GPT_SIGNATURE, SECTOR_SIZE,
};

/// On-disk size of the header sector.
pub const GPT_HEADER_SECTOR_SIZE: usize = SECTOR_SIZE as usize;

// GPT Header structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GptHeader {
    pub signature: [u8; 8], // "EFI PART"
    pub revision: u32,
    pub header_size: u32,
    pub header_crc32: u32,
    pub current_lba: u64,
    pub backup_lba: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
    pub disk_guid: Uuid,
    pub partition_entry_lba: u64,
    pub num_partition_entries: u32,
    pub partition_entry_size: u32,
    pub partition_array_crc32: u32,
}

impl GptHeader {
    pub fn new(
        total_lbas: u64,
        disk_guid: Uuid,
        partition_entry_lba: u64,
        num_partition_entries: u32,
    ) -> Self {
        let array_lbas = (num_partition_entries as u64 * GPT_PARTITION_ENTRY_SIZE as u64)
            .div_ceil(SECTOR_SIZE);

        GptHeader {
            signature: GPT_SIGNATURE,
            revision: 0x00010000, // Version 1.0
            header_size: GPT_HEADER_CRC_SIZE as u32,
            header_crc32: 0, // Calculated by `seal`
            current_lba: GPT_HEADER_LBA,
            backup_lba: total_lbas - 1,
            first_usable_lba: partition_entry_lba + array_lbas,
            last_usable_lba: total_lbas.saturating_sub(array_lbas + 2),
            disk_guid,
            partition_entry_lba,
            num_partition_entries,
            partition_entry_size: GPT_PARTITION_ENTRY_SIZE as u32,
            partition_array_crc32: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; GPT_HEADER_SECTOR_SIZE] {
        let mut bytes = [0u8; GPT_HEADER_SECTOR_SIZE];
        let mut offset = 0;

        bytes[offset..offset + 8].copy_from_slice(&self.signature);
        offset += 8;
        bytes[offset..offset + 4].copy_from_slice(&self.revision.to_le_bytes());
        offset += 4;
        bytes[offset..offset + 4].copy_from_slice(&self.header_size.to_le_bytes());
        offset += 4;
        bytes[offset..offset + 4].copy_from_slice(&self.header_crc32.to_le_bytes());
        offset += 8; // 4 reserved bytes follow the CRC
        bytes[offset..offset + 8].copy_from_slice(&self.current_lba.to_le_bytes());
        offset += 8;
        bytes[offset..offset + 8].copy_from_slice(&self.backup_lba.to_le_bytes());
        offset += 8;
        bytes[offset..offset + 8].copy_from_slice(&self.first_usable_lba.to_le_bytes());
        offset += 8;
        bytes[offset..offset + 8].copy_from_slice(&self.last_usable_lba.to_le_bytes());
        offset += 8;
        bytes[offset..offset + 16].copy_from_slice(&self.disk_guid.to_bytes_le());
        offset += 16;
        bytes[offset..offset + 8].copy_from_slice(&self.partition_entry_lba.to_le_bytes());
        offset += 8;
        bytes[offset..offset + 4].copy_from_slice(&self.num_partition_entries.to_le_bytes());
        offset += 4;
        bytes[offset..offset + 4].copy_from_slice(&self.partition_entry_size.to_le_bytes());
        offset += 4;
        bytes[offset..offset + 4].copy_from_slice(&self.partition_array_crc32.to_le_bytes());

        bytes
    }

    /// Parses a header sector. Fails if the signature is missing or the entry
    /// size is below 128 bytes.
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        if bytes.len() < GPT_HEADER_CRC_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("GPT header needs {} bytes, got {}", GPT_HEADER_CRC_SIZE, bytes.len()),
            ));
        }
        if bytes[0..8] != GPT_SIGNATURE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "GPT header signature not found",
            ));
        }

        let u32_at = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let u64_at = |at: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[at..at + 8]);
            u64::from_le_bytes(raw)
        };
        let partition_entry_size = u32_at(84);
        if (partition_entry_size as usize) < GPT_PARTITION_ENTRY_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("GPT partition entry size {} is too small", partition_entry_size),
            ));
        }
        let mut guid = [0u8; 16];
        guid.copy_from_slice(&bytes[56..72]);

        Ok(GptHeader {
            signature: GPT_SIGNATURE,
            revision: u32_at(8),
            header_size: u32_at(12),
            header_crc32: u32_at(16),
            current_lba: u64_at(24),
            backup_lba: u64_at(32),
            first_usable_lba: u64_at(40),
            last_usable_lba: u64_at(48),
            disk_guid: Uuid::from_bytes_le(guid),
            partition_entry_lba: u64_at(72),
            num_partition_entries: u32_at(80),
            partition_entry_size,
            partition_array_crc32: u32_at(88),
        })
    }

    /// CRC32 of the first `header_size` bytes with the CRC field zeroed.
    pub fn compute_crc32(&self) -> u32 {
        let mut header = *self;
        header.header_crc32 = 0; // Zero out CRC field for calculation
        let header_bytes = header.to_bytes();
        let len = (self.header_size as usize).clamp(GPT_HEADER_CRC_SIZE, GPT_HEADER_SECTOR_SIZE);
        let mut hasher = Hasher::new();
        hasher.update(&header_bytes[..len]);
        hasher.finalize()
    }

    /// Stores the array CRC and then the header CRC.
    pub fn seal(&mut self, partition_array: &[u8]) {
        self.partition_array_crc32 = crc32fast::hash(partition_array);
        self.header_crc32 = self.compute_crc32();
    }

    /// Byte length of the partition entry array this header describes.
    pub fn partition_array_len(&self) -> usize {
        (self.num_partition_entries as usize).saturating_mul(self.partition_entry_size as usize)
    }

    /// Reads the primary header from LBA 1 and checks its CRC.
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> io::Result<Self> {
        reader.seek(SeekFrom::Start(GPT_HEADER_LBA * SECTOR_SIZE))?;
        let mut sector = [0u8; GPT_HEADER_SECTOR_SIZE];
        reader.read_exact(&mut sector)?;

        let header = GptHeader::from_bytes(&sector)?;
        let computed = header.compute_crc32();
        if computed != header.header_crc32 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "GPT header CRC32 mismatch: stored {:#010x}, computed {:#010x}",
                    header.header_crc32, computed
                ),
            ));
        }
        Ok(header)
    }
}
