use std::io;

use uuid::Uuid;

use crate::constants::{GPT_PARTITION_ENTRY_SIZE, GPT_PARTITION_NAME_UNITS, SECTOR_SIZE};

/// Fixed-width UTF-16LE partition name as stored in a GPT entry.
pub type GptPartitionName = [u16; GPT_PARTITION_NAME_UNITS];

// GPT Partition Entry structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GptPartitionEntry {
    pub partition_type_guid: Uuid,
    pub unique_partition_guid: Uuid,
    pub starting_lba: u64,
    pub ending_lba: u64,
    pub attributes: u64,
    pub partition_name: GptPartitionName,
}

/// Encodes `name` into a zero-padded name field, truncating past 36 units.
pub fn encode_partition_name(name: &str) -> GptPartitionName {
    let mut name_units = [0u16; GPT_PARTITION_NAME_UNITS];
    for (i, c) in name.encode_utf16().take(GPT_PARTITION_NAME_UNITS).enumerate() {
        name_units[i] = c;
    }
    name_units
}

impl GptPartitionEntry {
    pub fn new(
        partition_type_guid: Uuid,
        unique_partition_guid: Uuid,
        starting_lba: u64,
        ending_lba: u64,
        partition_name: &str,
        attributes: u64,
    ) -> Self {
        GptPartitionEntry {
            partition_type_guid,
            unique_partition_guid,
            starting_lba,
            ending_lba,
            attributes,
            partition_name: encode_partition_name(partition_name),
        }
    }

    /// Unused slots carry an all-zero type GUID.
    pub fn is_used(&self) -> bool {
        !self.partition_type_guid.is_nil()
    }

    /// Logical name, stopping at the first NUL unit.
    pub fn name(&self) -> String {
        let end = self
            .partition_name
            .iter()
            .position(|&unit| unit == 0)
            .unwrap_or(GPT_PARTITION_NAME_UNITS);
        String::from_utf16_lossy(&self.partition_name[..end])
    }

    /// Byte offset and length of the partition on the disk.
    ///
    /// Fails for an inverted range or one that does not fit in 64-bit byte
    /// offsets; such tables come from foreign or damaged disks.
    pub fn byte_range(&self) -> io::Result<(u64, u64)> {
        let invalid = || {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "GPT entry {:?} has invalid LBA range {}..={}",
                    self.name(),
                    self.starting_lba,
                    self.ending_lba
                ),
            )
        };
        if self.ending_lba < self.starting_lba {
            return Err(invalid());
        }
        let offset = self.starting_lba.checked_mul(SECTOR_SIZE).ok_or_else(invalid)?;
        let length = (self.ending_lba - self.starting_lba)
            .checked_add(1)
            .and_then(|sectors| sectors.checked_mul(SECTOR_SIZE))
            .ok_or_else(invalid)?;
        offset.checked_add(length).ok_or_else(invalid)?;
        Ok((offset, length))
    }

    pub fn to_bytes(&self) -> [u8; GPT_PARTITION_ENTRY_SIZE] {
        let mut bytes = [0u8; GPT_PARTITION_ENTRY_SIZE];
        let mut offset = 0;

        bytes[offset..offset + 16].copy_from_slice(&self.partition_type_guid.to_bytes_le());
        offset += 16;
        bytes[offset..offset + 16].copy_from_slice(&self.unique_partition_guid.to_bytes_le());
        offset += 16;
        bytes[offset..offset + 8].copy_from_slice(&self.starting_lba.to_le_bytes());
        offset += 8;
        bytes[offset..offset + 8].copy_from_slice(&self.ending_lba.to_le_bytes());
        offset += 8;
        bytes[offset..offset + 8].copy_from_slice(&self.attributes.to_le_bytes());
        offset += 8;
        for unit in self.partition_name {
            bytes[offset..offset + 2].copy_from_slice(&unit.to_le_bytes());
            offset += 2;
        }

        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        if bytes.len() < GPT_PARTITION_ENTRY_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "GPT partition entry needs {} bytes, got {}",
                    GPT_PARTITION_ENTRY_SIZE,
                    bytes.len()
                ),
            ));
        }

        let guid_at = |at: usize| {
            let mut raw = [0u8; 16];
            raw.copy_from_slice(&bytes[at..at + 16]);
            Uuid::from_bytes_le(raw)
        };
        let u64_at = |at: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[at..at + 8]);
            u64::from_le_bytes(raw)
        };

        let mut partition_name = [0u16; GPT_PARTITION_NAME_UNITS];
        for (i, unit) in bytes[56..GPT_PARTITION_ENTRY_SIZE].chunks_exact(2).enumerate() {
            partition_name[i] = u16::from_le_bytes([unit[0], unit[1]]);
        }

        Ok(GptPartitionEntry {
            partition_type_guid: guid_at(0),
            unique_partition_guid: guid_at(16),
            starting_lba: u64_at(32),
            ending_lba: u64_at(40),
            attributes: u64_at(48),
            partition_name,
        })
    }
}
