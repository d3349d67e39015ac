// sfpd-align/src/gpt.rs
//! GUID Partition Table reading.
//!
//! Only the primary header and entry array are consulted; a corrupt primary
//! table is reported as an error instead of falling back to the backup copy.

use std::io::{self, Read, Seek, SeekFrom};

use crate::constants::{GPT_PARTITION_ENTRY_SIZE, SECTOR_SIZE};

pub mod header;
pub mod partition_entry;

pub use header::GptHeader;
pub use partition_entry::{GptPartitionEntry, GptPartitionName, encode_partition_name};

/// Upper bound on the entry array we are willing to load.
const MAX_PARTITION_ARRAY_LEN: usize = 1024 * 1024;

/// Reads the raw entry array described by `header` and checks its CRC32.
pub fn read_partition_array<R: Read + Seek>(
    reader: &mut R,
    header: &GptHeader,
) -> io::Result<Vec<u8>> {
    let array_len = header.partition_array_len();
    if array_len > MAX_PARTITION_ARRAY_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("GPT partition array of {} bytes is too large", array_len),
        ));
    }

    let array_offset = header
        .partition_entry_lba
        .checked_mul(SECTOR_SIZE)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "GPT partition array LBA {} is out of range",
                    header.partition_entry_lba
                ),
            )
        })?;
    reader.seek(SeekFrom::Start(array_offset))?;
    let mut array = vec![0u8; array_len];
    reader.read_exact(&mut array)?;

    let computed = crc32fast::hash(&array);
    if computed != header.partition_array_crc32 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "GPT partition array CRC32 mismatch: stored {:#010x}, computed {:#010x}",
                header.partition_array_crc32, computed
            ),
        ));
    }
    Ok(array)
}

/// Decodes every slot of the array, used or not, in table order.
pub fn parse_partition_entries(
    header: &GptHeader,
    array: &[u8],
) -> io::Result<Vec<GptPartitionEntry>> {
    if (header.partition_entry_size as usize) < GPT_PARTITION_ENTRY_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "GPT partition entry size {} is too small",
                header.partition_entry_size
            ),
        ));
    }
    array
        .chunks_exact(header.partition_entry_size as usize)
        .take(header.num_partition_entries as usize)
        .map(GptPartitionEntry::from_bytes)
        .collect()
}

/// Reads the primary header and returns it with its used entries, each paired
/// with its 1-based slot number.
pub fn read_gpt<R: Read + Seek>(
    reader: &mut R,
) -> io::Result<(GptHeader, Vec<(u32, GptPartitionEntry)>)> {
    let header = GptHeader::read_from(reader)?;
    let array = read_partition_array(reader, &header)?;
    let entries = parse_partition_entries(&header, &array)?
        .into_iter()
        .enumerate()
        .filter(|(_, entry)| entry.is_used())
        .map(|(slot, entry)| (slot as u32 + 1, entry))
        .collect();
    Ok((header, entries))
}
