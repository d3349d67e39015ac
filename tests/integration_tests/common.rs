use std::{
    fs,
    io::{self, Cursor, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use fatfs::{FileSystem, FormatVolumeOptions, FsOptions};
use sfpd_align::{
    RawDiskProvider, ScanOptions,
    gpt::{GptHeader, GptPartitionEntry},
    mbr::{Mbr, PartitionEntry},
};
use uuid::Uuid;

const SECTOR: u64 = 512;
const FIRST_PARTITION_LBA: u64 = 2048;
const PARTITION_SECTORS: u64 = 8192; // 4 MiB
const ENTRY_ARRAY_LBA: u64 = 2;
const ENTRY_COUNT: u32 = 128;

const BASIC_DATA: Uuid = Uuid::from_u128(0xEBD0A0A2_B9E5_4433_87C0_68B6B72699C7);

/// A FAT partition to place on a test disk, with the files in its root.
pub struct PartitionSpec<'a> {
    pub name: &'a str,
    pub files: &'a [(&'a str, &'a [u8])],
}

/// Path of disk `index` as `disk_provider` will open it.
pub fn disk_path(dir: &Path, index: u32) -> PathBuf {
    dir.join(format!("disk{}.img", index))
}

pub fn disk_provider(dir: &Path) -> RawDiskProvider {
    RawDiskProvider::new(dir.join("disk{index}.img").to_string_lossy().into_owned())
}

/// Scan bounds for test disks: no retry delay and only a few indices.
pub fn scan_options() -> ScanOptions {
    ScanOptions {
        max_device_index: 3,
        open_retry_delay: Duration::ZERO,
        ..ScanOptions::default()
    }
}

/// Formats a FAT volume of `sectors` sectors holding `files`.
fn fat_volume(sectors: u64, files: &[(&str, &[u8])]) -> io::Result<Vec<u8>> {
    let mut volume = Cursor::new(vec![0u8; (sectors * SECTOR) as usize]);
    fatfs::format_volume(&mut volume, FormatVolumeOptions::new())?;
    volume.seek(SeekFrom::Start(0))?;
    {
        let fs = FileSystem::new(&mut volume, FsOptions::new())?;
        let root_dir = fs.root_dir();
        for (name, content) in files {
            let mut file = root_dir.create_file(name)?;
            file.write_all(content)?;
            file.flush()?;
        }
    }
    Ok(volume.into_inner())
}

/// Writes a GPT disk with one FAT partition per entry, in order.
pub fn write_gpt_disk(path: &Path, partitions: &[PartitionSpec<'_>]) -> io::Result<()> {
    let total_lbas = FIRST_PARTITION_LBA + partitions.len() as u64 * PARTITION_SECTORS + 64;
    let mut disk = vec![0u8; (total_lbas * SECTOR) as usize];
    let mut array = vec![0u8; ENTRY_COUNT as usize * 128];

    for (i, partition) in partitions.iter().enumerate() {
        let start = FIRST_PARTITION_LBA + i as u64 * PARTITION_SECTORS;
        let entry = GptPartitionEntry::new(
            BASIC_DATA,
            Uuid::new_v4(),
            start,
            start + PARTITION_SECTORS - 1,
            partition.name,
            0,
        );
        array[i * 128..(i + 1) * 128].copy_from_slice(&entry.to_bytes());

        let volume = fat_volume(PARTITION_SECTORS, partition.files)?;
        let offset = (start * SECTOR) as usize;
        disk[offset..offset + volume.len()].copy_from_slice(&volume);
    }

    let mut header = GptHeader::new(total_lbas, Uuid::new_v4(), ENTRY_ARRAY_LBA, ENTRY_COUNT);
    header.seal(&array);

    disk[..512].copy_from_slice(&Mbr::protective(total_lbas).to_sector());
    disk[512..1024].copy_from_slice(&header.to_bytes());
    let array_offset = (ENTRY_ARRAY_LBA * SECTOR) as usize;
    disk[array_offset..array_offset + array.len()].copy_from_slice(&array);
    fs::write(path, disk)
}

/// Writes an MBR disk with a single FAT partition.
pub fn write_mbr_disk(path: &Path, files: &[(&str, &[u8])]) -> io::Result<()> {
    let total_lbas = FIRST_PARTITION_LBA + PARTITION_SECTORS;
    let mut disk = vec![0u8; (total_lbas * SECTOR) as usize];

    let mut partition_table = [PartitionEntry::default(); 4];
    partition_table[0] = PartitionEntry {
        status: 0x80,
        partition_type: 0x0C,
        start_lba: FIRST_PARTITION_LBA as u32,
        sector_count: PARTITION_SECTORS as u32,
    };
    let mbr = Mbr {
        disk_signature: 0x5F5F_5F5F,
        partition_table,
    };
    disk[..512].copy_from_slice(&mbr.to_sector());

    let volume = fat_volume(PARTITION_SECTORS, files)?;
    let offset = (FIRST_PARTITION_LBA * SECTOR) as usize;
    disk[offset..offset + volume.len()].copy_from_slice(&volume);
    fs::write(path, disk)
}

/// Writes a 128-sector GPT disk without file systems. `adjust` may change
/// the header before both CRCs are sealed, so the table stays CRC-valid.
pub fn write_sealed_gpt_disk(
    path: &Path,
    entries: &[GptPartitionEntry],
    adjust: impl FnOnce(&mut GptHeader),
) -> io::Result<()> {
    let total_lbas = 128;
    let mut array = vec![0u8; ENTRY_COUNT as usize * 128];
    for (i, entry) in entries.iter().enumerate() {
        array[i * 128..(i + 1) * 128].copy_from_slice(&entry.to_bytes());
    }

    let mut header = GptHeader::new(total_lbas, Uuid::new_v4(), ENTRY_ARRAY_LBA, ENTRY_COUNT);
    adjust(&mut header);
    header.seal(&array);

    let mut disk = vec![0u8; (total_lbas * SECTOR) as usize];
    disk[..512].copy_from_slice(&Mbr::protective(total_lbas).to_sector());
    disk[512..1024].copy_from_slice(&header.to_bytes());
    let array_offset = (ENTRY_ARRAY_LBA * SECTOR) as usize;
    disk[array_offset..array_offset + array.len()].copy_from_slice(&array);
    fs::write(path, disk)
}

/// A used GPT entry with arbitrary LBAs.
pub fn gpt_entry(name: &str, starting_lba: u64, ending_lba: u64) -> GptPartitionEntry {
    GptPartitionEntry::new(BASIC_DATA, Uuid::new_v4(), starting_lba, ending_lba, name, 0)
}
