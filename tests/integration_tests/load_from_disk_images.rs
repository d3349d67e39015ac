use std::{fs, io, path::Path};

use sfpd_align::{
    CalibrationError, CalibrationLoader, CalibrationRecord, LoadState, PanelSide, VolumeLocation,
    resolve_volume,
};
use tempfile::tempdir;

use crate::integration_tests::common::{
    PartitionSpec, disk_path, disk_provider, gpt_entry, scan_options, write_gpt_disk,
    write_mbr_disk, write_sealed_gpt_disk,
};

const RECORD_FILE: &str = "PixelAlignmentData.bin";

fn record() -> CalibrationRecord {
    CalibrationRecord {
        reserved0: 0,
        reserved1: 0x00C0_FFEE,
        panel0_side: PanelSide::Left,
        panel1_side: PanelSide::Right,
        panel0_shift: 5,
        panel1_shift: 10,
    }
}

#[test]
fn test_load_record_from_sfpd_partition() -> Result<(), CalibrationError> {
    let temp_dir = tempdir()?;
    let bytes = record().to_bytes();

    // disk0 is missing, disk1 is MBR with the record on it, disk2 is the real one
    write_mbr_disk(&disk_path(temp_dir.path(), 1), &[(RECORD_FILE, &[0u8; 24][..])])?;
    write_gpt_disk(
        &disk_path(temp_dir.path(), 2),
        &[
            PartitionSpec {
                name: "EFI system partition",
                files: &[],
            },
            PartitionSpec {
                name: "sfpd",
                files: &[(RECORD_FILE, &bytes[..])],
            },
        ],
    )?;

    let provider = disk_provider(temp_dir.path());
    assert_eq!(
        resolve_volume(&provider, &scan_options())?,
        VolumeLocation::new(2, 2)
    );

    let mut loader = CalibrationLoader::raw_disks(provider, scan_options());
    assert_eq!(loader.load()?, record());
    assert_eq!(loader.state(), LoadState::Loaded);
    Ok(())
}

#[test]
fn test_wrong_record_size_is_corrupt() -> io::Result<()> {
    let temp_dir = tempdir()?;
    write_gpt_disk(
        &disk_path(temp_dir.path(), 0),
        &[PartitionSpec {
            name: "sfpd",
            files: &[(RECORD_FILE, &[0xFFu8; 25][..])],
        }],
    )?;

    let mut loader = CalibrationLoader::raw_disks(disk_provider(temp_dir.path()), scan_options());
    let err = loader.load().unwrap_err();
    assert!(
        matches!(
            err,
            CalibrationError::Corrupt {
                expected: 24,
                actual: 25
            }
        ),
        "unexpected error: {}",
        err
    );
    assert_eq!(loader.state(), LoadState::Failed);
    Ok(())
}

#[test]
fn test_names_must_match_exactly() -> io::Result<()> {
    let temp_dir = tempdir()?;
    write_gpt_disk(
        &disk_path(temp_dir.path(), 0),
        &[
            PartitionSpec {
                name: "SFPD",
                files: &[(RECORD_FILE, &[0u8; 24][..])],
            },
            PartitionSpec {
                name: "sfpd2",
                files: &[(RECORD_FILE, &[0u8; 24][..])],
            },
        ],
    )?;

    let mut loader = CalibrationLoader::raw_disks(disk_provider(temp_dir.path()), scan_options());
    assert!(matches!(
        loader.load().unwrap_err(),
        CalibrationError::NotFound(_)
    ));
    Ok(())
}

#[test]
fn test_missing_record_file_is_not_found() -> io::Result<()> {
    let temp_dir = tempdir()?;
    write_gpt_disk(
        &disk_path(temp_dir.path(), 3),
        &[PartitionSpec {
            name: "sfpd",
            files: &[("other.bin", &[1u8, 2, 3][..])],
        }],
    )?;

    let mut loader = CalibrationLoader::raw_disks(disk_provider(temp_dir.path()), scan_options());
    let err = loader.load().unwrap_err();
    assert!(matches!(err, CalibrationError::NotFound(_)), "{}", err);
    Ok(())
}

#[test]
fn test_corrupt_gpt_disk_is_skipped() -> Result<(), CalibrationError> {
    let temp_dir = tempdir()?;
    let bytes = record().to_bytes();
    let sfpd = [PartitionSpec {
        name: "sfpd",
        files: &[(RECORD_FILE, &bytes[..])],
    }];

    write_gpt_disk(&disk_path(temp_dir.path(), 0), &sfpd)?;
    write_gpt_disk(&disk_path(temp_dir.path(), 1), &sfpd)?;

    // Break the entry array CRC on disk0.
    let broken = disk_path(temp_dir.path(), 0);
    let mut image = fs::read(&broken)?;
    image[1024 + 56] ^= 0xFF;
    fs::write(&broken, image)?;

    let provider = disk_provider(temp_dir.path());
    assert_eq!(
        resolve_volume(&provider, &scan_options())?,
        VolumeLocation::new(1, 1)
    );
    Ok(())
}

/// Disk 0 carries `broken`, disk 1 a readable sfpd partition.
fn assert_broken_disk_is_skipped(
    broken: impl FnOnce(&Path) -> io::Result<()>,
) -> Result<(), CalibrationError> {
    let temp_dir = tempdir()?;
    let bytes = record().to_bytes();
    broken(&disk_path(temp_dir.path(), 0))?;
    write_gpt_disk(
        &disk_path(temp_dir.path(), 1),
        &[PartitionSpec {
            name: "sfpd",
            files: &[(RECORD_FILE, &bytes[..])],
        }],
    )?;

    let provider = disk_provider(temp_dir.path());
    assert_eq!(
        resolve_volume(&provider, &scan_options())?,
        VolumeLocation::new(1, 1)
    );
    let mut loader = CalibrationLoader::raw_disks(provider, scan_options());
    assert_eq!(loader.load()?, record());
    Ok(())
}

#[test]
fn test_gpt_with_overflowing_entry_lbas_is_skipped() -> Result<(), CalibrationError> {
    assert_broken_disk_is_skipped(|path| {
        write_sealed_gpt_disk(path, &[gpt_entry("data", u64::MAX / 4, u64::MAX)], |_| {})
    })
}

#[test]
fn test_gpt_with_inverted_entry_range_is_skipped() -> Result<(), CalibrationError> {
    assert_broken_disk_is_skipped(|path| {
        write_sealed_gpt_disk(path, &[gpt_entry("sfpd", 100, 40)], |_| {})
    })
}

#[test]
fn test_gpt_with_entry_array_past_end_of_disk_is_skipped() -> Result<(), CalibrationError> {
    assert_broken_disk_is_skipped(|path| {
        write_sealed_gpt_disk(path, &[gpt_entry("sfpd", 34, 100)], |header| {
            header.partition_entry_lba = 1_000_000;
        })
    })
}

#[test]
fn test_gpt_with_unaddressable_entry_array_is_skipped() -> Result<(), CalibrationError> {
    assert_broken_disk_is_skipped(|path| {
        write_sealed_gpt_disk(path, &[gpt_entry("sfpd", 34, 100)], |header| {
            header.partition_entry_lba = u64::MAX / 2;
        })
    })
}

#[test]
fn test_gpt_with_short_entry_size_is_skipped() -> Result<(), CalibrationError> {
    assert_broken_disk_is_skipped(|path| {
        write_sealed_gpt_disk(path, &[gpt_entry("sfpd", 34, 100)], |header| {
            header.partition_entry_size = 64;
        })
    })
}
