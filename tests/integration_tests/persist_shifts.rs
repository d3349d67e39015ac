use std::{fs, io, path::Path};

use sfpd_align::{
    CalibrationError, CalibrationLoader, CalibrationRecord, DirectoryStore, MemoryStore,
    PanelSide, constants::{HEAT_LEFT_SHIFT, HEAT_RIGHT_SHIFT},
    store::SHIFT_KEY_PATH,
};
use tempfile::tempdir;

use crate::integration_tests::common::{
    PartitionSpec, disk_path, disk_provider, scan_options, write_gpt_disk,
};

fn write_sfpd_disk(dir: &Path, record: &[u8]) -> io::Result<()> {
    write_gpt_disk(
        &disk_path(dir, 0),
        &[PartitionSpec {
            name: "sfpd",
            files: &[("PixelAlignmentData.bin", record)],
        }],
    )
}

#[test]
fn test_apply_writes_both_sides() -> Result<(), CalibrationError> {
    let temp_dir = tempdir()?;
    let record = CalibrationRecord {
        panel0_side: PanelSide::Right,
        panel1_side: PanelSide::Left,
        panel0_shift: 42,
        panel1_shift: 7,
        ..CalibrationRecord::default()
    };
    write_sfpd_disk(temp_dir.path(), &record.to_bytes())?;

    let mut loader = CalibrationLoader::raw_disks(disk_provider(temp_dir.path()), scan_options());
    let mut store = MemoryStore::new();
    assert_eq!(loader.apply(&mut store)?, record);

    assert_eq!(
        store.get(&SHIFT_KEY_PATH, HEAT_LEFT_SHIFT),
        Some(&7u32.to_le_bytes()[..])
    );
    assert_eq!(
        store.get(&SHIFT_KEY_PATH, HEAT_RIGHT_SHIFT),
        Some(&42u32.to_le_bytes()[..])
    );
    Ok(())
}

#[test]
fn test_apply_to_directory_store_is_idempotent() -> Result<(), CalibrationError> {
    let disks = tempdir()?;
    let config = tempdir()?;
    let record = CalibrationRecord {
        panel0_side: PanelSide::Left,
        panel1_side: PanelSide::Left,
        panel0_shift: 5,
        panel1_shift: 10,
        ..CalibrationRecord::default()
    };
    write_sfpd_disk(disks.path(), &record.to_bytes())?;

    let mut loader = CalibrationLoader::raw_disks(disk_provider(disks.path()), scan_options());
    let mut store = DirectoryStore::new(config.path());
    loader.apply(&mut store)?;
    loader.apply(&mut store)?;

    let key_dir = config.path().join("Heat").join("VendorSpecific");
    assert_eq!(fs::read(key_dir.join(HEAT_LEFT_SHIFT))?, vec![10, 0, 0, 0]);
    assert!(!key_dir.join(HEAT_RIGHT_SHIFT).exists());
    assert_eq!(fs::read_dir(&key_dir)?.count(), 1);
    Ok(())
}

#[test]
fn test_failed_load_leaves_store_empty() -> Result<(), CalibrationError> {
    let temp_dir = tempdir()?;
    write_sfpd_disk(temp_dir.path(), &[0u8; 12])?;

    let mut loader = CalibrationLoader::raw_disks(disk_provider(temp_dir.path()), scan_options());
    let mut store = MemoryStore::new();
    let err = loader.apply(&mut store).unwrap_err();
    assert!(matches!(
        err,
        CalibrationError::Corrupt {
            expected: 24,
            actual: 12
        }
    ));
    assert!(store.is_empty());
    Ok(())
}
