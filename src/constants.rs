// sfpd-align/src/constants.rs

use std::time::Duration;

/// GPT partition name identifying the firmware provisioning data partition.
pub const SFPD_PARTITION_NAME: &str = "sfpd";

/// Location of the pixel alignment record, relative to the volume root.
pub const PIXEL_ALIGNMENT_DATA_FILE_PATH: &str = "PixelAlignmentData.bin";

/// Highest disk index scanned while looking for the sfpd partition (inclusive).
pub const MAX_DEVICE_INDEX: u32 = 6;

/// Attempts made to open a disk that reports a sharing violation.
pub const MAX_FILE_OPEN_ATTEMPTS: u32 = 10;

/// Pause between two consecutive open attempts.
pub const OPEN_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Number of partition entries the first layout query makes room for.
pub const INITIAL_PARTITION_COUNT_GUESS: usize = 4;

/// Largest partition count guess that may still be doubled.
pub const MAX_PARTITION_COUNT_GUESS: usize = 256;

// GPT / MBR geometry
pub const SECTOR_SIZE: u64 = 512;
pub const GPT_HEADER_LBA: u64 = 1;
pub const GPT_SIGNATURE: [u8; 8] = *b"EFI PART";
pub const GPT_HEADER_CRC_SIZE: usize = 92;
pub const GPT_PARTITION_NAME_UNITS: usize = 36;
pub const GPT_PARTITION_ENTRY_SIZE: usize = 128;
pub const MBR_BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];

// Configuration store layout
pub const REGISTRY_PARAMETER_HEAT: &str = "Heat";
pub const REGISTRY_PARAMETER_VENDOR_SPECIFIC: &str = "VendorSpecific";
pub const HEAT_LEFT_SHIFT: &str = "PixelShiftForLeftPanelInMicrometer";
pub const HEAT_RIGHT_SHIFT: &str = "PixelShiftForRightPanelInMicrometer";
