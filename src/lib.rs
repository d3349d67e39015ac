//! Locates the `sfpd` GPT partition among the attached disks and loads the
//! display pixel alignment record stored on it.

pub mod constants;
pub mod device;
pub mod error;
pub mod fat;
pub mod gpt;
pub mod layout;
pub mod loader;
pub mod locator;
pub mod mbr;
pub mod options;
pub mod reader;
pub mod record;
pub mod retry;
pub mod store;
pub mod volume;

pub use crate::device::{BlockDeviceProvider, OpenError, RawDisk, RawDiskProvider};
pub use crate::error::{CalibrationError, Result};
pub use crate::fat::FatVolumes;
pub use crate::layout::{DriveLayout, DriveLayoutQuery, PartitionStyle, fetch_drive_layout};
pub use crate::loader::{CalibrationLoader, LoadState};
pub use crate::locator::{PartitionMarker, find_named_partition, locate_partition};
pub use crate::options::ScanOptions;
pub use crate::reader::{DirectoryVolumes, VolumeFileSystem, item_size, read_item};
pub use crate::record::{CalibrationRecord, PanelSide, ShiftAssignment};
pub use crate::store::{ConfigStore, DirectoryStore, MemoryStore, persist_shift_assignment};
pub use crate::volume::{VolumeLocation, resolve_volume};

/// Loads the record from the host's raw disks with the default scan bounds.
pub fn load_calibration_record() -> Result<CalibrationRecord> {
    CalibrationLoader::raw_disks(RawDiskProvider::default(), ScanOptions::default()).load()
}
