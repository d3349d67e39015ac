// sfpd-align/src/volume.rs

use std::fmt;

use log::info;

use crate::device::BlockDeviceProvider;
use crate::error::Result;
use crate::locator::{PartitionMarker, locate_partition};
use crate::options::ScanOptions;

/// A located partition: disk index plus 1-based partition number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolumeLocation {
    pub disk_index: u32,
    pub partition_number: u32,
}

impl VolumeLocation {
    pub fn new(disk_index: u32, partition_number: u32) -> Self {
        VolumeLocation {
            disk_index,
            partition_number,
        }
    }

    /// NT device path of the volume root, with a trailing separator so that
    /// an item path can be appended directly.
    pub fn volume_path(&self) -> String {
        format!(
            "\\Device\\Harddisk{}\\Partition{}\\",
            self.disk_index, self.partition_number
        )
    }
}

impl fmt::Display for VolumeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.volume_path())
    }
}

/// Scans the disks for the sfpd partition. Always starts over from disk 0.
pub fn resolve_volume<P: BlockDeviceProvider>(
    provider: &P,
    options: &ScanOptions,
) -> Result<VolumeLocation> {
    let (disk_index, partition_number) =
        locate_partition(provider, PartitionMarker::sfpd(), options)?;
    let volume = VolumeLocation::new(disk_index, partition_number);
    info!("resolve_volume: sfpd volume at {}", volume);
    Ok(volume)
}
