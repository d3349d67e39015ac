// sfpd-align/src/locator.rs
//! Finds the GPT partition carrying a given name across indexed disks.

use log::{debug, info, warn};

use crate::constants::SFPD_PARTITION_NAME;
use crate::device::{BlockDeviceProvider, OpenError};
use crate::error::{CalibrationError, Result};
use crate::gpt::{GptPartitionName, encode_partition_name};
use crate::layout::{DriveLayout, PartitionStyle, fetch_drive_layout};
use crate::options::ScanOptions;
use crate::retry::RetryError;

/// A partition name matched against the whole fixed-width GPT name field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionMarker(GptPartitionName);

impl PartitionMarker {
    pub fn new(name: &str) -> Self {
        PartitionMarker(encode_partition_name(name))
    }

    pub fn sfpd() -> Self {
        PartitionMarker::new(SFPD_PARTITION_NAME)
    }

    /// Every unit must match, including the NUL padding after the name.
    pub fn matches(&self, name: &GptPartitionName) -> bool {
        self.0 == *name
    }
}

/// Number of the first GPT entry whose name field equals `marker`.
/// Tables in any other style never match.
pub fn find_marker_in_layout(layout: &DriveLayout, marker: &PartitionMarker) -> Option<u32> {
    if layout.style != PartitionStyle::Gpt {
        return None;
    }
    layout
        .partitions
        .iter()
        .find(|info| info.gpt_name().is_some_and(|name| marker.matches(name)))
        .map(|info| info.partition_number)
}

/// Opens disk `index`, retrying while it reports a sharing violation.
pub fn open_with_retry<P: BlockDeviceProvider>(
    provider: &P,
    index: u32,
    options: &ScanOptions,
) -> Result<P::Device> {
    options
        .open_retry_policy()
        .run(OpenError::is_sharing_violation, |attempt| {
            if attempt > 1 {
                debug!("open_with_retry: disk {} attempt {}", index, attempt);
            }
            provider.open_device(index)
        })
        .map_err(|err| match err {
            RetryError::Exhausted { attempts, .. } => {
                warn!("open_with_retry: disk {} busy after {} attempts", index, attempts);
                CalibrationError::DeviceBusy { attempts }
            }
            RetryError::Aborted(OpenError::NoDevice) => {
                CalibrationError::NotFound(format!("disk {}", index))
            }
            RetryError::Aborted(OpenError::Io(err)) => CalibrationError::Io(err),
            RetryError::Aborted(OpenError::SharingViolation) => {
                CalibrationError::DeviceBusy { attempts: 1 }
            }
        })
}

/// Looks for the marker partition on disk `index`.
///
/// The device is dropped before returning on every path. `Ok(None)` means the
/// disk was readable but holds no matching GPT entry.
pub fn find_named_partition<P: BlockDeviceProvider>(
    provider: &P,
    index: u32,
    marker: &PartitionMarker,
    options: &ScanOptions,
) -> Result<Option<u32>> {
    let mut device = open_with_retry(provider, index, options)?;
    let layout = fetch_drive_layout(
        &mut device,
        options.initial_partition_guess,
        options.max_partition_guess,
    )?;
    drop(device);

    let found = find_marker_in_layout(&layout, marker);
    match found {
        Some(partition) => info!(
            "find_named_partition: disk {} partition {} matches marker",
            index, partition
        ),
        None => debug!(
            "find_named_partition: no match on disk {} ({:?}, {} partitions)",
            index,
            layout.style,
            layout.partitions.len()
        ),
    }
    Ok(found)
}

/// Scans disks `0..=max_device_index` in order, one result per disk.
pub struct DeviceScan<'a, P: BlockDeviceProvider> {
    provider: &'a P,
    marker: PartitionMarker,
    options: &'a ScanOptions,
    next_index: Option<u32>,
}

impl<'a, P: BlockDeviceProvider> DeviceScan<'a, P> {
    pub fn new(provider: &'a P, marker: PartitionMarker, options: &'a ScanOptions) -> Self {
        DeviceScan {
            provider,
            marker,
            options,
            next_index: Some(0),
        }
    }
}

impl<P: BlockDeviceProvider> Iterator for DeviceScan<'_, P> {
    type Item = (u32, Result<Option<u32>>);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next_index.filter(|&i| i <= self.options.max_device_index)?;
        self.next_index = index.checked_add(1);
        let result = find_named_partition(self.provider, index, &self.marker, self.options);
        Some((index, result))
    }
}

/// First `(disk, partition)` carrying the marker.
///
/// A disk that cannot be scanned is logged and skipped so that one bad device
/// does not hide the partition on another.
pub fn locate_partition<P: BlockDeviceProvider>(
    provider: &P,
    marker: PartitionMarker,
    options: &ScanOptions,
) -> Result<(u32, u32)> {
    for (index, result) in DeviceScan::new(provider, marker, options) {
        match result {
            Ok(Some(partition)) => return Ok((index, partition)),
            Ok(None) => {}
            Err(CalibrationError::NotFound(_)) => debug!("locate_partition: no disk {}", index),
            Err(err) => warn!("locate_partition: skipping disk {}: {}", index, err),
        }
    }
    Err(CalibrationError::NotFound(format!(
        "no GPT partition named {:?} on disks 0..={}",
        SFPD_PARTITION_NAME, options.max_device_index
    )))
}
