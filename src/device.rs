// sfpd-align/src/device.rs
//! Block devices addressed by index.

use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom},
    path::PathBuf,
};

use log::debug;

use crate::constants::{GPT_HEADER_LBA, GPT_SIGNATURE, SECTOR_SIZE};
use crate::gpt;
use crate::layout::{
    DriveLayout, DriveLayoutQuery, LayoutQueryError, PartitionDetail, PartitionInfo,
    PartitionStyle,
};
use crate::mbr::Mbr;

#[cfg(windows)]
fn is_sharing_violation(err: &io::Error) -> bool {
    const ERROR_SHARING_VIOLATION: i32 = 32;
    err.raw_os_error() == Some(ERROR_SHARING_VIOLATION)
        || err.kind() == io::ErrorKind::ResourceBusy
}

#[cfg(not(windows))]
fn is_sharing_violation(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::ResourceBusy
}

/// Why a device could not be opened.
#[derive(Debug)]
pub enum OpenError {
    /// Someone else holds the device; worth retrying after a pause.
    SharingViolation,
    /// Nothing is attached at this index.
    NoDevice,
    Io(io::Error),
}

impl OpenError {
    pub fn is_sharing_violation(&self) -> bool {
        matches!(self, OpenError::SharingViolation)
    }
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenError::SharingViolation => write!(f, "sharing violation"),
            OpenError::NoDevice => write!(f, "no such device"),
            OpenError::Io(err) => write!(f, "{}", err),
        }
    }
}

impl From<io::Error> for OpenError {
    fn from(err: io::Error) -> Self {
        if is_sharing_violation(&err) {
            return OpenError::SharingViolation;
        }
        match err.kind() {
            io::ErrorKind::NotFound => OpenError::NoDevice,
            _ => OpenError::Io(err),
        }
    }
}

/// Source of block devices, addressed by a disk index starting at zero.
pub trait BlockDeviceProvider {
    type Device: DriveLayoutQuery;

    /// Opens disk `index` for reading. The device is released on drop.
    fn open_device(&self, index: u32) -> Result<Self::Device, OpenError>;
}

impl<P: BlockDeviceProvider + ?Sized> BlockDeviceProvider for &P {
    type Device = P::Device;

    fn open_device(&self, index: u32) -> Result<Self::Device, OpenError> {
        (**self).open_device(index)
    }
}

/// Opens disks through device paths built from a template.
///
/// `{index}` is replaced with the disk index and `{letter}` with the
/// matching drive letter (`0` → `a`, `25` → `z`, `26` → `aa`).
#[derive(Debug, Clone)]
pub struct RawDiskProvider {
    template: String,
}

impl RawDiskProvider {
    pub fn new(template: impl Into<String>) -> Self {
        RawDiskProvider {
            template: template.into(),
        }
    }

    pub fn device_path(&self, index: u32) -> PathBuf {
        PathBuf::from(
            self.template
                .replace("{index}", &index.to_string())
                .replace("{letter}", &drive_letters(index)),
        )
    }
}

impl Default for RawDiskProvider {
    #[cfg(windows)]
    fn default() -> Self {
        RawDiskProvider::new(r"\\.\PhysicalDrive{index}")
    }

    #[cfg(not(windows))]
    fn default() -> Self {
        RawDiskProvider::new("/dev/sd{letter}")
    }
}

impl BlockDeviceProvider for RawDiskProvider {
    type Device = RawDisk;

    fn open_device(&self, index: u32) -> Result<RawDisk, OpenError> {
        let path = self.device_path(index);
        debug!("open_device: opening {}", path.display());
        let file = OpenOptions::new().read(true).open(&path)?;
        Ok(RawDisk::new(file, path))
    }
}

fn drive_letters(index: u32) -> String {
    let mut letters = Vec::new();
    let mut n = index as u64 + 1;
    while n > 0 {
        n -= 1;
        letters.push(b'a' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// A disk, or disk image, read through a file handle.
pub struct RawDisk {
    file: File,
    path: PathBuf,
}

impl RawDisk {
    pub fn new(file: File, path: PathBuf) -> Self {
        RawDisk { file, path }
    }
}

impl fmt::Debug for RawDisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawDisk").field("path", &self.path).finish()
    }
}

impl Read for RawDisk {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for RawDisk {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl DriveLayoutQuery for RawDisk {
    fn query_drive_layout(&mut self, capacity: usize) -> Result<DriveLayout, LayoutQueryError> {
        read_drive_layout(self, capacity)
    }
}

/// Builds a layout from the MBR and GPT found on `disk`.
///
/// A disk is reported as GPT when LBA 1 carries the GPT signature, as MBR when
/// only a boot signature is present and as raw otherwise.
pub fn read_drive_layout<R: Read + Seek>(
    disk: &mut R,
    capacity: usize,
) -> Result<DriveLayout, LayoutQueryError> {
    let mbr = match Mbr::read_from(disk) {
        Ok(mbr) => mbr,
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(DriveLayout::raw()),
        Err(err) => return Err(err.into()),
    };

    if has_gpt_signature(disk)? {
        if !mbr.as_ref().is_some_and(Mbr::is_protective) {
            debug!("read_drive_layout: GPT without a protective MBR");
        }
        let (_, entries) = gpt::read_gpt(disk)?;
        if entries.len() > capacity {
            return Err(LayoutQueryError::BufferTooSmall {
                required: entries.len(),
            });
        }
        let partitions = entries
            .into_iter()
            .map(|(partition_number, entry)| {
                let (starting_offset, length) = entry.byte_range()?;
                debug!(
                    "read_drive_layout: GPT slot {} {:?} at {} ({} bytes)",
                    partition_number,
                    entry.name(),
                    starting_offset,
                    length
                );
                Ok(PartitionInfo {
                    partition_number,
                    starting_offset,
                    length,
                    detail: PartitionDetail::Gpt {
                        partition_type: entry.partition_type_guid,
                        partition_id: entry.unique_partition_guid,
                        attributes: entry.attributes,
                        name: entry.partition_name,
                    },
                })
            })
            .collect::<io::Result<Vec<_>>>()?;
        return Ok(DriveLayout {
            style: PartitionStyle::Gpt,
            partitions,
        });
    }

    let Some(mbr) = mbr else {
        return Ok(DriveLayout::raw());
    };
    let partitions: Vec<PartitionInfo> = mbr
        .partition_table
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.is_used())
        .map(|(i, entry)| PartitionInfo {
            partition_number: i as u32 + 1,
            starting_offset: entry.start_lba as u64 * SECTOR_SIZE,
            length: entry.sector_count as u64 * SECTOR_SIZE,
            detail: PartitionDetail::Mbr {
                partition_type: entry.partition_type,
                boot_indicator: entry.is_bootable(),
            },
        })
        .collect();
    if partitions.len() > capacity {
        return Err(LayoutQueryError::BufferTooSmall {
            required: partitions.len(),
        });
    }
    Ok(DriveLayout {
        style: PartitionStyle::Mbr,
        partitions,
    })
}

fn has_gpt_signature<R: Read + Seek>(disk: &mut R) -> io::Result<bool> {
    disk.seek(SeekFrom::Start(GPT_HEADER_LBA * SECTOR_SIZE))?;
    let mut signature = [0u8; 8];
    match disk.read_exact(&mut signature) {
        Ok(()) => Ok(signature == GPT_SIGNATURE),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err),
    }
}
