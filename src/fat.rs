// sfpd-align/src/fat.rs
use fatfs::{FileSystem, FsOptions};
use log::debug;
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::device::BlockDeviceProvider;
use crate::error::CalibrationError;
use crate::layout::fetch_drive_layout;
use crate::locator::open_with_retry;
use crate::options::ScanOptions;
use crate::reader::VolumeFileSystem;
use crate::volume::VolumeLocation;

/// A read-only window onto one partition of a disk.
///
/// Offsets are relative to the partition start, so the FAT driver sees the
/// partition as a whole volume. Writes are refused.
pub struct PartitionSlice<T> {
    inner: T,
    start: u64,
    len: u64,
    pos: u64,
}

impl<T: Seek> PartitionSlice<T> {
    pub fn new(mut inner: T, start: u64, len: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(start))?;
        Ok(Self {
            inner,
            start,
            len,
            pos: 0,
        })
    }
}

impl<T: Read> Read for PartitionSlice<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len.saturating_sub(self.pos);
        let max = (buf.len() as u64).min(remaining) as usize;
        if max == 0 {
            return Ok(0);
        }
        let n = self.inner.read(&mut buf[..max])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<T: Seek> Seek for PartitionSlice<T> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before the start of the partition",
            )
        })?;
        let absolute = self.start.checked_add(target).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek past the addressable end of the disk",
            )
        })?;
        self.inner.seek(SeekFrom::Start(absolute))?;
        self.pos = target;
        Ok(target)
    }
}

impl<T> Write for PartitionSlice<T> {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "partition is opened read-only",
        ))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Reads items from FAT12/16/32 volumes on disks of a block device provider.
pub struct FatVolumes<P> {
    provider: P,
    options: ScanOptions,
}

impl<P> FatVolumes<P>
where
    P: BlockDeviceProvider,
    P::Device: Read + Seek,
{
    pub fn new(provider: P, options: ScanOptions) -> Self {
        Self { provider, options }
    }

    /// Opens the disk holding `volume` and limits it to the partition bytes.
    fn open_partition(&self, volume: &VolumeLocation) -> io::Result<PartitionSlice<P::Device>> {
        let mut device = open_with_retry(&self.provider, volume.disk_index, &self.options)?;
        let layout = fetch_drive_layout(
            &mut device,
            self.options.initial_partition_guess,
            self.options.max_partition_guess,
        )?;
        let partition = layout.partition(volume.partition_number).ok_or_else(|| {
            CalibrationError::NotFound(format!("partition {} on disk {}", volume.partition_number, volume.disk_index))
        })?;
        debug!(
            "open_partition: {} spans {} bytes at offset {}",
            volume, partition.length, partition.starting_offset
        );
        PartitionSlice::new(device, partition.starting_offset, partition.length)
    }

    fn with_item<R>(
        &self,
        volume: &VolumeLocation,
        item_path: &str,
        f: impl FnOnce(&mut fatfs::File<'_, PartitionSlice<P::Device>>) -> io::Result<R>,
    ) -> io::Result<R> {
        let slice = self.open_partition(volume)?;
        let fs = FileSystem::new(slice, FsOptions::new())?;
        let root_dir = fs.root_dir();
        let mut file = root_dir.open_file(&fat_path(item_path))?;
        f(&mut file)
    }
}

impl<P> VolumeFileSystem for FatVolumes<P>
where
    P: BlockDeviceProvider,
    P::Device: Read + Seek,
{
    fn item_len(&self, volume: &VolumeLocation, item_path: &str) -> io::Result<u64> {
        self.with_item(volume, item_path, |file| file.seek(SeekFrom::End(0)))
    }

    fn read_item(
        &self,
        volume: &VolumeLocation,
        item_path: &str,
        buf: &mut [u8],
    ) -> io::Result<()> {
        self.with_item(volume, item_path, |file| file.read_exact(buf))
    }
}

/// FAT paths use `/` and are relative to the root directory.
fn fat_path(item_path: &str) -> String {
    item_path
        .split(['/', '\\'])
        .filter(|component| !component.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
